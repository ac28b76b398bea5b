//! Module lifecycle coordinator
//!
//! Drives a run in discovery order: lazily runs each module's beforeAll
//! hooks on its first regular test, wraps every test in its beforeEach and
//! afterEach hooks, and runs afterAll hooks for touched modules once the
//! last test has finished.

use crate::case::TestCase;
use crate::context::RunContext;
use crate::error::RunResult;
use crate::executor::{execute, run_hook, SkipReason, TestOutcome};
use crate::hooks::{ModuleId, ModuleRegistry};
use crate::name::{decompose, hook_kind, module_prefix, HookKind};
use crate::reporter::{Reporter, RunSummary};
use std::time::Instant;
use termcolor::WriteColor;

/// Run every test in `tests` and render the summary through `reporter`
pub fn run_tests<W: WriteColor>(
    tests: &[TestCase],
    ctx: &RunContext,
    reporter: &mut Reporter<W>,
) -> RunResult<RunSummary> {
    let coordinator = Coordinator::new(tests, ctx, reporter)?;
    ctx.capture().activate();
    coordinator.run()
}

/// Owns the module registry for the duration of one run
pub struct Coordinator<'a, W> {
    tests: &'a [TestCase],
    registry: ModuleRegistry,
    ctx: &'a RunContext,
    reporter: &'a mut Reporter<W>,
}

impl<'a, W: WriteColor> Coordinator<'a, W> {
    pub fn new(
        tests: &'a [TestCase],
        ctx: &'a RunContext,
        reporter: &'a mut Reporter<W>,
    ) -> RunResult<Self> {
        let registry = ModuleRegistry::build(tests)?;
        Ok(Self {
            tests,
            registry,
            ctx,
            reporter,
        })
    }

    pub fn run(mut self) -> RunResult<RunSummary> {
        let start = Instant::now();
        let tests = self.tests;

        for test in tests {
            if hook_kind(test.name()).is_some() {
                continue;
            }
            self.run_one(test)?;
        }

        let touched = self.registry.touched().to_vec();
        for id in touched {
            self.run_hooks(id, HookKind::AfterAll)?;
        }

        let summary = self
            .reporter
            .finish(start.elapsed(), self.ctx.log_errors())?;

        tracing::debug!(
            passed = summary.counters.passed,
            failed = summary.counters.failed,
            skipped = summary.counters.skipped,
            leaked = summary.counters.leaked,
            log_errors = summary.log_errors,
            "run finished"
        );

        Ok(summary)
    }

    fn run_one(&mut self, test: &TestCase) -> RunResult<()> {
        let id = self.registry.touch(module_prefix(test.name()))?;
        let name = decompose(test.name());

        if !self.registry.entry(id).before_all_attempted {
            let ok = self.run_hooks(id, HookKind::BeforeAll)?;
            let entry = self.registry.entry_mut(id);
            entry.before_all_attempted = true;
            entry.skipped = !ok;
            if !ok {
                tracing::debug!(module = entry.key(), "module setup failed");
            }
        }

        if self.registry.entry(id).skipped {
            let outcome = TestOutcome::skipped(SkipReason::ModuleSetupFailed);
            self.reporter.record(name, &outcome)?;
            return Ok(());
        }

        let outcome = if self.run_hooks(id, HookKind::BeforeEach)? {
            execute(test, self.ctx)
        } else {
            TestOutcome::skipped(SkipReason::BeforeEachFailed)
        };
        self.reporter.record(name, &outcome)?;

        self.run_hooks(id, HookKind::AfterEach)?;
        Ok(())
    }

    /// Run the module's hooks of `kind` in order. Setup hooks stop at the
    /// first failure; teardown hooks always all run. Returns whether every
    /// hook that ran succeeded.
    fn run_hooks(&mut self, id: ModuleId, kind: HookKind) -> RunResult<bool> {
        let stop_on_failure = matches!(kind, HookKind::BeforeAll | HookKind::BeforeEach);
        let tests = self.tests;
        let entry = self.registry.entry(id);
        let mut ok = true;

        for &position in entry.hooks(kind) {
            let hook = &tests[position];
            if let Err(failure) = run_hook(hook, self.ctx) {
                ok = false;
                self.reporter.hook_failure(entry.key(), kind, &failure)?;
                if stop_on_failure {
                    break;
                }
            }
        }

        Ok(ok)
    }
}
