//! Test executor - run one test or hook inside an isolated scope

use crate::arena::{Arena, LeakReport, Tracked};
use crate::case::{capture_backtrace, Failure, TestCase, TestError, TestResult};
use crate::context::RunContext;
use std::any::Any;
use std::cell::RefCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::{Duration, Instant};

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static PANIC_SLOT: RefCell<PanicSlot> = const { RefCell::new(PanicSlot::Idle) };
}

/// Per-thread handoff between the panic hook and [`run_scoped`]
#[derive(Debug)]
enum PanicSlot {
    Idle,
    Armed,
    Caught(PanicDetails),
}

/// What the panic hook recorded for a panicking body
#[derive(Debug, Default)]
struct PanicDetails {
    location: Option<String>,
    backtrace: Option<String>,
}

/// Chain a hook in front of the existing one. Panics on a thread that is
/// running a body are recorded instead of printed; every other panic goes
/// to the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let recorded = PANIC_SLOT
                .try_with(|slot| {
                    let Ok(mut slot) = slot.try_borrow_mut() else {
                        return false;
                    };
                    if !matches!(*slot, PanicSlot::Armed) {
                        return false;
                    }
                    *slot = PanicSlot::Caught(PanicDetails {
                        location: info.location().map(|l| l.to_string()),
                        backtrace: capture_backtrace(),
                    });
                    true
                })
                .unwrap_or(false);

            if !recorded {
                previous(info);
            }
        }));
    });
}

/// Arm the slot for a body, returning whatever an enclosing run left there
fn arm_panic_slot() -> PanicSlot {
    PANIC_SLOT.with(|slot| mem::replace(&mut *slot.borrow_mut(), PanicSlot::Armed))
}

/// Restore the enclosing state and hand back what the hook recorded
fn disarm_panic_slot(outer: PanicSlot) -> PanicDetails {
    match PANIC_SLOT.with(|slot| mem::replace(&mut *slot.borrow_mut(), outer)) {
        PanicSlot::Caught(details) => details,
        PanicSlot::Idle | PanicSlot::Armed => PanicDetails::default(),
    }
}

/// Resources available to a running test body
#[derive(Debug)]
pub struct Scope<'a> {
    name: &'a str,
    arena: Arena,
}

impl<'a> Scope<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            arena: Arena::new(),
        }
    }

    /// Qualified name of the running test
    pub fn name(&self) -> &str {
        self.name
    }

    /// The test's allocation arena
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Allocate through the test's arena
    pub fn alloc<T>(&self, value: T) -> Tracked<'_, T> {
        self.arena.alloc(value)
    }

    fn close(self) -> Option<LeakReport> {
        self.arena.close()
    }
}

/// Why a test was reported as skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The body returned the skip signal
    Requested(Option<String>),
    /// A beforeAll hook of the module failed
    ModuleSetupFailed,
    /// A beforeEach hook failed for this test
    BeforeEachFailed,
}

impl SkipReason {
    /// Parenthesized note in the report, if any
    pub fn note(&self) -> Option<&str> {
        match self {
            SkipReason::Requested(reason) => reason.as_deref(),
            SkipReason::ModuleSetupFailed => Some("module setup failed"),
            SkipReason::BeforeEachFailed => Some("beforeEach failed"),
        }
    }
}

/// Classification of a finished test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail(Failure),
    Skip(SkipReason),
}

/// Everything recorded about one regular test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub status: TestStatus,
    pub duration: Duration,
    /// Allocations the test never released
    pub leak: Option<LeakReport>,
    /// Error-level log events emitted while the test ran
    pub log_errors: usize,
}

impl TestOutcome {
    /// Outcome for a test whose body was never invoked
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            status: TestStatus::Skip(reason),
            duration: Duration::ZERO,
            leak: None,
            log_errors: 0,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.status, TestStatus::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self.status, TestStatus::Fail(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.status, TestStatus::Skip(_))
    }
}

struct ScopedRun {
    result: Result<TestResult, Box<dyn Any + Send>>,
    duration: Duration,
    leak: Option<LeakReport>,
    panic: PanicDetails,
}

/// Invoke `case` in a fresh scope with the run's log dispatcher installed.
///
/// The arena is closed on every path, including a panicking body.
fn run_scoped(case: &TestCase, ctx: &RunContext) -> ScopedRun {
    install_panic_hook();

    let scope = Scope::new(case.name());
    let start = Instant::now();
    let outer = arm_panic_slot();
    let result = tracing::dispatcher::with_default(ctx.dispatch(), || {
        panic::catch_unwind(AssertUnwindSafe(|| case.invoke(&scope)))
    });
    let panic = disarm_panic_slot(outer);
    let duration = start.elapsed();
    let leak = scope.close();

    ScopedRun {
        result,
        duration,
        leak,
        panic,
    }
}

/// Execute a regular test and classify the outcome
pub fn execute(test: &TestCase, ctx: &RunContext) -> TestOutcome {
    ctx.capture().reset_test();
    let ScopedRun {
        result,
        duration,
        leak,
        panic,
    } = run_scoped(test, ctx);

    let status = match result {
        Ok(Ok(())) => TestStatus::Pass,
        Ok(Err(TestError::Skipped(reason))) => TestStatus::Skip(SkipReason::Requested(reason)),
        Ok(Err(TestError::Failed(failure))) => TestStatus::Fail(failure),
        Err(payload) => TestStatus::Fail(panic_failure(payload.as_ref(), panic)),
    };

    let outcome = TestOutcome {
        status,
        duration,
        leak,
        log_errors: ctx.capture().test_errors(),
    };

    tracing::debug!(
        test = test.name(),
        duration = ?outcome.duration,
        leaked = outcome.leak.is_some(),
        "test finished"
    );

    outcome
}

/// Run a lifecycle hook. A hook that signals skip has nothing to set up and
/// counts as success; leaks in hook arenas are not counted.
pub fn run_hook(hook: &TestCase, ctx: &RunContext) -> Result<(), Failure> {
    let run = run_scoped(hook, ctx);

    if let Some(leak) = run.leak {
        tracing::debug!(hook = hook.name(), %leak, "hook left allocations live");
    }

    match run.result {
        Ok(Ok(())) | Ok(Err(TestError::Skipped(_))) => Ok(()),
        Ok(Err(TestError::Failed(failure))) => Err(failure),
        Err(payload) => Err(panic_failure(payload.as_ref(), run.panic)),
    }
}

fn panic_failure(payload: &(dyn Any + Send), details: PanicDetails) -> Failure {
    Failure::panic(panic_message(payload), details.location, details.backtrace)
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Some((*s).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{expect_equal, skip, skip_because};
    use crate::name::decompose;
    use crate::reporter::Reporter;
    use pretty_assertions::assert_eq;
    use termcolor::Buffer;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_passing_test() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("math.test.adds", |_| expect_equal(4, 2 + 2));

        let outcome = execute(&test, &ctx);
        assert!(outcome.is_pass());
        assert_eq!(outcome.leak, None);
        assert_eq!(outcome.log_errors, 0);
    }

    #[test]
    fn test_failing_test_keeps_identifier() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("math.test.broken", |_| expect_equal(5, 2 + 2));

        let outcome = execute(&test, &ctx);
        match outcome.status {
            TestStatus::Fail(failure) => assert_eq!(failure.name, "TestExpectedEqual"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_signal() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("net.test.offline", |_| skip());

        let outcome = execute(&test, &ctx);
        assert_eq!(outcome.status, TestStatus::Skip(SkipReason::Requested(None)));
    }

    #[test]
    fn test_panic_becomes_failure() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("math.test.panics", |_| {
            let values: Vec<u8> = Vec::new();
            if values.is_empty() {
                panic!("no values");
            }
            Ok(())
        });

        let outcome = execute(&test, &ctx);
        match outcome.status {
            TestStatus::Fail(failure) => {
                assert_eq!(failure.name, "Panic");
                assert_eq!(failure.message.as_deref(), Some("no values"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_records_location() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("math.test.wrong_sum", |_| {
            assert_eq!(1 + 1, 3);
            Ok(())
        });

        let outcome = execute(&test, &ctx);
        match outcome.status {
            TestStatus::Fail(failure) => {
                assert_eq!(failure.name, "Panic");
                let location = failure.location.unwrap_or_default();
                assert!(location.contains("executor.rs"), "location: {}", location);
                assert!(failure.message.unwrap_or_default().contains("left == right"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_hook_panic_records_location() {
        let ctx = RunContext::quiet();
        let hook = TestCase::new("db.test.zest.beforeAll", |_| panic!("no socket"));

        let failure = run_hook(&hook, &ctx).unwrap_err();
        assert_eq!(failure.message.as_deref(), Some("no socket"));
        assert!(failure.location.is_some());
    }

    #[test]
    fn test_nested_run_keeps_outer_panic_details() {
        let ctx = RunContext::quiet();
        let inner_ctx = RunContext::quiet();
        let test = TestCase::new("meta.test.nested", move |_| {
            let inner = TestCase::new("meta.test.inner", |_| panic!("inner"));
            assert!(execute(&inner, &inner_ctx).is_fail());
            panic!("outer");
        });

        match execute(&test, &ctx).status {
            TestStatus::Fail(failure) => {
                assert_eq!(failure.message.as_deref(), Some("outer"));
                assert!(failure.location.is_some());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_pass_with_leak() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("mem.test.leaky", |scope| {
            let buffer = scope.arena().alloc_bytes(64);
            buffer.leak();
            Ok(())
        });

        let outcome = execute(&test, &ctx);
        assert!(outcome.is_pass());
        assert_eq!(
            outcome.leak,
            Some(LeakReport {
                allocations: 1,
                bytes: 64
            })
        );
    }

    #[test]
    fn test_leak_detected_after_panic() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("mem.test.panics_holding", |scope| {
            std::mem::forget(scope.alloc(7u32));
            panic!("boom");
        });

        let outcome = execute(&test, &ctx);
        assert!(outcome.is_fail());
        assert_eq!(outcome.leak.map(|l| l.allocations), Some(1));
    }

    #[test]
    fn test_leak_counted_on_skip() {
        let ctx = RunContext::quiet();
        let test = TestCase::new("net.test.offline_holding", |scope| {
            std::mem::forget(scope.alloc([0u8; 16]));
            skip_because("no network")
        });

        let outcome = execute(&test, &ctx);
        assert_eq!(
            outcome.status,
            TestStatus::Skip(SkipReason::Requested(Some("no network".into())))
        );
        assert_eq!(
            outcome.leak,
            Some(LeakReport {
                allocations: 1,
                bytes: 16
            })
        );

        let mut reporter = Reporter::new(Buffer::no_color());
        reporter.record(decompose(test.name()), &outcome).unwrap();
        assert_eq!(reporter.counters().skipped, 1);
        assert_eq!(reporter.counters().leaked, 1);
    }

    #[test]
    fn test_each_test_gets_fresh_arena() {
        let ctx = RunContext::quiet();
        let seen = Rc::new(Cell::new(usize::MAX));
        let observed = Rc::clone(&seen);
        let test = TestCase::new("mem.test.fresh", move |scope| {
            observed.set(scope.arena().total_allocations());
            let _kept = scope.alloc(1u8);
            Ok(())
        });

        execute(&test, &ctx);
        execute(&test, &ctx);
        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn test_log_errors_are_counted_per_test() {
        let ctx = RunContext::quiet();
        let noisy = TestCase::new("log.test.noisy", |_| {
            tracing::error!("something broke");
            Ok(())
        });
        let calm = TestCase::new("log.test.calm", |_| {
            tracing::info!("all good");
            Ok(())
        });

        assert_eq!(execute(&noisy, &ctx).log_errors, 1);
        assert_eq!(execute(&calm, &ctx).log_errors, 0);
        assert_eq!(ctx.log_errors(), 1);
    }

    #[test]
    fn test_hook_outcomes() {
        let ctx = RunContext::quiet();
        let ok = TestCase::new("db.test.zest.beforeAll", |_| Ok(()));
        let skipped = TestCase::new("db.test.zest.beforeEach", |_| skip());
        let failing = TestCase::new("db.test.zest.afterAll", |_| {
            Err(Failure::new("ConnectionRefused").into())
        });

        assert_eq!(run_hook(&ok, &ctx), Ok(()));
        assert_eq!(run_hook(&skipped, &ctx), Ok(()));
        assert_eq!(
            run_hook(&failing, &ctx).map_err(|f| f.name),
            Err("ConnectionRefused".into())
        );
    }

    #[test]
    fn test_skip_reason_notes() {
        assert_eq!(SkipReason::Requested(None).note(), None);
        assert_eq!(
            SkipReason::Requested(Some("no network".into())).note(),
            Some("no network")
        );
        assert_eq!(
            SkipReason::ModuleSetupFailed.note(),
            Some("module setup failed")
        );
        assert_eq!(SkipReason::BeforeEachFailed.note(), Some("beforeEach failed"));
    }
}
