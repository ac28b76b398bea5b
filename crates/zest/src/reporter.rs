//! Test reporter - accumulate counters and render the console report

use crate::case::Failure;
use crate::executor::{TestOutcome, TestStatus};
use crate::name::{HookKind, QualifiedName};
use std::io::{self, IsTerminal};
use std::time::Duration;
use termcolor::{Color, ColorChoice, ColorSpec, WriteColor};
use zest_config::ColorMode;

/// Resolve a color mode against the actual stdout.
///
/// `Auto` only colors when stdout is a terminal; NO_COLOR is applied
/// earlier, by the config loader.
pub fn color_choice(mode: ColorMode) -> ColorChoice {
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto => {
            if io::stdout().is_terminal() {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        }
    }
}

/// Whether test log output, which goes to stderr, should carry ANSI codes
pub fn log_ansi(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal(),
    }
}

/// Outcome counters for a run; they only ever increase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub leaked: usize,
}

impl RunCounters {
    /// Count one regular test. A leak is counted on top of the
    /// pass/fail/skip classification.
    pub fn record(&mut self, outcome: &TestOutcome) {
        match outcome.status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail(_) => self.failed += 1,
            TestStatus::Skip(_) => self.skipped += 1,
        }
        if outcome.leak.is_some() {
            self.leaked += 1;
        }
    }

    /// Regular tests recorded
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub counters: RunCounters,
    /// Error-level log events over the whole run
    pub log_errors: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// The verdict: no failures, no leaks, and nothing logged at error level
    pub fn is_success(&self) -> bool {
        self.counters.failed == 0 && self.counters.leaked == 0 && self.log_errors == 0
    }
}

/// Writes one line per test and the final summary
pub struct Reporter<W> {
    out: W,
    counters: RunCounters,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            counters: RunCounters::default(),
        }
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Count a finished test and print its line(s)
    pub fn record(&mut self, name: QualifiedName<'_>, outcome: &TestOutcome) -> io::Result<()> {
        self.counters.record(outcome);

        match &outcome.status {
            TestStatus::Pass => {
                self.write_tag("PASS", Color::Green)?;
                self.write_name(name.module, name.display)?;
                writeln!(self.out, " ({})", format_duration(outcome.duration))?;
            }
            TestStatus::Fail(failure) => {
                self.write_tag("FAIL", Color::Red)?;
                self.write_name(name.module, name.display)?;
                writeln!(self.out, " ({})", format_duration(outcome.duration))?;
                self.write_failure(failure)?;
            }
            TestStatus::Skip(reason) => {
                self.write_tag("SKIP", Color::Yellow)?;
                self.write_name(name.module, name.display)?;
                match reason.note() {
                    Some(note) => writeln!(self.out, " ({})", note)?,
                    None => writeln!(self.out)?,
                }
            }
        }

        if let Some(leak) = &outcome.leak {
            self.write_tag("LEAK", Color::Red)?;
            self.write_name(name.module, name.display)?;
            writeln!(self.out, " ({})", leak)?;
        }

        if outcome.log_errors > 0 {
            self.write_tag("LOG", Color::Red)?;
            self.write_name(name.module, name.display)?;
            writeln!(
                self.out,
                " ({} error{} logged)",
                outcome.log_errors,
                plural(outcome.log_errors)
            )?;
        }

        Ok(())
    }

    /// Print a `HOOK FAIL` line; counters are untouched
    pub fn hook_failure(&mut self, module: &str, kind: HookKind, failure: &Failure) -> io::Result<()> {
        self.write_tag("HOOK FAIL", Color::Red)?;
        self.write_name(module, kind.label())?;
        writeln!(self.out)?;
        self.write_failure(failure)
    }

    /// Print the summary line and hand back the verdict inputs
    pub fn finish(&mut self, duration: Duration, log_errors: usize) -> io::Result<RunSummary> {
        let summary = RunSummary {
            counters: self.counters,
            log_errors,
            duration,
        };
        writeln!(self.out)?;
        render_summary(&mut self.out, &summary)?;
        self.out.flush()?;
        Ok(summary)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_tag(&mut self, tag: &str, color: Color) -> io::Result<()> {
        write!(self.out, "  ")?;
        self.out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(self.out, "{}", tag)?;
        self.out.reset()?;
        write!(self.out, "  ")
    }

    fn write_name(&mut self, module: &str, display: &str) -> io::Result<()> {
        if !module.is_empty() {
            self.out.set_color(ColorSpec::new().set_dimmed(true))?;
            write!(self.out, "{}", module)?;
            self.out.reset()?;
            write!(self.out, ": ")?;
        }
        write!(self.out, "{}", display)
    }

    fn write_failure(&mut self, failure: &Failure) -> io::Result<()> {
        write!(self.out, "  ")?;
        self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(self.out, "error.{}", failure.name)?;
        self.out.reset()?;
        writeln!(self.out)?;

        if let Some(message) = &failure.message {
            for line in message.lines() {
                writeln!(self.out, "  {}", line)?;
            }
        }
        if let Some(location) = &failure.location {
            writeln!(self.out, "  at {}", location)?;
        }
        if let Some(backtrace) = &failure.backtrace {
            self.out.set_color(ColorSpec::new().set_dimmed(true))?;
            for line in backtrace.lines() {
                writeln!(self.out, "    {}", line)?;
            }
            self.out.reset()?;
        }
        Ok(())
    }
}

/// Render `N passed[, N failed][, N skipped][, N leaked][, N errors logged] in T`.
///
/// Pure function of its input.
pub fn render_summary(w: &mut impl WriteColor, summary: &RunSummary) -> io::Result<()> {
    let counters = &summary.counters;

    if counters.failed == 0 && counters.leaked == 0 {
        w.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    }
    write!(w, "{} passed", counters.passed)?;
    w.reset()?;

    if counters.failed > 0 {
        write!(w, ", ")?;
        w.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(w, "{} failed", counters.failed)?;
        w.reset()?;
    }
    if counters.skipped > 0 {
        write!(w, ", {} skipped", counters.skipped)?;
    }
    if counters.leaked > 0 {
        write!(w, ", ")?;
        w.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(w, "{} leaked", counters.leaked)?;
        w.reset()?;
    }
    if summary.log_errors > 0 {
        write!(w, ", ")?;
        w.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(
            w,
            "{} error{} logged",
            summary.log_errors,
            plural(summary.log_errors)
        )?;
        w.reset()?;
    }

    writeln!(w, " in {}", format_duration(summary.duration))
}

/// One decimal place, unit picked by magnitude: ns, µs, ms, s
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos < 1_000 {
        format!("{:.1}ns", nanos as f64)
    } else if nanos < 1_000_000 {
        format!("{:.1}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.1}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.1}s", nanos as f64 / 1_000_000_000.0)
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
