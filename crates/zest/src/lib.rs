//! Zest - a module-aware test harness
//!
//! Runs a discovered list of named tests in order and reports one line per
//! test plus a summary:
//! - Tests are grouped into modules by their qualified name
//!   (`<module>.test.<display>`)
//! - Lifecycle hooks (`<module>.test.zest.beforeAll` and friends) run around
//!   the tests of their module
//! - Each test gets a fresh allocation arena; anything still live when the
//!   test ends is reported as a leak
//! - Log output emitted by test bodies is filtered by a threshold, while
//!   error-level events are always counted and fail the run
//!
//! # Example
//!
//! ```no_run
//! use zest::{expect_equal, skip, TestCase};
//!
//! fn main() -> std::process::ExitCode {
//!     zest::main(vec![
//!         TestCase::new("math.test.adds", |_| expect_equal(4, 2 + 2)),
//!         TestCase::new("net.test.requires interface", |_| skip()),
//!     ])
//! }
//! ```

pub mod arena;
pub mod capture;
pub mod case;
pub mod context;
pub mod error;
pub mod executor;
pub mod harness;
pub mod hooks;
pub mod lifecycle;
pub mod name;
pub mod reporter;

pub use arena::{Arena, LeakReport, Tracked};
pub use case::{expect, expect_equal, skip, skip_because, Failure, TestCase, TestError, TestResult};
pub use context::RunContext;
pub use error::{RunError, RunResult};
pub use executor::{Scope, SkipReason, TestOutcome, TestStatus};
pub use harness::{main, run, try_run, HarnessArgs};
pub use lifecycle::run_tests;
pub use name::{decompose, HookKind, QualifiedName};
pub use reporter::{Reporter, RunCounters, RunSummary};

pub use zest_config::{ColorMode, LogLevel};
