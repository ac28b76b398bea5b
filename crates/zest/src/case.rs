//! Test cases and the errors a test body can signal

use crate::executor::Scope;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::fmt;

/// Result type returned by test bodies and hooks
pub type TestResult = Result<(), TestError>;

type TestFn = dyn Fn(&Scope<'_>) -> TestResult;

/// A named unit of work supplied by the host's test discovery
pub struct TestCase {
    name: String,
    body: Box<TestFn>,
}

impl TestCase {
    /// Create a test case from a qualified name and a body
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Scope<'_>) -> TestResult + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// Fully qualified name, e.g. `imds.test.parseJsonField`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, scope: &Scope<'_>) -> TestResult {
        (self.body)(scope)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// Condition signalled by a test body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// The test intentionally did not evaluate its assertions
    Skipped(Option<String>),
    /// The test failed
    Failed(Failure),
}

impl TestError {
    pub fn is_skip(&self) -> bool {
        matches!(self, TestError::Skipped(_))
    }
}

/// Any error type can be propagated out of a test body with `?`
impl<E> From<E> for TestError
where
    E: std::error::Error,
{
    fn from(err: E) -> Self {
        TestError::Failed(Failure::from_error(&err))
    }
}

impl From<Failure> for TestError {
    fn from(failure: Failure) -> Self {
        TestError::Failed(failure)
    }
}

/// A failed test or hook: an error identifier plus optional details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Identifier printed as `error.<name>`
    pub name: Cow<'static, str>,
    /// Human readable detail
    pub message: Option<String>,
    /// Source location of a panic, `file:line:column`
    pub location: Option<String>,
    /// Rendered backtrace, when capture is enabled (RUST_BACKTRACE)
    pub backtrace: Option<String>,
}

impl Failure {
    /// Create a failure with the given identifier, capturing a backtrace
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            message: None,
            location: None,
            backtrace: capture_backtrace(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Failure for a caught panic; location and backtrace come from the
    /// panic hook
    pub(crate) fn panic(
        message: Option<String>,
        location: Option<String>,
        backtrace: Option<String>,
    ) -> Self {
        Self {
            name: Cow::Borrowed("Panic"),
            message,
            location,
            backtrace,
        }
    }

    fn from_error<E: std::error::Error>(err: &E) -> Self {
        Failure::new(short_type_name::<E>()).with_message(err.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error.{}", self.name)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

pub(crate) fn capture_backtrace() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

/// `std::num::ParseIntError` -> `ParseIntError`, generics stripped
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Signal that the current test is intentionally not evaluated
pub fn skip() -> TestResult {
    Err(TestError::Skipped(None))
}

/// Like [`skip`], with a reason shown in the report
pub fn skip_because(reason: impl Into<String>) -> TestResult {
    Err(TestError::Skipped(Some(reason.into())))
}

/// Fail with `TestExpectedEqual` unless `expected == actual`
pub fn expect_equal<T>(expected: T, actual: T) -> TestResult
where
    T: PartialEq + fmt::Debug,
{
    if expected == actual {
        Ok(())
    } else {
        Err(Failure::new("TestExpectedEqual")
            .with_message(format!("expected {:?}, found {:?}", expected, actual))
            .into())
    }
}

/// Fail with `TestUnexpectedResult` unless `condition` holds
pub fn expect(condition: bool) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(Failure::new("TestUnexpectedResult").into())
    }
}
