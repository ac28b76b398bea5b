//! Per-run context shared by the executor and log capture

use crate::capture::LogCapture;
use std::io;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use zest_config::LogLevel;

/// Everything a test execution needs besides the test itself.
///
/// One context per run; tests of the harness build their own so runs never
/// share counters.
#[derive(Debug, Clone)]
pub struct RunContext {
    capture: LogCapture,
    dispatch: Dispatch,
}

impl RunContext {
    /// Test log output goes to stderr, filtered by `threshold`
    pub fn new(threshold: LogLevel, ansi: bool) -> Self {
        Self::with_writer(threshold, io::stderr, ansi)
    }

    /// Route test log output to a custom writer
    pub fn with_writer<W>(threshold: LogLevel, make_writer: W, ansi: bool) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let capture = LogCapture::new(threshold);
        let dispatch = capture.dispatch(make_writer, ansi);
        Self { capture, dispatch }
    }

    /// Context that discards test log output, still counting errors
    pub fn quiet() -> Self {
        Self::with_writer(LogLevel::Off, io::sink, false)
    }

    pub fn capture(&self) -> &LogCapture {
        &self.capture
    }

    pub(crate) fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Error-level log events recorded so far in this run
    pub fn log_errors(&self) -> usize {
        self.capture.run_errors()
    }
}
