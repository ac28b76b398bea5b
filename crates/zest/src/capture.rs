//! Log capture for code running under test
//!
//! Test bodies run with a scoped `tracing` dispatcher built here. It counts
//! every error-level event and only prints events at or above the
//! configured threshold.
//!
//! The scoped dispatcher is thread-local, so events from threads a test
//! spawns reach the global subscriber instead. [`process_layer`] is part of
//! that subscriber (see `harness::init_logging`) and forwards those error
//! events to the active run's counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{fmt, Layer, Registry};
use zest_config::LogLevel;

/// Counters of the run that currently owns the process
static ACTIVE_RUN: RwLock<Option<Weak<CaptureState>>> = RwLock::new(None);

#[derive(Debug, Default)]
struct CaptureState {
    test_errors: AtomicUsize,
    run_errors: AtomicUsize,
}

impl CaptureState {
    fn record_error(&self) {
        self.test_errors.fetch_add(1, Ordering::Relaxed);
        self.run_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared handle to the run's log counters
#[derive(Debug, Clone)]
pub struct LogCapture {
    state: Arc<CaptureState>,
    threshold: LogLevel,
}

impl LogCapture {
    pub fn new(threshold: LogLevel) -> Self {
        Self {
            state: Arc::new(CaptureState::default()),
            threshold,
        }
    }

    /// Layer that counts error-level events, independent of the threshold
    pub fn layer(&self) -> ErrorCounter {
        ErrorCounter {
            state: Arc::clone(&self.state),
        }
    }

    /// Build a dispatcher for test bodies: error counting plus formatted
    /// output filtered by the threshold
    pub fn dispatch<W>(&self, make_writer: W, ansi: bool) -> Dispatch
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let output = fmt::layer()
            .with_writer(make_writer)
            .with_ansi(ansi)
            .with_target(false)
            .without_time()
            .with_filter(level_filter(self.threshold));

        Dispatch::new(Registry::default().with(self.layer()).with(output))
    }

    /// Route error events seen by [`process_layer`] to this capture until
    /// another capture activates or this one is dropped
    pub fn activate(&self) {
        if let Ok(mut active) = ACTIVE_RUN.write() {
            *active = Some(Arc::downgrade(&self.state));
        }
    }

    /// Zero the per-test counter; called right before each test body
    pub fn reset_test(&self) {
        self.state.test_errors.store(0, Ordering::Relaxed);
    }

    /// Error events since the last [`reset_test`](Self::reset_test)
    pub fn test_errors(&self) -> usize {
        self.state.test_errors.load(Ordering::Relaxed)
    }

    /// Error events over the whole run; never reset
    pub fn run_errors(&self) -> usize {
        self.state.run_errors.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }
}

/// `tracing` layer incrementing both error counters
pub struct ErrorCounter {
    state: Arc<CaptureState>,
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.state.record_error();
        }
    }
}

/// Layer for the global subscriber: counts error events from any thread
/// against the active run, if there is one
pub fn process_layer() -> ProcessErrorCounter {
    ProcessErrorCounter { _private: () }
}

/// See [`process_layer`]
pub struct ProcessErrorCounter {
    _private: (),
}

impl<S: Subscriber> Layer<S> for ProcessErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let state = match ACTIVE_RUN.read() {
            Ok(active) => active.as_ref().and_then(Weak::upgrade),
            Err(_) => None,
        };
        if let Some(state) = state {
            state.record_error();
        }
    }
}

/// Map the configured threshold onto a `tracing` filter
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    /// Writer collecting formatted output for assertions
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_counts_errors_regardless_of_threshold() {
        let capture = LogCapture::new(LogLevel::Off);
        let dispatch = capture.dispatch(io::sink, false);

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::error!("first");
            tracing::warn!("not an error");
            tracing::error!("second");
        });

        assert_eq!(capture.test_errors(), 2);
        assert_eq!(capture.run_errors(), 2);
    }

    #[test]
    fn test_reset_only_clears_test_counter() {
        let capture = LogCapture::new(LogLevel::Warn);
        let dispatch = capture.dispatch(io::sink, false);

        tracing::dispatcher::with_default(&dispatch, || tracing::error!("early"));
        capture.reset_test();
        tracing::dispatcher::with_default(&dispatch, || tracing::info!("late"));

        assert_eq!(capture.test_errors(), 0);
        assert_eq!(capture.run_errors(), 1);
    }

    #[test]
    fn test_threshold_suppresses_output() {
        let capture = LogCapture::new(LogLevel::Warn);
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let dispatch = capture.dispatch(move || writer.clone(), false);

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("hidden chatter");
            tracing::warn!("visible warning");
        });

        let output = buf.contents();
        assert!(output.contains("visible warning"));
        assert!(!output.contains("hidden chatter"));
        assert_eq!(capture.threshold(), LogLevel::Warn);
    }

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(level_filter(LogLevel::Off), LevelFilter::OFF);
        assert_eq!(level_filter(LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(level_filter(LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(level_filter(LogLevel::Trace), LevelFilter::TRACE);
    }
}
