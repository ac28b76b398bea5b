//! Harness entry points - configuration, logging and exit status

use crate::case::TestCase;
use crate::context::RunContext;
use crate::error::RunResult;
use crate::lifecycle::run_tests;
use crate::capture;
use crate::reporter::{color_choice, log_ansi, Reporter, RunSummary};
use clap::{Args, Parser};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;
use termcolor::StandardStream;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};
use zest_config::{ColorMode, Config, ConfigLoader, LogLevel};

/// Environment variable holding the harness log filter; `RUST_LOG` is the fallback
pub const LOG_ENV: &str = "ZEST_LOG";

static INIT: Once = Once::new();

/// Command-line options understood by the harness.
///
/// Flatten into a host's own parser with `#[command(flatten)]`.
#[derive(Args, Debug, Clone, Default)]
pub struct HarnessArgs {
    /// When to color the report: auto, always or never
    #[arg(long, value_name = "WHEN")]
    pub color: Option<ColorMode>,

    /// Lowest level of test log output to show: off, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Show the harness's own debug logs
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Use this configuration file instead of searching for zest.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl HarnessArgs {
    /// Resolve the effective settings: config file and environment first,
    /// then command-line flags on top
    pub fn settings(&self) -> RunResult<Settings> {
        let config = self.load_config()?;
        Ok(Settings {
            color: self.color.unwrap_or_else(|| config.color_mode()),
            log_level: self.log_level.unwrap_or_else(|| config.log_level()),
        })
    }

    fn load_config(&self) -> RunResult<Config> {
        let loader = ConfigLoader::new();
        let config = match &self.config {
            Some(path) => loader.load_from_file(path)?,
            None => {
                let cwd = env::current_dir().map_err(zest_config::ConfigError::from)?;
                loader.load_from_directory(&cwd)?
            }
        };
        if let Some(root) = config.project_root() {
            tracing::debug!(root = %root.display(), "loaded project configuration");
        }
        Ok(config)
    }
}

/// Effective run settings after every configuration layer is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub color: ColorMode,
    pub log_level: LogLevel,
}

#[derive(Parser, Debug)]
#[command(name = "zest", about = "Run the registered tests")]
struct Cli {
    #[command(flatten)]
    harness: HarnessArgs,
}

/// Parse harness flags from the process arguments and run `tests`
pub fn main(tests: Vec<TestCase>) -> ExitCode {
    let cli = Cli::parse();
    run(&tests, &cli.harness)
}

/// Run `tests` and map the verdict to a process exit status
pub fn run(tests: &[TestCase], args: &HarnessArgs) -> ExitCode {
    init_logging(args.verbose);

    match try_run(tests, args) {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("zest: {}", err);
            ExitCode::from(2)
        }
    }
}

/// Run `tests` with the report on stdout
pub fn try_run(tests: &[TestCase], args: &HarnessArgs) -> RunResult<RunSummary> {
    let settings = args.settings()?;
    let ctx = RunContext::new(settings.log_level, log_ansi(settings.color));
    let mut reporter = Reporter::new(StandardStream::stdout(color_choice(settings.color)));

    tracing::debug!(
        tests = tests.len(),
        color = %settings.color,
        log_level = %settings.log_level,
        "starting run"
    );

    run_tests(tests, &ctx, &mut reporter)
}

/// Install the harness's own log subscriber once per process.
///
/// The filter comes from `ZEST_LOG`, then `RUST_LOG`, defaulting to
/// `zest=warn` (`zest=debug` with `--verbose`). Test bodies log through a
/// separate scoped dispatcher; threads they spawn log here, and error events
/// from those threads still count against the active run.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let default = if verbose { "zest=debug" } else { "zest=warn" };
        let env_filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(default));

        let output = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .with_filter(env_filter);

        // A host may already own the global subscriber
        let _ = tracing_subscriber::registry()
            .with(output)
            .with(capture::process_layer())
            .try_init();
    });
}
