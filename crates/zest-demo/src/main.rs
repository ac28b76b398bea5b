use clap::Parser;
use std::process::ExitCode;
use zest::HarnessArgs;

mod sample;
mod suite;

use suite::Scenario;

/// Run a sample suite through the zest harness.
///
/// Each scenario exercises one part of the harness: lifecycle hooks,
/// assertion failures, leak detection, error-level logs, and module setup
/// failure.
///
/// EXAMPLES:
///     zest-demo                            Run the passing suite
///     zest-demo --scenario leak            Show a leak report
///     zest-demo --color never -v           Plain output with harness debug logs
///
/// ENVIRONMENT VARIABLES:
///     ZEST_COLOR       auto, always or never
///     ZEST_LOG_LEVEL   threshold for log output from tests
///     ZEST_LOG         harness log filter (falls back to RUST_LOG)
///     NO_COLOR         Set to disable colored output
#[derive(Parser)]
#[command(name = "zest-demo")]
#[command(version)]
struct Cli {
    /// Suite to run
    #[arg(long, value_enum, default_value_t = Scenario::Passing)]
    scenario: Scenario,

    /// Print the resolved settings and exit without running tests
    #[arg(long)]
    show_settings: bool,

    #[command(flatten)]
    harness: HarnessArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.show_settings {
        return match cli.harness.settings() {
            Ok(settings) => {
                println!("color = {}", settings.color);
                println!("log.level = {}", settings.log_level);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("zest-demo: {}", err);
                ExitCode::from(2)
            }
        };
    }

    let tests = suite::tests(cli.scenario);
    zest::run(&tests, &cli.harness)
}
