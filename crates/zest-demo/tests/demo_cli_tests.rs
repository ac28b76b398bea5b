//! Demo CLI Integration Tests
//!
//! Runs the sample suites as a real process and checks:
//! - Report lines and summary on stdout
//! - Exit status for each verdict
//! - Configuration precedence (zest.toml, environment, flags)

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Demo command isolated from the caller's environment and any zest.toml
/// above the crate directory
fn demo_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zest-demo").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ZEST_COLOR")
        .env_remove("ZEST_LOG_LEVEL")
        .env_remove("ZEST_LOG")
        .env_remove("RUST_LOG")
        .env_remove("NO_COLOR")
        .arg("--color")
        .arg("never");
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// SCENARIO TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod scenarios {
    use super::*;

    #[test]
    fn test_passing_suite_exits_zero() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .assert()
            .success()
            .stdout(predicate::str::contains("  PASS  credentials: static credentials ("))
            .stdout(predicate::str::contains("  PASS  signing: formatAmzDate ("))
            .stdout(predicate::str::contains("  SKIP  network: requires interface\n"))
            .stdout(predicate::str::contains("\n5 passed, 1 skipped in "))
            .stdout(predicate::str::contains("zest.beforeAll").not());
    }

    #[test]
    fn test_failing_assertion_exits_one() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "failing"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("  FAIL  imds: region ("))
            .stdout(predicate::str::contains("  error.TestExpectedEqual\n"))
            .stdout(predicate::str::contains("  expected \"us-east-1\", found \"eu-west-1\"\n"))
            .stdout(predicate::str::contains("5 passed, 1 failed, 1 skipped in "));
    }

    #[test]
    fn test_leak_exits_one_but_test_passes() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "leak"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("  PASS  imds: cached document ("))
            .stdout(predicate::str::contains("  LEAK  imds: cached document (1 allocation, "))
            .stdout(predicate::str::contains("6 passed, 1 skipped, 1 leaked in "));
    }

    #[test]
    fn test_error_log_exits_one() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "log-error"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("  PASS  imds: token refresh ("))
            .stdout(predicate::str::contains("  LOG  imds: token refresh (1 error logged)"))
            .stdout(predicate::str::contains("1 error logged in "))
            .stderr(predicate::str::contains("metadata token rejected"));
    }

    #[test]
    fn test_log_threshold_off_hides_but_still_fails() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "log-error", "--log-level", "off"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("metadata token rejected").not());
    }

    #[test]
    fn test_setup_failure_skips_module() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "setup-failure"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "  HOOK FAIL  db: beforeAll\n  error.ConnectionRefused\n  could not reach 127.0.0.1:5432\n",
            ))
            .stdout(predicate::str::contains("  SKIP  db: select (module setup failed)"))
            .stdout(predicate::str::contains("  SKIP  db: insert (module setup failed)"))
            .stdout(predicate::str::contains("5 passed, 3 skipped in "));
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        let dir = TempDir::new().unwrap();
        demo_cmd(&dir)
            .args(["--scenario", "everything"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod configuration {
    use super::*;

    fn bare_cmd(dir: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin("zest-demo").unwrap();
        cmd.current_dir(dir.path())
            .env_remove("ZEST_COLOR")
            .env_remove("ZEST_LOG_LEVEL")
            .env_remove("NO_COLOR");
        cmd
    }

    #[test]
    fn test_project_config_is_loaded() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("zest.toml"),
            "[report]\ncolor = \"always\"\n\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        bare_cmd(&dir)
            .arg("--show-settings")
            .assert()
            .success()
            .stdout(predicate::str::contains("color = always"))
            .stdout(predicate::str::contains("log.level = debug"));
    }

    #[test]
    fn test_flags_override_environment_and_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zest.toml"), "[report]\ncolor = \"always\"\n").unwrap();

        bare_cmd(&dir)
            .env("ZEST_LOG_LEVEL", "error")
            .args(["--show-settings", "--color", "never"])
            .assert()
            .success()
            .stdout(predicate::str::contains("color = never"))
            .stdout(predicate::str::contains("log.level = error"));
    }

    #[test]
    fn test_no_color_disables_color() {
        let dir = TempDir::new().unwrap();

        bare_cmd(&dir)
            .env("NO_COLOR", "1")
            .arg("--show-settings")
            .assert()
            .success()
            .stdout(predicate::str::contains("color = never"));
    }

    #[test]
    fn test_always_color_emits_escape_codes() {
        let dir = TempDir::new().unwrap();

        bare_cmd(&dir)
            .args(["--color", "always"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\u{1b}["));
    }

    #[test]
    fn test_invalid_config_exits_two() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zest.toml"), "[report]\ncolor = \"rainbow\"\n").unwrap();

        bare_cmd(&dir)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("rainbow"));
    }

    #[test]
    fn test_missing_config_file_exits_two() {
        let dir = TempDir::new().unwrap();

        bare_cmd(&dir)
            .args(["--config", "missing.toml"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("not found"));
    }
}
