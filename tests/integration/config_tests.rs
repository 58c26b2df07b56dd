use clap::Parser;
use linedupe::cli::Cli;
use linedupe::config::Config;
use linedupe::dedup::{ComparisonMode, ConfigError};
use linedupe::output::ReportFormat;
use std::fs;
use tempfile::TempDir;

// Environment variables are process-wide; every key used here is touched by
// this test only.
#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "report = \"csv\"\n\n[stream]\npoll_interval = 0.5\nmax_runtime = 10.0\n",
    )
    .unwrap();

    std::env::set_var("LINEDUPE_REPORT", "markdown");
    std::env::set_var("LINEDUPE_STREAM__MAX_RUNTIME", "3.5");

    let config: Config = Config::figment(Some(&path)).extract().unwrap();
    assert_eq!(config.report, ReportFormat::Markdown);
    assert_eq!(config.stream.poll_interval, 0.5);
    assert_eq!(config.stream.max_runtime, Some(3.5));

    let cli = Cli::parse_from([
        "linedupe",
        "--report",
        "json",
        "--stream",
        "--max-runtime",
        "1",
        "a.log",
    ]);
    let mut config = config;
    config.apply_cli(&cli);
    assert_eq!(config.report, ReportFormat::Json);
    assert_eq!(config.stream.max_runtime, Some(1.0));
    assert_eq!(config.stream.poll_interval, 0.5);

    std::env::remove_var("LINEDUPE_REPORT");
    std::env::remove_var("LINEDUPE_STREAM__MAX_RUNTIME");
}

#[test]
fn test_load_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("linedupe.toml");
    fs::write(&path, "mode = \"content_hash\"\nexclude_pattern = \"^//\"\nbackup = true\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.mode, ComparisonMode::ContentHash);
    assert_eq!(config.exclude_pattern.as_deref(), Some("^//"));
    assert!(config.backup);
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_explicit_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "mode = [unclosed\n").unwrap();

    assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Load(_))));
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "similarity = 2.0\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSimilarity(s)) if s == 2.0
    ));
}

#[test]
fn test_orchestrator_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "parallel = true\nworkers = 3\ndry_run = true\nchunk_size = 8192\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    let orchestrator = config.orchestrator_config();
    assert!(orchestrator.parallel);
    assert_eq!(orchestrator.workers, 3);
    assert!(orchestrator.dry_run);
    assert_eq!(orchestrator.chunk_size, 8192);
}
