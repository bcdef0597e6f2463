//! Option parsing and conversion into `LoadConfig`.

use std::time::Duration;

use clap::Parser;
use loadgen_core::{Mode, StatementErrorPolicy};
use txn_loadgen::{LoadConfig, LoadOpts};

fn parse(args: &[&str]) -> LoadOpts {
    let mut argv = vec!["txn-loadgen", "--connection-string", "memory://"];
    argv.extend_from_slice(args);
    LoadOpts::try_parse_from(argv).unwrap()
}

#[test]
fn test_defaults() {
    let config = LoadConfig::from_opts(&parse(&[])).unwrap();
    assert_eq!(config.mode, Mode::Each);
    assert_eq!(config.zone.to_string(), "Asia/Tokyo");
    assert_eq!(config.driver.table, "test");
    assert_eq!(config.driver.progress_interval, 10_000);
    assert_eq!(config.driver.batch_limit, 10_000_000);
    assert_eq!(config.driver.deadline, None);
    assert_eq!(config.driver.statement_errors, StatementErrorPolicy::Continue);
    assert!(!config.delete_all);
    assert!(!config.dry_run);
}

#[test]
fn test_unknown_mode_falls_back_to_each() {
    let config = LoadConfig::from_opts(&parse(&["--mode", "twice"])).unwrap();
    assert_eq!(config.mode, Mode::Each);

    let config = LoadConfig::from_opts(&parse(&["--mode", "once"])).unwrap();
    assert_eq!(config.mode, Mode::Once);
}

#[test]
fn test_invalid_timezone_is_fatal() {
    let err = LoadConfig::from_opts(&parse(&["--timezone", "Mars/Olympus"])).unwrap_err();
    assert!(format!("{err:#}").contains("Mars/Olympus"));
}

#[test]
fn test_fixed_offset_timezone() {
    let config = LoadConfig::from_opts(&parse(&["--timezone", "-05:30"])).unwrap();
    assert!(config.clock().timestamp().ends_with("-05:30"));
}

#[test]
fn test_timeout_and_limits() {
    let config = LoadConfig::from_opts(&parse(&[
        "--timeout",
        "5m",
        "--max-records",
        "42",
        "--batch-limit",
        "7",
        "--abort-on-statement-error",
    ]))
    .unwrap();
    assert_eq!(config.driver.deadline, Some(Duration::from_secs(300)));
    assert_eq!(config.driver.max_records, Some(42));
    assert_eq!(config.driver.batch_limit, 7);
    assert_eq!(config.driver.statement_errors, StatementErrorPolicy::Abort);

    assert!(LoadConfig::from_opts(&parse(&["--timeout", "soon"])).is_err());
    assert!(LoadConfig::from_opts(&parse(&["--timeout", "18446744073709551615h"])).is_err());

    let config = LoadConfig::from_opts(&parse(&["--timeout", "18446744073709551615"])).unwrap();
    assert_eq!(config.driver.deadline, Some(Duration::from_secs(u64::MAX)));
}

#[test]
fn test_retry_policy_selection() {
    let config = LoadConfig::from_opts(&parse(&[])).unwrap();
    let policy = config.retry_policy();
    assert_eq!(policy.next_delay(1), Some(Duration::ZERO));
    assert_eq!(policy.next_delay(1_000), Some(Duration::ZERO));

    let config = LoadConfig::from_opts(&parse(&[
        "--retry-backoff-ms",
        "100",
        "--retry-max-backoff-ms",
        "400",
        "--max-attempts",
        "4",
    ]))
    .unwrap();
    let policy = config.retry_policy();
    assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
    assert_eq!(policy.next_delay(3), Some(Duration::from_millis(400)));
    assert_eq!(policy.next_delay(4), None);
}

#[test]
fn test_seeded_ids_repeat() {
    let config = LoadConfig::from_opts(&parse(&["--seed", "7"])).unwrap();
    let mut a = config.id_generator();
    let mut b = config.id_generator();
    assert_eq!(a.next_id(), b.next_id());
}
