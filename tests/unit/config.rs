//! Unit tests for configuration helpers

use std::time::Duration;

use tradedash::config::{
    clamp_interval_minutes, split_origins, SchedulerConfig, MAX_INTERVAL_MINUTES,
    MIN_INTERVAL_MINUTES,
};

#[test]
fn interval_is_clamped_to_bounds() {
    assert_eq!(clamp_interval_minutes(i64::MIN), MIN_INTERVAL_MINUTES);
    assert_eq!(clamp_interval_minutes(1), 5);
    assert_eq!(clamp_interval_minutes(5), 5);
    assert_eq!(clamp_interval_minutes(60), 60);
    assert_eq!(clamp_interval_minutes(1440), 1440);
    assert_eq!(clamp_interval_minutes(i64::MAX), MAX_INTERVAL_MINUTES);
}

#[test]
fn cors_origins_are_trimmed_and_blank_entries_dropped() {
    let origins = split_origins(" http://localhost:3000 ,, http://localhost:5173,");
    assert_eq!(
        origins,
        vec!["http://localhost:3000", "http://localhost:5173"]
    );
    assert!(split_origins("").is_empty());
}

#[test]
fn scheduler_defaults() {
    let config = SchedulerConfig::default();
    assert_eq!(config.interval_minutes, 30);
    assert!(!config.autostart);
    assert_eq!(config.symbol_delay, Duration::from_millis(500));
    assert_eq!(config.error_cooldown, Duration::from_secs(60));
}
