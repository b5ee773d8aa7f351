//! Unit tests for logging setup

use tradedash::logging::{init_logging, parse_filter, LogFormat, DEFAULT_DIRECTIVE};

#[test]
fn production_environments_log_json() {
    assert_eq!(LogFormat::for_environment("production"), LogFormat::Json);
    assert_eq!(LogFormat::for_environment("prod"), LogFormat::Json);
    assert_eq!(LogFormat::for_environment(" PRODUCTION "), LogFormat::Json);
}

#[test]
fn other_environments_log_pretty() {
    for env in ["sandbox", "staging", "dev", ""] {
        assert_eq!(LogFormat::for_environment(env), LogFormat::Pretty, "{}", env);
    }
}

#[test]
fn default_directive_is_valid() {
    assert!(parse_filter(DEFAULT_DIRECTIVE).is_ok());
    assert!(parse_filter("tradedash=debug,info").is_ok());
}

#[test]
fn init_twice_does_not_panic() {
    init_logging();
    init_logging();
}
