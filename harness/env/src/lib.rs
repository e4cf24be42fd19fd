use std::{env, path::PathBuf};

#[must_use]
pub fn slow_test_env() -> bool {
    env::var("STACK_TESTS_SLOW_ENV").is_ok_and(|s| s == "true")
}

#[must_use]
pub fn keep_env() -> bool {
    env::var("STACK_TESTS_KEEP_ENV").is_ok()
}

#[must_use]
pub fn stack_cli() -> Option<PathBuf> {
    env::var("STACK_CLI").ok().map(PathBuf::from)
}

#[must_use]
pub fn wait_timeout_secs() -> Option<u64> {
    env::var("STACK_WAIT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

#[must_use]
pub fn wait_poll_secs() -> Option<u64> {
    env::var("STACK_WAIT_POLL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

#[must_use]
pub fn command_timeout_secs() -> Option<u64> {
    env::var("STACK_COMMAND_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}
