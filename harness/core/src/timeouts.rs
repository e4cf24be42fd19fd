use std::time::Duration;

pub const WAIT_FOR_STARTED_TIMEOUT_SECS: u64 = 1200;
pub const WAIT_POLL_INTERVAL_SECS: u64 = 2;
pub const COMMAND_TIMEOUT_SECS: u64 = 600;

fn env_duration(value: Option<u64>, default: u64) -> Duration {
    value
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

/// Deadline for `wait_for_started` before giving up on a deployment.
pub fn wait_for_started_timeout() -> Duration {
    env_duration(
        harness_env::wait_timeout_secs(),
        WAIT_FOR_STARTED_TIMEOUT_SECS,
    )
}

/// Interval between status polls while waiting for readiness.
pub fn wait_poll_interval() -> Duration {
    env_duration(harness_env::wait_poll_secs(), WAIT_POLL_INTERVAL_SECS)
}

/// Deadline for a single stack CLI invocation.
pub fn command_timeout() -> Duration {
    env_duration(harness_env::command_timeout_secs(), COMMAND_TIMEOUT_SECS)
}
