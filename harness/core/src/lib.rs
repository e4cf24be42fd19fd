pub mod args;
pub mod backend;
pub mod bootstrap;
pub mod client;
pub mod logging;
pub mod readiness;
pub mod status;
pub mod timeouts;
pub mod workspace;

use std::{ops::Mul as _, sync::LazyLock, time::Duration};

pub use args::TestArgs;
pub use bootstrap::{BootstrapManager, EnvMode, EnvScope};
pub use client::StackClient;

static IS_SLOW_TEST_ENV: LazyLock<bool> = LazyLock::new(harness_env::slow_test_env);

const SLOW_ENV_TIMEOUT_MULTIPLIER: u32 = 2;

/// In slow test environments like shared CI runners, use 2x timeout.
#[must_use]
pub fn adjust_timeout(d: Duration) -> Duration {
    if *IS_SLOW_TEST_ENV {
        d.mul(SLOW_ENV_TIMEOUT_MULTIPLIER)
    } else {
        d
    }
}
