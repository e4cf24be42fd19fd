//! Smoke test against a real stack CLI. Point `STACK_CLI` at a working
//! binary (or have `stack` on `PATH`) and run with `--ignored`; the test
//! bootstraps a throwaway environment and destroys it afterwards.

mod common;

use assessments::{assess_deploy, run_assessment};
use common::test_args;
use harness_core::logging::configure_logging;

#[tokio::test]
#[ignore = "requires a stack CLI binary and a reachable provider"]
async fn full_driver_flow_against_a_real_cli() {
    let args = test_args(&["local"]).with_default_temp_env_name("assess-smoke");
    configure_logging(args.verbose);

    run_assessment(&args, assess_deploy)
        .await
        .expect("bootstrap, deploy, wait and destroy all succeed");
}
