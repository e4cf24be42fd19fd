//! Readiness behavior of `wait_for_started` through the full driver:
//! pending agents resolve, error states abort immediately, and an
//! exhausted deadline reports the last-seen agent states.

mod common;

use std::sync::Arc;

use assessments::{assess_deploy, run_with_manager};
use common::{
    EnvVarGuard, RecordingBackend, STATUS_ALL_STARTED, STATUS_ERRORED, STATUS_PENDING, test_args,
};
use harness_core::BootstrapManager;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn pending_agents_eventually_report_started() {
    let _fast_poll = EnvVarGuard::set("STACK_WAIT_POLL_SECS", "0");

    let backend = Arc::new(RecordingBackend::new().with_statuses(&[
        STATUS_ALL_STARTED,
        STATUS_PENDING,
        STATUS_PENDING,
        STATUS_ALL_STARTED,
    ]));
    let args = test_args(&["--existing", "shared-env"]);
    let manager = BootstrapManager::from_existing(&args).with_backend(backend.clone());

    run_with_manager(&args, manager, assess_deploy)
        .await
        .expect("agents settle into started");

    // One acquisition probe plus three readiness polls.
    assert_eq!(backend.count("status"), 4);
}

#[tokio::test]
#[serial]
async fn errored_agents_abort_the_wait_immediately() {
    let backend = Arc::new(
        RecordingBackend::new().with_statuses(&[STATUS_ALL_STARTED, STATUS_ERRORED]),
    );
    let args = test_args(&["--existing", "shared-env"]);
    let manager = BootstrapManager::from_existing(&args).with_backend(backend.clone());

    let err = run_with_manager(&args, manager, assess_deploy)
        .await
        .expect_err("error states fail the wait");

    let rendered = format!("{err:#}");
    assert!(rendered.contains("entered the error state"), "err: {rendered}");
    assert!(rendered.contains("ubuntu/0"), "err: {rendered}");
    assert!(rendered.contains("hook failed"), "err: {rendered}");
}

#[tokio::test]
#[serial]
async fn exhausted_deadline_reports_the_last_seen_states() {
    let _no_deadline = EnvVarGuard::set("STACK_WAIT_TIMEOUT_SECS", "0");

    let backend = Arc::new(
        RecordingBackend::new().with_statuses(&[STATUS_ALL_STARTED, STATUS_PENDING]),
    );
    let args = test_args(&["--existing", "shared-env"]);
    let manager = BootstrapManager::from_existing(&args).with_backend(backend.clone());

    let err = run_with_manager(&args, manager, assess_deploy)
        .await
        .expect_err("deadline runs out");

    let rendered = format!("{err:#}");
    assert!(
        rendered.contains("timed out waiting for environment"),
        "err: {rendered}"
    );
    assert!(rendered.contains("pending"), "err: {rendered}");
}
