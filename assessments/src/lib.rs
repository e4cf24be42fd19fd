//! Assessment scripts and the shared driver flow they all run through.
//!
//! An assessment is one end-to-end check against a stack-managed
//! environment. The driver owns everything around the check: argument
//! handling, environment acquisition (fresh bootstrap or attach to an
//! existing environment) and guaranteed release. New assessments start
//! from [`assess_deploy`] and replace its body.

use std::{future::Future, time::Duration};

use anyhow::Context as _;
use harness_core::{BootstrapManager, EnvMode, StackClient, TestArgs};
use tracing::info;

/// Workload deployed by the placeholder assessment.
pub const DEPLOY_WORKLOAD: &str = "ubuntu";
/// Instances requested for the placeholder workload.
pub const DEPLOY_INSTANCES: u32 = 2;

/// Placeholder assessment body: deploy a known-good workload and wait
/// for every agent to come up. Real assessments add their functional
/// checks after the wait.
pub async fn assess_deploy(client: StackClient) -> anyhow::Result<()> {
    client
        .deploy(DEPLOY_WORKLOAD, DEPLOY_INSTANCES)
        .await
        .with_context(|| format!("deploying {DEPLOY_WORKLOAD}"))?;
    client
        .wait_for_started()
        .await
        .context("waiting for the deployment to report started")?;
    info!(
        workload = DEPLOY_WORKLOAD,
        instances = DEPLOY_INSTANCES,
        "deployed workload is up"
    );
    Ok(())
}

/// Pick the acquisition mode for the parsed arguments: attach when
/// `--existing` was given, bootstrap a fresh environment otherwise.
#[must_use]
pub fn bootstrap_manager_for(args: &TestArgs) -> BootstrapManager {
    if args.existing.is_some() {
        BootstrapManager::from_existing(args)
    } else {
        BootstrapManager::from_args(args)
    }
}

/// Run one assessment end to end: acquire the scoped environment, hand
/// the assessment a client, and release the scope on every exit path.
/// The assessment verdict is returned after release, so a failed check
/// still tears its environment down.
pub async fn run_assessment<F, Fut>(args: &TestArgs, assess: F) -> anyhow::Result<()>
where
    F: FnOnce(StackClient) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    run_with_manager(args, bootstrap_manager_for(args), assess).await
}

/// Same as [`run_assessment`], with the acquisition manager supplied by
/// the caller. Acceptance tests use this to inject a scripted backend.
pub async fn run_with_manager<F, Fut>(
    args: &TestArgs,
    manager: BootstrapManager,
    assess: F,
) -> anyhow::Result<()>
where
    F: FnOnce(StackClient) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let scope = match manager.mode() {
        EnvMode::Fresh => manager
            .booted_context(args.upload_tools)
            .await
            .context("bootstrapping a fresh environment")?,
        EnvMode::Existing => {
            let run_name = args.temp_env_name.as_deref().unwrap_or("assessment");
            manager
                .existing_context(args.upload_tools, run_name)
                .await
                .context("attaching to the existing environment")?
        }
    };
    info!(environment = scope.environment(), "environment acquired");

    let run = assess(scope.client().clone());
    let verdict = match args.timeout {
        Some(secs) => {
            let limit = Duration::from_secs(secs);
            match tokio::time::timeout(limit, run).await {
                Ok(verdict) => verdict,
                Err(_) => Err(anyhow::anyhow!("assessment exceeded its {secs}s deadline")),
            }
        }
        None => run.await,
    };

    scope.release().await;
    verdict
}
