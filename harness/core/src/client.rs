use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    args::TestArgs,
    backend::{Backend, BackendError, StackCommand},
    readiness::{ReadinessCheck as _, ReadinessError, StartedCheck},
    status::{Status, StatusError},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    #[error("no active environment reported by the stack CLI")]
    NoActiveEnvironment,
}

/// Flags forwarded to `stack bootstrap`.
#[derive(Clone, Debug, Default)]
pub struct BootstrapParams {
    pub base_env: String,
    pub upload_tools: bool,
    pub region: Option<String>,
    pub series: Option<String>,
    pub agent_url: Option<String>,
    pub agent_stream: Option<String>,
    pub bootstrap_host: Option<String>,
    pub logging_config: Option<String>,
}

impl BootstrapParams {
    /// Collect the bootstrap-relevant arguments. `upload_tools` is chosen
    /// by the caller at acquisition time, not here.
    #[must_use]
    pub fn from_args(args: &TestArgs) -> Self {
        Self {
            base_env: args.env.clone(),
            upload_tools: false,
            region: args.region.clone(),
            series: args.series.clone(),
            agent_url: args.agent_url.clone(),
            agent_stream: args.agent_stream.clone(),
            bootstrap_host: args.bootstrap_host.clone(),
            logging_config: args.logging_config.clone(),
        }
    }
}

/// Client handle for one environment. Every operation is issued through
/// the backend seam, so tests can script the CLI away.
#[derive(Clone)]
pub struct StackClient {
    environment: String,
    global_flags: Vec<String>,
    backend: Arc<dyn Backend>,
}

impl StackClient {
    #[must_use]
    pub fn new(environment: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            environment: environment.into(),
            global_flags: Vec::new(),
            backend,
        }
    }

    /// Forward `--debug` to every CLI invocation.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.global_flags.push("--debug".to_owned());
        }
        self
    }

    /// Same backend and flags, different target environment.
    #[must_use]
    pub fn for_environment(&self, environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            global_flags: self.global_flags.clone(),
            backend: Arc::clone(&self.backend),
        }
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn command(&self, description: impl Into<String>) -> StackCommand {
        let mut cmd = StackCommand::new(description);
        for flag in &self.global_flags {
            cmd = cmd.arg(flag);
        }
        cmd
    }

    /// Provision a fresh environment named after this client.
    pub async fn bootstrap(&self, params: &BootstrapParams) -> Result<(), ClientError> {
        let mut cmd = self
            .command(format!("stack bootstrap {}", self.environment))
            .arg("bootstrap")
            .arg(&params.base_env)
            .arg(&self.environment);
        if params.upload_tools {
            cmd = cmd.arg("--upload-tools");
        }
        for (flag, value) in [
            ("--region", &params.region),
            ("--series", &params.series),
            ("--agent-url", &params.agent_url),
            ("--agent-stream", &params.agent_stream),
            ("--bootstrap-host", &params.bootstrap_host),
            ("--logging-config", &params.logging_config),
        ] {
            if let Some(value) = value {
                cmd = cmd.arg(flag).arg(value);
            }
        }

        info!(
            environment = %self.environment,
            base_env = %params.base_env,
            upload_tools = params.upload_tools,
            "bootstrapping environment"
        );
        self.backend.run(&cmd).await?;
        info!(environment = %self.environment, "bootstrap completed");
        Ok(())
    }

    pub async fn deploy(&self, workload: &str, instances: u32) -> Result<(), ClientError> {
        let cmd = self
            .command(format!("stack deploy {workload}"))
            .arg("deploy")
            .arg("-e")
            .arg(&self.environment)
            .arg(workload)
            .arg("-n")
            .arg(instances.to_string());

        info!(
            environment = %self.environment,
            workload,
            instances,
            "deploying workload"
        );
        self.backend.run(&cmd).await?;
        Ok(())
    }

    /// The status document exactly as the CLI printed it.
    pub async fn raw_status(&self) -> Result<String, ClientError> {
        let cmd = self
            .command(format!("stack status {}", self.environment))
            .arg("status")
            .arg("-e")
            .arg(&self.environment)
            .arg("--format")
            .arg("yaml");
        Ok(self.backend.output(&cmd).await?)
    }

    pub async fn status(&self) -> Result<Status, ClientError> {
        let raw = self.raw_status().await?;
        Ok(Status::from_yaml(&raw)?)
    }

    /// Block until every machine and unit agent reports `started`.
    pub async fn wait_for_started(&self) -> Result<(), ClientError> {
        info!(environment = %self.environment, "waiting for agents to report started");
        StartedCheck { client: self }.wait().await?;
        info!(environment = %self.environment, "all agents started");
        Ok(())
    }

    /// Forced teardown of this client's environment.
    pub async fn destroy_environment(&self) -> Result<(), ClientError> {
        let cmd = self
            .command(format!("stack destroy-environment {}", self.environment))
            .arg("destroy-environment")
            .arg(&self.environment)
            .arg("--force")
            .arg("--yes");

        info!(environment = %self.environment, "destroying environment");
        self.backend.run(&cmd).await?;
        info!(environment = %self.environment, "environment destroyed");
        Ok(())
    }

    /// Name of the currently active environment, used to resolve the bare
    /// `--existing` form.
    pub async fn active_environment(&self) -> Result<String, ClientError> {
        let cmd = self
            .command("stack switch --list-active")
            .arg("switch")
            .arg("--list-active");
        let raw = self.backend.output(&cmd).await?;
        raw.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_owned)
            .ok_or(ClientError::NoActiveEnvironment)
    }
}
