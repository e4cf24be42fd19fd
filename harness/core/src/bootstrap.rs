use std::{fs, path::PathBuf, sync::Arc, thread};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    args::{self, TestArgs},
    backend::{Backend, CliBackend},
    client::{BootstrapParams, ClientError, StackClient},
    workspace::{HarnessWorkspace, WorkspaceError},
};

const CURRENT_ENV: &str = "current";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("failed to bootstrap environment {environment}: {source}")]
    Bootstrap {
        environment: String,
        #[source]
        source: ClientError,
    },
    #[error("environment {environment} is not reachable: {source}")]
    Probe {
        environment: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to resolve the active environment: {source}")]
    ResolveActive {
        #[source]
        source: ClientError,
    },
}

/// Teardown policy chosen at construction time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnvMode {
    /// The harness bootstrapped the environment and destroys it on release.
    Fresh,
    /// The harness attached to an operator-provided environment and only
    /// detaches on release.
    Existing,
}

/// Owns environment acquisition for one run: either bootstrap a fresh
/// temporary environment or attach to an existing one, yielding an
/// [`EnvScope`] that guarantees release.
pub struct BootstrapManager {
    environment: String,
    mode: EnvMode,
    params: BootstrapParams,
    client_bin: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    debug: bool,
    keep_env: bool,
    backend_override: Option<Arc<dyn Backend>>,
}

impl BootstrapManager {
    /// Fresh-bootstrap mode. The temporary environment name comes from the
    /// arguments, or is generated when absent.
    #[must_use]
    pub fn from_args(test_args: &TestArgs) -> Self {
        let environment = test_args
            .temp_env_name
            .clone()
            .unwrap_or_else(|| args::generated_temp_env_name("stack"));
        Self {
            environment,
            mode: EnvMode::Fresh,
            params: BootstrapParams::from_args(test_args),
            client_bin: test_args.client_bin.clone(),
            artifacts_dir: test_args.logs.clone(),
            debug: test_args.debug,
            keep_env: test_args.keep_env || harness_env::keep_env(),
            backend_override: None,
        }
    }

    /// Attach mode. Targets the `--existing` environment, or the currently
    /// active one for the bare form.
    #[must_use]
    pub fn from_existing(test_args: &TestArgs) -> Self {
        let environment = test_args
            .existing
            .clone()
            .unwrap_or_else(|| CURRENT_ENV.to_owned());
        Self {
            environment,
            mode: EnvMode::Existing,
            params: BootstrapParams::from_args(test_args),
            client_bin: test_args.client_bin.clone(),
            artifacts_dir: test_args.logs.clone(),
            debug: test_args.debug,
            keep_env: test_args.keep_env || harness_env::keep_env(),
            backend_override: None,
        }
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    #[must_use]
    pub const fn mode(&self) -> EnvMode {
        self.mode
    }

    /// Route every CLI invocation through the given backend instead of
    /// spawning the stack binary. Acceptance tests script the CLI away
    /// with this.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend_override = Some(backend);
        self
    }

    fn backend(&self, workspace: &HarnessWorkspace) -> Arc<dyn Backend> {
        match &self.backend_override {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(
                CliBackend::resolve(self.client_bin.as_deref())
                    .with_env("STACK_HOME", workspace.home().display().to_string()),
            ),
        }
    }

    /// Bootstrap the temporary environment and hand out its scope. A failed
    /// bootstrap still attempts to destroy whatever came up before the
    /// error is returned.
    pub async fn booted_context(mut self, upload_tools: bool) -> Result<EnvScope, BootstrapError> {
        debug_assert_eq!(
            self.mode,
            EnvMode::Fresh,
            "booted_context requires a fresh-bootstrap manager"
        );

        let workspace = HarnessWorkspace::create(&self.environment)?;
        let backend = self.backend(&workspace);
        let client = StackClient::new(&self.environment, backend).with_debug(self.debug);

        self.params.upload_tools = upload_tools;
        if let Err(source) = client.bootstrap(&self.params).await {
            if let Err(error) = client.destroy_environment().await {
                warn!(
                    environment = %self.environment,
                    %error,
                    "cleanup after failed bootstrap also failed"
                );
            }
            return Err(BootstrapError::Bootstrap {
                environment: self.environment,
                source,
            });
        }

        let run_name = self.environment.clone();
        Ok(EnvScope::new(
            client,
            EnvMode::Fresh,
            run_name,
            self.artifacts_dir,
            workspace,
            self.keep_env,
        ))
    }

    /// Attach to the existing environment and hand out its scope. The
    /// environment is probed once so a bad name fails here, not halfway
    /// through an assessment.
    pub async fn existing_context(
        self,
        upload_tools: bool,
        run_name: &str,
    ) -> Result<EnvScope, BootstrapError> {
        debug_assert_eq!(
            self.mode,
            EnvMode::Existing,
            "existing_context requires an attach-mode manager"
        );

        if upload_tools {
            info!("upload-tools has no effect on an existing environment; ignoring");
        }

        let workspace = HarnessWorkspace::create(run_name)?;
        let backend = self.backend(&workspace);
        let client = StackClient::new(&self.environment, backend).with_debug(self.debug);

        let client = if self.environment == CURRENT_ENV {
            let active = client
                .active_environment()
                .await
                .map_err(|source| BootstrapError::ResolveActive { source })?;
            info!(environment = %active, "resolved the active environment");
            client.for_environment(active)
        } else {
            client
        };

        let status = client
            .status()
            .await
            .map_err(|source| BootstrapError::Probe {
                environment: client.environment().to_owned(),
                source,
            })?;
        info!(
            environment = %client.environment(),
            agents = %status.agent_state_summary(),
            "attached to existing environment"
        );

        Ok(EnvScope::new(
            client,
            EnvMode::Existing,
            run_name.to_owned(),
            self.artifacts_dir,
            workspace,
            self.keep_env,
        ))
    }
}

/// Scoped environment handle. Released exactly once: explicitly through
/// [`EnvScope::release`], or by the drop backstop when a run bails out
/// early.
pub struct EnvScope {
    client: StackClient,
    teardown: Option<ScopeTeardown>,
}

impl EnvScope {
    fn new(
        client: StackClient,
        mode: EnvMode,
        run_name: String,
        artifacts_dir: Option<PathBuf>,
        workspace: HarnessWorkspace,
        keep_env: bool,
    ) -> Self {
        Self {
            client: client.clone(),
            teardown: Some(ScopeTeardown {
                client,
                mode,
                run_name,
                artifacts_dir,
                workspace: Some(workspace),
                keep_env,
            }),
        }
    }

    #[must_use]
    pub fn client(&self) -> &StackClient {
        &self.client
    }

    #[must_use]
    pub fn environment(&self) -> &str {
        self.client.environment()
    }

    /// Graceful release: capture the final status, tear the environment
    /// down per the scope's mode, then drop or persist the workspace.
    /// Teardown problems are logged, never returned; they must not mask
    /// the assessment verdict.
    pub async fn release(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run().await;
        }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            warn!(
                environment = %teardown.client.environment(),
                "environment scope dropped without an explicit release"
            );
            run_teardown_blocking(teardown);
        }
    }
}

struct ScopeTeardown {
    client: StackClient,
    mode: EnvMode,
    run_name: String,
    artifacts_dir: Option<PathBuf>,
    workspace: Option<HarnessWorkspace>,
    keep_env: bool,
}

impl ScopeTeardown {
    async fn run(mut self) {
        debug!(
            environment = %self.client.environment(),
            mode = ?self.mode,
            keep_env = self.keep_env,
            "releasing environment scope"
        );
        self.capture_final_status().await;
        self.teardown_environment().await;
        self.finish_workspace();
    }

    async fn capture_final_status(&self) {
        let Some(dir) = &self.artifacts_dir else {
            return;
        };
        let raw = match self.client.raw_status().await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    environment = %self.client.environment(),
                    %error,
                    "could not capture the final status"
                );
                return;
            }
        };
        let path = dir.join(format!("{}-final-status.yaml", self.run_name));
        match fs::create_dir_all(dir).and_then(|()| fs::write(&path, &raw)) {
            Ok(()) => info!(path = %path.display(), "final status captured"),
            Err(error) => warn!(
                path = %path.display(),
                %error,
                "could not write the final status artifact"
            ),
        }
    }

    async fn teardown_environment(&self) {
        match self.mode {
            EnvMode::Fresh => {
                if self.keep_env {
                    info!(
                        environment = %self.client.environment(),
                        "keep-env set; skipping destroy-environment"
                    );
                    return;
                }
                if let Err(error) = self.client.destroy_environment().await {
                    warn!(
                        environment = %self.client.environment(),
                        %error,
                        "destroy-environment failed during release"
                    );
                }
            }
            EnvMode::Existing => {
                info!(
                    environment = %self.client.environment(),
                    "detaching from existing environment"
                );
            }
        }
    }

    fn finish_workspace(&mut self) {
        let Some(workspace) = self.workspace.take() else {
            return;
        };
        if self.keep_env {
            let home = workspace.keep();
            info!(home = %home.display(), "preserving harness workspace");
        }
    }
}

fn run_teardown_blocking(teardown: ScopeTeardown) {
    let handle = thread::spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(teardown.run()),
            Err(error) => warn!(%error, "failed to build a runtime for drop-path teardown"),
        }
    });
    if handle.join().is_err() {
        warn!("drop-path teardown thread panicked");
    }
}
