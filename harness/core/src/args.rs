use std::path::PathBuf;

use clap::Parser;

/// The shared argument surface every assessment binary takes.
///
/// Scripts add their own arguments on top by flattening this struct into
/// their own `Parser`.
#[derive(Clone, Debug, Parser)]
#[command(about = "Run one scripted acceptance assessment against a stack environment")]
pub struct TestArgs {
    /// Base environment definition to bootstrap from.
    #[arg(default_value = "local")]
    pub env: String,

    /// Path to the stack CLI binary under test. Falls back to `STACK_CLI`,
    /// then to `stack` on PATH.
    pub client_bin: Option<PathBuf>,

    /// Directory where run artifacts (final status snapshot) are written.
    pub logs: Option<PathBuf>,

    /// Name for the temporary environment. Generated when absent.
    pub temp_env_name: Option<String>,

    /// Verbose harness logging.
    #[arg(long)]
    pub verbose: bool,

    /// Forward --debug to every stack invocation.
    #[arg(long)]
    pub debug: bool,

    /// Attach to an existing environment instead of bootstrapping one.
    /// A bare `--existing` means the currently active environment.
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "current")]
    pub existing: Option<String>,

    /// Upload local agent binaries during bootstrap.
    #[arg(long)]
    pub upload_tools: bool,

    /// Region to bootstrap into.
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Default series for deployed workloads.
    #[arg(long, value_name = "SERIES")]
    pub series: Option<String>,

    /// Agent binary download location.
    #[arg(long, value_name = "URL")]
    pub agent_url: Option<String>,

    /// Stream to source agent binaries from.
    #[arg(long, value_name = "STREAM")]
    pub agent_stream: Option<String>,

    /// Host to bootstrap the initial machine onto.
    #[arg(long, value_name = "HOST")]
    pub bootstrap_host: Option<String>,

    /// Logging config forwarded to the bootstrapped environment.
    #[arg(long, value_name = "CONFIG")]
    pub logging_config: Option<String>,

    /// Preserve the environment and harness workspace after the run.
    #[arg(long)]
    pub keep_env: bool,

    /// Overall deadline for the assessment in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl TestArgs {
    /// Fill in a generated temporary environment name when none was given.
    #[must_use]
    pub fn with_default_temp_env_name(mut self, script: &str) -> Self {
        if self.temp_env_name.is_none() {
            self.temp_env_name = Some(generated_temp_env_name(script));
        }
        self
    }
}

/// Unique per-run environment name, prefixed with the script that owns it.
#[must_use]
pub fn generated_temp_env_name(script: &str) -> String {
    format!("{script}-temp-env-{:08x}", rand::random::<u32>())
}
