use tracing_subscriber::{EnvFilter, fmt};

/// One-shot tracing init for assessment binaries.
///
/// `RUST_LOG` takes precedence when set; otherwise `--verbose` selects
/// debug-level output. Safe to call more than once, later calls are no-ops.
pub fn configure_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = harness_env::rust_log()
        .map_or_else(|| EnvFilter::new(default_level), EnvFilter::new);
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
