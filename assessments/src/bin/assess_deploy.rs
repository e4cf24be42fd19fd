use assessments::{assess_deploy, run_assessment};
use clap::Parser as _;
use harness_core::{TestArgs, logging::configure_logging};

const SCRIPT: &str = "assess-deploy";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = TestArgs::parse().with_default_temp_env_name(SCRIPT);
    configure_logging(args.verbose);

    run_assessment(&args, assess_deploy).await
}
