use anyhow::{Context, Result};
use tracing::{error, info};

use sonar_redline_step::{load_config, RuleRedlineChecker, SonarClient, StepRunner};

#[tokio::main]
async fn main() {
    init_tracing();

    match run().await {
        Ok(()) => info!("run step successfully!"),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(-1);
        }
    }
}

async fn run() -> Result<()> {
    let cfg = load_config();
    let client = SonarClient::new(&cfg.sonar_host, &cfg.sonar_token, cfg.request_timeout)
        .context("Failed to build HTTP client")?;
    let checker = RuleRedlineChecker::new();
    let runner = StepRunner::new(&cfg, &client, &checker);

    runner.run_until_cancelled(tokio::signal::ctrl_c()).await?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
