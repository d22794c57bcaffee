use anyhow::{bail, Result};
use lock_harness::config::Settings;
use lock_harness::infrastructure::log_messages::harness;
use lock_harness::Harness;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    info!("{}", harness::STARTING);

    let fail_on_worker_error = settings.scenario.fail_on_worker_error;
    let report = Harness::new(settings).run().await?;

    if fail_on_worker_error && !report.passed() {
        bail!(
            "{} worker(s) failed and {} violation(s) were found",
            report.failed_workers().count(),
            report.violations.len()
        );
    }

    Ok(())
}
