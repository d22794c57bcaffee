use crate::application::provisioner::Provisioner;
use crate::application::scenario::ScenarioRunner;
use crate::application::teardown::teardown;
use crate::config::Settings;
use crate::domain::ScenarioReport;
use crate::infrastructure::log_messages::{container as container_messages, harness};
use crate::infrastructure::{
    connect, CommandRunner, ContainerHandle, ContainerRuntime, LockTable, ProcessCommandRunner,
};
use crate::Result;
use sqlx::Connection;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Provision, run the locking scenario, verify, and always tear down
pub struct Harness {
    settings: Settings,
    runtime: ContainerRuntime,
}

impl Harness {
    /// Drives the configured container runtime executable
    pub fn new(settings: Settings) -> Self {
        let runner = ProcessCommandRunner::new(
            settings.container.runtime.clone(),
            container_messages::OUTPUT_TAG,
        );
        Self::with_runner(settings, Arc::new(runner))
    }

    pub fn with_runner(settings: Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            settings,
            runtime: ContainerRuntime::new(runner),
        }
    }

    /// Teardown runs whenever the container was created, even if starting it
    /// or a later phase failed. When both fail, the earlier error wins.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ScenarioReport> {
        let provisioner = Provisioner::new(&self.settings, &self.runtime);
        let script = provisioner.prepare_init_script()?;
        let handle = provisioner.create_container(&script).await?;

        let outcome = self.exercise(&provisioner, &handle).await;
        let cleanup = teardown(&self.runtime, &handle).await;
        drop(script);

        match (outcome, cleanup) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(cleanup_error)) => Err(cleanup_error.into()),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(cleanup_error)) => {
                error!(error = %cleanup_error, "{}", harness::TEARDOWN_FAILED_AFTER_ERROR);
                Err(error)
            }
        }
    }

    async fn exercise(
        &self,
        provisioner: &Provisioner<'_>,
        handle: &ContainerHandle,
    ) -> Result<ScenarioReport> {
        provisioner.start_container(handle).await?;
        provisioner.wait_until_ready(handle).await?;
        let rows_before = self.count_rows().await?;

        info!("{}", harness::STARTING_TEST);
        let runner = ScenarioRunner::new(&self.settings.database, &self.settings.scenario);
        let outcomes = runner.run(self.settings.scenario.workers()).await;
        info!("{}", harness::TEST_COMPLETE);

        let rows_after = self.count_rows().await?;
        let report = ScenarioReport::new(outcomes, rows_before, rows_after);
        log_report(&report);
        Ok(report)
    }

    async fn count_rows(&self) -> Result<i64> {
        let mut conn = connect(&self.settings.database).await?;
        let table = LockTable::new(self.settings.database.table_name.clone());
        let rows = table.count_rows(&mut conn).await?;
        conn.close().await?;
        Ok(rows)
    }
}

fn log_report(report: &ScenarioReport) {
    for violation in &report.violations {
        warn!(%violation, "{}", harness::VIOLATION);
    }
    let failed = report.failed_workers().count();
    if report.passed() {
        info!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            "{}",
            harness::TEST_PASSED
        );
    } else {
        warn!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            failed_workers = failed,
            violations = report.violations.len(),
            "{}",
            harness::TEST_FAILED
        );
    }
}
