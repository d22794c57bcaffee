//! Brings the database container up and waits until the table is usable

use crate::config::Settings;
use crate::error::{ProvisionError, Result};
use crate::infrastructure::log_messages::{container as container_messages, readiness};
use crate::infrastructure::{
    connect, init_script, ContainerHandle, ContainerRuntime, ContainerSpec, InitScript, LockTable,
};
use sqlx::Connection;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument};

pub struct Provisioner<'a> {
    settings: &'a Settings,
    runtime: &'a ContainerRuntime,
}

impl<'a> Provisioner<'a> {
    pub fn new(settings: &'a Settings, runtime: &'a ContainerRuntime) -> Self {
        Self { settings, runtime }
    }

    /// Renders the init script into the configured host directory
    pub fn prepare_init_script(&self) -> Result<InitScript> {
        let container = &self.settings.container;
        let database = &self.settings.database;
        let template = init_script::load_template(container.init_template.as_deref())?;
        let script =
            init_script::render(&template, &database.database_name, &database.table_name)?;
        Ok(InitScript::write(&container.init_dir, &script)?)
    }

    /// Creates the container with `script` mounted where the image runs it
    ///
    /// A name collision fails here, before this run owns any container.
    #[instrument(skip_all, fields(container = %self.settings.container.name))]
    pub async fn create_container(&self, script: &InitScript) -> Result<ContainerHandle> {
        let spec = ContainerSpec::from_settings(self.settings, script.mount_dir());
        Ok(self.runtime.create(&spec).await?)
    }

    #[instrument(skip_all, fields(container = %handle))]
    pub async fn start_container(&self, handle: &ContainerHandle) -> Result<()> {
        info!("{}", container_messages::STARTING_SERVER);
        Ok(self.runtime.start(handle).await?)
    }

    /// Polls until the table answers a query or the attempts run out
    #[instrument(skip_all, fields(container = %handle))]
    pub async fn wait_until_ready(&self, handle: &ContainerHandle) -> Result<()> {
        let readiness = &self.settings.readiness;
        let max_attempts = readiness.max_attempts.into_inner();

        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "{}", readiness::TRYING_TO_CONNECT);
            match timeout(readiness.attempt_timeout(), self.probe()).await {
                Ok(Ok(())) => {
                    info!("{}", readiness::STARTED_SERVER);
                    return Ok(());
                }
                Ok(Err(error)) => debug!(attempt, %error, "{}", readiness::PROBE_FAILED),
                Err(_) => debug!(attempt, "{}", readiness::PROBE_TIMED_OUT),
            }
            if attempt < max_attempts {
                sleep(readiness.interval()).await;
            }
        }

        error!(attempts = max_attempts, "{}", readiness::GAVE_UP);
        Err(ProvisionError::Timeout {
            attempts: max_attempts,
        }
        .into())
    }

    async fn probe(&self) -> std::result::Result<(), sqlx::Error> {
        let mut conn = connect(&self.settings.database).await?;
        let table = LockTable::new(self.settings.database.table_name.clone());
        let result = table.probe(&mut conn).await;
        if let Err(error) = conn.close().await {
            debug!(%error, "Failed to close probe connection");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MaxAttempts;
    use crate::error::{CommandError, Error};
    use crate::infrastructure::CommandRunner;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopRunner;

    #[async_trait]
    impl CommandRunner for NoopRunner {
        async fn run(&self, _args: &[String]) -> std::result::Result<(), CommandError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn init_script_lands_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::defaults().unwrap();
        settings.container.init_dir = dir.path().join("temp");
        let runtime = ContainerRuntime::new(Arc::new(NoopRunner));

        let script = Provisioner::new(&settings, &runtime)
            .prepare_init_script()
            .unwrap();
        let contents = std::fs::read_to_string(script.path()).unwrap();
        assert!(contents.contains("CREATE TABLE IF NOT EXISTS TestTable"));
    }

    #[tokio::test]
    async fn readiness_gives_up_after_max_attempts() {
        let mut settings = Settings::defaults().unwrap();
        settings.database.host = crate::domain::Host::try_new("127.0.0.1".to_string()).unwrap();
        settings.database.port = crate::domain::Port::try_new(1).unwrap();
        settings.readiness.max_attempts = MaxAttempts::try_new(2).unwrap();
        settings.readiness.interval_ms = 10;
        let runtime = ContainerRuntime::new(Arc::new(NoopRunner));
        let provisioner = Provisioner::new(&settings, &runtime);

        let dir = tempfile::tempdir().unwrap();
        let script = InitScript::write(dir.path(), "SELECT 1;").unwrap();
        let handle = provisioner.create_container(&script).await.unwrap();
        provisioner.start_container(&handle).await.unwrap();
        let result = provisioner.wait_until_ready(&handle).await;

        assert!(matches!(
            result,
            Err(Error::Provision(ProvisionError::Timeout { attempts: 2 }))
        ));
    }
}
