pub use config::ConfigError;

use crate::domain::{
    ContainerName, DatabaseName, DatabasePassword, DatabaseUsername, Host, ImageReference,
    InsertCount, MaxAttempts, Port, TableName, WorkerCount, WorkerName,
};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub container: ContainerSettings,
    pub database: DatabaseSettings,
    pub readiness: ReadinessSettings,
    pub scenario: ScenarioSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContainerSettings {
    /// Container runtime executable
    pub runtime: String,
    pub name: ContainerName,
    pub image: ImageReference,
    /// Host directory holding the rendered init script, bind-mounted into the container
    pub init_dir: PathBuf,
    /// Replaces the built-in init script template
    pub init_template: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: Host,
    /// Host port published for the container's MySQL port
    pub port: Port,
    pub username: DatabaseUsername,
    pub password: DatabasePassword,
    pub database_name: DatabaseName,
    pub table_name: TableName,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReadinessSettings {
    pub max_attempts: MaxAttempts,
    pub interval_ms: u64,
    pub attempt_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioSettings {
    pub worker_count: WorkerCount,
    pub inserts_per_worker: InsertCount,
    pub insert_delay_ms: u64,
    /// Turn worker failures and verification violations into a failed run
    pub fail_on_worker_error: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Defaults, overlaid with `config/*` files and `LOCK_HARNESS__*` variables
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("LOCK_HARNESS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only, ignoring files and the environment
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("container.runtime", "docker")?
            .set_default("container.name", "mysql")?
            .set_default("container.image", "mysql:5.7")?
            .set_default("container.init_dir", "./temp")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 30000)?
            .set_default("database.username", "root")?
            .set_default("database.password", "root")?
            .set_default("database.database_name", "TestDB")?
            .set_default("database.table_name", "TestTable")?
            .set_default("readiness.max_attempts", 120)?
            .set_default("readiness.interval_ms", 1000)?
            .set_default("readiness.attempt_timeout_ms", 5000)?
            .set_default("scenario.worker_count", 3)?
            .set_default("scenario.inserts_per_worker", 20)?
            .set_default("scenario.insert_delay_ms", 100)?
            .set_default("scenario.fail_on_worker_error", true)?
            .set_default("logging.level", "info")
    }

    /// Connection URL for logging; the password is redacted
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(self.host.as_ref())
            .port(*self.port.as_ref())
            .username(self.username.as_ref())
            .password(self.password.as_ref())
            .database(self.database_name.as_ref())
            .ssl_mode(MySqlSslMode::Disabled)
    }
}

impl ReadinessSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl ScenarioSettings {
    pub fn workers(&self) -> Vec<WorkerName> {
        WorkerName::roster(self.worker_count.into_inner())
    }

    pub fn insert_delay(&self) -> Duration {
        Duration::from_millis(self.insert_delay_ms)
    }

    /// Rows the scenario adds when every worker commits
    pub fn expected_inserts(&self) -> usize {
        self.worker_count.into_inner() * self.inserts_per_worker.into_inner()
    }
}
