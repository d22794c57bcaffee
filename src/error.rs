use thiserror::Error;

/// Failures while bringing the database container up
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Database did not become ready after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("Failed to write init script: {0}")]
    InitScript(#[from] std::io::Error),

    #[error("Invalid init script template: missing placeholder {placeholder}")]
    Template { placeholder: &'static str },
}

/// Failures inside a single worker's locking scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to fetch initial max ID (got {0:?})")]
    InvalidInitialMax(Option<i64>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures of an external container runtime command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` command failed; exit code {code}")]
    NonZeroExit { program: String, code: i32 },
}

/// Lock harness error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Container command error: {0}")]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
