//! Lifecycle of the database container through the runtime CLI

use crate::config::Settings;
use crate::domain::{ContainerName, ImageReference};
use crate::error::CommandError;
use crate::infrastructure::command::CommandRunner;
use derive_more::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Port MySQL listens on inside the container
pub const MYSQL_CONTAINER_PORT: u16 = 3306;

/// Directory whose scripts the MySQL image runs on first start
pub const INIT_MOUNT_POINT: &str = "/docker-entrypoint-initdb.d";

/// A container created by this run; it must be removed again
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{name}")]
pub struct ContainerHandle {
    name: ContainerName,
}

/// Everything `create` needs to set up the database container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: ContainerName,
    pub image: ImageReference,
    pub host_port: u16,
    pub init_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    pub fn from_settings(settings: &Settings, init_dir: &Path) -> Self {
        Self {
            name: settings.container.name.clone(),
            image: settings.container.image.clone(),
            host_port: *settings.database.port.as_ref(),
            init_dir: init_dir.to_path_buf(),
            env: vec![
                (
                    "MYSQL_ROOT_PASSWORD".to_string(),
                    settings.database.password.as_ref().to_string(),
                ),
                (
                    "MYSQL_DATABASE".to_string(),
                    settings.database.database_name.to_string(),
                ),
            ],
        }
    }

    /// Arguments of the `create` invocation
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            self.name.to_string(),
            "-p".to_string(),
            format!("{}:{MYSQL_CONTAINER_PORT}", self.host_port),
            "-v".to_string(),
            format!("{}:{INIT_MOUNT_POINT}:ro", self.init_dir.display()),
        ];
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(self.image.to_string());
        args
    }
}

/// Creates, starts, stops and removes containers via a [`CommandRunner`]
#[derive(Clone)]
pub struct ContainerRuntime {
    runner: Arc<dyn CommandRunner>,
}

impl ContainerRuntime {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Fails when a container of the same name already exists
    pub async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, CommandError> {
        self.runner.run(&spec.create_args()).await?;
        Ok(ContainerHandle {
            name: spec.name.clone(),
        })
    }

    /// Can fail after `create` succeeded, e.g. when the host port is taken
    pub async fn start(&self, handle: &ContainerHandle) -> Result<(), CommandError> {
        self.runner
            .run(&["start".to_string(), handle.name.to_string()])
            .await
    }

    pub async fn stop(&self, handle: &ContainerHandle) -> Result<(), CommandError> {
        self.runner
            .run(&["stop".to_string(), handle.name.to_string()])
            .await
    }

    pub async fn remove(&self, handle: &ContainerHandle) -> Result<(), CommandError> {
        self.runner
            .run(&["rm".to_string(), handle.name.to_string()])
            .await
    }
}
