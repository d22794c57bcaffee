//! Infrastructure layer for the lock harness
//!
//! This module contains the implementations for external concerns: the
//! container runtime CLI, the init script on disk, and database access.

pub mod command;
pub mod container;
pub mod database;
pub mod init_script;
pub mod log_messages;

pub use command::{CommandRunner, ProcessCommandRunner};
pub use container::{ContainerHandle, ContainerRuntime, ContainerSpec};
pub use database::{connect, LockTable};
pub use init_script::InitScript;
