//! Domain types for the lock harness
//!
//! Validated configuration values, worker identities and reports, and the
//! verification of a finished scenario.

pub mod config_types;
pub mod verification;
pub mod worker;

pub use config_types::*;
pub use verification::{ScenarioReport, Violation};
pub use worker::{row_name, WorkerName, WorkerOutcome, WorkerReport};
