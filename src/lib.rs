//! Lock harness - verifies MySQL pessimistic row locking end to end
//!
//! Starts a disposable MySQL container, lets concurrent workers contend on
//! `SELECT MAX(ID) ... FOR UPDATE` while inserting rows, checks that their
//! critical sections were serialized, and removes the container again.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::Harness;
pub use error::{Error, Result};
