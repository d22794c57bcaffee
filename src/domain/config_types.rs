//! Type-safe configuration types
//!
//! This module provides domain-specific types for configuration values,
//! ensuring validation at boundaries and preventing primitive obsession.

use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host address of the database server
#[nutype(
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Host(String);

/// Port number for network services
#[nutype(
    validate(predicate = |port| *port >= 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct Port(u16);

/// Database username
#[nutype(
    validate(not_empty, len_char_max = 128),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef)
)]
pub struct DatabaseUsername(String);

impl fmt::Display for DatabaseUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Database password (secured)
#[nutype(validate(not_empty), derive(Clone, Serialize, Deserialize, AsRef))]
pub struct DatabasePassword(String);

impl fmt::Debug for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabasePassword(***)")
    }
}

impl fmt::Display for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Database name
#[nutype(
    validate(not_empty, len_char_max = 64, regex = r"^[a-zA-Z][a-zA-Z0-9_]*$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct DatabaseName(String);

/// Table the workers lock and insert into
///
/// Table names cannot be bound as statement parameters, so they are restricted
/// to plain identifiers before they are ever formatted into SQL.
#[nutype(
    validate(not_empty, len_char_max = 64, regex = r"^[a-zA-Z][a-zA-Z0-9_]*$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct TableName(String);

/// Container name passed to `docker create --name`
#[nutype(
    validate(
        not_empty,
        len_char_max = 128,
        regex = r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$"
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct ContainerName(String);

/// Image reference, e.g. `mysql:5.7`
#[nutype(
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct ImageReference(String);

/// Number of concurrent workers in the scenario
#[nutype(
    validate(predicate = |count| (1..=64).contains(count)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct WorkerCount(usize);

/// Rows each worker inserts while holding the lock
#[nutype(
    validate(predicate = |count| (1..=10_000).contains(count)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct InsertCount(usize);

/// Upper bound on readiness probes before provisioning gives up
#[nutype(
    validate(predicate = |attempts| *attempts > 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct MaxAttempts(u32);
