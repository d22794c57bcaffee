//! Workers and what they report back to the coordinator

use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Identity of one concurrent worker, embedded in every row it inserts
#[nutype(
    validate(
        not_empty,
        len_char_max = 64,
        regex = r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$"
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
pub struct WorkerName(String);

impl WorkerName {
    /// Conventional name of the worker at the 1-based `index`
    pub fn numbered(index: usize) -> Self {
        match Self::try_new(format!("worker-{index}")) {
            Ok(name) => name,
            Err(_) => unreachable!("worker-<n> always satisfies the worker name rules"),
        }
    }

    /// Names for `count` workers, `worker-1` through `worker-<count>`
    pub fn roster(count: usize) -> Vec<Self> {
        (1..=count).map(Self::numbered).collect()
    }
}

/// Value of the `NAME` column for a worker's insert
pub fn row_name(worker: &WorkerName, iteration: usize) -> String {
    format!("{worker}:row-{iteration}")
}

/// Everything a worker observed while it held the lock
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker: WorkerName,
    /// `MAX(ID)` read by the locking select
    pub initial_max: i64,
    /// `LAST_INSERT_ID()` of each insert, in insertion order
    pub inserted_ids: Vec<u64>,
    pub final_max: Option<i64>,
    pub final_name: Option<String>,
    /// Taken right after the locking select returned
    pub lock_acquired_at: Instant,
    /// Taken right before the commit was sent
    pub lock_released_at: Instant,
}

impl WorkerReport {
    /// Whether this worker's lock interval intersects `other`'s
    pub fn overlaps(&self, other: &WorkerReport) -> bool {
        self.lock_acquired_at < other.lock_released_at
            && other.lock_acquired_at < self.lock_released_at
    }
}

/// Result of one worker, successful or not
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Completed(WorkerReport),
    Failed { worker: WorkerName, reason: String },
}

impl WorkerOutcome {
    pub fn worker(&self) -> &WorkerName {
        match self {
            Self::Completed(report) => &report.worker,
            Self::Failed { worker, .. } => worker,
        }
    }

    pub fn report(&self) -> Option<&WorkerReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
