//! Checks a finished scenario against the serialization properties
//!
//! All checks are pure functions over what the workers reported, so they can
//! be exercised without a database.

use super::worker::{WorkerName, WorkerOutcome, WorkerReport};
use thiserror::Error;

/// A property the scenario was expected to uphold but did not
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("{first} and {second} held the lock at the same time")]
    OverlappingLocks {
        first: WorkerName,
        second: WorkerName,
    },

    #[error("{worker} inserted id {next} right after id {previous}")]
    NonContiguousIds {
        worker: WorkerName,
        previous: u64,
        next: u64,
    },

    #[error("{worker} inserted id {first_id} although it locked max id {initial_max}")]
    InsertAtOrBelowLockedMax {
        worker: WorkerName,
        initial_max: i64,
        first_id: u64,
    },

    #[error("table holds {actual} rows after the scenario, expected {expected}")]
    RowCountMismatch { expected: i64, actual: i64 },
}

/// Aggregated result of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub outcomes: Vec<WorkerOutcome>,
    pub rows_before: i64,
    pub rows_after: i64,
    pub violations: Vec<Violation>,
}

impl ScenarioReport {
    /// Verifies the outcomes and row counts and assembles the report
    pub fn new(outcomes: Vec<WorkerOutcome>, rows_before: i64, rows_after: i64) -> Self {
        let reports: Vec<&WorkerReport> =
            outcomes.iter().filter_map(WorkerOutcome::report).collect();
        let violations = verify(&reports, rows_before, rows_after);
        Self {
            outcomes,
            rows_before,
            rows_after,
            violations,
        }
    }

    pub fn failed_workers(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failed())
    }

    /// No worker failed and no property was violated
    pub fn passed(&self) -> bool {
        self.violations.is_empty() && self.failed_workers().next().is_none()
    }
}

/// Runs every check and returns the violations found, in a stable order
pub fn verify(reports: &[&WorkerReport], rows_before: i64, rows_after: i64) -> Vec<Violation> {
    let mut violations = overlapping_locks(reports);
    for report in reports {
        violations.extend(id_sequence(report));
    }
    violations.extend(row_count(reports, rows_before, rows_after));
    violations
}

/// Every pair of workers whose lock intervals intersect
pub fn overlapping_locks(reports: &[&WorkerReport]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (index, first) in reports.iter().enumerate() {
        for second in &reports[index + 1..] {
            if first.overlaps(second) {
                violations.push(Violation::OverlappingLocks {
                    first: first.worker.clone(),
                    second: second.worker.clone(),
                });
            }
        }
    }
    violations
}

/// A worker's ids must start above its locked max and have no gaps
pub fn id_sequence(report: &WorkerReport) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(&first_id) = report.inserted_ids.first() {
        let above_max = match i64::try_from(first_id) {
            Ok(id) => id > report.initial_max,
            Err(_) => true,
        };
        if !above_max {
            violations.push(Violation::InsertAtOrBelowLockedMax {
                worker: report.worker.clone(),
                initial_max: report.initial_max,
                first_id,
            });
        }
    }

    for pair in report.inserted_ids.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if previous.checked_add(1) != Some(next) {
            violations.push(Violation::NonContiguousIds {
                worker: report.worker.clone(),
                previous,
                next,
            });
        }
    }

    violations
}

/// Rows committed by completed workers must all be visible afterwards
pub fn row_count(reports: &[&WorkerReport], rows_before: i64, rows_after: i64) -> Option<Violation> {
    let inserted: usize = reports.iter().map(|report| report.inserted_ids.len()).sum();
    let expected = rows_before.saturating_add(i64::try_from(inserted).unwrap_or(i64::MAX));
    (expected != rows_after).then_some(Violation::RowCountMismatch {
        expected,
        actual: rows_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, Instant};

    fn serialized_reports(workers: usize, inserts: usize, seed_rows: u64) -> Vec<WorkerReport> {
        let start = Instant::now();
        let mut next_id = seed_rows + 1;
        (0..workers)
            .map(|index| {
                let ids: Vec<u64> = (next_id..next_id + inserts as u64).collect();
                let initial_max = next_id as i64 - 1;
                next_id += inserts as u64;
                let slot = index as u64 * 100;
                WorkerReport {
                    worker: WorkerName::numbered(index + 1),
                    initial_max,
                    final_max: ids.last().map(|&id| id as i64),
                    final_name: None,
                    inserted_ids: ids,
                    lock_acquired_at: start + Duration::from_millis(slot),
                    lock_released_at: start + Duration::from_millis(slot + 90),
                }
            })
            .collect()
    }

    #[test]
    fn serialized_scenario_has_no_violations() {
        let reports = serialized_reports(3, 20, 1);
        let refs: Vec<&WorkerReport> = reports.iter().collect();
        assert!(verify(&refs, 1, 61).is_empty());
    }

    #[test]
    fn overlapping_lock_intervals_are_reported_per_pair() {
        let mut reports = serialized_reports(3, 2, 1);
        reports[1].lock_acquired_at = reports[0].lock_acquired_at + Duration::from_millis(10);
        let refs: Vec<&WorkerReport> = reports.iter().collect();

        let violations = overlapping_locks(&refs);
        assert_eq!(
            violations,
            vec![Violation::OverlappingLocks {
                first: WorkerName::numbered(1),
                second: WorkerName::numbered(2),
            }]
        );
    }

    #[test]
    fn interleaved_ids_are_reported() {
        let mut reports = serialized_reports(1, 3, 1);
        reports[0].inserted_ids = vec![2, 3, 5];

        let violations = id_sequence(&reports[0]);
        assert_eq!(
            violations,
            vec![Violation::NonContiguousIds {
                worker: WorkerName::numbered(1),
                previous: 3,
                next: 5,
            }]
        );
    }

    #[test]
    fn insert_at_locked_max_is_reported() {
        let mut reports = serialized_reports(1, 2, 1);
        reports[0].initial_max = 5;
        reports[0].inserted_ids = vec![5, 6];

        assert!(matches!(
            id_sequence(&reports[0]).as_slice(),
            [Violation::InsertAtOrBelowLockedMax { first_id: 5, .. }]
        ));
    }

    #[test]
    fn missing_rows_are_reported() {
        let reports = serialized_reports(3, 20, 1);
        let refs: Vec<&WorkerReport> = reports.iter().collect();
        assert_eq!(
            row_count(&refs, 1, 41),
            Some(Violation::RowCountMismatch {
                expected: 61,
                actual: 41,
            })
        );
    }

    #[test]
    fn failed_worker_fails_the_report_without_violations() {
        let mut outcomes: Vec<WorkerOutcome> = serialized_reports(2, 20, 1)
            .into_iter()
            .map(WorkerOutcome::Completed)
            .collect();
        outcomes.push(WorkerOutcome::Failed {
            worker: WorkerName::numbered(3),
            reason: "connection reset".to_string(),
        });

        let report = ScenarioReport::new(outcomes, 1, 41);
        assert!(report.violations.is_empty());
        assert_eq!(report.failed_workers().count(), 1);
        assert!(!report.passed());
    }

    proptest! {
        #[test]
        fn any_serialized_schedule_verifies(
            workers in 1usize..8,
            inserts in 1usize..50,
            seed_rows in 1u64..1000,
        ) {
            let reports = serialized_reports(workers, inserts, seed_rows);
            let refs: Vec<&WorkerReport> = reports.iter().collect();
            let rows_before = seed_rows as i64;
            let rows_after = rows_before + (workers * inserts) as i64;
            prop_assert!(verify(&refs, rows_before, rows_after).is_empty());
        }
    }
}
