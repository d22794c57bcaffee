//! Concurrent workers contending on `SELECT MAX(ID) ... FOR UPDATE`
//!
//! Each worker runs on its own task with its own connection. While one worker
//! holds the lock, the others block inside their locking select until it
//! commits. A worker failure is logged and turned into a failed
//! [`WorkerOutcome`]; it never cancels the other workers.

use crate::config::{DatabaseSettings, ScenarioSettings};
use crate::domain::{row_name, WorkerName, WorkerOutcome, WorkerReport};
use crate::error::ScenarioError;
use crate::infrastructure::log_messages::worker as messages;
use crate::infrastructure::{connect, LockTable};
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, Instrument};

pub struct ScenarioRunner {
    database: DatabaseSettings,
    table: LockTable,
    inserts_per_worker: usize,
    insert_delay: Duration,
}

impl ScenarioRunner {
    pub fn new(database: &DatabaseSettings, scenario: &ScenarioSettings) -> Self {
        Self {
            database: database.clone(),
            table: LockTable::new(database.table_name.clone()),
            inserts_per_worker: scenario.inserts_per_worker.into_inner(),
            insert_delay: scenario.insert_delay(),
        }
    }

    /// Runs one worker per name concurrently and waits for all of them
    pub async fn run(&self, workers: Vec<WorkerName>) -> Vec<WorkerOutcome> {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                let job = WorkerJob {
                    worker: worker.clone(),
                    database: self.database.clone(),
                    table: self.table.clone(),
                    inserts: self.inserts_per_worker,
                    insert_delay: self.insert_delay,
                };
                let span = info_span!("worker", name = %worker);
                (worker, tokio::spawn(job.run().instrument(span)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (worker, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(report)) => WorkerOutcome::Completed(report),
                Ok(Err(failure)) => {
                    error!(worker = %worker, error = %failure, "{}", messages::FAILED);
                    WorkerOutcome::Failed {
                        worker,
                        reason: failure.to_string(),
                    }
                }
                Err(join_error) => {
                    error!(worker = %worker, error = %join_error, "{}", messages::PANICKED);
                    WorkerOutcome::Failed {
                        worker,
                        reason: join_error.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// The locked max must name an existing row; an empty table yields NULL
fn positive_max(locked_max: Option<i64>) -> Result<i64, ScenarioError> {
    match locked_max {
        Some(id) if id > 0 => Ok(id),
        other => Err(ScenarioError::InvalidInitialMax(other)),
    }
}

struct WorkerJob {
    worker: WorkerName,
    database: DatabaseSettings,
    table: LockTable,
    inserts: usize,
    insert_delay: Duration,
}

impl WorkerJob {
    async fn run(self) -> Result<WorkerReport, ScenarioError> {
        let mut conn = connect(&self.database).await?;
        let result = self.hold_lock(&mut conn).await;
        if let Err(error) = conn.close().await {
            debug!(%error, "{}", messages::CLOSE_FAILED);
        }
        result
    }

    async fn hold_lock(&self, conn: &mut MySqlConnection) -> Result<WorkerReport, ScenarioError> {
        let mut tx = conn.begin().await?;

        info!("{}", messages::TRYING_TO_LOCK);
        let locked_max = self.table.max_id_for_update(&mut tx).await?;
        let lock_acquired_at = Instant::now();
        info!("{}", messages::LOCK_ACQUIRED);

        let initial_max = positive_max(locked_max)?;
        info!(initial_max, "{}", messages::INITIAL_MAX);

        let mut inserted_ids = Vec::with_capacity(self.inserts);
        for iteration in 1..=self.inserts {
            sleep(self.insert_delay).await;
            let name = row_name(&self.worker, iteration);
            let inserted = self.table.insert_row(&mut tx, &name).await?;
            info!(
                iteration,
                rows = inserted.rows_affected,
                id = inserted.id,
                "{}",
                messages::ROW_INSERTED
            );
            inserted_ids.push(inserted.id);
        }

        let final_max = self.table.max_id(&mut tx).await?;
        info!(final_max = ?final_max, "{}", messages::FINAL_MAX);
        let final_name = match final_max {
            Some(id) => self.table.name_of(&mut tx, id).await?,
            None => None,
        };
        if let Some(name) = &final_name {
            info!(name = %name, "{}", messages::FINAL_MAX_NAME);
        }

        info!("{}", messages::RELEASING_LOCK);
        let lock_released_at = Instant::now();
        tx.commit().await?;

        Ok(WorkerReport {
            worker: self.worker.clone(),
            initial_max,
            inserted_ids,
            final_max,
            final_name,
            lock_acquired_at,
            lock_released_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::{Host, Port};
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some(0))]
    #[case(Some(-4))]
    fn missing_or_non_positive_max_is_rejected(#[case] locked_max: Option<i64>) {
        assert!(matches!(
            positive_max(locked_max),
            Err(ScenarioError::InvalidInitialMax(observed)) if observed == locked_max
        ));
    }

    #[test]
    fn positive_max_is_accepted() {
        assert_eq!(positive_max(Some(1)).unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_database_fails_every_worker_independently() {
        let mut settings = Settings::defaults().unwrap();
        settings.database.host = Host::try_new("127.0.0.1".to_string()).unwrap();
        settings.database.port = Port::try_new(1).unwrap();
        let runner = ScenarioRunner::new(&settings.database, &settings.scenario);

        let outcomes = runner.run(WorkerName::roster(3)).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(WorkerOutcome::is_failed));
        let names: Vec<&str> = outcomes.iter().map(|o| o.worker().as_ref()).collect();
        assert_eq!(names, vec!["worker-1", "worker-2", "worker-3"]);
    }
}
