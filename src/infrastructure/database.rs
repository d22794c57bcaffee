use crate::config::DatabaseSettings;
use crate::domain::TableName;
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;

/// Opens a dedicated connection; connections are never pooled or shared
pub async fn connect(settings: &DatabaseSettings) -> Result<MySqlConnection, sqlx::Error> {
    MySqlConnection::connect_with(&settings.connect_options()).await
}

/// Outcome of a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedRow {
    pub rows_affected: u64,
    pub id: u64,
}

/// Statements against the table the workers contend on
///
/// The table name is a validated identifier and is the only value formatted
/// into SQL text; row values are always bound.
#[derive(Debug, Clone)]
pub struct LockTable {
    table: TableName,
}

impl LockTable {
    pub fn new(table: TableName) -> Self {
        Self { table }
    }

    pub fn probe_sql(&self) -> String {
        format!("SELECT * FROM {} LIMIT 1", self.table)
    }

    pub fn max_id_for_update_sql(&self) -> String {
        format!("SELECT MAX(ID) FROM {} FOR UPDATE", self.table)
    }

    pub fn max_id_sql(&self) -> String {
        format!("SELECT MAX(ID) FROM {}", self.table)
    }

    pub fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (NAME) VALUES (?)", self.table)
    }

    pub fn name_by_id_sql(&self) -> String {
        format!("SELECT NAME FROM {} WHERE ID = ?", self.table)
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.table)
    }

    /// Succeeds once the table exists and can be read
    pub async fn probe(&self, conn: &mut MySqlConnection) -> Result<(), sqlx::Error> {
        sqlx::query(&self.probe_sql())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(())
    }

    /// Reads the max id and blocks until this transaction holds the write lock
    pub async fn max_id_for_update(
        &self,
        conn: &mut MySqlConnection,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(&self.max_id_for_update_sql())
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn max_id(&self, conn: &mut MySqlConnection) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(&self.max_id_sql())
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn insert_row(
        &self,
        conn: &mut MySqlConnection,
        name: &str,
    ) -> Result<InsertedRow, sqlx::Error> {
        let result = sqlx::query(&self.insert_sql())
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(InsertedRow {
            rows_affected: result.rows_affected(),
            id: result.last_insert_id(),
        })
    }

    pub async fn name_of(
        &self,
        conn: &mut MySqlConnection,
        id: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(&self.name_by_id_sql())
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn count_rows(&self, conn: &mut MySqlConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&self.count_sql())
            .fetch_one(&mut *conn)
            .await
    }
}
