//! Rendering and placing the schema script run by the database image on first start

use crate::domain::{DatabaseName, TableName};
use crate::error::ProvisionError;
use crate::infrastructure::log_messages::container as messages;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Template shipped with the harness: creates the table and one seed row
pub const DEFAULT_TEMPLATE: &str = include_str!("../../resources/init.sql");

pub const DATABASE_PLACEHOLDER: &str = "${MYSQL_DATABASE_NAME}";
pub const TABLE_PLACEHOLDER: &str = "${MYSQL_TABLE_NAME}";

const SCRIPT_FILE_NAME: &str = "init.sql";

/// Substitutes the database and table names into `template`
pub fn render(
    template: &str,
    database: &DatabaseName,
    table: &TableName,
) -> Result<String, ProvisionError> {
    if !template.contains(TABLE_PLACEHOLDER) {
        return Err(ProvisionError::Template {
            placeholder: TABLE_PLACEHOLDER,
        });
    }
    Ok(template
        .replace(DATABASE_PLACEHOLDER, database.as_ref())
        .replace(TABLE_PLACEHOLDER, table.as_ref()))
}

/// Reads the template from `path`, or falls back to the built-in one
pub fn load_template(path: Option<&Path>) -> Result<String, ProvisionError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// A rendered init script on disk, removed again when dropped
#[derive(Debug)]
pub struct InitScript {
    dir: PathBuf,
    path: PathBuf,
}

impl InitScript {
    /// Writes `contents` into `dir`, creating it if needed
    pub fn write(dir: &Path, contents: &str) -> Result<Self, ProvisionError> {
        fs::create_dir_all(dir)?;
        let dir = fs::canonicalize(dir)?;
        let path = dir.join(SCRIPT_FILE_NAME);
        fs::write(&path, contents)?;
        info!(path = %path.display(), "{}", messages::INIT_SCRIPT_WRITTEN);
        Ok(Self { dir, path })
    }

    /// Absolute directory to bind-mount into the container
    pub fn mount_dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InitScript {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %error, "{}", messages::INIT_SCRIPT_REMOVE_FAILED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> (DatabaseName, TableName) {
        (
            DatabaseName::try_new("TestDB".to_string()).unwrap(),
            TableName::try_new("TestTable".to_string()).unwrap(),
        )
    }

    #[test]
    fn default_template_renders_every_placeholder() {
        let (database, table) = names();
        let script = render(DEFAULT_TEMPLATE, &database, &table).unwrap();

        assert!(!script.contains("${"));
        assert!(script.contains("USE TestDB;"));
        assert!(script.contains("CREATE TABLE IF NOT EXISTS TestTable"));
        assert!(script.contains("INSERT INTO TestTable"));
    }

    #[test]
    fn template_without_table_placeholder_is_rejected() {
        let (database, table) = names();
        let result = render("CREATE DATABASE ${MYSQL_DATABASE_NAME};", &database, &table);
        assert!(matches!(
            result,
            Err(ProvisionError::Template {
                placeholder: TABLE_PLACEHOLDER
            })
        ));
    }

    #[test]
    fn custom_template_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.sql");
        fs::write(&path, "SELECT 1 FROM ${MYSQL_TABLE_NAME};").unwrap();

        assert_eq!(
            load_template(Some(&path)).unwrap(),
            "SELECT 1 FROM ${MYSQL_TABLE_NAME};"
        );
        assert_eq!(load_template(None).unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn script_is_written_then_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("temp");

        let script = InitScript::write(&target, "SELECT 1;").unwrap();
        let path = script.path().to_path_buf();
        assert!(script.mount_dir().is_absolute());
        assert_eq!(fs::read_to_string(&path).unwrap(), "SELECT 1;");

        drop(script);
        assert!(!path.exists());
    }
}
