//! Read-only database introspection: table listing and schema descriptions,
//! plus the two tools that expose them to the pipeline.

pub mod error;
pub mod info;
pub mod postgres;
pub mod sqlite;
pub mod tools;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use querent_settings::{DatabaseDriver, DatabaseSettings};

pub use error::DbError;
pub use postgres::PostgresDatabase;
pub use sqlite::SqliteDatabase;
pub use tools::{ListTablesTool, SchemaTool, LIST_TABLES_TOOL, SCHEMA_TOOL};

/// SQL variant spoken by a database. Displays as the name used in prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgresql,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema-level, read-only view of a live database.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// User table names, sorted.
    async fn list_tables(&self) -> Result<Vec<String>, DbError>;

    /// `CREATE TABLE` text and sample rows for each named table.
    async fn table_info(&self, tables: &[String]) -> Result<String, DbError>;
}

/// Open the configured backend. Called once at startup.
pub async fn connect(settings: &DatabaseSettings) -> Result<Arc<dyn SqlDatabase>, DbError> {
    let db: Arc<dyn SqlDatabase> = match settings.driver {
        DatabaseDriver::Sqlite => {
            let path = settings
                .sqlite_path()
                .ok_or_else(|| DbError::Config("sqlite requires a database path".into()))?;
            Arc::new(SqliteDatabase::open(&path, settings.sample_rows)?)
        }
        DatabaseDriver::Postgres => Arc::new(PostgresDatabase::connect(settings).await?),
    };
    info!(dialect = %db.dialect(), "database connected");
    Ok(db)
}
