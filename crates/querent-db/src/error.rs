#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Database(String),

    #[error("table_names {} not found in database", .0.join(", "))]
    UnknownTables(Vec<String>),

    #[error("invalid database configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Database(e.to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        DbError::Database(e.to_string())
    }
}

impl From<tokio::task::JoinError> for DbError {
    fn from(e: tokio::task::JoinError) -> Self {
        DbError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tables_lists_names() {
        let err = DbError::UnknownTables(vec!["orders".into(), "payments".into()]);
        assert_eq!(err.to_string(), "table_names orders, payments not found in database");
    }
}
