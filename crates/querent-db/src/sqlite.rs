use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::DbError;
use crate::info::{missing_tables, quote_ident, sample_block, table_section, truncate_value};
use crate::{Dialect, SqlDatabase};

/// Read-only SQLite handle.
/// Uses parking_lot::Mutex for synchronous access; queries run on the blocking pool.
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    sample_rows: usize,
}

impl SqliteDatabase {
    /// Open an existing database file without write access.
    pub fn open(path: &Path, sample_rows: usize) -> Result<Self, DbError> {
        if !path.exists() {
            return Err(DbError::Io(format!("database file not found: {}", path.display())));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        info!(path = %path.display(), "sqlite database opened read-only");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            sample_rows,
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await?
    }
}

fn table_names(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn create_statement(conn: &Connection, table: &str) -> Result<String, DbError> {
    let sql: String = conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(sql)
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".into(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => truncate_value(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

fn sample(conn: &Connection, table: &str, limit: usize) -> Result<String, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT ?1", quote_ident(table)))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([limit as i64], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(render_value))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sample_block(table, limit, &columns, &rows))
}

#[async_trait]
impl SqlDatabase for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        self.with_conn(table_names).await
    }

    async fn table_info(&self, tables: &[String]) -> Result<String, DbError> {
        let requested = tables.to_vec();
        let sample_rows = self.sample_rows;
        debug!(tables = ?requested, "describing sqlite tables");

        self.with_conn(move |conn| {
            let known = table_names(conn)?;
            let missing = missing_tables(&requested, &known);
            if !missing.is_empty() {
                return Err(DbError::UnknownTables(missing));
            }

            let mut sections = Vec::with_capacity(requested.len());
            for table in &requested {
                let create = create_statement(conn, table)?;
                let block = if sample_rows > 0 {
                    Some(sample(conn, table, sample_rows)?)
                } else {
                    None
                };
                sections.push(table_section(&create, block));
            }
            Ok(sections.join("\n\n"))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER, total REAL);
             INSERT INTO users (name, email) VALUES ('Alice', 'alice@example.com');
             INSERT INTO users (name, email) VALUES ('Bob', NULL);
             INSERT INTO orders (user_id, total) VALUES (1, 9.5);",
        )
        .unwrap();
        (tmp, path)
    }

    #[tokio::test]
    async fn lists_user_tables_sorted() {
        let (_tmp, path) = fixture();
        let db = SqliteDatabase::open(&path, 3).unwrap();
        assert_eq!(db.list_tables().await.unwrap(), vec!["orders", "users"]);
        assert_eq!(db.dialect(), Dialect::Sqlite);
    }

    #[tokio::test]
    async fn table_info_includes_definition_and_samples() {
        let (_tmp, path) = fixture();
        let db = SqliteDatabase::open(&path, 3).unwrap();
        let info = db.table_info(&["users".into()]).await.unwrap();

        assert!(info.starts_with("CREATE TABLE users"));
        assert!(info.contains("/*\n3 rows from users table:\nid\tname\temail\n"));
        assert!(info.contains("1\tAlice\talice@example.com"));
        assert!(info.contains("2\tBob\tNULL"));
        assert!(info.ends_with("*/"));
    }

    #[tokio::test]
    async fn multiple_tables_are_separated_by_blank_line() {
        let (_tmp, path) = fixture();
        let db = SqliteDatabase::open(&path, 0).unwrap();
        let info = db
            .table_info(&["users".into(), "orders".into()])
            .await
            .unwrap();
        let sections: Vec<&str> = info.split("\n\n").collect();
        assert_eq!(sections.len(), 2);
        assert!(sections[1].starts_with("CREATE TABLE orders"));
        assert!(!info.contains("/*"));
    }

    #[tokio::test]
    async fn unknown_tables_are_reported() {
        let (_tmp, path) = fixture();
        let db = SqliteDatabase::open(&path, 3).unwrap();
        let err = db
            .table_info(&["users".into(), "invoices".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownTables(ref t) if t == &vec!["invoices".to_string()]));
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SqliteDatabase::open(&tmp.path().join("nope.db"), 3).err().unwrap();
        assert!(matches!(err, DbError::Io(_)));
    }

    #[tokio::test]
    async fn connection_is_read_only() {
        let (_tmp, path) = fixture();
        let db = SqliteDatabase::open(&path, 3).unwrap();
        let result = db
            .with_conn(|conn| {
                conn.execute("DELETE FROM users", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(DbError::Database(_))));
    }
}
