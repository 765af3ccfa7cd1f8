use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use querent_settings::DatabaseSettings;

use crate::error::DbError;
use crate::info::{missing_tables, quote_ident, sample_block, table_section, truncate_value};
use crate::{Dialect, SqlDatabase};

const DEFAULT_PORT: u16 = 5432;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// A column as reported by `information_schema.columns`.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub default_value: Option<String>,
}

/// Pooled PostgreSQL handle scoped to one schema.
pub struct PostgresDatabase {
    pool: PgPool,
    schema: String,
    sample_rows: usize,
}

impl PostgresDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let host = settings
            .server
            .as_deref()
            .ok_or_else(|| DbError::Config("postgres requires a server".into()))?;
        let name = settings
            .name
            .as_deref()
            .ok_or_else(|| DbError::Config("postgres requires a database name".into()))?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(settings.port.unwrap_or(DEFAULT_PORT))
            .database(name);
        if let Some(user) = &settings.user {
            options = options.username(user);
        }
        if let Some(password) = &settings.password {
            options = options.password(password.expose_secret());
        }

        info!(host, database = name, schema = %settings.schema, "connecting to postgres");

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to connect to postgres");
                DbError::from(e)
            })?;

        Ok(Self::from_pool(pool, settings.schema.clone(), settings.sample_rows))
    }

    pub fn from_pool(pool: PgPool, schema: String, sample_rows: usize) -> Self {
        Self {
            pool,
            schema,
            sample_rows,
        }
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let columns = sqlx::query_as::<_, ColumnInfo>(
            "SELECT column_name::text AS name, data_type::text AS data_type, \
                    is_nullable::text AS is_nullable, column_default::text AS default_value \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn sample(&self, table: &str, columns: &[ColumnInfo]) -> Result<String, DbError> {
        let sql = format!(
            "SELECT row_to_json(t)::text FROM (SELECT * FROM {}.{} LIMIT $1) t",
            quote_ident(&self.schema),
            quote_ident(table)
        );
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(self.sample_rows as i64)
            .fetch_all(&self.pool)
            .await?;

        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let rendered = rows
            .iter()
            .map(|json| json_row_values(json, &names))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sample_block(table, self.sample_rows, &names, &rendered))
    }
}

/// Rebuild a `CREATE TABLE` statement from column metadata.
pub fn render_create_table(table: &str, columns: &[ColumnInfo]) -> String {
    let body = columns
        .iter()
        .map(|c| {
            let mut line = format!("\t{} {}", c.name, c.data_type.to_uppercase());
            if c.is_nullable.eq_ignore_ascii_case("NO") {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default_value {
                line.push_str(" DEFAULT ");
                line.push_str(default);
            }
            line
        })
        .collect::<Vec<_>>()
        .join(", \n");
    format!("CREATE TABLE {table} (\n{body}\n)")
}

/// Pull the values of one `row_to_json` object out in column order.
pub fn json_row_values(json: &str, columns: &[String]) -> Result<Vec<String>, DbError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| DbError::Database(format!("unreadable sample row: {e}")))?;
    Ok(columns
        .iter()
        .map(|name| match value.get(name) {
            None | Some(serde_json::Value::Null) => "NULL".to_string(),
            Some(serde_json::Value::String(s)) => truncate_value(s.clone()),
            Some(other) => truncate_value(other.to_string()),
        })
        .collect())
}

#[async_trait]
impl SqlDatabase for PostgresDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn table_info(&self, tables: &[String]) -> Result<String, DbError> {
        debug!(tables = ?tables, schema = %self.schema, "describing postgres tables");

        let known = self.list_tables().await?;
        let missing = missing_tables(tables, &known);
        if !missing.is_empty() {
            return Err(DbError::UnknownTables(missing));
        }

        let mut sections = Vec::with_capacity(tables.len());
        for table in tables {
            let columns = self.columns(table).await?;
            let create = render_create_table(table, &columns);
            let block = if self.sample_rows > 0 {
                Some(self.sample(table, &columns).await?)
            } else {
                None
            };
            sections.push(table_section(&create, block));
        }
        Ok(sections.join("\n\n"))
    }
}
