use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use querent_core::tools::{Tool, ToolError, ToolResult};

use crate::info::parse_table_list;
use crate::SqlDatabase;

pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
pub const SCHEMA_TOOL: &str = "sql_db_schema";

pub struct ListTablesTool {
    db: Arc<dyn SqlDatabase>,
}

impl ListTablesTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        LIST_TABLES_TOOL
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let tables = self
            .db
            .list_tables()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ToolResult {
            content: tables.join(", "),
            duration: start.elapsed(),
        })
    }
}

pub struct SchemaTool {
    db: Arc<dyn SqlDatabase>,
}

impl SchemaTool {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self { db }
    }
}

/// `table_names` may be a comma-separated string or an array of strings.
fn table_names_arg(args: &Value) -> Result<Vec<String>, ToolError> {
    let names = match &args["table_names"] {
        Value::String(s) => parse_table_list(s),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| ToolError::InvalidArguments("table_names must contain strings".into()))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => return Err(ToolError::InvalidArguments("table_names is required".into())),
        _ => {
            return Err(ToolError::InvalidArguments(
                "table_names must be a string or an array of strings".into(),
            ))
        }
    };

    if names.is_empty() {
        return Err(ToolError::InvalidArguments("table_names is empty".into()));
    }
    Ok(names)
}

#[async_trait]
impl Tool for SchemaTool {
    fn name(&self) -> &str {
        SCHEMA_TOOL
    }

    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, output is the schema and sample rows \
         for those tables. Be sure that the tables actually exist by calling sql_db_list_tables first! \
         Example Input: table1, table2, table3"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "required": ["table_names"],
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "A comma-separated list of the table names for which to return the schema. Example input: 'table1, table2, table3'"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let start = Instant::now();
        let tables = table_names_arg(&args)?;

        let info = self
            .db
            .table_info(&tables)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(ToolResult {
            content: info,
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::Dialect;

    struct FakeDb {
        fail: bool,
    }

    #[async_trait]
    impl SqlDatabase for FakeDb {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }

        async fn list_tables(&self) -> Result<Vec<String>, DbError> {
            if self.fail {
                return Err(DbError::Database("connection refused".into()));
            }
            Ok(vec!["orders".into(), "users".into()])
        }

        async fn table_info(&self, tables: &[String]) -> Result<String, DbError> {
            Ok(tables
                .iter()
                .map(|t| format!("CREATE TABLE {t} (id INTEGER)"))
                .collect::<Vec<_>>()
                .join("\n\n"))
        }
    }

    fn db(fail: bool) -> Arc<dyn SqlDatabase> {
        Arc::new(FakeDb { fail })
    }

    #[tokio::test]
    async fn list_tables_joins_names() {
        let tool = ListTablesTool::new(db(false));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result.content, "orders, users");
        assert_eq!(tool.to_definition().name, "sql_db_list_tables");
    }

    #[tokio::test]
    async fn list_tables_failure_is_execution_error() {
        let tool = ListTablesTool::new(db(true));
        let err = tool.execute(Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(ref m) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn schema_accepts_string_or_array() {
        let tool = SchemaTool::new(db(false));

        let from_string = tool
            .execute(serde_json::json!({"table_names": "users, orders"}))
            .await
            .unwrap();
        let from_array = tool
            .execute(serde_json::json!({"table_names": ["users", "orders"]}))
            .await
            .unwrap();

        assert_eq!(from_string.content, from_array.content);
        assert!(from_string.content.starts_with("CREATE TABLE users"));
    }

    #[tokio::test]
    async fn schema_rejects_missing_or_bad_arguments() {
        let tool = SchemaTool::new(db(false));
        for args in [
            serde_json::json!({}),
            serde_json::json!({"table_names": ""}),
            serde_json::json!({"table_names": 42}),
            serde_json::json!({"table_names": [1, 2]}),
        ] {
            let err = tool.execute(args.clone()).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)), "args: {args}");
        }
    }
}
