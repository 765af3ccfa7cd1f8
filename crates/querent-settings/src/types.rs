use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::errors::{Result, SettingsError};

/// Top-level settings.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check cross-field requirements that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_none() {
            return Err(SettingsError::Invalid(
                "llm.api_key is required (set OPENAI_API_KEY)".into(),
            ));
        }
        if self.llm.call_timeout_secs == 0 {
            return Err(SettingsError::Invalid("llm.call_timeout_secs must be positive".into()));
        }
        self.database.validate()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole `/chat` request.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    #[serde(deserialize_with = "lenient_secret")]
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    /// Deadline for each individual model or tool call.
    pub call_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4.1-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            temperature: None,
            call_timeout_secs: 60,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub driver: DatabaseDriver,
    #[serde(deserialize_with = "lenient_string")]
    pub server: Option<String>,
    pub port: Option<u16>,
    /// Database name; for sqlite, the path of the database file.
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub user: Option<String>,
    #[serde(deserialize_with = "lenient_secret")]
    pub password: Option<SecretString>,
    /// Schema searched for tables (postgres only).
    pub schema: String,
    /// Example rows included with each table definition; 0 disables sampling.
    pub sample_rows: usize,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::Sqlite,
            server: None,
            port: None,
            name: None,
            user: None,
            password: None,
            schema: "public".into(),
            sample_rows: 3,
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    pub fn validate(&self) -> Result<()> {
        match self.driver {
            DatabaseDriver::Sqlite => {
                if self.sqlite_path().is_none() {
                    return Err(SettingsError::Invalid(
                        "database.name must point at the sqlite file (set DB_NAME)".into(),
                    ));
                }
            }
            DatabaseDriver::Postgres => {
                if self.server.is_none() || self.name.is_none() {
                    return Err(SettingsError::Invalid(
                        "postgres requires database.server and database.name".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> Option<PathBuf> {
        self.name.as_ref().map(PathBuf::from)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
    /// Directory for daily log files; `None` logs to the console only.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            directory: Some(PathBuf::from("logs")),
        }
    }
}

// Environment values are parsed by type, so `DB_PASSWORD=12345` arrives as a
// number. Accept any scalar for string-typed fields.

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.and_then(scalar_to_string))
}

fn lenient_secret<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<SecretString>, D::Error> {
    Ok(lenient_string(d)?.map(SecretString::from))
}
