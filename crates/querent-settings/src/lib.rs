//! Configuration for the querent service.
//!
//! Sources, lowest priority first:
//! 1. compiled defaults (`#[serde(default)]` on every section)
//! 2. a JSON file (`querent.json`, or the path in `QUERENT_CONFIG`)
//! 3. the flat variables `OPENAI_API_KEY`, `DB_DRIVER`, `DB_SERVER`, `DB_PORT`,
//!    `DB_NAME`, `DB_USER`, `DB_PASSWORD`
//! 4. `QUERENT_*` variables, nested with `__` (`QUERENT_SERVER__PORT=9000`)
//!
//! A `.env` file in the working directory is loaded into the process
//! environment before the sources are read.

mod errors;
mod loader;
mod types;

pub use errors::{Result, SettingsError};
pub use loader::{figment, load, load_from, DEFAULT_CONFIG_FILE};
pub use types::{DatabaseDriver, DatabaseSettings, LlmSettings, LoggingSettings, ServerSettings, Settings};
