use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json};
use figment::Figment;
use tracing::debug;

use crate::errors::Result;
use crate::types::Settings;

/// File read when no explicit path or `QUERENT_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "querent.json";

/// Flat variable names (`OPENAI_API_KEY`, `DB_*`) and the keys they map to.
const FLAT_ENV_KEYS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "llm.api_key"),
    ("DB_DRIVER", "database.driver"),
    ("DB_SERVER", "database.server"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
];

/// Load `.env`, read every source and validate the result.
pub fn load(config_path: Option<&Path>) -> Result<Settings> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env file"),
        Err(e) if e.not_found() => debug!("no .env file found"),
        Err(e) => tracing::warn!(error = %e, "failed to parse .env file, ignoring"),
    }
    load_from(figment(config_path))
}

/// Extract and validate settings from a prepared figment.
pub fn load_from(figment: Figment) -> Result<Settings> {
    let settings: Settings = figment.extract()?;
    settings.validate()?;
    Ok(settings)
}

/// Build the layered figment without touching `.env`.
pub fn figment(config_path: Option<&Path>) -> Figment {
    let path = resolve_config_path(config_path);
    debug!(path = %path.display(), "settings file");

    Figment::new()
        .merge(Json::file(path))
        .merge(flat_env())
        .merge(Env::prefixed("QUERENT_").split("__"))
}

fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var("QUERENT_CONFIG")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn flat_env() -> Env {
    let names: Vec<&'static str> = FLAT_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw()
        .only(&names)
        .map(|key| {
            FLAT_ENV_KEYS
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map(|(_, target)| (*target).into())
                .unwrap_or_else(|| key.as_str().to_string().into())
        })
}
