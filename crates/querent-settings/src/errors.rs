//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source could not be read or a value had the wrong shape.
    #[error("failed to load settings: {0}")]
    Load(#[from] Box<figment::Error>),
    /// Settings loaded but are not usable.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl From<figment::Error> for SettingsError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
