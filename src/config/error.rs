//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid regex pattern for interface filtering.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        /// The invalid pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Invalid duration value (zero).
    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: &'static str,
    },

    /// The home directory is needed for `~` expansion but unknown.
    #[error("Cannot expand '{}': home directory is unknown", path.display())]
    NoHomeDir {
        /// The path that started with `~`
        path: PathBuf,
    },
}

/// Well-known field names for `InvalidDuration` errors.
pub mod field {
    /// The monitor wait slice.
    pub const SLICE_MS: &str = "slice_ms";
}

impl ConfigError {
    /// Creates an `InvalidRegex` error for a pattern.
    #[must_use]
    pub fn invalid_regex(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        }
    }
}
