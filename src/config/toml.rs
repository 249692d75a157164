//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Enumeration inclusion flags
    #[serde(default)]
    pub enumerate: EnumerateSection,

    /// Interface name filter configuration
    #[serde(default)]
    pub filter: FilterSection,

    /// Change monitor configuration
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Output configuration
    #[serde(default)]
    pub output: OutputSection,
}

/// Enumeration inclusion flags section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct EnumerateSection {
    /// Include IPv6 addresses
    #[serde(default)]
    pub include_ipv6: bool,

    /// Include loopback interfaces
    #[serde(default)]
    pub include_loopback: bool,

    /// Include interfaces that are down
    #[serde(default)]
    pub include_down: bool,
}

/// Interface name filter section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    /// Regex patterns for interfaces to include
    #[serde(default)]
    pub include: Vec<String>,

    /// Regex patterns for interfaces to exclude
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Change monitor section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Longest single wait in milliseconds
    pub slice_ms: Option<u64>,

    /// Sleep after an interrupted wait in milliseconds
    pub interrupt_backoff_ms: Option<u64>,
}

/// Output section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Print JSON instead of text
    #[serde(default)]
    pub json: bool,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# netut Configuration File

[enumerate]
# Include IPv6 addresses in `netut list` (or pass --ipv6)
include_ipv6 = false

# Include loopback interfaces (or pass --loopback)
include_loopback = false

# Include interfaces that are down (or pass --down)
include_down = false

[filter]
# Regex patterns for interfaces to include (empty = all)
# Note: CLI patterns REPLACE these entirely (not merged)
# include = ["^eth", "^en"]

# Regex patterns for interfaces to exclude
# Note: CLI patterns REPLACE these entirely (not merged)
# exclude = ["^docker", "^veth"]

[monitor]
# Longest single wait of `netut watch` in milliseconds (default: 1000)
slice_ms = 1000

# Sleep after an interrupted wait in milliseconds (default: 500)
interrupt_backoff_ms = 500

[output]
# Print JSON instead of text (or pass --json)
json = false
"#
    .to_string()
}
