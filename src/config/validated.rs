//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::network::{EnumerationFilter, FilterChain, NameRegexFilter};

use super::cli::{Cli, Command};
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Inclusion flags for `list`
    pub enumeration: EnumerationFilter,

    /// Interface name filters, with `enumeration` as the record base.
    ///
    /// Used as a [`RecordFilter`](crate::network::RecordFilter) by `list` and
    /// as a [`NameMatcher`](crate::network::filter::NameMatcher) by `watch`.
    pub filter: FilterChain,

    /// Single interface requested by `list --interface`
    pub interface: Option<String>,

    /// Longest single wait of `watch`
    pub slice: Duration,

    /// Sleep after an interrupted wait
    pub interrupt_backoff: Duration,

    /// JSON output
    pub json: bool,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ ipv6: {}, loopback: {}, down: {}, slice: {}ms, backoff: {}ms, json: {}, \
             includes: {}, excludes: {} }}",
            self.enumeration.include_ipv6,
            self.enumeration.include_loopback,
            self.enumeration.include_down,
            self.slice.as_millis(),
            self.interrupt_backoff.as_millis(),
            self.json,
            self.filter.include_count(),
            self.filter.exclude_count(),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Regex patterns are invalid
    /// - `slice_ms` is zero
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let enumeration = Self::resolve_enumeration(cli, toml);
        let filter = Self::build_filter(cli, toml)?.with_base(enumeration);
        let (slice, interrupt_backoff) = Self::resolve_timing(cli, toml)?;

        let cli_json = match &cli.command {
            Command::List(args) => args.json,
            Command::Watch(args) => args.json,
            Command::Init { .. } => false,
        };
        let json = cli_json || toml.is_some_and(|t| t.output.json);

        let interface = match &cli.command {
            Command::List(args) => args.interface.clone(),
            _ => None,
        };

        Ok(Self {
            enumeration,
            filter,
            interface,
            slice,
            interrupt_backoff,
            json,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config path cannot be expanded
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = match cli.config_path()? {
            Some(path) => Some(TomlConfig::load(&path)?),
            None => None,
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Flags only enable: CLI or TOML `true` wins.
    fn resolve_enumeration(cli: &Cli, toml: Option<&TomlConfig>) -> EnumerationFilter {
        let section = toml.map(|t| &t.enumerate);
        let (ipv6, loopback, down) = match &cli.command {
            Command::List(args) => (args.ipv6, args.loopback, args.down),
            _ => (false, false, false),
        };

        EnumerationFilter::new(
            ipv6 || section.is_some_and(|s| s.include_ipv6),
            loopback || section.is_some_and(|s| s.include_loopback),
            down || section.is_some_and(|s| s.include_down),
        )
    }

    fn build_filter(cli: &Cli, toml: Option<&TomlConfig>) -> Result<FilterChain, ConfigError> {
        let names = match &cli.command {
            Command::List(args) => Some(&args.names),
            Command::Watch(args) => Some(&args.names),
            Command::Init { .. } => None,
        };
        let cli_includes = names.map_or(&[][..], |n| n.include_interfaces.as_slice());
        let cli_excludes = names.map_or(&[][..], |n| n.exclude_interfaces.as_slice());

        // CLI patterns replace TOML patterns, includes and excludes independently
        let includes = if cli_includes.is_empty() {
            toml.map_or(&[][..], |t| t.filter.include.as_slice())
        } else {
            cli_includes
        };
        let excludes = if cli_excludes.is_empty() {
            toml.map_or(&[][..], |t| t.filter.exclude.as_slice())
        } else {
            cli_excludes
        };

        let mut filter = FilterChain::new();
        for pattern in includes {
            filter = filter.include(compile(pattern)?);
        }
        for pattern in excludes {
            filter = filter.exclude(compile(pattern)?);
        }

        Ok(filter)
    }

    fn resolve_timing(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<(Duration, Duration), ConfigError> {
        let section = toml.map(|t| &t.monitor);
        let (cli_slice, cli_backoff) = match &cli.command {
            Command::Watch(args) => (args.slice_ms, args.backoff_ms),
            _ => (None, None),
        };

        // Priority: CLI explicit > TOML > default
        let slice_ms = cli_slice
            .or_else(|| section.and_then(|s| s.slice_ms))
            .unwrap_or(defaults::SLICE_MS);

        let backoff_ms = cli_backoff
            .or_else(|| section.and_then(|s| s.interrupt_backoff_ms))
            .unwrap_or(defaults::INTERRUPT_BACKOFF_MS);

        if slice_ms == 0 {
            return Err(ConfigError::InvalidDuration {
                field: field::SLICE_MS,
                reason: "must be greater than 0",
            });
        }

        Ok((
            Duration::from_millis(slice_ms),
            Duration::from_millis(backoff_ms),
        ))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn compile(pattern: &str) -> Result<NameRegexFilter, ConfigError> {
    NameRegexFilter::new(pattern).map_err(|e| ConfigError::invalid_regex(pattern, e))
}
