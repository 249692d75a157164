//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use super::ConfigError;
use super::defaults;

/// netut: network interface and address observer
///
/// Lists the IP addresses of the host's interfaces and watches them for
/// changes.
#[derive(Debug, Parser)]
#[command(name = "netut")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (`~` expands to the home directory)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for netut
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a snapshot of the host's addresses
    List(ListArgs),

    /// Print address change events until Ctrl+C
    Watch(WatchArgs),

    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = defaults::CONFIG_FILE)]
        output: PathBuf,
    },
}

/// Interface name patterns shared by `list` and `watch`.
#[derive(Debug, Default, Args)]
pub struct NameFilterArgs {
    /// Regex pattern for interfaces to include (can be specified multiple times)
    #[arg(long = "include-interface", value_name = "PATTERN")]
    pub include_interfaces: Vec<String>,

    /// Regex pattern for interfaces to exclude (can be specified multiple times)
    #[arg(long = "exclude-interface", value_name = "PATTERN")]
    pub exclude_interfaces: Vec<String>,
}

/// Options of the `list` subcommand.
#[derive(Debug, Default, Args)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct ListArgs {
    /// Include IPv6 addresses
    #[arg(long)]
    pub ipv6: bool,

    /// Include loopback interfaces
    #[arg(long)]
    pub loopback: bool,

    /// Include interfaces that are down
    #[arg(long)]
    pub down: bool,

    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Print only the first address of this interface
    #[arg(long, value_name = "NAME")]
    pub interface: Option<String>,

    #[command(flatten)]
    pub names: NameFilterArgs,
}

/// Options of the `watch` subcommand.
#[derive(Debug, Default, Args)]
pub struct WatchArgs {
    /// Longest single wait in milliseconds
    #[arg(long = "slice-ms", value_name = "MS")]
    pub slice_ms: Option<u64>,

    /// Sleep after an interrupted wait in milliseconds
    #[arg(long = "backoff-ms", value_name = "MS")]
    pub backoff_ms: Option<u64>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub names: NameFilterArgs,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Command::Init { .. })
    }

    /// Returns the config file path with a leading `~` expanded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDir`] if the path starts with `~` and
    /// the home directory cannot be determined.
    pub fn config_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        self.config
            .as_deref()
            .map(|path| expand_tilde(path, dirs::home_dir()))
            .transpose()
    }
}

/// Replaces a leading `~` component with `home`.
pub(crate) fn expand_tilde(path: &Path, home: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = home.ok_or_else(|| ConfigError::NoHomeDir {
        path: path.to_path_buf(),
    })?;
    if rest.as_os_str().is_empty() {
        return Ok(home);
    }
    Ok(home.join(rest))
}
