//! Configuration layer for netut.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! For interface name patterns (`--include-interface`, `--exclude-interface`), CLI
//! patterns **replace** TOML patterns entirely (not merged). Include and exclude
//! patterns are handled independently.
//!
//! # Boolean Flag Semantics
//!
//! Boolean flags (`--ipv6`, `--loopback`, `--down`, `--json`) use OR semantics:
//! - If set `true` in either CLI or TOML, the result is `true`.
//! - Once set `true` in TOML, CLI cannot override to `false` (flags only enable, not disable).

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;


pub use cli::{Cli, Command, ListArgs, NameFilterArgs, WatchArgs};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
