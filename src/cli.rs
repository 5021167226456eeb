//! CLI arguments and subcommands for memcached-gmond.
//!
//! This module defines the command-line interface of the standalone binary
//! using the clap library, and merges it over the configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use memcached_gmond::config::{load_config, ConfigFormat};
use memcached_gmond::{Config, Interval};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a config file value, `None` when unrecognised.
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    /// Most verbose level let through; `Off` silences everything.
    pub fn as_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "memcached-gmond",
    about = "Poll memcached statistics the way the gmond module does and print them",
    long_about = "Poll memcached statistics the way the gmond module does and print them.\n\n\
                  Runs the module's init / call_back cycle against a memcached server on a \
                  fixed interval and prints every metric through its descriptor format, \
                  including min/max/mean/median of item ages across slabs.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// memcached host
    #[arg(long)]
    pub host: Option<String>,

    /// memcached port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Metric descriptor file (JSON)
    #[arg(short = 'd', long)]
    pub defs: Option<PathBuf>,

    /// Polling interval in seconds
    #[arg(short = 'i', long)]
    pub interval_seconds: Option<f64>,

    /// Log level (overrides `log_level` from the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a fixed number of polling cycles and exit
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Also print refresh timing and cache details
        #[arg(long)]
        verbose: bool,
    },
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(host) = &args.host {
        config.host = Some(host.clone());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(defs) = &args.defs {
        config.defs = Some(defs.clone());
    }
    if let Some(seconds) = args.interval_seconds {
        config.interval = Interval::seconds(seconds);
    }

    Ok(config)
}
