// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build front-end assets: Sass, CSS pruning and minification, JS bundles, images, icon fonts and sprites.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline to run (`default`, `stripcss`, `iconfont` in the built-in
    /// configuration).
    #[arg(value_name = "PIPELINE", default_value = "default")]
    pub pipeline: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetflow.toml` in the current directory if present,
    /// otherwise the built-in configuration.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load, validate and print the resolved plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the terminal watch step, if the pipeline has one.
    #[arg(long)]
    pub no_watch: bool,

    /// List pipelines, tasks and watch groups, then exit.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
