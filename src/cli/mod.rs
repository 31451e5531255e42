//! CLI command definitions for jax-startup
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::environment::{Browser, EnvironmentIdentity};
use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};

/// Resolve math-typesetting engine configuration and drive its startup
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces project/user discovery)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Host browser identity used for per-browser preferences
    #[arg(short, long, default_value = "other", global = true)]
    pub browser: Browser,

    /// Whether the host renders MathML natively (default depends on browser)
    #[arg(long, global = true)]
    pub native_mathml: Option<bool>,

    /// Output format: json, yaml or markdown
    #[arg(short, long, default_value = "yaml", value_parser = parse_format, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Environment identity from the browser flags.
    pub fn environment(&self) -> EnvironmentIdentity {
        let mut env = EnvironmentIdentity::for_browser(self.browser);
        if let Some(native) = self.native_mathml {
            env.native_mathml = native;
        }
        env
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the resolved configuration
    Config,

    /// Print the module load plan
    Plan,

    /// Drive the full startup sequence (default if no subcommand given)
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Raise the deferral signal after this many milliseconds
    #[arg(long)]
    pub signal_after: Option<u64>,

    /// Skip the initial typeset pass regardless of configuration
    #[arg(long)]
    pub no_typeset: bool,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(value).ok_or_else(|| format!("unknown format: {}", value))
}
