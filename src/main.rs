//! jax-startup
//!
//! Resolves the engine configuration, prints it or its load plan, or drives
//! a full startup against a host that reports each step through tracing.

use anyhow::Result;
use clap::Parser;
use jax_startup::cli::{Cli, Command, RunArgs};
use jax_startup::config::{ConfigLoader, ConfigPaths, ConfigTree, Defaults, merge};
use jax_startup::error::{Error, ErrorReport};
use jax_startup::format::{OutputFormat, format_config, format_plan};
use jax_startup::logging::{self, LogTarget};
use jax_startup::startup::{ReadySignal, StartupSequencer, TracingHost};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn load_override(cli: &Cli) -> std::result::Result<ConfigTree, Error> {
    let mut paths = ConfigPaths::discover();
    if let Some(ref path) = cli.config {
        paths = paths.with_explicit_file(path);
    }
    let loader = ConfigLoader::load_with_paths(paths)?;
    Ok(loader.override_tree()?)
}

fn sequencer(cli: &Cli, caller_override: ConfigTree) -> std::result::Result<StartupSequencer<TracingHost>, Error> {
    let defaults = Defaults::builtin()?;
    Ok(StartupSequencer::new(TracingHost, defaults, caller_override).with_environment(cli.environment()))
}

/// Run startup with every ready signal pre-raised, for inspection commands.
async fn dry_run(cli: &Cli) -> std::result::Result<StartupSequencer<TracingHost>, Error> {
    let caller_override = merge(
        &load_override(cli)?,
        &ConfigTree::new().with("skipStartupTypeset", true),
    )?;
    let sequencer = sequencer(cli, caller_override)?;
    sequencer.signal(ReadySignal::PageLoaded);
    sequencer.signal(ReadySignal::Configured);
    sequencer.start().await?;
    Ok(sequencer)
}

async fn run(cli: &Cli, args: &RunArgs) -> std::result::Result<String, Error> {
    let mut caller_override = load_override(cli)?;
    if args.no_typeset {
        caller_override = merge(&caller_override, &ConfigTree::new().with("skipStartupTypeset", true))?;
    }
    let sequencer = Arc::new(sequencer(cli, caller_override)?);

    match args.signal_after {
        Some(ms) => {
            let signaller = Arc::clone(&sequencer);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                debug!(after_ms = ms, "Raising ready signals");
                signaller.signal(ReadySignal::PageLoaded);
                signaller.signal(ReadySignal::Configured);
            });
        }
        None => {
            sequencer.signal(ReadySignal::PageLoaded);
            sequencer.signal(ReadySignal::Configured);
        }
    }

    let state = sequencer.start().await?;
    info!(state = %state, "Startup finished");
    Ok(format!("{}\n", state))
}

async fn execute(cli: &Cli) -> Result<String> {
    let command = cli.command.clone().unwrap_or(Command::Run(RunArgs::default()));
    match command {
        Command::Config => {
            let sequencer = dry_run(cli).await?;
            let config = sequencer.config().unwrap_or_default();
            format_config(&config, cli.format)
        }
        Command::Plan => {
            let sequencer = dry_run(cli).await?;
            let plan = sequencer.plan().unwrap_or_default();
            let root = sequencer
                .options()
                .map(|o| o.root.clone())
                .unwrap_or_default();
            format_plan(&plan, &root, cli.format)
        }
        Command::Run(args) => Ok(run(cli, &args).await?),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    match execute(&cli).await {
        Ok(output) => {
            print!("{}", output);
            Ok(())
        }
        Err(err) => {
            let known = err.downcast_ref::<Error>();
            if let (OutputFormat::Json, Some(known)) = (cli.format, known) {
                let report = ErrorReport::from(known);
                eprintln!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprintln!("error: {}", err);
            }
            std::process::exit(1);
        }
    }
}
