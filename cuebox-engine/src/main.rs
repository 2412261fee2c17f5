//! Cuebox show runner - Main entry point
//!
//! Loads a show file into an in-memory cue store, runs the playback engine
//! over the simulated audio backend, reads line commands from stdin and
//! prints every engine event as one JSON line on stdout.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use cuebox_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use cuebox_common::events::EventBus;
use cuebox_engine::shell::ShellCommand;
use cuebox_engine::{EngineService, InMemoryCueStore, SimulatedAudioBackend, TomlConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for cuebox
#[derive(Parser, Debug)]
#[command(name = "cuebox")]
#[command(about = "Cue playback engine with a line command shell")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Show file with [[cues]] definitions (overrides the config file)
    #[arg(short, long)]
    show: Option<PathBuf>,

    /// Log level filter (overrides the config file; RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,

    /// Simulated media length for items without a known duration (seconds)
    #[arg(long, default_value = "30")]
    sim_duration: f64,

    /// Reject cues whose files do not exist on disk
    #[arg(long)]
    check_files: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = TomlConfig::load(config_path.as_deref());

    init_tracing(args.log_level.as_deref().unwrap_or(&config.logging.level), &config)?;

    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let cues = match args.show.as_ref().or(config.show_file.as_ref()) {
        Some(path) => InMemoryCueStore::load_show_file(path)
            .with_context(|| format!("Failed to load show file {}", path.display()))?,
        None => {
            warn!("No show file given; the cue store is empty");
            InMemoryCueStore::new()
        }
    };
    info!("Cue store holds {} cues", cues.len());

    let bus = Arc::new(EventBus::new(256));
    let mut events = bus.subscribe();
    let (engine, engine_task) = EngineService::new(
        config.playback.clone(),
        Arc::new(SimulatedAudioBackend::new(args.sim_duration).with_file_checks(args.check_files)),
        Arc::new(cues),
        bus.clone(),
    )
    .spawn();

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event printer lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!("Ready; type commands (quit to exit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let command = match line.parse::<ShellCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        let quitting = command == ShellCommand::Quit;
        match command.execute(&engine).await {
            Ok(Some(output)) => println!("{}", output),
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
        if quitting {
            break;
        }
    }

    if engine.is_running() {
        engine.shutdown().await.context("Engine shutdown failed")?;
    }
    engine_task.await.context("Engine task panicked")?;
    drop(bus);
    printer.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Install the tracing subscriber (stderr, or the configured log file)
fn init_tracing(level: &str, config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("cuebox_engine={level},cuebox_common={level}")))
        .unwrap_or_else(|_| EnvFilter::new("cuebox_engine=info,cuebox_common=info"));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}
