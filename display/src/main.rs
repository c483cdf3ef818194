//! Terminal display host for live stream overlays.
//!
//! Reads a `DisplayConfig` JSON file, connects to the event stream and
//! renders the configured overlay to stdout. Console commands control the
//! host while it runs.

mod commands;
mod overlays;
mod surface;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overlay_engine::create_host;
use overlay_ipc::{command_channel, event_channel, DisplayConfig, HostCommand, HostEvent};
use overlay_loader::OverlayRegistry;

use crate::commands::{parse_command, HELP};
use crate::surface::TerminalSurface;

/// Environment variable naming the config file when no argument is given.
const CONFIG_ENV: &str = "OVERLAY_DISPLAY_CONFIG";

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "overlay_display=debug,overlay_engine=debug,overlay_transport=debug,overlay_loader=debug,overlay_sdk=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn config_path() -> Result<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: overlay-display <config.json> (or set {CONFIG_ENV})"))
}

fn load_config(path: &Path) -> Result<DisplayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Log host events until the host shuts down.
fn report_events(event_rx: Receiver<HostEvent>) {
    for event in event_rx {
        match event {
            HostEvent::Ready => debug!("Display host ready"),
            HostEvent::ConnectionChanged { current, .. } => {
                info!(status = current.status.name(), "{}", current.message());
            }
            HostEvent::OverlayChanged(state) => info!(?state, "Overlay state changed"),
            HostEvent::Stats(stats) => debug!(?stats, "Connection stats"),
            HostEvent::Error {
                recoverable,
                message,
            } => error!(recoverable, "{}", message),
            HostEvent::State(state) => match serde_json::to_string_pretty(&state) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Failed to encode state: {}", e),
            },
            HostEvent::Shutdown => break,
        }
    }
}

/// Forward console lines to the host until `quit` or end of input.
fn read_commands(command_tx: &Sender<HostCommand>, config: &DisplayConfig) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim() == "help" {
            println!("{HELP}");
            continue;
        }

        match parse_command(&line, config) {
            Ok(Some(command)) => {
                let shutdown = matches!(command, HostCommand::Shutdown);
                command_tx
                    .send(command)
                    .context("Display host is no longer running")?;
                if shutdown {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => println!("{e:#}\n{HELP}"),
        }
    }

    command_tx
        .send(HostCommand::Shutdown)
        .context("Display host is no longer running")
}

fn main() -> Result<()> {
    init_logging();

    let path = config_path()?;
    let config = load_config(&path)?;
    info!(config = %path.display(), bundle = %config.bundle_url, "Overlay display starting");

    let registry = Arc::new(OverlayRegistry::new());
    overlays::register_builtin(&registry);
    debug!(modules = ?registry.urls(), "Built-in overlays registered");

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    let surface = Arc::new(TerminalSurface::new());
    let host = thread::Builder::new()
        .name("display-host".to_string())
        .spawn(move || {
            let mut host = create_host(command_rx, event_tx, registry, surface);
            host.run();
        })
        .context("Failed to spawn display host")?;

    let reporter = thread::Builder::new()
        .name("host-events".to_string())
        .spawn(move || report_events(event_rx))
        .context("Failed to spawn event reporter")?;

    command_tx
        .send(HostCommand::Start {
            config: config.clone(),
        })
        .context("Display host is no longer running")?;

    read_commands(&command_tx, &config)?;

    host.join()
        .map_err(|_| anyhow!("Display host thread panicked"))?;
    reporter
        .join()
        .map_err(|_| anyhow!("Event reporter thread panicked"))?;

    info!("Overlay display stopped");
    Ok(())
}
