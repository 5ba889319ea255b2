//! tray-status-agent: background tray agent for lock keys and a fan hotkey
//!
//! The agent runs from the notification area and provides:
//! - Global key observation via a low-level keyboard hook
//! - A learnable hotkey that toggles the simulated fan state
//! - Caps Lock / Num Lock polling with edge notifications
//! - A status glyph, context menu and status window
//!
//! Settings and launch-at-login live in the current user's registry hive.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![cfg_attr(not(windows), allow(dead_code))]

mod agent;
mod config;
mod events;
mod hotkey;
mod lifecycle;
#[cfg(windows)]
mod platform;
mod render;
mod settings;
mod state;
mod ui;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();
}

#[cfg(windows)]
#[tokio::main]
async fn main() -> Result<()> {
    use tokio::sync::{broadcast, mpsc};
    use tracing::{error, info, warn};

    use crate::agent::{Agent, AgentParts};
    use crate::config::Config;
    use crate::events::AppEvent;
    use crate::hotkey::KeyboardHook;
    use crate::lifecycle::ShutdownSignal;
    use crate::platform::{RegistrySettings, RunKeyAutostart, TrayUi, WindowsLockKeys};
    use crate::render::GlyphRenderer;
    use crate::settings::{AutostartRegistry, MigrationAction, SettingsStore};

    init_logging();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "tray-status-agent starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(?config, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Hook thread -> agent
    let (edge_tx, edge_rx) = mpsc::channel(config.edge_queue);
    // Tray menu -> agent
    let (command_tx, command_rx) = mpsc::channel(16);
    // Agent -> tray surface
    let (event_tx, _event_rx) = broadcast::channel::<AppEvent>(64);

    let settings = SettingsStore::load(Box::new(RegistrySettings::new(&config.settings_key)));

    let autostart = RunKeyAutostart;
    match autostart.migrate() {
        Ok(MigrationAction::Nothing) => {}
        Ok(action) => info!(?action, "autostart entry migrated"),
        Err(e) => warn!(error = %e, "autostart migration failed"),
    }

    let mut tray = TrayUi::spawn(command_tx.clone())?;

    // Forward agent events to the UI thread in emission order
    let poster = tray.poster();
    let mut ui_events = event_tx.subscribe();
    let bridge = tokio::spawn(async move {
        loop {
            match ui_events.recv().await {
                Ok(event) => poster.post(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "tray event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Install the keyboard hook (runs on dedicated thread)
    let mut hook = KeyboardHook::new(edge_tx);
    let hotkey_available = match hook.install() {
        Ok(()) => hook.is_installed(),
        Err(e) => {
            error!(error = %e, "failed to install keyboard hook");
            warn!("continuing without fan hotkey support");
            false
        }
    };

    let mut agent = Agent::new(AgentParts {
        settings,
        autostart: Box::new(autostart),
        locks: Box::new(WindowsLockKeys),
        renderer: GlyphRenderer::new(config.icon_size),
        events: event_tx.clone(),
        poll_interval: config.poll_interval,
        hotkey_available,
    });

    info!("agent initialized, entering main loop");

    tokio::select! {
        _ = agent.run(edge_rx, command_rx) => {
            info!("agent exited");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup: hook first so no edge arrives after the agent stops
    info!("shutting down...");

    hook.uninstall();
    bridge.abort();
    tray.shutdown();

    info!("tray-status-agent stopped");

    Ok(())
}

#[cfg(not(windows))]
fn main() -> Result<()> {
    init_logging();
    tracing::error!("tray-status-agent requires Windows");
    anyhow::bail!("unsupported platform: {}", std::env::consts::OS)
}
