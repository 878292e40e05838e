//! cockpit-radio: background radio for the ship you are sitting in
//!
//! This daemon runs next to the game and provides:
//! - A memory probe that watches which ship the player occupies
//! - Ship pairing, station navigation and a power switch on global hotkeys
//! - Fades in when you board the paired ship, fades out when you leave
//! - A burst of static when changing stations
//!
//! Hotkey presses are queued and applied by the tuner loop between ticks;
//! the loop is the only owner of tuner state and of the media player.

mod audio;
mod config;
mod events;
mod hotkey;
mod lifecycle;
mod probe;
mod state;
mod tuner;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::MpvSink;
use crate::config::Config;
use crate::events::TunerEvent;
use crate::hotkey::HotkeyListener;
use crate::lifecycle::ShutdownSignal;
use crate::probe::{ProcReader, ProcessProbe};
use crate::tuner::Tuner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "cockpit-radio starting"
    );

    // Load configuration
    let config = Config::load();
    let pointer_offset = config.pointer_offset()?;
    info!(
        process = %config.system.process_name,
        stations = config.stations.len(),
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Hotkey listener -> tuner loop
    let (hotkey_tx, hotkey_rx) = mpsc::channel(32);

    // Bind hotkeys and start the listener (runs on dedicated thread)
    let hotkey_listener = match HotkeyListener::new(hotkey_tx) {
        Ok(mut listener) => {
            bind_keys(&mut listener, &config);
            match listener.start() {
                Ok(()) => info!(bound = listener.bound_count(), "hotkey listener started"),
                Err(e) => error!(?e, "failed to start hotkey listener"),
            }
            Some(listener)
        }
        Err(e) => {
            error!(error = %e, "failed to create hotkey listener");
            warn!("continuing without hotkey support");
            None
        }
    };

    // Start the media player
    let sink = MpvSink::spawn(&config.system.player_path, &config.system.player_args)
        .await
        .context("failed to start media player")?;

    let probe = ProcessProbe::new(
        ProcReader::new(),
        config.system.process_name.clone(),
        pointer_offset,
    );
    let mut tuner = Tuner::new(config, probe, sink);
    tuner.prepare().await?;

    info!("daemon initialized, entering main loop");

    let result = tuner.run(hotkey_rx, shutdown.wait()).await;

    // Cleanup
    info!("shutting down...");

    if let Some(listener) = hotkey_listener.as_ref().filter(|l| l.is_running()) {
        listener.stop();
    }
    tuner.into_sink().shutdown().await;

    if let Err(e) = result {
        error!(error = %e, "critical error");
        return Err(e.into());
    }

    info!("cockpit-radio stopped");

    Ok(())
}

/// Register every configured key, skipping the ones that fail
fn bind_keys(listener: &mut HotkeyListener, config: &Config) {
    for action in TunerEvent::ALL {
        let Some(key) = config.key_for(action) else {
            info!(action = action.config_name(), "no key configured");
            continue;
        };

        match listener.bind(action, key) {
            Ok(()) => info!(%action, key, "hotkey bound"),
            Err(e) => warn!(%action, error = %e, "key binding error, binding disabled"),
        }
    }
}
