//! Hotkey module for global keyboard shortcuts
//!
//! Each configured action is registered as a system-wide hotkey. Presses
//! are queued as `TunerEvent`s for the tuner loop; nothing here touches
//! tuner state.

mod keys;
mod listener;

pub use listener::HotkeyListener;

use crate::events::TunerEvent;

/// Errors that stop the hotkey listener as a whole
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("global hotkeys unavailable: {0}")]
    Manager(#[source] global_hotkey::Error),

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// A single key could not be bound; the other bindings are unaffected
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("invalid key name {key:?}: {reason}")]
    Parse { key: String, reason: String },

    #[error("key {key:?} is already bound to {action}")]
    Duplicate { key: String, action: TunerEvent },

    #[error("failed to register key {key:?}: {reason}")]
    Register { key: String, reason: String },
}
