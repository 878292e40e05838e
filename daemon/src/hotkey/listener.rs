//! Global hotkey listener
//!
//! Registers the configured keys with the OS and runs a dedicated thread
//! that turns key-down events into `TunerEvent`s on the tuner's queue.
//! Only the pressed edge is forwarded, so holding a key fires once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::parse_key;
use super::{BindError, HotkeyError};
use crate::events::TunerEvent;

/// How often the listener thread checks whether it should stop
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Global hotkey listener feeding the tuner's event queue
pub struct HotkeyListener {
    manager: GlobalHotKeyManager,
    bindings: HashMap<u32, TunerEvent>,
    event_tx: mpsc::Sender<TunerEvent>,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(event_tx: mpsc::Sender<TunerEvent>) -> Result<Self, HotkeyError> {
        let manager = GlobalHotKeyManager::new().map_err(HotkeyError::Manager)?;
        Ok(Self {
            manager,
            bindings: HashMap::new(),
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register `key_name` for `action`
    ///
    /// A failed binding leaves every other binding untouched.
    pub fn bind(&mut self, action: TunerEvent, key_name: &str) -> Result<(), BindError> {
        let hotkey = parse_key(key_name)?;
        if let Some(existing) = self.bindings.get(&hotkey.id()) {
            return Err(BindError::Duplicate {
                key: key_name.to_string(),
                action: *existing,
            });
        }

        self.manager
            .register(hotkey)
            .map_err(|e| BindError::Register {
                key: key_name.to_string(),
                reason: e.to_string(),
            })?;

        self.bindings.insert(hotkey.id(), action);
        Ok(())
    }

    /// Number of keys successfully bound
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Start the listener thread
    ///
    /// The thread runs until `stop()` is called or the event queue closes.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let bindings = self.bindings.clone();
        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");
                run_event_loop(&bindings, &event_tx, &running);
                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HotkeyError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop the listener thread
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Forward pressed hotkeys until stopped
fn run_event_loop(
    bindings: &HashMap<u32, TunerEvent>,
    event_tx: &mpsc::Sender<TunerEvent>,
    running: &AtomicBool,
) {
    let receiver = GlobalHotKeyEvent::receiver();

    while running.load(Ordering::SeqCst) {
        let Ok(event) = receiver.recv_timeout(POLL_INTERVAL) else {
            continue;
        };

        let Some(action) = translate(bindings, &event) else {
            continue;
        };

        debug!(%action, "hotkey pressed");
        if event_tx.blocking_send(action).is_err() {
            error!("tuner event queue closed, stopping hotkey listener");
            break;
        }
    }
}

/// Map a raw hotkey event to the bound action, ignoring releases
fn translate(bindings: &HashMap<u32, TunerEvent>, event: &GlobalHotKeyEvent) -> Option<TunerEvent> {
    if !matches!(event.state, HotKeyState::Pressed) {
        return None;
    }
    let action = bindings.get(&event.id).copied();
    if action.is_none() {
        warn!(id = event.id, "event for unknown hotkey");
    }
    action
}
