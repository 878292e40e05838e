//! Tuner state and playback decision
//!
//! `TunerState` is owned by the tuner loop. Hotkey events are applied to
//! it at a single point per tick, and `decide` turns the state plus the
//! latest probe reading into exactly one `TunerCommand`.

use tracing::{debug, info, warn};

use crate::config::{Config, Station};
use crate::events::TunerEvent;

use super::catalog::StationCatalog;
use super::pairing::{PairingController, PowerSwitch};

/// What the tuner loop should do with the media sink this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunerCommand {
    /// Nothing to do
    NoOp,
    /// Ramp the volume from the current level to the given one
    FadeTo(u8),
    /// Play the static transition, load `station` and jump straight to `volume`
    HardSwitch { station: usize, volume: u8 },
}

impl std::fmt::Display for TunerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TunerCommand::NoOp => write!(f, "NoOp"),
            TunerCommand::FadeTo(volume) => write!(f, "FadeTo({})", volume),
            TunerCommand::HardSwitch { station, volume } => {
                write!(f, "HardSwitch(station={}, volume={})", station, volume)
            }
        }
    }
}

/// Mutable tuner state
#[derive(Debug, Clone)]
pub struct TunerState {
    catalog: StationCatalog,
    pairing: PairingController,
    power: PowerSwitch,
    /// Set by navigation, cleared once the hard switch to the new station completes
    station_changed: bool,
    current_volume: u8,
}

impl TunerState {
    /// Fresh state: first station selected, radio on, silent, unpaired
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            catalog: StationCatalog::new(stations),
            pairing: PairingController::default(),
            power: PowerSwitch::default(),
            station_changed: false,
            current_volume: 0,
        }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn station_index(&self) -> usize {
        self.catalog.index()
    }

    pub fn station_changed(&self) -> bool {
        self.station_changed
    }

    pub fn paired_id(&self) -> Option<i32> {
        self.pairing.paired_id()
    }

    pub fn is_radio_on(&self) -> bool {
        self.power.is_on()
    }

    pub fn current_volume(&self) -> u8 {
        self.current_volume
    }

    pub fn set_current_volume(&mut self, volume: i32) {
        self.current_volume = volume.clamp(0, 100) as u8;
    }

    /// Apply one hotkey event
    ///
    /// `probe_value` is this tick's reading, or `None` when the game is
    /// not connected; pairing needs a reading, the other events do not.
    pub fn apply(&mut self, event: TunerEvent, probe_value: Option<i32>) {
        debug!(%event, ?probe_value, "applying event");

        match event {
            TunerEvent::NextStation | TunerEvent::PrevStation => {
                if !self.pairing.is_paired() {
                    debug!(%event, "no ship paired yet, ignoring navigation");
                    return;
                }
                let moved = match event {
                    TunerEvent::NextStation => self.catalog.next(),
                    _ => self.catalog.prev(),
                };
                if moved {
                    self.station_changed = true;
                    debug!(index = self.catalog.index(), "station selected");
                }
            }
            TunerEvent::PairShip => match probe_value {
                Some(value) => match self.pairing.try_pair(value) {
                    Ok(id) => info!(id, "ship paired"),
                    Err(e) => warn!("{}", e),
                },
                None => warn!("game not connected, cannot pair"),
            },
            TunerEvent::TogglePower => {
                let on = self.power.toggle();
                info!("radio switched {}", if on { "ON" } else { "OFF" });
            }
        }
    }

    /// True when the probe reads the paired ship's id
    pub fn in_context(&self, probe_value: i32) -> bool {
        self.pairing.is_in_paired_context(probe_value)
    }

    /// True when the player sits in the paired ship with the radio on
    pub fn should_play(&self, probe_value: i32) -> bool {
        self.in_context(probe_value) && self.power.is_on()
    }

    /// Decide what to do with the sink for this tick. Pure: no I/O, no mutation.
    pub fn decide(&self, probe_value: i32, config: &Config) -> TunerCommand {
        let target = self.catalog.current_volume(config.max_volume());

        if self.should_play(probe_value) {
            if self.station_changed {
                TunerCommand::HardSwitch {
                    station: self.catalog.index(),
                    volume: target,
                }
            } else if self.current_volume != target {
                TunerCommand::FadeTo(target)
            } else {
                TunerCommand::NoOp
            }
        } else if self.current_volume != 0 {
            TunerCommand::FadeTo(0)
        } else {
            TunerCommand::NoOp
        }
    }

    /// Record that the hard switch to the selected station finished at `volume`
    pub fn complete_switch(&mut self, volume: u8) {
        self.station_changed = false;
        self.set_current_volume(i32::from(volume));
    }
}
