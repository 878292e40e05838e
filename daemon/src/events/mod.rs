//! Events module for tuner input
//!
//! Hotkey presses are never applied to tuner state directly. The listener
//! thread enqueues a `TunerEvent` and the tuner loop drains the queue once
//! per tick, so every mutation happens on the loop's own task.

use serde::{Deserialize, Serialize};

/// Actions a bound hotkey can request
///
/// The serialized names double as the keys of the `keys` section in the
/// configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunerEvent {
    /// Tune to the next station in the catalog
    NextStation,

    /// Tune to the previous station in the catalog
    PrevStation,

    /// Pair the ship the player currently occupies
    PairShip,

    /// Flip the radio power switch
    TogglePower,
}

impl TunerEvent {
    /// All actions, in the order they are listed in the startup banner
    pub const ALL: [TunerEvent; 4] = [
        TunerEvent::TogglePower,
        TunerEvent::NextStation,
        TunerEvent::PrevStation,
        TunerEvent::PairShip,
    ];

    /// Name used in the configuration file
    pub fn config_name(&self) -> &'static str {
        match self {
            TunerEvent::NextStation => "next_station",
            TunerEvent::PrevStation => "prev_station",
            TunerEvent::PairShip => "pair_ship",
            TunerEvent::TogglePower => "toggle_power",
        }
    }
}

impl std::fmt::Display for TunerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TunerEvent::NextStation => write!(f, "NEXT"),
            TunerEvent::PrevStation => write!(f, "PREV"),
            TunerEvent::PairShip => write!(f, "PAIR"),
            TunerEvent::TogglePower => write!(f, "POWER"),
        }
    }
}
