//! Ship pairing and the radio power switch

use std::num::NonZeroI32;

/// Pairing was requested while the probe read zero (player not in a ship)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("value is 0, enter ship first")]
pub struct PairingRejected;

/// Remembers which ship the radio belongs to
#[derive(Debug, Clone, Copy, Default)]
pub struct PairingController {
    paired_id: Option<NonZeroI32>,
}

impl PairingController {
    pub fn paired_id(&self) -> Option<i32> {
        self.paired_id.map(NonZeroI32::get)
    }

    pub fn is_paired(&self) -> bool {
        self.paired_id.is_some()
    }

    /// Pair with the ship identified by `probe_value`
    ///
    /// Zero never pairs and leaves any existing pairing intact. Pairing
    /// again while already paired replaces the old id.
    pub fn try_pair(&mut self, probe_value: i32) -> Result<i32, PairingRejected> {
        let id = NonZeroI32::new(probe_value).ok_or(PairingRejected)?;
        self.paired_id = Some(id);
        Ok(id.get())
    }

    /// True when a ship is paired and the probe currently reads its id
    pub fn is_in_paired_context(&self, probe_value: i32) -> bool {
        self.paired_id() == Some(probe_value)
    }
}

/// Radio on/off flag. Starts on.
#[derive(Debug, Clone, Copy)]
pub struct PowerSwitch {
    on: bool,
}

impl Default for PowerSwitch {
    fn default() -> Self {
        Self { on: true }
    }
}

impl PowerSwitch {
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Flip the switch and return the new position
    pub fn toggle(&mut self) -> bool {
        self.on = !self.on;
        self.on
    }
}
