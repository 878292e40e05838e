//! Key name parsing
//!
//! Key names come straight from the config file ("f8", "F7",
//! "ctrl+shift+f5") and are turned into registrable hotkeys here.

use global_hotkey::hotkey::HotKey;

use super::BindError;

/// Parse a configured key name into a hotkey
pub fn parse_key(name: &str) -> Result<HotKey, BindError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BindError::Parse {
            key: name.to_string(),
            reason: "empty key name".to_string(),
        });
    }

    trimmed.parse::<HotKey>().map_err(|e| BindError::Parse {
        key: name.to_string(),
        reason: e.to_string(),
    })
}
