//! Configuration loading and management
//!
//! The tuner reads one JSON file at startup and never writes it again,
//! except to create it with defaults when it does not exist yet.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::TunerEvent;

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "COCKPIT_RADIO_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.json";
const DEFAULT_POINTER_OFFSET: &str = "0x596F740";

/// Errors raised while reading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pointer offset {0:?}, expected a hex number")]
    InvalidOffset(String),
}

/// Daemon configuration, mirroring the layout of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub audio: AudioConfig,

    /// Hotkey name per action name. Actions missing from the map are not
    /// bound; names no action answers to are ignored.
    pub keys: BTreeMap<String, String>,

    pub stations: Vec<Station>,
}

/// Target process and media player settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Offset of the watched value from the process image base
    pub pointer_offset_hex: String,

    /// Executable name of the game process
    pub process_name: String,

    /// mpv executable used for playback
    pub player_path: String,

    /// Extra arguments handed to the player on startup
    pub player_args: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            pointer_offset_hex: DEFAULT_POINTER_OFFSET.to_string(),
            process_name: "NMS.exe".to_string(),
            player_path: "mpv".to_string(),
            player_args: vec![
                "--loop-file=inf".to_string(),
                // Narrow band plus a little gain: a small cockpit speaker
                "--af=lavfi=[highpass=f=250,lowpass=f=4000,volume=4dB]".to_string(),
            ],
        }
    }
}

/// Volume and fade settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Volume a station at 100% plays at (0-100)
    pub max_volume: i32,

    /// Seconds between two fade steps
    pub fade_speed: f64,

    /// Seconds the static transition plays for
    pub static_duration: f64,

    /// Volume of the static transition (0-100)
    pub static_volume: i32,

    /// Sound played between stations; a silent pause is used when missing
    pub static_sound_file: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_volume: 90,
            fade_speed: 0.05,
            static_duration: 0.8,
            static_volume: 100,
            static_sound_file: Some(PathBuf::from("static.mp3")),
        }
    }
}

/// A single radio station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub url: String,
    pub name: String,

    /// Share of `max_volume` this station plays at, in percent
    #[serde(rename = "volume", default = "full_volume")]
    pub volume_percent: i32,
}

fn full_volume() -> i32 {
    100
}

impl Default for Config {
    fn default() -> Self {
        let keys = [
            (TunerEvent::NextStation, "f8"),
            (TunerEvent::PrevStation, "f6"),
            (TunerEvent::PairShip, "f7"),
            (TunerEvent::TogglePower, "f5"),
        ]
        .into_iter()
        .map(|(action, key)| (action.config_name().to_string(), key.to_string()))
        .collect();

        Self {
            system: SystemConfig::default(),
            audio: AudioConfig::default(),
            keys,
            stations: Vec::new(),
        }
    }
}

impl Config {
    /// Location of the configuration file
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_or_create(&Self::path())
    }

    /// Load configuration from `path`, never failing
    ///
    /// A missing file is created with defaults. A file that cannot be read
    /// or parsed is left untouched and defaults are used in its place.
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!(?path, "created default config file"),
                Err(e) => warn!(?path, error = %e, "failed to write default config file"),
            }
            return config;
        }

        let mut config = match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(?path, error = %e, "error loading config, using defaults");
                return Self::default();
            }
        };

        for name in config.unknown_keys() {
            warn!(action = name, "unknown action in keys, ignored");
        }

        if let Err(e) = config.pointer_offset() {
            warn!(error = %e, fallback = DEFAULT_POINTER_OFFSET, "using default pointer offset");
            config.system.pointer_offset_hex = DEFAULT_POINTER_OFFSET.to_string();
        }

        config
    }

    /// Read and parse the file at `path`
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write this configuration to `path`, pretty-printed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parsed pointer offset, accepting an optional `0x` prefix
    pub fn pointer_offset(&self) -> Result<u64, ConfigError> {
        let raw = self.system.pointer_offset_hex.trim();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        u64::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidOffset(raw.to_string()))
    }

    /// Master volume as configured; only the scaled station volume is clamped
    pub fn max_volume(&self) -> i32 {
        self.audio.max_volume
    }

    pub fn static_volume(&self) -> u8 {
        self.audio.static_volume.clamp(0, 100) as u8
    }

    pub fn fade_step_delay(&self) -> Duration {
        seconds(self.audio.fade_speed, Duration::from_millis(50))
    }

    pub fn static_duration(&self) -> Duration {
        seconds(self.audio.static_duration, Duration::from_millis(800))
    }

    /// Key name bound to `action`, if any
    pub fn key_for(&self, action: TunerEvent) -> Option<&str> {
        self.keys.get(action.config_name()).map(String::as_str)
    }

    /// Entries of `keys` that do not name any action
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.keys
            .keys()
            .map(String::as_str)
            .filter(|name| !TunerEvent::ALL.iter().any(|a| a.config_name() == *name))
    }
}

fn seconds(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(fallback)
}
