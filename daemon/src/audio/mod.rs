//! Audio output module
//!
//! The tuner talks to its player through the `MediaSink` trait. Volume
//! changes go through one of two paths:
//! - `VolumeFader`: step-wise ramp, used for entering/leaving the ship and power
//! - `TransitionEffect`: static burst, used only when changing stations

mod fader;
mod mpv;
mod transition;

use async_trait::async_trait;

pub use fader::VolumeFader;
pub use mpv::MpvSink;
pub use transition::TransitionEffect;

/// Errors reported by a media sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to start media player: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("media player IPC failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("media player IPC message invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("media player rejected {command}: {reason}")]
    Rejected { command: String, reason: String },

    #[error("media player did not answer in time")]
    Timeout,

    #[error("media player closed the connection")]
    Closed,
}

/// A player the tuner can drive
#[async_trait]
pub trait MediaSink: Send {
    /// Load a stream URL or file without starting playback
    async fn load_media(&mut self, source: &str) -> Result<(), SinkError>;

    async fn play(&mut self) -> Result<(), SinkError>;

    async fn pause(&mut self) -> Result<(), SinkError>;

    async fn stop(&mut self) -> Result<(), SinkError>;

    /// Set the output volume (0-100)
    async fn set_volume(&mut self, volume: u8) -> Result<(), SinkError>;

    /// Whether the sink is currently producing sound
    async fn is_playing(&mut self) -> Result<bool, SinkError>;
}

/// Clamp any volume value into the 0-100 range
pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, 100) as u8
}
