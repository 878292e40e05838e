//! Static burst played between stations

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use super::{MediaSink, SinkError};

/// Pause used instead of the static sound when the file is missing
pub const FALLBACK_PAUSE: Duration = Duration::from_millis(200);

/// Plays a short burst of static before a new station is loaded
#[derive(Debug, Clone)]
pub struct TransitionEffect {
    sound_file: Option<PathBuf>,
    volume: u8,
    duration: Duration,
}

impl TransitionEffect {
    pub fn new(sound_file: Option<PathBuf>, volume: u8, duration: Duration) -> Self {
        Self {
            sound_file,
            volume,
            duration,
        }
    }

    /// Stop whatever is playing and run the transition to completion
    ///
    /// The caller loads the next station afterwards and sets its volume
    /// directly, without a fade.
    pub async fn play<S>(&self, sink: &mut S) -> Result<(), SinkError>
    where
        S: MediaSink + ?Sized,
    {
        sink.stop().await?;

        let sound = match &self.sound_file {
            Some(path) => tokio::fs::try_exists(path)
                .await
                .unwrap_or(false)
                .then_some(path),
            None => None,
        };

        match sound {
            Some(path) => {
                info!("(tuning...)");
                sink.load_media(&path.to_string_lossy()).await?;
                sink.play().await?;
                sink.set_volume(self.volume).await?;
                tokio::time::sleep(self.duration).await;
            }
            None => {
                debug!("no static sound available, pausing instead");
                tokio::time::sleep(FALLBACK_PAUSE).await;
            }
        }

        Ok(())
    }
}
