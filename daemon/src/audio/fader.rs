//! Step-wise volume ramp

use std::time::Duration;

use tracing::debug;

use super::{clamp_volume, MediaSink, SinkError};

/// Volume change per fade step
pub const FADE_STEP: u8 = 5;

/// Ramps the sink volume between two levels
///
/// A fade holds the caller until the last step has been applied, so two
/// fades can never interleave on the same sink.
#[derive(Debug, Clone, Copy)]
pub struct VolumeFader {
    step_delay: Duration,
}

impl VolumeFader {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }

    /// Fade from `start` to `end`, returning the volume the sink was left at
    ///
    /// Both ends are clamped to 0-100 first. Playback is started before the
    /// first step when fading up on a silent sink, and paused after the last
    /// step when fading down to zero.
    pub async fn fade_to<S>(&self, sink: &mut S, start: i32, end: i32) -> Result<u8, SinkError>
    where
        S: MediaSink + ?Sized,
    {
        let steps = fade_steps(start, end);
        let end = clamp_volume(end);
        if steps.is_empty() {
            return Ok(end);
        }

        debug!(start, end, steps = steps.len(), "fading");

        if end > 0 && !sink.is_playing().await? {
            sink.play().await?;
        }

        for volume in steps {
            sink.set_volume(volume).await?;
            tokio::time::sleep(self.step_delay).await;
        }

        if end == 0 {
            sink.pause().await?;
        }

        Ok(end)
    }
}

/// Volumes visited by a fade, starting level included
///
/// Moves in steps of `FADE_STEP`; the last step is shortened to land on
/// `end` exactly. Empty when both ends clamp to the same level.
pub fn fade_steps(start: i32, end: i32) -> Vec<u8> {
    let (start, end) = (clamp_volume(start), clamp_volume(end));
    if start == end {
        return Vec::new();
    }

    let mut steps = vec![start];
    let mut volume = start;
    while volume != end {
        volume = if end > volume {
            volume.saturating_add(FADE_STEP).min(end)
        } else {
            volume.saturating_sub(FADE_STEP).max(end)
        };
        steps.push(volume);
    }
    steps
}
