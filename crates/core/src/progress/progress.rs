use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cue::cue::CueId;
use crate::cue::scheduler::CueScheduler;
use crate::launcher::ProcessLauncher;
use crate::media::engine::MediaEngine;
use crate::surface::renderer::ImageRenderer;

pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// One progress sample for the active cue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub cue: CueId,
    pub percent: u8,
    pub fraction: f32,
    pub position: Duration,
    pub duration: Duration,
    /// Time left, formatted `HH:MM:SS`.
    pub remaining: String,
}

/// Samples the active cue's playback position on a fixed cadence.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    interval: Duration,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Take one sample. Returns `None` without an active cue, without a live session, or
    /// while the stream length is zero or unknown.
    pub fn poll<E, R, L>(&self, scheduler: &mut CueScheduler<E, R, L>) -> Option<ProgressUpdate>
    where
        E: MediaEngine,
        R: ImageRenderer,
        L: ProcessLauncher,
    {
        let (cue, session) = scheduler.active_session()?;
        let sample = scheduler.engine().query_position(session)?;
        let duration = sample
            .duration
            .or_else(|| scheduler.cue(cue).and_then(|item| item.media_duration))
            .filter(|duration| !duration.is_zero())?;

        let position = sample.position.min(duration);
        let fraction = (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32;
        scheduler.record_progress(cue, fraction);

        Some(ProgressUpdate {
            cue,
            percent: (fraction * 100.0).round() as u8,
            fraction,
            position,
            duration,
            remaining: format_hms(duration - position),
        })
    }
}

/// Format as `HH:MM:SS`, truncating sub-second precision.
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format a wait time as `M:SS`.
pub fn format_minutes_seconds(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
