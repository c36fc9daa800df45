use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cue::cue::CueId;
use crate::cue::timer::{TimerAction, TimerId, TimerQueue};
use crate::surface::renderer::ImageRenderer;
use crate::surface::surface::PlaybackSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Forward,
    Backward,
}

/// Cycles a slideshow cue's images on the playback surface.
///
/// The player owns no timer of its own; it arms `SlideshowTick` actions on the scheduler's
/// [`TimerQueue`] and is handed the tick back through [`SlideshowPlayer::on_tick`]. Every
/// `start` and `stop` bumps the generation so ticks from an earlier run are ignored.
#[derive(Debug, Default)]
pub struct SlideshowPlayer {
    owner: Option<CueId>,
    images: Vec<PathBuf>,
    index: usize,
    playing: bool,
    interval: Duration,
    timer: Option<TimerId>,
    generation: u64,
}

impl SlideshowPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cue currently driving the slideshow.
    pub fn owner(&self) -> Option<CueId> {
        self.owner
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True when slides advance on their own.
    pub fn is_timed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.owner?;
        self.images.get(self.index).map(PathBuf::as_path)
    }

    /// Start showing `images` for `owner` from the first image. With an interval of 0 the
    /// slides only move on `next`/`prev`. Returns the index shown, if any image was readable.
    pub fn start<R: ImageRenderer>(
        &mut self,
        owner: CueId,
        images: Vec<PathBuf>,
        interval_seconds: u32,
        surface: &mut PlaybackSurface<R>,
        timers: &mut TimerQueue,
    ) -> Option<usize> {
        self.cancel_timer(timers);
        self.generation += 1;
        self.owner = Some(owner);
        self.images = images;
        self.index = 0;
        self.playing = true;
        self.interval = Duration::from_secs(u64::from(interval_seconds));

        log::info!(
            "Starting slideshow for cue {} with {} images",
            owner,
            self.images.len()
        );

        let shown = self.display_from(0, Step::Forward, surface);
        if shown.is_none() {
            log::warn!("Slideshow for cue {} has no readable images", owner);
        }

        if !self.interval.is_zero() {
            self.arm(timers);
        }
        shown
    }

    pub fn next<R: ImageRenderer>(&mut self, surface: &mut PlaybackSurface<R>) -> Option<usize> {
        self.step(Step::Forward, surface)
    }

    pub fn prev<R: ImageRenderer>(&mut self, surface: &mut PlaybackSurface<R>) -> Option<usize> {
        self.step(Step::Backward, surface)
    }

    /// Stop timed advance. Manual `next`/`prev` still work.
    pub fn pause(&mut self) -> bool {
        if self.owner.is_none() || !self.playing {
            return false;
        }
        self.playing = false;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.owner.is_none() || self.playing {
            return false;
        }
        self.playing = true;
        true
    }

    /// Cancel the timer and take the slideshow off the surface.
    pub fn stop<R: ImageRenderer>(
        &mut self,
        surface: &mut PlaybackSurface<R>,
        timers: &mut TimerQueue,
    ) -> Option<CueId> {
        self.cancel_timer(timers);
        self.generation += 1;
        self.playing = false;

        let owner = self.owner.take()?;
        self.images.clear();
        self.index = 0;
        surface.release(owner);
        log::info!("Stopped slideshow for cue {}", owner);
        Some(owner)
    }

    /// Handle a `SlideshowTick`. Re-arms the timer and advances unless paused.
    pub fn on_tick<R: ImageRenderer>(
        &mut self,
        generation: u64,
        surface: &mut PlaybackSurface<R>,
        timers: &mut TimerQueue,
    ) -> Option<usize> {
        if generation != self.generation || self.owner.is_none() {
            log::debug!("Ignoring stale slideshow tick");
            return None;
        }

        self.timer = None;
        self.arm(timers);

        if self.playing {
            self.step(Step::Forward, surface)
        } else {
            None
        }
    }

    fn arm(&mut self, timers: &mut TimerQueue) {
        let id = timers.schedule(
            self.interval,
            TimerAction::SlideshowTick {
                generation: self.generation,
            },
        );
        self.timer = Some(id);
    }

    fn cancel_timer(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
    }

    fn step<R: ImageRenderer>(
        &mut self,
        step: Step,
        surface: &mut PlaybackSurface<R>,
    ) -> Option<usize> {
        let len = self.images.len();
        if self.owner.is_none() || len == 0 {
            return None;
        }
        let start = match step {
            Step::Forward => (self.index + 1) % len,
            Step::Backward => (self.index + len - 1) % len,
        };
        self.display_from(start, step, surface)
    }

    /// Show the image at `start`, skipping unreadable images in the direction of travel.
    fn display_from<R: ImageRenderer>(
        &mut self,
        start: usize,
        step: Step,
        surface: &mut PlaybackSurface<R>,
    ) -> Option<usize> {
        let owner = self.owner?;
        let len = self.images.len();
        let mut index = start;

        for _ in 0..len {
            match surface.show_slide(owner, &self.images[index]) {
                Ok(()) => {
                    self.index = index;
                    return Some(index);
                }
                Err(e) => log::warn!("Skipping slide {}: {}", index, e),
            }
            index = match step {
                Step::Forward => (index + 1) % len,
                Step::Backward => (index + len - 1) % len,
            };
        }
        None
    }
}
