use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cue::{CueAction, CueId, CueItem, CueKind, CueProperties, CueStatus};
use super::cue_list::CueList;
use super::timer::{TimerAction, TimerId, TimerQueue};
use crate::error::{CueError, EngineError};
use crate::launcher::ProcessLauncher;
use crate::media::engine::{EngineEvent, EngineState, MediaEngine, MediaKind, SessionId};
use crate::messages::{ControlEvent, Settings};
use crate::progress::progress::format_minutes_seconds;
use crate::slideshow::slideshow::SlideshowPlayer;
use crate::surface::renderer::ImageRenderer;
use crate::surface::surface::PlaybackSurface;

/// Volumes this close to a bound are treated as the bound.
const FADE_SNAP: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPhase {
    PreWait,
    PostWait,
}

/// How a cue's action came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    EndOfStream,
    Failed,
}

/// Who started a cue. Only an operator GO may skip the pre-wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Manual,
    Follow,
}

/// Time left on one pending pre-wait or post-wait.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub cue: CueId,
    pub phase: WaitPhase,
    pub remaining: Duration,
}

impl Countdown {
    /// Whole seconds left, rounded up so a countdown never shows 0 while still pending.
    pub fn remaining_seconds(&self) -> u64 {
        let seconds = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            seconds + 1
        } else {
            seconds
        }
    }
}

/// One row of the cue list as shown to the operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CueSummary {
    pub id: CueId,
    pub number: usize,
    pub live: bool,
    pub selected: bool,
    pub name: String,
    pub kind: CueKind,
    pub pre_wait: String,
    pub action: String,
    pub progress_percent: u8,
    pub post_wait: String,
    pub status: CueStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// Volume change per fade tick.
    pub fade_step: f32,
    pub fade_tick: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            fade_step: 0.05,
            fade_tick: Duration::from_millis(100),
        }
    }
}

impl From<&Settings> for SchedulerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            fade_step: settings.fade_step,
            fade_tick: Duration::from_millis(settings.fade_tick_ms),
        }
    }
}

/// Owns the cue list and decides when each cue starts, ends and hands off to the next.
///
/// All delayed work (pre-waits, post-waits, fades, slideshow ticks) runs on a virtual clock
/// that the caller advances with [`CueScheduler::poll_timers`]. Engine notifications are pulled
/// in with [`CueScheduler::poll_engine`]. Notifications for the control surface accumulate
/// until [`CueScheduler::take_events`].
pub struct CueScheduler<E, R, L> {
    cues: CueList,
    active: Option<CueId>,
    selected: Option<CueId>,
    engine: E,
    surface: PlaybackSurface<R>,
    slideshow: SlideshowPlayer,
    launcher: L,
    timers: TimerQueue,
    waits: HashMap<CueId, (WaitPhase, TimerId)>,
    fades: HashMap<CueId, TimerId>,
    /// The cue whose session holds audio/video output.
    output_owner: Option<CueId>,
    settings: SchedulerSettings,
    events: Vec<ControlEvent>,
    /// Set while `follow_on` is walking a chain.
    following: bool,
    pending_follow: Option<CueId>,
}

impl<E, R, L> CueScheduler<E, R, L>
where
    E: MediaEngine,
    R: ImageRenderer,
    L: ProcessLauncher,
{
    pub fn new(engine: E, renderer: R, launcher: L, settings: SchedulerSettings) -> Self {
        Self {
            cues: CueList::new(),
            active: None,
            selected: None,
            engine,
            surface: PlaybackSurface::new(renderer),
            slideshow: SlideshowPlayer::new(),
            launcher,
            timers: TimerQueue::new(),
            waits: HashMap::new(),
            fades: HashMap::new(),
            output_owner: None,
            settings,
            events: Vec::new(),
            following: false,
            pending_follow: None,
        }
    }

    pub fn cues(&self) -> &CueList {
        &self.cues
    }

    pub fn cue(&self, id: CueId) -> Option<&CueItem> {
        self.cues.get(id)
    }

    pub fn active_cue(&self) -> Option<CueId> {
        self.active
    }

    pub fn selected_cue(&self) -> Option<CueId> {
        self.selected
    }

    pub fn output_owner(&self) -> Option<CueId> {
        self.output_owner
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn surface(&self) -> &PlaybackSurface<R> {
        &self.surface
    }

    pub fn slideshow(&self) -> &SlideshowPlayer {
        &self.slideshow
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SchedulerSettings) {
        self.settings = settings;
    }

    /// Current reading of the virtual clock.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn next_timer_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ControlEvent) {
        self.events.push(event);
    }

    // Cue list editing

    pub fn add_cue(&mut self, properties: CueProperties) -> CueId {
        let id = self.cues.push(properties);
        if let Some(cue) = self.cues.get(id) {
            log::info!("Added {} cue {} '{}'", cue.kind(), id, cue.name);
        }

        if self.selected.is_none() && self.active.is_none() {
            self.set_selected(Some(id));
        }
        self.emit(ControlEvent::CueListChanged);
        id
    }

    pub fn set_media_duration(&mut self, id: CueId, duration: Option<Duration>) -> bool {
        match self.cues.get_mut(id) {
            Some(cue) => {
                cue.media_duration = duration;
                self.emit(ControlEvent::CueListChanged);
                true
            }
            None => false,
        }
    }

    /// Edit a cue in place. A running cue keeps running with its old media.
    pub fn update_cue(&mut self, id: CueId, properties: CueProperties) -> Result<(), CueError> {
        let cue = self.cues.get_mut(id).ok_or(CueError::UnknownCue(id))?;
        cue.apply(properties)?;
        log::info!("Updated cue {} '{}'", id, cue.name);
        self.emit(ControlEvent::CueListChanged);
        Ok(())
    }

    /// Tear down everything the cue has running, then drop it from the list.
    pub fn remove_cue(&mut self, id: CueId) -> Result<(), CueError> {
        let index = self.cues.position(id).ok_or(CueError::UnknownCue(id))?;

        self.cancel_pending(id);
        if self.slideshow.owner() == Some(id) {
            self.slideshow.stop(&mut self.surface, &mut self.timers);
        }
        self.release_session(id);
        self.surface.release(id);

        if let Some(cue) = self.cues.remove(id) {
            log::info!("Removed cue {} '{}'", id, cue.name);
        }

        if self.active == Some(id) {
            self.set_active(None);
        }
        if self.selected == Some(id) {
            let replacement = self.cues.id_at(index).or_else(|| self.cues.last());
            self.set_selected(replacement);
        }

        self.emit(ControlEvent::CueRemoved { cue: id });
        self.emit(ControlEvent::CueListChanged);
        Ok(())
    }

    /// Remove the selected cue, returning its id.
    pub fn delete_selected(&mut self) -> Result<Option<CueId>, CueError> {
        match self.selected {
            Some(id) => {
                self.remove_cue(id)?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    pub fn reorder(&mut self, order: &[CueId]) -> Result<(), CueError> {
        self.cues.reorder(order)?;
        log::info!("Reordered cue list");
        self.emit(ControlEvent::CueListChanged);
        Ok(())
    }

    pub fn move_cue(&mut self, id: CueId, index: usize) -> Result<(), CueError> {
        self.cues.move_to(id, index)?;
        log::info!("Moved cue {} to position {}", id, index + 1);
        self.emit(ControlEvent::CueListChanged);
        Ok(())
    }

    /// Swap in a whole new cue list, stopping everything that was running.
    pub fn replace_cues(&mut self, cues: Vec<CueProperties>) -> Vec<CueId> {
        self.teardown_all();
        self.cues.clear();
        self.set_active(None);

        let ids: Vec<CueId> = cues
            .into_iter()
            .map(|properties| self.cues.push(properties))
            .collect();
        self.set_selected(ids.first().copied());

        log::info!("Loaded {} cues", ids.len());
        self.emit(ControlEvent::CueListChanged);
        ids
    }

    pub fn definitions(&self) -> Vec<CueProperties> {
        self.cues.iter().map(CueItem::properties).collect()
    }

    pub fn summaries(&self) -> Vec<CueSummary> {
        self.cues
            .iter()
            .enumerate()
            .map(|(index, cue)| CueSummary {
                id: cue.id,
                number: index + 1,
                live: self.active == Some(cue.id),
                selected: self.selected == Some(cue.id),
                name: cue.name.clone(),
                kind: cue.kind(),
                pre_wait: format_minutes_seconds(cue.pre_wait_seconds),
                action: cue.action_text(),
                progress_percent: (cue.progress_fraction * 100.0).round() as u8,
                post_wait: format_minutes_seconds(cue.post_wait_seconds),
                status: cue.status,
            })
            .collect()
    }

    // Cursor

    pub fn select(&mut self, index: usize) -> Result<(), CueError> {
        let id = self.cues.id_at(index).ok_or(CueError::IndexOutOfRange {
            index,
            len: self.cues.len(),
        })?;
        self.set_selected(Some(id));
        Ok(())
    }

    pub fn select_next(&mut self) -> Option<CueId> {
        let next = match self.selected.and_then(|id| self.cues.position(id)) {
            Some(index) => self.cues.id_at(index + 1).or(self.selected),
            None => self.cues.first(),
        };
        self.set_selected(next);
        next
    }

    pub fn select_previous(&mut self) -> Option<CueId> {
        let previous = match self.selected.and_then(|id| self.cues.position(id)) {
            Some(index) => self.cues.id_at(index.saturating_sub(1)),
            None => self.cues.last(),
        };
        self.set_selected(previous);
        previous
    }

    fn set_selected(&mut self, cue: Option<CueId>) {
        if self.selected != cue {
            self.selected = cue;
            self.emit(ControlEvent::SelectionChanged { cue });
        }
    }

    /// Move the active cursor. Pending waits of the cue being replaced are cancelled.
    fn set_active(&mut self, cue: Option<CueId>) {
        if self.active == cue {
            return;
        }
        if let Some(previous) = self.active {
            self.cancel_waits(previous);
        }
        self.active = cue;
        match cue {
            Some(id) => log::info!("Active cue is now {}", id),
            None => log::info!("No active cue"),
        }
        self.emit(ControlEvent::ActiveCueChanged { cue });
    }

    /// GO: start the selected cue, or the one after the active cue, and move the selection on.
    pub fn advance(&mut self) {
        let target = match self.selected {
            Some(id) => Some(id),
            None => match self.active {
                Some(active) => self.cues.next_after(active),
                None => self.cues.first(),
            },
        };

        let Some(target) = target.filter(|id| self.cues.contains(*id)) else {
            log::info!("GO ignored: nothing left to play");
            return;
        };

        log::info!("GO: cue {}", target);
        let following = self.cues.next_after(target);
        self.set_selected(following);
        self.set_active(Some(target));
        self.launch(target, Trigger::Manual);
    }

    /// Make `id` the active cue and start it as if the operator pressed GO on it.
    pub fn start_cue(&mut self, id: CueId) -> Result<(), CueError> {
        if !self.cues.contains(id) {
            return Err(CueError::UnknownCue(id));
        }
        if self.selected == Some(id) {
            let following = self.cues.next_after(id);
            self.set_selected(following);
        }
        self.set_active(Some(id));
        self.launch(id, Trigger::Manual);
        Ok(())
    }

    // Cue lifecycle

    fn launch(&mut self, id: CueId, trigger: Trigger) {
        self.cancel_pending(id);

        let Some(cue) = self.cues.get_mut(id) else {
            return;
        };
        cue.generation += 1;
        cue.progress_fraction = 0.0;
        let generation = cue.generation;

        let pre_wait = if trigger == Trigger::Manual && cue.start_immediately {
            0
        } else {
            cue.pre_wait_seconds
        };

        if pre_wait == 0 {
            self.begin_action(id);
            return;
        }

        cue.status = CueStatus::PreWait;
        log::info!("Cue {} '{}' starts in {}s", id, cue.name, pre_wait);
        let timer = self.timers.schedule(
            seconds(pre_wait),
            TimerAction::PreWaitElapsed {
                cue: id,
                generation,
            },
        );
        self.waits.insert(id, (WaitPhase::PreWait, timer));
    }

    fn begin_action(&mut self, id: CueId) {
        let Some(cue) = self.cues.get_mut(id) else {
            return;
        };
        cue.status = CueStatus::Running;
        let action = cue.action.clone();
        let generation = cue.generation;
        let post_wait = cue.post_wait_seconds;
        log::info!("Starting {} cue {} '{}'", cue.kind(), id, cue.name);
        self.emit(ControlEvent::CueStarted { cue: id });

        match action {
            CueAction::Audio { path, .. } => {
                self.start_media(id, &path, MediaKind::Audio);
            }
            CueAction::Video { path, .. } => {
                self.clear_visual_for(id);
                if self.start_media(id, &path, MediaKind::Video) {
                    self.surface.attach_video(id);
                }
            }
            CueAction::Slideshow {
                images,
                interval_seconds,
            } => {
                self.clear_visual_for(id);
                if images.is_empty() {
                    log::warn!("Slideshow cue {} has no images", id);
                    self.emit(ControlEvent::Error {
                        message: format!("Slideshow cue {} has no images", id),
                    });
                    self.on_cue_finished(id, Completion::Failed);
                    return;
                }
                let shown = self.slideshow.start(
                    id,
                    images,
                    interval_seconds,
                    &mut self.surface,
                    &mut self.timers,
                );
                if let Some(index) = shown {
                    self.emit_slide(id, index);
                }
            }
            CueAction::Command { command } => {
                if let Err(e) = self.launcher.run(&command) {
                    log::error!("Command cue {} failed: {}", id, e);
                    self.emit(ControlEvent::Error {
                        message: format!("Command cue {} failed: {}", id, e),
                    });
                }

                if post_wait > 0 {
                    let timer = self.timers.schedule(
                        seconds(post_wait),
                        TimerAction::CommandSettled {
                            cue: id,
                            generation,
                        },
                    );
                    self.waits.insert(id, (WaitPhase::PostWait, timer));
                } else {
                    self.on_cue_finished(id, Completion::EndOfStream);
                }
            }
        }
    }

    /// Open a session for `id`, taking the output from whichever cue held it.
    fn start_media(&mut self, id: CueId, path: &Path, kind: MediaKind) -> bool {
        self.release_session(id);

        if let Some(owner) = self.output_owner.filter(|owner| *owner != id) {
            log::info!("Cue {} takes the output from cue {}", id, owner);
            self.release_session(owner);
            self.surface.release(owner);
            self.interrupt(owner);
        }

        match self.open_session(path, kind) {
            Ok(session) => {
                if let Some(cue) = self.cues.get_mut(id) {
                    cue.playback_handle = Some(session);
                }
                self.output_owner = Some(id);
                log::debug!("Cue {} playing {} on {}", id, path.display(), session);
                true
            }
            Err(e) => {
                log::error!("Cue {} failed to start: {}", id, e);
                self.emit(ControlEvent::Error {
                    message: format!("Cue {} failed to start: {}", id, e),
                });
                self.on_cue_finished(id, Completion::Failed);
                false
            }
        }
    }

    fn open_session(&mut self, path: &Path, kind: MediaKind) -> Result<SessionId, EngineError> {
        let session = self.engine.open(path, kind)?;
        self.engine.on_end_of_stream(session);

        let started = self
            .engine
            .set_volume(session, 1.0)
            .and_then(|()| self.engine.set_state(session, EngineState::Playing));
        if let Err(e) = started {
            self.engine.close(session);
            return Err(e);
        }
        Ok(session)
    }

    /// Stop and close the cue's session, if it has one.
    fn release_session(&mut self, id: CueId) {
        self.cancel_fade(id);
        if self.output_owner == Some(id) {
            self.output_owner = None;
        }

        let Some(session) = self
            .cues
            .get_mut(id)
            .and_then(|cue| cue.playback_handle.take())
        else {
            return;
        };

        if let Err(e) = self.engine.set_state(session, EngineState::Stopped) {
            log::debug!("Stopping {} for cue {}: {}", session, id, e);
        }
        self.engine.close(session);
        log::debug!("Released {} from cue {}", session, id);
    }

    /// Make room on the surface for visual cue `id`.
    fn clear_visual_for(&mut self, id: CueId) {
        if let Some(owner) = self.slideshow.owner().filter(|owner| *owner != id) {
            self.slideshow.stop(&mut self.surface, &mut self.timers);
            self.interrupt(owner);
        }

        if let Some(occupant) = self.surface.occupant().filter(|occupant| *occupant != id) {
            log::info!("Cue {} takes the surface from cue {}", id, occupant);
            self.release_session(occupant);
            self.surface.release(occupant);
            self.interrupt(occupant);
        }
    }

    /// Mark a cue that was cut off by another cue as stopped.
    fn interrupt(&mut self, id: CueId) {
        let Some(cue) = self.cues.get_mut(id) else {
            return;
        };
        if cue.status.is_playing() {
            cue.status = CueStatus::Stopped;
            log::info!("Cue {} '{}' was interrupted", id, cue.name);
            self.emit(ControlEvent::CueStopped { cue: id });
        }
    }

    /// The cue's action came to an end: loop, hold, or clean up, then follow on if allowed.
    pub fn on_cue_finished(&mut self, id: CueId, completion: Completion) {
        if self.active != Some(id) {
            self.retire(id, completion);
            return;
        }
        let Some(cue) = self.cues.get(id) else {
            return;
        };
        if !cue.status.is_playing() {
            log::debug!("Ignoring completion of cue {} in state {:?}", id, cue.status);
            return;
        }

        let kind = cue.kind();
        let auto_advance = cue.auto_advance;
        let post_wait = cue.post_wait_seconds;
        let generation = cue.generation;

        if completion == Completion::EndOfStream && cue.loop_forever() {
            log::info!("Looping cue {} '{}'", id, cue.name);
            self.emit(ControlEvent::CueRestarted { cue: id });
            self.begin_action(id);
            return;
        }

        self.wind_down(id, completion);

        if !auto_advance {
            log::info!("Holding after cue {}", id);
            return;
        }

        let Some(next) = self.cues.next_after(id) else {
            log::info!("End of program after cue {}", id);
            self.emit(ControlEvent::ProgramEnded { cue: id });
            return;
        };

        // Command cues spend their post-wait before finishing.
        if kind != CueKind::Command && post_wait > 0 {
            if let Some(cue) = self.cues.get_mut(id) {
                if cue.status == CueStatus::Finished {
                    cue.status = CueStatus::PostWait;
                }
            }
            log::info!("Cue {} follows cue {} in {}s", next, id, post_wait);
            let timer = self.timers.schedule(
                seconds(post_wait),
                TimerAction::PostWaitElapsed {
                    cue: id,
                    generation,
                },
            );
            self.waits.insert(id, (WaitPhase::PostWait, timer));
        } else {
            self.follow_on(id);
        }
    }

    /// A cue that is no longer active ran out on its own. Its session is released but nothing
    /// follows on and nothing loops.
    fn retire(&mut self, id: CueId, completion: Completion) {
        let current = self
            .cues
            .get(id)
            .is_some_and(|cue| cue.playback_handle.is_some() && cue.status.is_playing());
        if !current {
            log::debug!("Ignoring stale completion of cue {}", id);
            return;
        }
        log::info!("Cue {} ended after it was superseded", id);
        self.wind_down(id, completion);
    }

    /// Release what a finished cue holds, or freeze its last frame, and record how it ended.
    fn wind_down(&mut self, id: CueId, completion: Completion) {
        let hold = self.cues.get(id).is_some_and(CueItem::hold_last_frame);
        let held = completion == Completion::EndOfStream && hold && self.hold_frame(id);
        if !held {
            self.release_session(id);
            if self.slideshow.owner() == Some(id) {
                self.slideshow.stop(&mut self.surface, &mut self.timers);
            } else if !self.surface.release(id) && self.surface.occupant().is_none() {
                self.surface.show_fallback();
            }
        }

        let status = match completion {
            Completion::EndOfStream => CueStatus::Finished,
            Completion::Failed => CueStatus::Failed,
        };
        if let Some(cue) = self.cues.get_mut(id) {
            cue.status = status;
            if status == CueStatus::Finished {
                cue.progress_fraction = 1.0;
            }
            log::info!("Cue {} '{}' ended ({:?})", id, cue.name, status);
        }
        self.emit(ControlEvent::CueFinished { cue: id, status });
    }

    /// Pause the video of `id` on its last frame. Returns false if there is nothing to hold.
    fn hold_frame(&mut self, id: CueId) -> bool {
        let Some(session) = self.cues.get(id).and_then(|cue| cue.playback_handle) else {
            return false;
        };
        if self.surface.occupant() != Some(id) {
            return false;
        }
        if let Err(e) = self.engine.set_state(session, EngineState::Paused) {
            log::warn!("Cannot hold last frame of cue {}: {}", id, e);
            return false;
        }
        self.surface.freeze(id);
        log::info!("Holding last frame of cue {}", id);
        true
    }

    /// Auto-advance from `id` to the cue after it.
    ///
    /// A chain of cues that finish as soon as they start is walked in a loop here, never by
    /// recursion through `launch`.
    fn follow_on(&mut self, id: CueId) {
        self.pending_follow = Some(id);
        if self.following {
            return;
        }
        self.following = true;
        while let Some(id) = self.pending_follow.take() {
            self.follow_one(id);
        }
        self.following = false;
    }

    fn follow_one(&mut self, id: CueId) {
        if self.active != Some(id) {
            return;
        }
        if let Some(cue) = self.cues.get_mut(id) {
            if cue.status == CueStatus::PostWait {
                cue.status = CueStatus::Finished;
            }
        }

        let Some(next) = self.cues.next_after(id) else {
            log::info!("End of program after cue {}", id);
            self.emit(ControlEvent::ProgramEnded { cue: id });
            return;
        };

        log::info!("Auto-advancing from cue {} to cue {}", id, next);
        if self.selected == Some(next) {
            let following = self.cues.next_after(next);
            self.set_selected(following);
        }
        self.set_active(Some(next));
        self.launch(next, Trigger::Follow);
    }

    // Timers and engine notifications

    /// Run every delayed action due at or before `now`.
    pub fn poll_timers(&mut self, now: Duration) {
        while let Some((timer, action)) = self.timers.pop_due(now) {
            self.dispatch(timer, action);
        }
        self.timers.advance_to(now);
    }

    fn dispatch(&mut self, timer: TimerId, action: TimerAction) {
        match action {
            TimerAction::PreWaitElapsed { cue, generation } => {
                if self.claim_wait(cue, WaitPhase::PreWait, timer, generation) {
                    self.begin_action(cue);
                }
            }
            TimerAction::PostWaitElapsed { cue, generation } => {
                if self.claim_wait(cue, WaitPhase::PostWait, timer, generation) {
                    self.follow_on(cue);
                }
            }
            TimerAction::CommandSettled { cue, generation } => {
                if self.claim_wait(cue, WaitPhase::PostWait, timer, generation) {
                    self.on_cue_finished(cue, Completion::EndOfStream);
                }
            }
            TimerAction::FadeStep {
                cue,
                generation,
                direction,
            } => {
                let current = self.fades.get(&cue) == Some(&timer)
                    && self.cues.get(cue).map(|item| item.generation) == Some(generation);
                if current {
                    self.fades.remove(&cue);
                    self.step_fade(cue, direction);
                } else {
                    log::debug!("Ignoring stale fade step for cue {}", cue);
                }
            }
            TimerAction::SlideshowTick { generation } => {
                let owner = self.slideshow.owner();
                let shown = self
                    .slideshow
                    .on_tick(generation, &mut self.surface, &mut self.timers);
                if let (Some(owner), Some(index)) = (owner, shown) {
                    self.emit_slide(owner, index);
                }
            }
        }
    }

    /// Consume the wait entry for a firing timer, if the timer is still the current one.
    fn claim_wait(&mut self, cue: CueId, phase: WaitPhase, timer: TimerId, generation: u64) -> bool {
        let current_generation = self.cues.get(cue).map(|item| item.generation);
        if current_generation != Some(generation) || self.waits.get(&cue) != Some(&(phase, timer)) {
            log::debug!("Ignoring stale {:?} timer for cue {}", phase, cue);
            return false;
        }
        self.waits.remove(&cue);
        true
    }

    /// Pull notifications from the engine and reap finished commands.
    pub fn poll_engine(&mut self) {
        for event in self.engine.drain_events() {
            self.handle_engine_event(event);
        }
        self.launcher.reap();
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        let session = event.session();
        let Some(id) = self.cue_for_session(session) else {
            log::debug!("Ignoring event for released {}", session);
            return;
        };

        match event {
            EngineEvent::EndOfStream(_) => {
                log::info!("Cue {} reached end of stream", id);
                self.on_cue_finished(id, Completion::EndOfStream);
            }
            EngineEvent::Failed { message, .. } => {
                log::error!("Cue {} playback failed: {}", id, message);
                self.emit(ControlEvent::Error {
                    message: format!("Cue {} playback failed: {}", id, message),
                });
                self.on_cue_finished(id, Completion::Failed);
            }
        }
    }

    fn cue_for_session(&self, session: SessionId) -> Option<CueId> {
        self.cues
            .iter()
            .find(|cue| cue.playback_handle == Some(session))
            .map(|cue| cue.id)
    }

    // Global transport

    pub fn play(&mut self) -> bool {
        match self.active_session() {
            Some((id, _)) => self.resume_cue(id),
            None => false,
        }
    }

    pub fn pause(&mut self) -> bool {
        match self.active_session() {
            Some((id, _)) => self.pause_cue(id),
            None => false,
        }
    }

    /// Stop the active cue, including a pending pre-wait or post-wait.
    pub fn stop(&mut self) -> bool {
        match self.active {
            Some(id) => self.stop_cue(id),
            None => false,
        }
    }

    pub fn fade_up(&mut self) -> bool {
        match self.active {
            Some(id) => self.fade_cue(id, FadeDirection::Up),
            None => false,
        }
    }

    pub fn fade_down(&mut self) -> bool {
        match self.active {
            Some(id) => self.fade_cue(id, FadeDirection::Down),
            None => false,
        }
    }

    // Per-cue controls

    pub fn pause_cue(&mut self, id: CueId) -> bool {
        let Some(cue) = self.cues.get(id) else {
            return false;
        };
        let mut paused = false;

        if let Some(session) = cue.playback_handle {
            match self.engine.set_state(session, EngineState::Paused) {
                Ok(()) => paused = true,
                Err(e) => log::warn!("Cannot pause cue {}: {}", id, e),
            }
        }
        if self.slideshow.owner() == Some(id) {
            paused |= self.slideshow.pause();
        }

        if paused {
            if let Some(cue) = self.cues.get_mut(id) {
                if cue.status == CueStatus::Running {
                    cue.status = CueStatus::Paused;
                }
            }
            log::info!("Paused cue {}", id);
        }
        paused
    }

    pub fn resume_cue(&mut self, id: CueId) -> bool {
        let Some(cue) = self.cues.get(id) else {
            return false;
        };
        let mut resumed = false;

        if let Some(session) = cue.playback_handle {
            match self.engine.set_state(session, EngineState::Playing) {
                Ok(()) => resumed = true,
                Err(e) => log::warn!("Cannot resume cue {}: {}", id, e),
            }
        }
        if self.slideshow.owner() == Some(id) {
            resumed |= self.slideshow.resume();
        }

        if resumed {
            if let Some(cue) = self.cues.get_mut(id) {
                if cue.status == CueStatus::Paused {
                    cue.status = CueStatus::Running;
                }
            }
            log::info!("Resumed cue {}", id);
        }
        resumed
    }

    /// Stop everything the cue has going: waits, fades, media and slideshow.
    pub fn stop_cue(&mut self, id: CueId) -> bool {
        let Some(cue) = self.cues.get(id) else {
            return false;
        };
        let live = cue.playback_handle.is_some()
            || cue.status.is_playing()
            || self.waits.contains_key(&id)
            || self.slideshow.owner() == Some(id);
        if !live {
            return false;
        }

        self.cancel_pending(id);
        if let Some(cue) = self.cues.get_mut(id) {
            cue.generation += 1;
            cue.status = CueStatus::Stopped;
            cue.progress_fraction = 0.0;
        }
        self.release_session(id);
        if self.slideshow.owner() == Some(id) {
            self.slideshow.stop(&mut self.surface, &mut self.timers);
        } else {
            self.surface.release(id);
        }

        log::info!("Stopped cue {}", id);
        self.emit(ControlEvent::CueStopped { cue: id });
        true
    }

    /// Ramp the cue's volume one step per tick until it reaches 0 or 1.
    pub fn fade_cue(&mut self, id: CueId, direction: FadeDirection) -> bool {
        let Some(cue) = self.cues.get(id) else {
            return false;
        };
        if cue.playback_handle.is_none() {
            log::debug!("Cue {} has nothing to fade", id);
            return false;
        }
        let generation = cue.generation;

        self.cancel_fade(id);
        let timer = self.timers.schedule(
            self.settings.fade_tick,
            TimerAction::FadeStep {
                cue: id,
                generation,
                direction,
            },
        );
        self.fades.insert(id, timer);
        log::info!("Fading cue {} {:?}", id, direction);
        true
    }

    fn step_fade(&mut self, id: CueId, direction: FadeDirection) {
        let Some(cue) = self.cues.get(id) else {
            return;
        };
        let Some(session) = cue.playback_handle else {
            return;
        };
        let generation = cue.generation;

        let current = self.engine.volume(session).unwrap_or(1.0);
        let volume = step_volume(current, direction, self.settings.fade_step);
        if let Err(e) = self.engine.set_volume(session, volume) {
            log::warn!("Fade of cue {} aborted: {}", id, e);
            return;
        }
        self.emit(ControlEvent::VolumeChanged { cue: id, volume });

        let finished = match direction {
            FadeDirection::Up => volume >= 1.0,
            FadeDirection::Down => volume <= 0.0,
        };
        if finished {
            log::debug!("Fade of cue {} complete at {:.2}", id, volume);
            return;
        }

        let timer = self.timers.schedule(
            self.settings.fade_tick,
            TimerAction::FadeStep {
                cue: id,
                generation,
                direction,
            },
        );
        self.fades.insert(id, timer);
    }

    // Slideshow controls, applied to whichever cue owns the slideshow

    pub fn slideshow_next(&mut self) -> Option<usize> {
        let owner = self.slideshow.owner()?;
        let index = self.slideshow.next(&mut self.surface)?;
        self.emit_slide(owner, index);
        Some(index)
    }

    pub fn slideshow_prev(&mut self) -> Option<usize> {
        let owner = self.slideshow.owner()?;
        let index = self.slideshow.prev(&mut self.surface)?;
        self.emit_slide(owner, index);
        Some(index)
    }

    pub fn slideshow_pause(&mut self) -> bool {
        match self.slideshow.owner() {
            Some(owner) => self.pause_cue(owner),
            None => false,
        }
    }

    pub fn slideshow_resume(&mut self) -> bool {
        match self.slideshow.owner() {
            Some(owner) => self.resume_cue(owner),
            None => false,
        }
    }

    fn emit_slide(&mut self, cue: CueId, index: usize) {
        if let Some(path) = self.slideshow.current_image() {
            let path = path.to_path_buf();
            self.emit(ControlEvent::SlideChanged { cue, index, path });
        }
    }

    // Progress and status

    /// The active cue and its live session.
    pub fn active_session(&self) -> Option<(CueId, SessionId)> {
        let id = self.active?;
        let session = self.cues.get(id)?.playback_handle?;
        Some((id, session))
    }

    pub fn record_progress(&mut self, id: CueId, fraction: f32) {
        if let Some(cue) = self.cues.get_mut(id) {
            cue.progress_fraction = fraction.clamp(0.0, 1.0);
        }
    }

    /// Pending pre-waits and post-waits, in cue list order. Each phase is reported on its own.
    pub fn countdowns(&self) -> Vec<Countdown> {
        let mut countdowns: Vec<Countdown> = self
            .waits
            .iter()
            .filter_map(|(cue, (phase, timer))| {
                self.timers.remaining(*timer).map(|remaining| Countdown {
                    cue: *cue,
                    phase: *phase,
                    remaining,
                })
            })
            .collect();
        countdowns.sort_by_key(|countdown| self.cues.position(countdown.cue));
        countdowns
    }

    pub fn set_fallback_image(&mut self, path: Option<PathBuf>) {
        match &path {
            Some(path) => log::info!("Fallback image set to {}", path.display()),
            None => log::info!("Fallback image cleared"),
        }
        self.surface.set_fallback_image(path);
    }

    /// Stop all playback and cancel every pending action.
    pub fn shutdown(&mut self) {
        log::info!("Stopping all cues");
        self.teardown_all();
    }

    fn teardown_all(&mut self) {
        for (_, (_, timer)) in self.waits.drain() {
            self.timers.cancel(timer);
        }
        for (_, timer) in self.fades.drain() {
            self.timers.cancel(timer);
        }
        self.slideshow.stop(&mut self.surface, &mut self.timers);

        for id in self.cues.ids() {
            self.release_session(id);
        }
        if let Some(occupant) = self.surface.occupant() {
            self.surface.release(occupant);
        }

        for cue in self.cues.iter_mut() {
            cue.generation += 1;
            if matches!(
                cue.status,
                CueStatus::PreWait | CueStatus::Running | CueStatus::Paused | CueStatus::PostWait
            ) {
                cue.status = CueStatus::Stopped;
            }
        }
    }

    fn cancel_waits(&mut self, id: CueId) {
        if let Some((phase, timer)) = self.waits.remove(&id) {
            self.timers.cancel(timer);
            log::debug!("Cancelled {:?} of cue {}", phase, id);
            if let Some(cue) = self.cues.get_mut(id) {
                if cue.status == CueStatus::PreWait {
                    cue.status = CueStatus::Idle;
                } else if cue.status == CueStatus::PostWait {
                    cue.status = CueStatus::Finished;
                }
            }
        }
    }

    fn cancel_fade(&mut self, id: CueId) {
        if let Some(timer) = self.fades.remove(&id) {
            self.timers.cancel(timer);
        }
    }

    fn cancel_pending(&mut self, id: CueId) {
        self.cancel_waits(id);
        self.cancel_fade(id);
    }
}

fn seconds(value: u32) -> Duration {
    Duration::from_secs(u64::from(value))
}

/// One fade step, clamped to [0, 1] and snapped onto a bound once within reach of it.
pub(crate) fn step_volume(current: f32, direction: FadeDirection, step: f32) -> f32 {
    let raw = match direction {
        FadeDirection::Up => current + step,
        FadeDirection::Down => current - step,
    };
    let volume = raw.clamp(0.0, 1.0);
    if volume > 1.0 - FADE_SNAP {
        1.0
    } else if volume < FADE_SNAP {
        0.0
    } else {
        volume
    }
}
