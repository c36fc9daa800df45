use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::cue::cue::CueId;
use crate::cue::scheduler::{CueScheduler, SchedulerSettings};
use crate::launcher::ProcessLauncher;
use crate::media::engine::MediaEngine;
use crate::media::probe::probe_duration_or_log;
use crate::messages::{ControlCommand, ControlEvent, Settings};
use crate::progress::progress::ProgressReporter;
use crate::show::show_manager::ShowManager;
use crate::surface::renderer::ImageRenderer;

const MIN_TICK: Duration = Duration::from_millis(1);

/// The cue player's control loop: applies operator commands to the scheduler, drives its
/// clock, and publishes what happened to the control surface.
pub struct CueConsole<E, R, L> {
    scheduler: CueScheduler<E, R, L>,
    reporter: ProgressReporter,
    show_manager: ShowManager,
    settings: Settings,
    engine_poll_interval: Duration,
    started: Instant,
    outbox: Vec<ControlEvent>,
}

impl<E, R, L> CueConsole<E, R, L>
where
    E: MediaEngine,
    R: ImageRenderer,
    L: ProcessLauncher,
{
    pub fn new(
        mut scheduler: CueScheduler<E, R, L>,
        settings: Settings,
        show_manager: ShowManager,
    ) -> Self {
        scheduler.set_settings(SchedulerSettings::from(&settings));
        scheduler.set_fallback_image(settings.fallback_image.clone());

        Self {
            scheduler,
            reporter: ProgressReporter::new(Duration::from_millis(settings.progress_interval_ms)),
            show_manager,
            engine_poll_interval: Duration::from_millis(settings.engine_poll_interval_ms),
            settings,
            started: Instant::now(),
            outbox: Vec::new(),
        }
    }

    pub fn scheduler(&self) -> &CueScheduler<E, R, L> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut CueScheduler<E, R, L> {
        &mut self.scheduler
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn show_manager(&self) -> &ShowManager {
        &self.show_manager
    }

    /// Bring the scheduler's clock up to wall time, firing anything due.
    fn sync_clock(&mut self) {
        self.scheduler.poll_timers(self.started.elapsed());
    }

    pub fn process_command(&mut self, command: ControlCommand) -> Result<(), anyhow::Error> {
        use ControlCommand::*;

        log::debug!("Processing command: {:?}", command);
        self.sync_clock();

        match command {
            // Cue list editing
            AddCue { properties } => {
                let cue = self.scheduler.add_cue(properties);
                self.probe_media_duration(cue);
                self.autosave()?;
            }
            UpdateCue { cue, properties } => {
                self.scheduler.update_cue(cue, properties)?;
                self.probe_media_duration(cue);
                self.autosave()?;
            }
            RemoveCue { cue } => {
                self.scheduler.remove_cue(cue)?;
                self.autosave()?;
            }
            RemoveSelected => {
                if self.scheduler.delete_selected()?.is_some() {
                    self.autosave()?;
                }
            }
            Reorder { order } => {
                self.scheduler.reorder(&order)?;
                self.autosave()?;
            }
            MoveCue { cue, index } => {
                self.scheduler.move_cue(cue, index)?;
                self.autosave()?;
            }

            // Cursor
            Advance => self.scheduler.advance(),
            StartCue { cue } => self.scheduler.start_cue(cue)?,
            Select { index } => self.scheduler.select(index)?,
            SelectNext => {
                self.scheduler.select_next();
            }
            SelectPrevious => {
                self.scheduler.select_previous();
            }

            // Global transport
            Play => log_ignored("Play", self.scheduler.play()),
            Pause => log_ignored("Pause", self.scheduler.pause()),
            Stop => log_ignored("Stop", self.scheduler.stop()),
            FadeUp => log_ignored("Fade up", self.scheduler.fade_up()),
            FadeDown => log_ignored("Fade down", self.scheduler.fade_down()),

            // Per-cue controls
            PauseCue { cue } => log_ignored("Pause", self.scheduler.pause_cue(cue)),
            ResumeCue { cue } => log_ignored("Resume", self.scheduler.resume_cue(cue)),
            StopCue { cue } => log_ignored("Stop", self.scheduler.stop_cue(cue)),
            FadeCue { cue, direction } => {
                log_ignored("Fade", self.scheduler.fade_cue(cue, direction))
            }

            // Slideshow controls
            SlideshowNext => log_ignored("Next slide", self.scheduler.slideshow_next().is_some()),
            SlideshowPrevious => log_ignored(
                "Previous slide",
                self.scheduler.slideshow_prev().is_some(),
            ),
            SlideshowPause => log_ignored("Slideshow pause", self.scheduler.slideshow_pause()),
            SlideshowResume => log_ignored("Slideshow resume", self.scheduler.slideshow_resume()),

            SetFallbackImage { path } => {
                self.settings.fallback_image = path.clone();
                self.scheduler.set_fallback_image(path);
            }

            // Show management
            NewShow { name } => {
                let show = self.show_manager.new_show(name);
                self.scheduler.replace_cues(show.cues);
                self.outbox.push(ControlEvent::ShowLoaded {
                    name: show.name,
                    path: None,
                });
            }
            LoadShow { path } => self.load_show(&path)?,
            SaveShow => {
                let path = self.show_manager.save_show(
                    self.scheduler.definitions(),
                    self.settings.fallback_image.clone(),
                )?;
                self.outbox.push(ControlEvent::ShowSaved { path });
            }
            SaveShowAs { name, path } => {
                let path = self.show_manager.save_show_as(
                    name,
                    path,
                    self.scheduler.definitions(),
                    self.settings.fallback_image.clone(),
                )?;
                self.outbox.push(ControlEvent::ShowSaved { path });
            }

            QueryCueList => self.outbox.push(ControlEvent::CueList {
                cues: self.scheduler.summaries(),
            }),
            Shutdown => self.scheduler.shutdown(),
        }

        Ok(())
    }

    /// Replace the cue list with the contents of a show file.
    pub fn load_show(&mut self, path: &Path) -> Result<(), anyhow::Error> {
        let show = self.show_manager.load_show(path)?;

        if show.fallback_image.is_some() {
            self.settings.fallback_image = show.fallback_image.clone();
            self.scheduler.set_fallback_image(show.fallback_image.clone());
        }

        let ids = self.scheduler.replace_cues(show.cues);
        for cue in ids {
            self.probe_media_duration(cue);
        }

        self.outbox.push(ControlEvent::ShowLoaded {
            name: show.name,
            path: Some(path.to_path_buf()),
        });
        Ok(())
    }

    /// Fill in the duration column of a media cue.
    fn probe_media_duration(&mut self, cue: CueId) {
        let Some(item) = self.scheduler.cue(cue) else {
            return;
        };
        if item.media_duration.is_some() {
            return;
        }
        let Some(path) = item.action.media_path().map(Path::to_path_buf) else {
            return;
        };
        if let Some(duration) = probe_duration_or_log(&path) {
            self.scheduler.set_media_duration(cue, Some(duration));
        }
    }

    fn autosave(&mut self) -> Result<(), anyhow::Error> {
        if !self.settings.enable_autosave || self.show_manager.current_path().is_none() {
            return Ok(());
        }
        let path = self.show_manager.save_show(
            self.scheduler.definitions(),
            self.settings.fallback_image.clone(),
        )?;
        log::debug!("Autosaved {}", path.display());
        Ok(())
    }

    pub fn poll_engine(&mut self) {
        self.sync_clock();
        self.scheduler.poll_engine();
    }

    /// Publish progress of the active cue and every running countdown.
    pub fn report_progress(&mut self) {
        self.sync_clock();
        if let Some(update) = self.reporter.poll(&mut self.scheduler) {
            self.outbox.push(ControlEvent::Progress(update));
        }
        for countdown in self.scheduler.countdowns() {
            self.outbox.push(ControlEvent::Countdown(countdown));
        }
    }

    /// Everything that happened since the last call. A fresh cue list snapshot follows any
    /// change that alters how the list is displayed.
    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        let mut events = self.scheduler.take_events();
        events.append(&mut self.outbox);

        let list_stale = events.iter().any(|event| {
            matches!(
                event,
                ControlEvent::CueListChanged
                    | ControlEvent::ActiveCueChanged { .. }
                    | ControlEvent::SelectionChanged { .. }
                    | ControlEvent::CueStarted { .. }
                    | ControlEvent::CueFinished { .. }
                    | ControlEvent::CueStopped { .. }
            )
        });
        if list_stale {
            events.push(ControlEvent::CueList {
                cues: self.scheduler.summaries(),
            });
        }
        events
    }

    /// Run the console with channel-based communication
    pub async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<ControlCommand>,
        event_tx: mpsc::UnboundedSender<ControlEvent>,
    ) -> Result<(), anyhow::Error> {
        log::info!("Cue console starting...");

        // tokio rejects a zero period
        let mut engine_poll = tokio::time::interval(self.engine_poll_interval.max(MIN_TICK));
        engine_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut progress = tokio::time::interval(self.reporter.interval().max(MIN_TICK));
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.outbox.push(ControlEvent::CueList {
            cues: self.scheduler.summaries(),
        });

        loop {
            let deadline = self
                .scheduler
                .next_timer_deadline()
                .map(|deadline| self.started + deadline);

            tokio::select! {
                // Commands from the control surface
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        log::info!("Command channel closed");
                        break;
                    };

                    if let ControlCommand::Shutdown = command {
                        log::info!("Received shutdown command");
                        break;
                    }

                    if let Err(e) = self.process_command(command) {
                        log::error!("Command processing error: {}", e);
                        self.outbox.push(ControlEvent::Error {
                            message: format!("Command processing error: {}", e),
                        });
                    }
                }

                // Next pre-wait, post-wait, fade step or slide
                _ = sleep_until(deadline) => self.sync_clock(),

                _ = engine_poll.tick() => self.poll_engine(),

                _ = progress.tick() => self.report_progress(),
            }

            for event in self.take_events() {
                if event_tx.send(event).is_err() {
                    log::debug!("Event receiver dropped");
                }
            }
        }

        self.scheduler.shutdown();
        for event in self.take_events() {
            let _ = event_tx.send(event);
        }
        let _ = event_tx.send(ControlEvent::ShutdownComplete);
        log::info!("Cue console stopped");
        Ok(())
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

fn log_ignored(action: &str, applied: bool) {
    if !applied {
        log::debug!("{} ignored: nothing to apply it to", action);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::cue::cue::CueProperties;
    use crate::testing::{RecordingEngine, RecordingLauncher, RecordingRenderer};

    type TestConsole = CueConsole<RecordingEngine, RecordingRenderer, RecordingLauncher>;

    fn console(temp_dir: &TempDir, settings: Settings) -> TestConsole {
        let scheduler = CueScheduler::new(
            RecordingEngine::new(),
            RecordingRenderer::new(),
            RecordingLauncher::new(),
            SchedulerSettings::default(),
        );
        let shows = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
        CueConsole::new(scheduler, settings, shows)
    }

    #[test]
    fn test_settings_reach_scheduler() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            fade_step: 0.1,
            fade_tick_ms: 250,
            fallback_image: Some(PathBuf::from("logo.png")),
            ..Settings::default()
        };
        let console = console(&temp_dir, settings);

        assert_eq!(console.scheduler().settings().fade_step, 0.1);
        assert_eq!(
            console.scheduler().settings().fade_tick,
            Duration::from_millis(250)
        );
        assert_eq!(
            console.scheduler().surface().renderer().current(),
            Some(Path::new("logo.png"))
        );
    }

    #[test]
    fn test_errors_surface_as_results() {
        let temp_dir = TempDir::new().unwrap();
        let mut console = console(&temp_dir, Settings::default());

        assert!(console
            .process_command(ControlCommand::Select { index: 3 })
            .is_err());
        assert!(console
            .process_command(ControlCommand::LoadShow {
                path: temp_dir.path().join("missing.stageshow"),
            })
            .is_err());
    }

    #[test]
    fn test_list_snapshot_follows_changes() {
        let temp_dir = TempDir::new().unwrap();
        let mut console = console(&temp_dir, Settings::default());

        console
            .process_command(ControlCommand::AddCue {
                properties: CueProperties::command("echo one"),
            })
            .unwrap();
        let events = console.take_events();
        let snapshot = events.iter().find_map(|event| match event {
            ControlEvent::CueList { cues } => Some(cues.clone()),
            _ => None,
        });
        assert_eq!(snapshot.map(|cues| cues.len()), Some(1));

        console.process_command(ControlCommand::Play).unwrap();
        assert!(console.take_events().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip_through_commands() {
        let temp_dir = TempDir::new().unwrap();
        let mut console = console(&temp_dir, Settings::default());
        let path = temp_dir.path().join("night.stageshow");

        for properties in [
            CueProperties::command("echo one").with_post_wait(2),
            CueProperties::slideshow(vec![PathBuf::from("a.png")], 4).with_auto_advance(),
        ] {
            console
                .process_command(ControlCommand::AddCue { properties })
                .unwrap();
        }
        console
            .process_command(ControlCommand::SaveShowAs {
                name: "Night".to_string(),
                path: path.clone(),
            })
            .unwrap();
        assert!(console
            .take_events()
            .contains(&ControlEvent::ShowSaved { path: path.clone() }));

        console
            .process_command(ControlCommand::NewShow {
                name: "Blank".to_string(),
            })
            .unwrap();
        assert!(console.scheduler().cues().is_empty());

        console
            .process_command(ControlCommand::LoadShow { path: path.clone() })
            .unwrap();
        let definitions = console.scheduler().definitions();
        assert_eq!(definitions.len(), 2);
        assert_eq!(definitions[0].post_wait_seconds, 2);
        assert!(definitions[1].auto_advance);
        assert!(console.take_events().contains(&ControlEvent::ShowLoaded {
            name: "Night".to_string(),
            path: Some(path),
        }));
    }

    #[test]
    fn test_autosave_after_edit() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            enable_autosave: true,
            ..Settings::default()
        };
        let mut console = console(&temp_dir, settings);
        let path = temp_dir.path().join("auto.stageshow");

        console
            .process_command(ControlCommand::SaveShowAs {
                name: "Auto".to_string(),
                path: path.clone(),
            })
            .unwrap();
        console
            .process_command(ControlCommand::AddCue {
                properties: CueProperties::command("echo saved"),
            })
            .unwrap();

        let mut shows = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
        let show = shows.load_show(&path).unwrap();
        assert_eq!(show.cues.len(), 1);
    }
}
