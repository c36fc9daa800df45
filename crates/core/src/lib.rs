pub use config::{ConfigError, ConfigManager, ConfigSchema};
pub use console::CueConsole;
pub use cue::cue::{CueAction, CueId, CueItem, CueKind, CueProperties, CueStatus, CueTarget};
pub use cue::cue_list::CueList;
pub use cue::scheduler::{
    Completion, Countdown, CueScheduler, CueSummary, FadeDirection, SchedulerSettings, WaitPhase,
};
pub use cue::timer::{TimerAction, TimerId, TimerQueue};
pub use error::{CueError, EngineError, LaunchError, RenderError};
pub use launcher::{ProcessLauncher, ShellLauncher};
pub use media::device_enumerator::{enumerate_audio_devices, AudioDeviceInfo, DEFAULT_DEVICE};
pub use media::engine::{
    EngineEvent, EngineState, MediaEngine, MediaKind, PlaybackPosition, SessionId,
};
pub use media::probe::probe_duration;
pub use media::rodio_engine::RodioEngine;
pub use messages::{ControlCommand, ControlEvent, Settings};
pub use progress::progress::{
    format_hms, format_minutes_seconds, ProgressReporter, ProgressUpdate,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use show::show::{Show, SHOW_EXTENSION};
pub use show::show_manager::ShowManager;
pub use slideshow::slideshow::SlideshowPlayer;
pub use surface::renderer::{HeadlessRenderer, ImageRenderer};
pub use surface::surface::{PlaybackSurface, SurfaceContent};

mod config;
mod console;
mod cue;
mod error;
mod launcher;
mod media;
pub mod messages;
mod progress;
mod show;
mod slideshow;
mod surface;
pub mod testing;
