use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cue::cue::{CueId, CueProperties, CueStatus};
use crate::cue::scheduler::{Countdown, CueSummary, FadeDirection};
use crate::progress::progress::ProgressUpdate;

/// Commands sent from a control surface to the cue console
#[derive(Debug, Clone)]
pub enum ControlCommand {
    // Cue list editing
    AddCue {
        properties: CueProperties,
    },
    UpdateCue {
        cue: CueId,
        properties: CueProperties,
    },
    RemoveCue {
        cue: CueId,
    },
    RemoveSelected,
    Reorder {
        order: Vec<CueId>,
    },
    MoveCue {
        cue: CueId,
        index: usize,
    },

    // Cursor
    Advance,
    StartCue {
        cue: CueId,
    },
    Select {
        index: usize,
    },
    SelectNext,
    SelectPrevious,

    // Global transport, applied to the active cue
    Play,
    Pause,
    Stop,
    FadeUp,
    FadeDown,

    // Per-cue controls
    PauseCue {
        cue: CueId,
    },
    ResumeCue {
        cue: CueId,
    },
    StopCue {
        cue: CueId,
    },
    FadeCue {
        cue: CueId,
        direction: FadeDirection,
    },

    // Slideshow controls
    SlideshowNext,
    SlideshowPrevious,
    SlideshowPause,
    SlideshowResume,

    // Settings
    SetFallbackImage {
        path: Option<PathBuf>,
    },

    // Show management
    NewShow {
        name: String,
    },
    LoadShow {
        path: PathBuf,
    },
    SaveShow,
    SaveShowAs {
        name: String,
        path: PathBuf,
    },

    QueryCueList,
    Shutdown,
}

/// Events sent from the cue console to control surfaces
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    // Cue list
    CueListChanged,
    CueList {
        cues: Vec<CueSummary>,
    },
    ActiveCueChanged {
        cue: Option<CueId>,
    },
    SelectionChanged {
        cue: Option<CueId>,
    },

    // Cue lifecycle
    CueStarted {
        cue: CueId,
    },
    CueRestarted {
        cue: CueId,
    },
    CueFinished {
        cue: CueId,
        status: CueStatus,
    },
    CueStopped {
        cue: CueId,
    },
    CueRemoved {
        cue: CueId,
    },
    /// Auto-advance ran off the end of the list.
    ProgramEnded {
        cue: CueId,
    },

    // Playback feedback
    Progress(ProgressUpdate),
    Countdown(Countdown),
    VolumeChanged {
        cue: CueId,
        volume: f32,
    },
    SlideChanged {
        cue: CueId,
        index: usize,
        path: PathBuf,
    },

    // Show management
    ShowLoaded {
        name: String,
        path: Option<PathBuf>,
    },
    ShowSaved {
        path: PathBuf,
    },

    Error {
        message: String,
    },
    ShutdownComplete,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // General
    pub fallback_image: Option<PathBuf>,
    pub shows_directory: Option<PathBuf>,
    pub enable_autosave: bool,

    // Playback
    pub progress_interval_ms: u64,
    pub engine_poll_interval_ms: u64,
    pub fade_step: f32,
    pub fade_tick_ms: u64,

    // Audio
    pub audio_device: String,

    // Command cues
    pub shell: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_image: None,
            shows_directory: None,
            enable_autosave: false,
            progress_interval_ms: 500,
            engine_poll_interval_ms: 50,
            fade_step: 0.05,
            fade_tick_ms: 100,
            audio_device: "Default".to_string(),
            shell: "sh".to_string(),
        }
    }
}
