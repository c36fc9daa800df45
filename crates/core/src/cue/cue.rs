use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CueError;
use crate::media::engine::SessionId;
use crate::progress::progress::format_hms;

/// Characters of a shell command used as the default name of a command cue.
const COMMAND_NAME_LENGTH: usize = 20;

/// Stable identity of a cue. Survives reordering and removal of other cues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CueId(pub u64);

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Audio,
    Video,
    Slideshow,
    Command,
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CueKind::Audio => "audio",
            CueKind::Video => "video",
            CueKind::Slideshow => "slideshow",
            CueKind::Command => "command",
        };
        f.pad(label)
    }
}

/// What a cue does when it fires. The variant is fixed for the lifetime of a cue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueAction {
    Audio {
        path: PathBuf,
        #[serde(default)]
        loop_forever: bool,
    },
    Video {
        path: PathBuf,
        #[serde(default)]
        loop_forever: bool,
        #[serde(default)]
        hold_last_frame: bool,
    },
    Slideshow {
        images: Vec<PathBuf>,
        /// Seconds between slides; 0 means manual advance only.
        #[serde(default)]
        interval_seconds: u32,
    },
    Command {
        command: String,
    },
}

impl CueAction {
    pub fn kind(&self) -> CueKind {
        match self {
            CueAction::Audio { .. } => CueKind::Audio,
            CueAction::Video { .. } => CueKind::Video,
            CueAction::Slideshow { .. } => CueKind::Slideshow,
            CueAction::Command { .. } => CueKind::Command,
        }
    }

    pub fn loop_forever(&self) -> bool {
        match self {
            CueAction::Audio { loop_forever, .. } | CueAction::Video { loop_forever, .. } => {
                *loop_forever
            }
            _ => false,
        }
    }

    pub fn hold_last_frame(&self) -> bool {
        matches!(
            self,
            CueAction::Video {
                hold_last_frame: true,
                ..
            }
        )
    }

    pub fn media_path(&self) -> Option<&Path> {
        match self {
            CueAction::Audio { path, .. } | CueAction::Video { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Name used when the operator leaves the name blank.
    fn default_name(&self) -> String {
        match self {
            CueAction::Audio { path, .. } | CueAction::Video { path, .. } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            CueAction::Slideshow { .. } => "Slideshow".to_string(),
            CueAction::Command { command } => command.chars().take(COMMAND_NAME_LENGTH).collect(),
        }
    }
}

/// Borrowed view of what a cue plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CueTarget<'a> {
    Media(&'a Path),
    Images(&'a [PathBuf]),
    Command(&'a str),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueStatus {
    #[default]
    Idle,
    PreWait,
    Running,
    Paused,
    PostWait,
    Finished,
    Stopped,
    Failed,
}

impl CueStatus {
    /// True while the cue's action is playing or paused.
    pub fn is_playing(&self) -> bool {
        matches!(self, CueStatus::Running | CueStatus::Paused)
    }
}

/// The authored definition of a cue, as edited by the operator and stored in show files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CueProperties {
    #[serde(default)]
    pub name: String,
    pub action: CueAction,
    #[serde(default)]
    pub pre_wait_seconds: u32,
    #[serde(default)]
    pub post_wait_seconds: u32,
    #[serde(default)]
    pub auto_advance: bool,
    #[serde(default)]
    pub start_immediately: bool,
}

impl CueProperties {
    pub fn new(action: CueAction) -> Self {
        Self {
            name: String::new(),
            action,
            pre_wait_seconds: 0,
            post_wait_seconds: 0,
            auto_advance: false,
            start_immediately: false,
        }
    }

    pub fn audio(path: impl Into<PathBuf>) -> Self {
        Self::new(CueAction::Audio {
            path: path.into(),
            loop_forever: false,
        })
    }

    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self::new(CueAction::Video {
            path: path.into(),
            loop_forever: false,
            hold_last_frame: false,
        })
    }

    pub fn slideshow(images: Vec<PathBuf>, interval_seconds: u32) -> Self {
        Self::new(CueAction::Slideshow {
            images,
            interval_seconds,
        })
    }

    pub fn command(command: impl Into<String>) -> Self {
        Self::new(CueAction::Command {
            command: command.into(),
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pre_wait(mut self, seconds: u32) -> Self {
        self.pre_wait_seconds = seconds;
        self
    }

    pub fn with_post_wait(mut self, seconds: u32) -> Self {
        self.post_wait_seconds = seconds;
        self
    }

    pub fn with_auto_advance(mut self) -> Self {
        self.auto_advance = true;
        self
    }

    pub fn with_start_immediately(mut self) -> Self {
        self.start_immediately = true;
        self
    }

    /// Loop audio or video until stopped. Ignored for other kinds.
    pub fn looping(mut self) -> Self {
        if let CueAction::Audio { loop_forever, .. } | CueAction::Video { loop_forever, .. } =
            &mut self.action
        {
            *loop_forever = true;
        }
        self
    }

    /// Freeze the final video frame on end of stream. Ignored for other kinds.
    pub fn holding_last_frame(mut self) -> Self {
        if let CueAction::Video {
            hold_last_frame, ..
        } = &mut self.action
        {
            *hold_last_frame = true;
        }
        self
    }

    /// The name to display, falling back to one derived from the action.
    pub fn resolved_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            self.action.default_name()
        } else {
            trimmed.to_string()
        }
    }
}

/// A cue in the running cue list: its definition plus live playback state.
#[derive(Clone, Debug)]
pub struct CueItem {
    pub id: CueId,
    pub name: String,
    pub action: CueAction,
    pub pre_wait_seconds: u32,
    pub post_wait_seconds: u32,
    pub auto_advance: bool,
    pub start_immediately: bool,
    /// Engine session while audio or video is loaded; `None` otherwise.
    pub playback_handle: Option<SessionId>,
    /// Written only by the progress reporter.
    pub progress_fraction: f32,
    pub status: CueStatus,
    pub media_duration: Option<Duration>,
    pub(crate) generation: u64,
}

impl CueItem {
    pub fn new(id: CueId, properties: CueProperties) -> Self {
        Self {
            id,
            name: properties.resolved_name(),
            action: properties.action,
            pre_wait_seconds: properties.pre_wait_seconds,
            post_wait_seconds: properties.post_wait_seconds,
            auto_advance: properties.auto_advance,
            start_immediately: properties.start_immediately,
            playback_handle: None,
            progress_fraction: 0.0,
            status: CueStatus::Idle,
            media_duration: None,
            generation: 0,
        }
    }

    pub fn kind(&self) -> CueKind {
        self.action.kind()
    }

    pub fn target(&self) -> CueTarget<'_> {
        match &self.action {
            CueAction::Audio { path, .. } | CueAction::Video { path, .. } => CueTarget::Media(path),
            CueAction::Slideshow { images, .. } => CueTarget::Images(images),
            CueAction::Command { command } => CueTarget::Command(command),
        }
    }

    pub fn loop_forever(&self) -> bool {
        self.action.loop_forever()
    }

    pub fn hold_last_frame(&self) -> bool {
        self.action.hold_last_frame()
    }

    pub fn slideshow_interval_seconds(&self) -> Option<u32> {
        match &self.action {
            CueAction::Slideshow {
                interval_seconds, ..
            } => Some(*interval_seconds),
            _ => None,
        }
    }

    /// Text for the action column of the cue list.
    pub fn action_text(&self) -> String {
        match &self.action {
            CueAction::Audio { .. } | CueAction::Video { .. } => match self.media_duration {
                Some(duration) => format_hms(duration),
                None => "(Unknown)".to_string(),
            },
            CueAction::Slideshow {
                images,
                interval_seconds,
            } => {
                if *interval_seconds > 0 && !images.is_empty() {
                    let total = u64::from(*interval_seconds) * images.len() as u64;
                    format_hms(Duration::from_secs(total))
                } else {
                    "Slideshow".to_string()
                }
            }
            CueAction::Command { .. } => "-".to_string(),
        }
    }

    /// The authored definition, without live state.
    pub fn properties(&self) -> CueProperties {
        CueProperties {
            name: self.name.clone(),
            action: self.action.clone(),
            pre_wait_seconds: self.pre_wait_seconds,
            post_wait_seconds: self.post_wait_seconds,
            auto_advance: self.auto_advance,
            start_immediately: self.start_immediately,
        }
    }

    /// Edit the cue in place. The cue kind cannot change.
    pub fn apply(&mut self, properties: CueProperties) -> Result<(), CueError> {
        let (from, to) = (self.kind(), properties.action.kind());
        if from != to {
            return Err(CueError::KindChanged {
                id: self.id,
                from,
                to,
            });
        }

        if self.action.media_path() != properties.action.media_path() {
            self.media_duration = None;
        }

        self.name = properties.resolved_name();
        self.action = properties.action;
        self.pre_wait_seconds = properties.pre_wait_seconds;
        self.post_wait_seconds = properties.post_wait_seconds;
        self.auto_advance = properties.auto_advance;
        self.start_immediately = properties.start_immediately;
        Ok(())
    }
}
