use std::path::PathBuf;

use thiserror::Error;

use crate::cue::cue::{CueId, CueKind};
use crate::media::engine::SessionId;

/// Errors raised by cue list and scheduler operations.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("cue {0} not found")]
    UnknownCue(CueId),
    #[error("cue index {index} is out of range for a list of {len} cues")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("new cue order must name every cue exactly once")]
    InvalidOrder,
    #[error("cue {id} is a {from} cue and cannot be changed into a {to} cue")]
    KindChanged {
        id: CueId,
        from: CueKind,
        to: CueKind,
    },
}

/// Errors reported by a media engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },
    #[error("unknown engine session {0}")]
    UnknownSession(SessionId),
}

/// Errors raised when launching a command cue.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command is empty")]
    EmptyCommand,
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by an image renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot display {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_open_error_names_the_file() {
        let error = EngineError::Open {
            path: PathBuf::from("media/opener.mp4"),
            reason: "unsupported format".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to open media/opener.mp4: unsupported format"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn test_spawn_error_keeps_its_cause() {
        let error = LaunchError::Spawn {
            command: "echo lights".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such shell"),
        };
        assert_eq!(error.source().unwrap().to_string(), "no such shell");
    }
}
