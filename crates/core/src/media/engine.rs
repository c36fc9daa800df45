use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque handle to one loaded media stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Playing,
    Paused,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackPosition {
    pub position: Duration,
    /// `None` while the engine does not yet know the stream length.
    pub duration: Option<Duration>,
}

/// Notifications produced by the engine. They are collected with
/// [`MediaEngine::drain_events`] on the control loop, never delivered from engine threads.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    EndOfStream(SessionId),
    Failed { session: SessionId, message: String },
}

impl EngineEvent {
    pub fn session(&self) -> SessionId {
        match self {
            EngineEvent::EndOfStream(session) => *session,
            EngineEvent::Failed { session, .. } => *session,
        }
    }
}

/// The playback contract the scheduler relies on.
pub trait MediaEngine {
    fn open(&mut self, source: &Path, kind: MediaKind) -> Result<SessionId, EngineError>;

    fn set_state(&mut self, session: SessionId, state: EngineState) -> Result<(), EngineError>;

    /// Volume is linear, 0.0 to 1.0.
    fn set_volume(&mut self, session: SessionId, volume: f32) -> Result<(), EngineError>;

    fn volume(&self, session: SessionId) -> Option<f32>;

    fn query_position(&self, session: SessionId) -> Option<PlaybackPosition>;

    /// Ask for an `EndOfStream` event once this session runs out of media.
    fn on_end_of_stream(&mut self, session: SessionId);

    /// Release the session. Events for a closed session are never produced.
    fn close(&mut self, session: SessionId);

    fn drain_events(&mut self) -> Vec<EngineEvent>;
}
