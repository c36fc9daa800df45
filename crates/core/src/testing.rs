//! In-memory collaborators for driving the scheduler without audio hardware, a display or a
//! shell. Used by the unit tests and the integration tests under `tests/`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, LaunchError, RenderError};
use crate::launcher::ProcessLauncher;
use crate::media::engine::{
    EngineEvent, EngineState, MediaEngine, MediaKind, PlaybackPosition, SessionId,
};
use crate::surface::renderer::ImageRenderer;

/// Everything the engine knows about one session.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedSession {
    pub source: PathBuf,
    pub kind: MediaKind,
    pub state: EngineState,
    pub volume: f32,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub end_of_stream_armed: bool,
    pub closed: bool,
}

/// A media engine that records every call. End of stream and failures are raised by the test
/// with [`RecordingEngine::finish`] and [`RecordingEngine::fail`].
#[derive(Debug, Default)]
pub struct RecordingEngine {
    next_session: u64,
    sessions: HashMap<SessionId, RecordedSession>,
    opened: Vec<(SessionId, PathBuf)>,
    durations: HashMap<PathBuf, Duration>,
    failing: HashSet<PathBuf>,
    pending: Vec<EngineEvent>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `duration` for sessions opened on `source`.
    pub fn with_duration(mut self, source: impl Into<PathBuf>, duration: Duration) -> Self {
        self.durations.insert(source.into(), duration);
        self
    }

    /// Refuse to open `source`.
    pub fn fail_on(mut self, source: impl Into<PathBuf>) -> Self {
        self.failing.insert(source.into());
        self
    }

    pub fn session(&self, session: SessionId) -> Option<&RecordedSession> {
        self.sessions.get(&session)
    }

    /// The most recent session opened on `source`.
    pub fn session_for(&self, source: impl AsRef<Path>) -> Option<SessionId> {
        let source = source.as_ref();
        self.opened
            .iter()
            .rev()
            .find(|(_, path)| path == source)
            .map(|(session, _)| *session)
    }

    /// Sources in the order they were opened.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.iter().map(|(_, path)| path.clone()).collect()
    }

    /// Sessions that are open and not stopped.
    pub fn live_sessions(&self) -> Vec<SessionId> {
        let mut live: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| !session.closed && session.state != EngineState::Stopped)
            .map(|(id, _)| *id)
            .collect();
        live.sort_by_key(|session| session.0);
        live
    }

    pub fn is_closed(&self, session: SessionId) -> bool {
        self.sessions
            .get(&session)
            .map(|recorded| recorded.closed)
            .unwrap_or(true)
    }

    pub fn set_position(&mut self, session: SessionId, position: Duration) {
        if let Some(recorded) = self.sessions.get_mut(&session) {
            recorded.position = position;
        }
    }

    /// Queue an end of stream for `session`, if the scheduler asked for one.
    pub fn finish(&mut self, session: SessionId) {
        if let Some(recorded) = self.sessions.get_mut(&session) {
            if let Some(duration) = recorded.duration {
                recorded.position = duration;
            }
            if recorded.end_of_stream_armed && !recorded.closed {
                self.pending.push(EngineEvent::EndOfStream(session));
            }
        }
    }

    /// Queue an end of stream even if the session is gone, as a late callback would.
    pub fn finish_late(&mut self, session: SessionId) {
        self.pending.push(EngineEvent::EndOfStream(session));
    }

    pub fn fail(&mut self, session: SessionId, message: &str) {
        self.pending.push(EngineEvent::Failed {
            session,
            message: message.to_string(),
        });
    }

    fn live_mut(&mut self, session: SessionId) -> Result<&mut RecordedSession, EngineError> {
        match self.sessions.get_mut(&session) {
            Some(recorded) if !recorded.closed => Ok(recorded),
            _ => Err(EngineError::UnknownSession(session)),
        }
    }
}

impl MediaEngine for RecordingEngine {
    fn open(&mut self, source: &Path, kind: MediaKind) -> Result<SessionId, EngineError> {
        if self.failing.contains(source) {
            return Err(EngineError::Open {
                path: source.to_path_buf(),
                reason: "unsupported format".to_string(),
            });
        }

        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.sessions.insert(
            session,
            RecordedSession {
                source: source.to_path_buf(),
                kind,
                state: EngineState::Stopped,
                volume: 1.0,
                position: Duration::ZERO,
                duration: self.durations.get(source).copied(),
                end_of_stream_armed: false,
                closed: false,
            },
        );
        self.opened.push((session, source.to_path_buf()));
        Ok(session)
    }

    fn set_state(&mut self, session: SessionId, state: EngineState) -> Result<(), EngineError> {
        self.live_mut(session)?.state = state;
        Ok(())
    }

    fn set_volume(&mut self, session: SessionId, volume: f32) -> Result<(), EngineError> {
        self.live_mut(session)?.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn volume(&self, session: SessionId) -> Option<f32> {
        self.sessions
            .get(&session)
            .filter(|recorded| !recorded.closed)
            .map(|recorded| recorded.volume)
    }

    fn query_position(&self, session: SessionId) -> Option<PlaybackPosition> {
        self.sessions
            .get(&session)
            .filter(|recorded| !recorded.closed)
            .map(|recorded| PlaybackPosition {
                position: recorded.position,
                duration: recorded.duration,
            })
    }

    fn on_end_of_stream(&mut self, session: SessionId) {
        if let Ok(recorded) = self.live_mut(session) {
            recorded.end_of_stream_armed = true;
        }
    }

    fn close(&mut self, session: SessionId) {
        if let Some(recorded) = self.sessions.get_mut(&session) {
            recorded.closed = true;
        }
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending)
    }
}

/// An image renderer that records what was shown.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    shown: Vec<PathBuf>,
    current: Option<PathBuf>,
    clears: usize,
    unreadable: HashSet<PathBuf>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` fail to render.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.insert(path.into());
        self
    }

    /// Every image successfully shown, in order.
    pub fn shown(&self) -> &[PathBuf] {
        &self.shown
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl ImageRenderer for RecordingRenderer {
    fn show(&mut self, path: &Path) -> Result<(), RenderError> {
        if self.unreadable.contains(path) {
            return Err(RenderError::Unreadable {
                path: path.to_path_buf(),
                reason: "corrupt image".to_string(),
            });
        }
        self.shown.push(path.to_path_buf());
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn clear(&mut self) {
        self.current = None;
        self.clears += 1;
    }
}

/// A process launcher that records commands instead of running them.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    commands: Vec<String>,
    failing: bool,
    reaps: usize,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn reaps(&self) -> usize {
        self.reaps
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn run(&mut self, command: &str) -> Result<(), LaunchError> {
        self.commands.push(command.to_string());
        if self.failing {
            return Err(LaunchError::Spawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such shell"),
            });
        }
        Ok(())
    }

    fn reap(&mut self) {
        self.reaps += 1;
    }
}
