use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::device_enumerator::DEFAULT_DEVICE;
use super::engine::{EngineEvent, EngineState, MediaEngine, MediaKind, PlaybackPosition, SessionId};
use crate::error::EngineError;

struct RodioSession {
    source: PathBuf,
    sink: Sink,
    state: EngineState,
    duration: Option<Duration>,
    end_of_stream_armed: bool,
    end_of_stream_sent: bool,
}

/// Media engine backed by rodio. Each session is one sink on the shared output mixer.
///
/// Rodio has no completion callback, so end of stream is detected when
/// [`MediaEngine::drain_events`] finds a playing sink that has run dry. The output stream is
/// not `Send`; the engine lives on the control loop thread.
pub struct RodioEngine {
    stream: OutputStream,
    sessions: HashMap<SessionId, RodioSession>,
    next_session: u64,
    pending: Vec<EngineEvent>,
}

impl RodioEngine {
    /// Open the named output device, falling back to the system default.
    pub fn new(device_name: &str) -> Result<Self, EngineError> {
        let mut stream = open_stream(device_name)?;
        stream.log_on_drop(false);

        log::info!("Audio output ready");
        Ok(Self {
            stream,
            sessions: HashMap::new(),
            next_session: 0,
            pending: Vec::new(),
        })
    }

    fn session(&self, session: SessionId) -> Result<&RodioSession, EngineError> {
        self.sessions
            .get(&session)
            .ok_or(EngineError::UnknownSession(session))
    }

    fn session_mut(&mut self, session: SessionId) -> Result<&mut RodioSession, EngineError> {
        self.sessions
            .get_mut(&session)
            .ok_or(EngineError::UnknownSession(session))
    }
}

fn open_stream(device_name: &str) -> Result<OutputStream, EngineError> {
    if device_name != DEFAULT_DEVICE {
        let host = rodio::cpal::default_host();
        let device = host.output_devices().ok().and_then(|mut devices| {
            devices.find(|device| device.name().map_or(false, |name| name == device_name))
        });

        match device {
            Some(device) => {
                let opened = OutputStreamBuilder::from_device(device)
                    .and_then(|builder| builder.open_stream());
                match opened {
                    Ok(stream) => {
                        log::info!("Using audio device: {}", device_name);
                        return Ok(stream);
                    }
                    Err(e) => log::warn!(
                        "Failed to open audio device '{}': {}. Using default device.",
                        device_name,
                        e
                    ),
                }
            }
            None => log::warn!(
                "Audio device '{}' not found. Using default device.",
                device_name
            ),
        }
    }

    OutputStreamBuilder::open_default_stream()
        .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))
}

impl MediaEngine for RodioEngine {
    fn open(&mut self, source: &Path, kind: MediaKind) -> Result<SessionId, EngineError> {
        let open_error = |reason: String| EngineError::Open {
            path: source.to_path_buf(),
            reason,
        };

        let file = File::open(source).map_err(|e| open_error(e.to_string()))?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| open_error(e.to_string()))?;
        let duration = decoder.total_duration();

        if kind == MediaKind::Video {
            log::warn!(
                "No video output available, playing the audio of {}",
                source.display()
            );
        }

        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(decoder);

        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.sessions.insert(
            session,
            RodioSession {
                source: source.to_path_buf(),
                sink,
                state: EngineState::Paused,
                duration,
                end_of_stream_armed: false,
                end_of_stream_sent: false,
            },
        );
        log::debug!("Opened {} as {}", source.display(), session);
        Ok(session)
    }

    fn set_state(&mut self, session: SessionId, state: EngineState) -> Result<(), EngineError> {
        let entry = self.session_mut(session)?;
        match state {
            EngineState::Playing => entry.sink.play(),
            EngineState::Paused => entry.sink.pause(),
            EngineState::Stopped => entry.sink.stop(),
        }
        entry.state = state;
        Ok(())
    }

    fn set_volume(&mut self, session: SessionId, volume: f32) -> Result<(), EngineError> {
        self.session(session)?.sink.set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    fn volume(&self, session: SessionId) -> Option<f32> {
        self.sessions.get(&session).map(|entry| entry.sink.volume())
    }

    fn query_position(&self, session: SessionId) -> Option<PlaybackPosition> {
        self.sessions.get(&session).map(|entry| PlaybackPosition {
            position: entry.sink.get_pos(),
            duration: entry.duration,
        })
    }

    fn on_end_of_stream(&mut self, session: SessionId) {
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.end_of_stream_armed = true;
        }
    }

    fn close(&mut self, session: SessionId) {
        if let Some(entry) = self.sessions.remove(&session) {
            entry.sink.stop();
            log::debug!("Closed {} ({})", session, entry.source.display());
        }
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        for (id, entry) in self.sessions.iter_mut() {
            let ran_dry = entry.state == EngineState::Playing && entry.sink.empty();
            if entry.end_of_stream_armed && !entry.end_of_stream_sent && ran_dry {
                entry.end_of_stream_sent = true;
                self.pending.push(EngineEvent::EndOfStream(*id));
            }
        }
        std::mem::take(&mut self.pending)
    }
}
