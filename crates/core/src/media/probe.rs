use std::path::Path;
use std::time::Duration;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Read the playing time of a media file from its container headers.
pub fn probe_duration<P: AsRef<Path>>(path: P) -> Result<Duration, String> {
    let path = path.as_ref();

    let file = std::fs::File::open(path).map_err(|e| format!("Failed to open media file: {e}"))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| format!("Failed to probe media file: {e}"))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;

    let params = &track.codec_params;
    let frames = params.n_frames.ok_or("Track length unknown")?;

    if let Some(sample_rate) = params.sample_rate.filter(|rate| *rate > 0) {
        return Ok(Duration::from_secs_f64(frames as f64 / sample_rate as f64));
    }

    let time_base = params.time_base.ok_or("Track length unknown")?;
    let time = time_base.calc_time(frames);
    Ok(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
}

/// Duration as shown in the cue list, or `None` when the file cannot be probed.
pub fn probe_duration_or_log<P: AsRef<Path>>(path: P) -> Option<Duration> {
    let path = path.as_ref();
    match probe_duration(path) {
        Ok(duration) => Some(duration),
        Err(e) => {
            log::warn!("Could not read duration of {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    /// Write a mono 16-bit PCM WAV file of `frames` silent samples.
    fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);

        let mut file = File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn test_probe_wav_duration() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write_wav(&path, 8000, 16000);

        let duration = probe_duration(&path).unwrap();
        assert_eq!(duration, Duration::from_secs(2));
    }

    #[test]
    fn test_probe_missing_file() {
        assert!(probe_duration("/no/such/file.wav").is_err());
        assert_eq!(probe_duration_or_log("/no/such/file.wav"), None);
    }

    #[test]
    fn test_probe_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(probe_duration(&path).is_err());
    }
}
