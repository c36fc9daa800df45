use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

/// Name used in settings for the system's default output.
pub const DEFAULT_DEVICE: &str = "Default";

/// An audio output the engine can be pointed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List audio output devices for `--list-devices`.
pub fn enumerate_audio_devices() -> Result<Vec<AudioDeviceInfo>, String> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let devices = host
        .output_devices()
        .map_err(|e| format!("Failed to enumerate audio devices: {e}"))?;

    let mut listed: Vec<AudioDeviceInfo> = devices
        .filter_map(|device| device.name().ok())
        .map(|name| AudioDeviceInfo {
            is_default: default_name.as_ref() == Some(&name),
            name,
        })
        .collect();

    if listed.is_empty() {
        listed.push(AudioDeviceInfo {
            name: DEFAULT_DEVICE.to_string(),
            is_default: true,
        });
    }

    Ok(listed)
}
