use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Settings;

/// Configuration manager for Stageshow settings
/// Provides a layered configuration system that separates schema, available options, and persisted
/// values. Configuration is stored in config.json in the working directory by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub general: GeneralConfigSchema,
    pub playback: PlaybackConfigSchema,
    pub audio: AudioConfigSchema,
    pub commands: CommandConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfigSchema {
    pub fallback_image: ConfigOption<Option<PathBuf>>,
    pub shows_directory: ConfigOption<Option<PathBuf>>,
    pub enable_autosave: ConfigOption<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfigSchema {
    pub progress_interval_ms: ConfigOption<u64>,
    pub engine_poll_interval_ms: ConfigOption<u64>,
    pub fade_step: ConfigOption<f32>,
    pub fade_tick_ms: ConfigOption<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfigSchema {
    pub audio_device: ConfigOption<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfigSchema {
    pub shell: ConfigOption<String>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

impl<T> ConfigOption<T> {
    fn new(default: T, description: &str) -> Self {
        Self {
            default,
            valid_range: None,
            valid_choices: None,
            description: description.to_string(),
            requires_restart: false,
        }
    }

    fn range(mut self, min: T, max: T) -> Self {
        self.valid_range = Some((min, max));
        self
    }

    fn restart(mut self) -> Self {
        self.requires_restart = true;
        self
    }
}

impl<T: PartialOrd + std::fmt::Display> ConfigOption<T> {
    /// Push an error onto `errors` if `value` falls outside the valid range.
    fn check_range(&self, name: &str, value: &T, errors: &mut Vec<String>) {
        if let Some((min, max)) = &self.valid_range {
            if value < min || value > max {
                errors.push(format!("{} must be between {} and {}", name, min, max));
            }
        }
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'config.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("config.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Writes a default file first if none exists
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self
            .existing_created_at()
            .unwrap_or_else(|| now.clone());

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Creation timestamp of the file on disk, kept across saves.
    fn existing_created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let existing: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(existing.created_at)
    }

    /// Validate, update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            general: GeneralConfigSchema {
                fallback_image: ConfigOption::new(
                    None,
                    "Image shown when no video or slideshow is on screen",
                ),
                shows_directory: ConfigOption::new(
                    None,
                    "Directory where show files are saved (defaults to the working directory)",
                ),
                enable_autosave: ConfigOption::new(
                    false,
                    "Save the show file after every change to the cue list",
                ),
            },
            playback: PlaybackConfigSchema {
                progress_interval_ms: ConfigOption::new(
                    500,
                    "How often playback progress is reported, in milliseconds",
                )
                .range(100, 5000),
                engine_poll_interval_ms: ConfigOption::new(
                    50,
                    "How often the media engine is checked for finished media, in milliseconds",
                )
                .range(10, 1000),
                fade_step: ConfigOption::new(0.05, "Volume change per fade step (0.0 to 1.0)")
                    .range(0.01, 0.5),
                fade_tick_ms: ConfigOption::new(100, "Time between fade steps, in milliseconds")
                    .range(20, 1000),
            },
            audio: AudioConfigSchema {
                audio_device: ConfigOption::new(
                    "Default".to_string(),
                    "Audio output device for playback",
                )
                .restart(), // Choices are populated from system enumeration
            },
            commands: CommandConfigSchema {
                shell: ConfigOption::new("sh".to_string(), "Shell used to run command cues"),
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        // Validate playback settings
        schema.playback.progress_interval_ms.check_range(
            "progress_interval_ms",
            &settings.progress_interval_ms,
            &mut errors,
        );
        schema.playback.engine_poll_interval_ms.check_range(
            "engine_poll_interval_ms",
            &settings.engine_poll_interval_ms,
            &mut errors,
        );
        schema
            .playback
            .fade_step
            .check_range("fade_step", &settings.fade_step, &mut errors);
        schema
            .playback
            .fade_tick_ms
            .check_range("fade_tick_ms", &settings.fade_tick_ms, &mut errors);

        // Validate audio and command settings
        if settings.audio_device.trim().is_empty() {
            errors.push("audio_device must not be empty".to_string());
        }
        if settings.shell.trim().is_empty() {
            errors.push("shell must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}
