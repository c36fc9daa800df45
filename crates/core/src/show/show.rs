use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::cue::cue::CueProperties;

/// File extension of saved shows.
pub const SHOW_EXTENSION: &str = "stageshow";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Show {
    pub name: String,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
    #[serde(default)]
    pub fallback_image: Option<PathBuf>,
    pub cues: Vec<CueProperties>,
    pub version: String, // Schema version for future compatibility
}

impl Show {
    pub fn new(name: String) -> Self {
        let now = SystemTime::now();
        Self {
            name,
            created_at: now,
            modified_at: now,
            fallback_image: None,
            cues: Vec::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// File name derived from the show name, e.g. `Opening Night` -> `opening_night.stageshow`.
    pub fn file_name(&self) -> String {
        let sanitized: String = self
            .name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect::<String>()
            .to_lowercase();
        let stem = if sanitized.is_empty() {
            "untitled_show"
        } else {
            sanitized.as_str()
        };
        format!("{}.{}", stem, SHOW_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(
            Show::new("Opening Night".to_string()).file_name(),
            "opening_night.stageshow"
        );
        assert_eq!(
            Show::new("Act 2/Scene 1".to_string()).file_name(),
            "act_2_scene_1.stageshow"
        );
        assert_eq!(Show::new("   ".to_string()).file_name(), "untitled_show.stageshow");
    }
}
