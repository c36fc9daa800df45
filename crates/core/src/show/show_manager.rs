use anyhow::{anyhow, Context, Result};
use serde_json::{from_reader, to_writer_pretty};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cue::cue::CueProperties;

use super::show::{Show, SHOW_EXTENSION};

pub struct ShowManager {
    shows_directory: PathBuf,
    current_show: Option<Show>,
    current_path: Option<PathBuf>,
}

impl ShowManager {
    /// Shows are saved under `shows_directory`, or the working directory when unset.
    pub fn new(shows_directory: Option<PathBuf>) -> Result<Self> {
        let shows_directory = match shows_directory {
            Some(dir) => dir,
            None => match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => dirs::home_dir()
                    .ok_or_else(|| anyhow!("No directory available for show files: {e}"))?,
            },
        };

        Ok(Self {
            shows_directory,
            current_show: None,
            current_path: None,
        })
    }

    pub fn shows_directory(&self) -> &Path {
        &self.shows_directory
    }

    pub fn current_show(&self) -> Option<&Show> {
        self.current_show.as_ref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn new_show(&mut self, name: String) -> Show {
        let show = Show::new(name);
        self.current_show = Some(show.clone());
        self.current_path = None;
        show
    }

    /// Save the cue list into the current show file, creating one named after the show if
    /// the show has never been saved.
    pub fn save_show(
        &mut self,
        cues: Vec<CueProperties>,
        fallback_image: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let mut show = self
            .current_show
            .take()
            .unwrap_or_else(|| Show::new("Untitled Show".to_string()));
        show.cues = cues;
        show.fallback_image = fallback_image;
        show.modified_at = SystemTime::now();

        let path = match &self.current_path {
            Some(path) => path.clone(),
            None => self.shows_directory.join(show.file_name()),
        };

        let written = write_show(&path, &show);
        self.current_show = Some(show);
        written?;

        self.current_path = Some(path.clone());
        log::info!("Saved show to {}", path.display());
        Ok(path)
    }

    pub fn save_show_as(
        &mut self,
        name: String,
        path: PathBuf,
        cues: Vec<CueProperties>,
        fallback_image: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let mut show = Show::new(name);
        if let Some(current) = &self.current_show {
            show.created_at = current.created_at;
        }
        show.cues = cues;
        show.fallback_image = fallback_image;

        write_show(&path, &show)?;

        self.current_show = Some(show);
        self.current_path = Some(path.clone());
        log::info!("Saved show as {}", path.display());
        Ok(path)
    }

    pub fn load_show(&mut self, path: &Path) -> Result<Show> {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let show: Show = from_reader(file)
            .with_context(|| format!("{} is not a valid show file", path.display()))?;

        if show.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Show {} was saved by version {}, this is {}",
                path.display(),
                show.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        self.current_show = Some(show.clone());
        self.current_path = Some(path.to_path_buf());
        log::info!("Loaded show '{}' with {} cues", show.name, show.cues.len());

        Ok(show)
    }

    pub fn list_shows(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.shows_directory)?;

        let mut shows = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == SHOW_EXTENSION) {
                shows.push(path);
            }
        }
        shows.sort();

        Ok(shows)
    }
}

fn write_show(path: &Path, show: &Show) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    to_writer_pretty(file, show)?;
    Ok(())
}
