use std::path::{Path, PathBuf};

use crate::error::RenderError;

/// Draws still images on the output surface.
pub trait ImageRenderer {
    fn show(&mut self, path: &Path) -> Result<(), RenderError>;

    fn clear(&mut self);
}

/// Renderer for machines without a display. Images are decoded far enough to validate their
/// header, then logged.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    current: Option<PathBuf>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl ImageRenderer for HeadlessRenderer {
    fn show(&mut self, path: &Path) -> Result<(), RenderError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| RenderError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        log::info!("Showing {} ({}x{})", path.display(), width, height);
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(path) = self.current.take() {
            log::debug!("Cleared {}", path.display());
        }
    }
}
