use std::path::{Path, PathBuf};

use super::renderer::ImageRenderer;
use crate::cue::cue::CueId;
use crate::error::RenderError;

/// What currently occupies the output surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceContent {
    Empty,
    Fallback,
    Video(CueId),
    /// A video cue that ended with its last frame held.
    Frozen(CueId),
    Slideshow(CueId),
}

/// The single visual output. Exactly one cue may occupy it at a time.
pub struct PlaybackSurface<R> {
    renderer: R,
    content: SurfaceContent,
    fallback_image: Option<PathBuf>,
}

impl<R: ImageRenderer> PlaybackSurface<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            content: SurfaceContent::Empty,
            fallback_image: None,
        }
    }

    pub fn content(&self) -> SurfaceContent {
        self.content
    }

    /// The cue that owns the surface, if any.
    pub fn occupant(&self) -> Option<CueId> {
        match self.content {
            SurfaceContent::Video(cue)
            | SurfaceContent::Frozen(cue)
            | SurfaceContent::Slideshow(cue) => Some(cue),
            SurfaceContent::Empty | SurfaceContent::Fallback => None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn fallback_image(&self) -> Option<&Path> {
        self.fallback_image.as_deref()
    }

    /// Change the fallback image. Refreshes the surface if the fallback is on screen.
    pub fn set_fallback_image(&mut self, path: Option<PathBuf>) {
        self.fallback_image = path;
        if self.occupant().is_none() {
            self.show_fallback();
        }
    }

    /// Hand the surface to a video cue. The engine draws the frames.
    pub fn attach_video(&mut self, cue: CueId) {
        self.renderer.clear();
        self.content = SurfaceContent::Video(cue);
    }

    /// Keep the last frame of `cue` on screen. Only applies while `cue` is the video on screen.
    pub fn freeze(&mut self, cue: CueId) -> bool {
        if self.content == SurfaceContent::Video(cue) {
            self.content = SurfaceContent::Frozen(cue);
            true
        } else {
            false
        }
    }

    pub fn show_slide(&mut self, cue: CueId, image: &Path) -> Result<(), RenderError> {
        self.renderer.show(image)?;
        self.content = SurfaceContent::Slideshow(cue);
        Ok(())
    }

    /// Show the fallback image, or a blank surface when none is set or it cannot be drawn.
    pub fn show_fallback(&mut self) {
        self.content = SurfaceContent::Empty;
        self.renderer.clear();

        if let Some(path) = &self.fallback_image {
            match self.renderer.show(path) {
                Ok(()) => self.content = SurfaceContent::Fallback,
                Err(e) => log::warn!("Fallback image unavailable: {}", e),
            }
        }
    }

    /// Give up the surface if `cue` holds it. Returns whether anything changed.
    pub fn release(&mut self, cue: CueId) -> bool {
        if self.occupant() == Some(cue) {
            self.show_fallback();
            true
        } else {
            false
        }
    }
}
