//! Per-scene resources.
//!
//! A [`Content`] owns every texture and extra render target a scene loads, and
//! releases them all at once when the scene unloads.

use std::path::{Path, PathBuf};

use glam::UVec2;
use log::debug;

use crate::error::{ContentError, GraphicsError};
use crate::graphics::{Graphics, RenderTarget, TargetDescriptor, TargetId, TextureId};
use crate::text::FontAtlas;

/// Scene-scoped resource loader.
#[derive(Debug)]
pub struct Content {
    root: PathBuf,
    targets: Vec<RenderTarget>,
    textures: Vec<TextureId>,
}

impl Content {
    /// Create a loader that resolves relative paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            targets: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of resources currently held.
    pub fn len(&self) -> usize {
        self.targets.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocate an extra render target owned by this content set.
    pub fn create_target(
        &mut self,
        gfx: &mut dyn Graphics,
        size: UVec2,
        label: &str,
    ) -> Result<TargetId, ContentError> {
        let target = RenderTarget::new(gfx, TargetDescriptor::new(size, label))?;
        let id = target.id()?;
        self.targets.push(target);
        Ok(id)
    }

    /// Upload raw RGBA8 pixels as a texture.
    pub fn texture_from_rgba(
        &mut self,
        gfx: &mut dyn Graphics,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<TextureId, ContentError> {
        let id = gfx.create_texture(rgba, width, height, label)?;
        self.textures.push(id);
        Ok(id)
    }

    /// Decode an encoded image (PNG, etc.) and upload it.
    pub fn load_texture_bytes(
        &mut self,
        gfx: &mut dyn Graphics,
        bytes: &[u8],
        label: &str,
    ) -> Result<TextureId, ContentError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        self.texture_from_rgba(gfx, &img, width, height, label)
    }

    /// Load an image file relative to the content root.
    pub fn load_texture(
        &mut self,
        gfx: &mut dyn Graphics,
        path: impl AsRef<Path>,
    ) -> Result<TextureId, ContentError> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full).map_err(|source| ContentError::Io {
            path: full.display().to_string(),
            source,
        })?;
        let label = full.display().to_string();
        self.load_texture_bytes(gfx, &bytes, &label)
    }

    /// Rasterize a TTF/OTF font at `size` pixels and upload its atlas.
    pub fn load_font_bytes(
        &mut self,
        gfx: &mut dyn Graphics,
        bytes: &[u8],
        size: f32,
    ) -> Result<FontAtlas, ContentError> {
        let mut font = FontAtlas::from_bytes(bytes, size)?;
        let dims = font.atlas_size();
        let label = format!("font atlas {size}px");
        let id = self.texture_from_rgba(gfx, font.pixels(), dims.x, dims.y, &label)?;
        font.attach(id);
        debug!("built {label} ({}x{})", dims.x, dims.y);
        Ok(font)
    }

    /// Load a font file relative to the content root.
    pub fn load_font(
        &mut self,
        gfx: &mut dyn Graphics,
        path: impl AsRef<Path>,
        size: f32,
    ) -> Result<FontAtlas, ContentError> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full).map_err(|source| ContentError::Io {
            path: full.display().to_string(),
            source,
        })?;
        self.load_font_bytes(gfx, &bytes, size)
    }

    /// The built-in font at `size` pixels.
    pub fn default_font(&mut self, gfx: &mut dyn Graphics, size: f32) -> Result<FontAtlas, ContentError> {
        self.load_font_bytes(gfx, crate::text::EMBEDDED_FONT, size)
    }

    /// Recreate every owned render target after device loss.
    pub fn reload_targets(&mut self, gfx: &mut dyn Graphics) -> Result<(), GraphicsError> {
        for target in &mut self.targets {
            target.reload(gfx)?;
        }
        Ok(())
    }

    /// Release everything this content set owns.
    pub fn unload(&mut self, gfx: &mut dyn Graphics) {
        let count = self.len();
        for mut target in self.targets.drain(..) {
            target.dispose(gfx);
        }
        for id in self.textures.drain(..) {
            gfx.dispose_texture(id);
        }
        if count > 0 {
            debug!("unloaded {count} content resources");
        }
    }
}
