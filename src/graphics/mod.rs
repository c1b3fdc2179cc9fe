//! The graphics collaborator used by scenes and transitions.
//!
//! Everything above this module talks to a [`Graphics`] trait object: render
//! targets are created, reloaded and disposed through it, and all drawing is
//! "bind a target, then draw images and rectangles into it". Two backends are
//! provided:
//!
//! - [`GpuGraphics`]: wgpu rendering into a winit window.
//! - [`HeadlessGraphics`]: an in-memory recorder used by tests and tools.
//!
//! Drawing calls are infallible. A draw that references an unknown or disposed
//! image is logged and skipped by the backend. Binding an unknown target is an
//! error.

mod headless;
mod sprite_pass;
mod target;
mod wgpu_backend;

pub use headless::{DrawRecord, HeadlessGraphics, PassRecord};
pub use target::{RenderTarget, TargetDescriptor};
pub use wgpu_backend::GpuGraphics;

use glam::{UVec2, Vec2};

use crate::draw2d::{Color, Rect, Sprite};
use crate::error::GraphicsError;

/// Handle to an offscreen render target owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u32);

/// Handle to a static texture owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

/// The image a draw call samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Target(TargetId),
    Texture(TextureId),
}

impl From<TargetId> for ImageSource {
    fn from(id: TargetId) -> Self {
        ImageSource::Target(id)
    }
}

impl From<TextureId> for ImageSource {
    fn from(id: TextureId) -> Self {
        ImageSource::Texture(id)
    }
}

/// A backend capable of offscreen rendering and simple sprite drawing.
pub trait Graphics {
    /// The fixed game resolution. Scene targets are allocated at this size and
    /// the screen pass uses it as its coordinate space.
    fn resolution(&self) -> UVec2;

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId, GraphicsError>;

    /// Recreate the backing storage of a target, keeping its id. Contents are lost.
    fn reload_target(&mut self, id: TargetId) -> Result<(), GraphicsError>;

    /// Release a target. Unknown ids are ignored.
    fn dispose_target(&mut self, id: TargetId);

    fn target_size(&self, id: TargetId) -> Option<UVec2>;

    /// Upload a tightly packed RGBA8 image.
    fn create_texture(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<TextureId, GraphicsError>;

    fn texture_size(&self, id: TextureId) -> Option<UVec2>;

    fn dispose_texture(&mut self, id: TextureId);

    /// Bind `target` (or the screen when `None`) for the following draw calls,
    /// optionally clearing it first.
    fn begin_pass(&mut self, target: Option<TargetId>, clear: Option<Color>)
    -> Result<(), GraphicsError>;

    /// Draw an image into the bound target.
    fn draw_image(&mut self, source: ImageSource, sprite: &Sprite);

    /// Fill a rectangle in the bound target.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw the border of a rectangle, `thickness` pixels wide, inside its bounds.
    fn outline_rect(&mut self, rect: Rect, color: Color, thickness: f32) {
        let t = thickness.min(rect.width / 2.0).min(rect.height / 2.0);
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - t, rect.width, t), color);
        self.fill_rect(
            Rect::new(rect.x, rect.y + t, t, rect.height - t * 2.0),
            color,
        );
        self.fill_rect(
            Rect::new(rect.right() - t, rect.y + t, t, rect.height - t * 2.0),
            color,
        );
    }

    /// Submit everything recorded since the last call and present the screen.
    fn end_frame(&mut self) -> Result<(), GraphicsError>;
}

/// Validate tightly packed RGBA8 data for a `width` x `height` texture.
pub(crate) fn check_rgba(rgba: &[u8], width: u32, height: u32) -> Result<(), GraphicsError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .filter(|&n| n > 0)
        .ok_or(GraphicsError::InvalidSize { width, height })?;
    if rgba.len() != expected {
        return Err(GraphicsError::TextureDataSize {
            expected,
            actual: rgba.len(),
        });
    }
    Ok(())
}

/// The screen-space rectangle the game resolution is scaled into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Convert a window position into game coordinates.
    pub fn to_game(&self, window_pos: Vec2, resolution: UVec2) -> Vec2 {
        let scale = Vec2::new(
            resolution.x as f32 / self.width.max(1.0),
            resolution.y as f32 / self.height.max(1.0),
        );
        (window_pos - Vec2::new(self.x, self.y)) * scale
    }
}

/// Fit `resolution` into `surface` preserving its aspect ratio, shrink it by
/// `padding` pixels horizontally (and proportionally vertically), and center it.
pub fn letterbox(surface: UVec2, resolution: UVec2, padding: f32) -> Viewport {
    let sw = surface.x as f32;
    let sh = surface.y as f32;
    let rw = resolution.x.max(1) as f32;
    let rh = resolution.y.max(1) as f32;

    let (mut width, mut height) = if sw / rw > sh / rh {
        (sh / rh * rw, sh)
    } else {
        (sw, sw / rw * rh)
    };

    let aspect = height / width;
    width = (width - padding * 2.0).max(1.0);
    height = (height - padding * aspect * 2.0).max(1.0);

    Viewport {
        x: ((sw - width) / 2.0).floor(),
        y: ((sh - height) / 2.0).floor(),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_fills_surface() {
        let vp = letterbox(UVec2::new(1280, 720), UVec2::new(1280, 720), 0.0);
        assert_eq!(vp, Viewport { x: 0.0, y: 0.0, width: 1280.0, height: 720.0 });
    }

    #[test]
    fn wide_surface_gets_pillarboxed() {
        let vp = letterbox(UVec2::new(2000, 720), UVec2::new(1280, 720), 0.0);
        assert_eq!(vp.width, 1280.0);
        assert_eq!(vp.height, 720.0);
        assert_eq!(vp.x, 360.0);
        assert_eq!(vp.y, 0.0);
    }

    #[test]
    fn tall_surface_gets_letterboxed() {
        let vp = letterbox(UVec2::new(640, 720), UVec2::new(1280, 720), 0.0);
        assert_eq!(vp.width, 640.0);
        assert_eq!(vp.height, 360.0);
        assert_eq!(vp.y, 180.0);
    }

    #[test]
    fn padding_keeps_aspect() {
        let vp = letterbox(UVec2::new(1280, 720), UVec2::new(1280, 720), 64.0);
        assert_eq!(vp.width, 1152.0);
        assert!((vp.height - 648.0).abs() < 1e-3);
        assert_eq!(vp.x, 64.0);
        assert_eq!(vp.y, 36.0);
    }

    #[test]
    fn rgba_size_is_checked_without_overflow() {
        assert!(check_rgba(&[0; 16], 2, 2).is_ok());
        assert!(matches!(
            check_rgba(&[0; 16], 0, 2),
            Err(GraphicsError::InvalidSize { width: 0, height: 2 })
        ));
        // 65536 * 65536 * 4 does not fit in a u32.
        match check_rgba(&[], 65536, 65536) {
            Err(GraphicsError::TextureDataSize { expected, actual }) => {
                assert_eq!(expected as u64, 1u64 << 34);
                assert_eq!(actual, 0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn window_position_maps_into_game_space() {
        let vp = letterbox(UVec2::new(640, 360), UVec2::new(1280, 720), 0.0);
        let p = vp.to_game(Vec2::new(320.0, 180.0), UVec2::new(1280, 720));
        assert_eq!(p, Vec2::new(640.0, 360.0));
    }
}
