//! 2D drawing primitives shared by every graphics backend.
//!
//! Coordinates are in pixels with the origin at the top-left of the bound
//! target. Backends convert [`Sprite`] quads into [`Vertex2d`] triangles with
//! [`sprite_vertices`].

use glam::Vec2;

/// An RGBA color with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build a color from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const CORNFLOWER_BLUE: Color = Color::rgba(0.392, 0.584, 0.929, 1.0);

    /// Same color with the alpha channel replaced.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Same color with the alpha channel multiplied by `factor` (clamped to 0..=1).
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: self.a * factor.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

/// An axis-aligned rectangle in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle at the origin with the given size.
    pub fn from_size(size: Vec2) -> Self {
        Self::new(0.0, 0.0, size.x, size.y)
    }

    /// A rectangle of the given size centered on `center`.
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Shrink the rectangle by `amount` on every side.
    pub fn inset(&self, amount: f32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            (self.width - amount * 2.0).max(0.0),
            (self.height - amount * 2.0).max(0.0),
        )
    }
}

/// A textured quad: which part of the image to read, where to put it, and how
/// to tint and rotate it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    /// Source rectangle in image pixels. `None` uses the whole image.
    pub src: Option<Rect>,
    /// Destination rectangle in target pixels.
    pub dst: Rect,
    /// Color multiplier; alpha is used for blending.
    pub tint: Color,
    /// Clockwise rotation in radians around the destination center.
    pub rotation: f32,
}

impl Sprite {
    pub fn new(dst: Rect) -> Self {
        Self {
            src: None,
            dst,
            tint: Color::WHITE,
            rotation: 0.0,
        }
    }

    pub fn source(mut self, src: Rect) -> Self {
        self.src = Some(src);
        self
    }

    pub fn tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }
}

/// Vertex for 2D sprite rendering. Positions are already in clip space.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Corners of `dst` rotated by `rotation` radians around its center, in
/// top-left, top-right, bottom-right, bottom-left order.
pub fn quad_corners(dst: Rect, rotation: f32) -> [Vec2; 4] {
    let center = dst.center();
    let half = dst.size() / 2.0;
    let local = [
        Vec2::new(-half.x, -half.y),
        Vec2::new(half.x, -half.y),
        Vec2::new(half.x, half.y),
        Vec2::new(-half.x, half.y),
    ];
    if rotation == 0.0 {
        return local.map(|p| center + p);
    }
    let rot = Vec2::from_angle(rotation);
    local.map(|p| center + rot.rotate(p))
}

/// Build the six vertices (two triangles) for a sprite drawn into a target of
/// `target_size` pixels, sampling an image of `source_size` pixels.
pub fn sprite_vertices(sprite: &Sprite, source_size: Vec2, target_size: Vec2) -> [Vertex2d; 6] {
    let src = sprite.src.unwrap_or_else(|| Rect::from_size(source_size));
    let u0 = src.x / source_size.x;
    let v0 = src.y / source_size.y;
    let u1 = src.right() / source_size.x;
    let v1 = src.bottom() / source_size.y;

    let [tl, tr, br, bl] = quad_corners(sprite.dst, sprite.rotation).map(|p| to_clip(p, target_size));
    let color = sprite.tint.to_array();
    let v = |position: Vec2, uv: [f32; 2]| Vertex2d {
        position: position.to_array(),
        uv,
        color,
    };

    [
        v(tl, [u0, v0]),
        v(tr, [u1, v0]),
        v(bl, [u0, v1]),
        v(tr, [u1, v0]),
        v(br, [u1, v1]),
        v(bl, [u0, v1]),
    ]
}

/// Convert a pixel position to clip space for a target of `target_size` pixels.
fn to_clip(p: Vec2, target_size: Vec2) -> Vec2 {
    Vec2::new(
        p.x / target_size.x * 2.0 - 1.0,
        1.0 - p.y / target_size.y * 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn unrotated_corners_match_rect() {
        let c = quad_corners(Rect::new(10.0, 20.0, 4.0, 2.0), 0.0);
        assert_eq!(c[0], Vec2::new(10.0, 20.0));
        assert_eq!(c[2], Vec2::new(14.0, 22.0));
    }

    #[test]
    fn quarter_turn_rotates_around_center() {
        let c = quad_corners(Rect::new(0.0, 0.0, 2.0, 2.0), std::f32::consts::FRAC_PI_2);
        // Top-left corner (-1,-1) from center ends up at (1,-1).
        assert!(approx(c[0], Vec2::new(2.0, 0.0)));
        assert!(approx(c[2], Vec2::new(0.0, 2.0)));
    }

    #[test]
    fn full_target_maps_to_clip_extremes() {
        let size = Vec2::new(320.0, 180.0);
        let verts = sprite_vertices(&Sprite::new(Rect::from_size(size)), size, size);
        assert_eq!(verts[0].position, [-1.0, 1.0]);
        assert_eq!(verts[4].position, [1.0, -1.0]);
        assert_eq!(verts[0].uv, [0.0, 0.0]);
        assert_eq!(verts[4].uv, [1.0, 1.0]);
    }

    #[test]
    fn source_rect_larger_than_image_tiles() {
        let sprite = Sprite::new(Rect::new(0.0, 0.0, 64.0, 64.0)).source(Rect::new(0.0, 0.0, 64.0, 64.0));
        let verts = sprite_vertices(&sprite, Vec2::splat(32.0), Vec2::splat(64.0));
        assert_eq!(verts[4].uv, [2.0, 2.0]);
    }

    #[test]
    fn fade_multiplies_alpha() {
        let c = Color::WHITE.with_alpha(0.5).fade(0.5);
        assert_eq!(c.a, 0.25);
        assert_eq!(Color::WHITE.fade(2.0).a, 1.0);
    }
}
