//! Text rendering from a rasterized font atlas.
//!
//! A [`FontAtlas`] rasterizes the printable ASCII range of a TTF/OTF font at
//! one pixel size with `fontdue`, packs the glyphs into a single white RGBA
//! image (coverage in alpha), and draws text as one textured quad per glyph.
//! Atlases are created through [`Content`](crate::content::Content) so they
//! are released with the scene that loaded them.

use std::collections::HashMap;

use fontdue::{Font, FontSettings};
use glam::{UVec2, Vec2};

use crate::draw2d::{Color, Rect, Sprite};
use crate::error::ContentError;
use crate::graphics::{Graphics, ImageSource, TextureId};

/// Built-in font, so text needs no asset files (DejaVu Sans Bold, see
/// `fonts/LICENSE-DejaVu.txt`).
pub(crate) const EMBEDDED_FONT: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Rendered in place of characters the atlas does not contain.
const FALLBACK: char = '?';

/// Gap between packed glyphs, in atlas pixels.
const PADDING: u32 = 1;

const ATLAS_WIDTH: u32 = 512;

/// Placement of one rasterized glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    /// Where the glyph sits in the atlas, in pixels. Empty for blank glyphs.
    pub src: Rect,
    /// Offset from the pen position on the baseline to the glyph's top-left.
    pub offset: Vec2,
    pub advance: f32,
}

/// A font rasterized at one size, ready to draw once uploaded.
pub struct FontAtlas {
    font: Font,
    size: f32,
    glyphs: HashMap<char, GlyphInfo>,
    ascent: f32,
    line_advance: f32,
    atlas_size: UVec2,
    /// RGBA pixels waiting for upload; emptied once the texture exists.
    pixels: Vec<u8>,
    texture: Option<TextureId>,
}

impl FontAtlas {
    /// Rasterize `font_data` at `size` pixels. The atlas is CPU-side until
    /// [`attach`](Self::attach) gives it a texture.
    pub fn from_bytes(font_data: &[u8], size: f32) -> Result<Self, ContentError> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| ContentError::Font(e.to_string()))?;
        let size = size.max(1.0);

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = (32u8..=126)
            .map(char::from)
            .map(|c| {
                let (metrics, coverage) = font.rasterize(c, size);
                (c, metrics, coverage)
            })
            .collect();

        // Shelf packing: left to right, a new row when the current one is full.
        let atlas_width = rasterized
            .iter()
            .map(|(_, m, _)| m.width as u32 + PADDING * 2)
            .max()
            .unwrap_or(0)
            .max(ATLAS_WIDTH);
        let mut placements = Vec::with_capacity(rasterized.len());
        let (mut x, mut y, mut row_height) = (PADDING, PADDING, 0);
        for (_, metrics, _) in &rasterized {
            let (w, h) = (metrics.width as u32, metrics.height as u32);
            if x + w + PADDING > atlas_width {
                x = PADDING;
                y += row_height + PADDING;
                row_height = 0;
            }
            placements.push(UVec2::new(x, y));
            x += w + PADDING;
            row_height = row_height.max(h);
        }
        let atlas_size = UVec2::new(atlas_width, y + row_height + PADDING);

        let mut pixels = vec![0u8; atlas_size.x as usize * atlas_size.y as usize * 4];
        let mut glyphs = HashMap::with_capacity(rasterized.len());
        for ((c, metrics, coverage), at) in rasterized.iter().zip(placements) {
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = coverage[gy * metrics.width + gx];
                    let i = ((at.y as usize + gy) * atlas_size.x as usize + at.x as usize + gx) * 4;
                    pixels[i..i + 4].copy_from_slice(&[255, 255, 255, alpha]);
                }
            }
            glyphs.insert(
                *c,
                GlyphInfo {
                    src: Rect::new(
                        at.x as f32,
                        at.y as f32,
                        metrics.width as f32,
                        metrics.height as f32,
                    ),
                    // fontdue's ymin is the bottom edge relative to the baseline, y up.
                    offset: Vec2::new(
                        metrics.xmin as f32,
                        -(metrics.ymin as f32 + metrics.height as f32),
                    ),
                    advance: metrics.advance_width,
                },
            );
        }

        let (ascent, line_advance) = match font.horizontal_line_metrics(size) {
            Some(m) => (m.ascent, m.new_line_size),
            None => (size * 0.8, size * 1.2),
        };

        Ok(Self {
            font,
            size,
            glyphs,
            ascent,
            line_advance,
            atlas_size,
            pixels,
            texture: None,
        })
    }

    /// The built-in font at `size` pixels.
    pub fn embedded(size: f32) -> Result<Self, ContentError> {
        Self::from_bytes(EMBEDDED_FONT, size)
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn atlas_size(&self) -> UVec2 {
        self.atlas_size
    }

    /// RGBA atlas pixels still waiting for upload.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Use `texture` (an upload of [`pixels`](Self::pixels)) for drawing and
    /// drop the CPU copy.
    pub fn attach(&mut self, texture: TextureId) {
        self.texture = Some(texture);
        self.pixels = Vec::new();
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    fn glyph_or_fallback(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c).or_else(|| self.glyphs.get(&FALLBACK))
    }

    /// Distance between the baselines of consecutive lines.
    pub fn line_height(&self) -> f32 {
        self.line_advance
    }

    fn kern(&self, prev: Option<char>, c: char) -> f32 {
        prev.and_then(|p| self.font.horizontal_kern(p, c, self.size))
            .unwrap_or(0.0)
    }

    fn line_width(&self, line: &str) -> f32 {
        let mut width = 0.0;
        let mut prev = None;
        for c in line.chars() {
            if let Some(glyph) = self.glyph_or_fallback(c) {
                width += self.kern(prev, c) + glyph.advance;
            }
            prev = Some(c);
        }
        width
    }

    /// Size of the block `text` occupies. Lines are split on `\n`.
    pub fn measure(&self, text: &str) -> Vec2 {
        let mut lines = 0;
        let mut widest: f32 = 0.0;
        for line in text.split('\n') {
            lines += 1;
            widest = widest.max(self.line_width(line));
        }
        Vec2::new(widest, lines as f32 * self.line_advance)
    }

    /// Insert line breaks between words so no line is wider than `max_width`.
    /// A single word wider than the limit gets a line of its own.
    pub fn wrap(&self, text: &str, max_width: f32) -> String {
        let mut out = String::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if self.line_width(&candidate) > max_width {
                out.push_str(&line);
                out.push('\n');
                line = word.to_string();
            } else {
                line = candidate;
            }
        }
        out.push_str(&line);
        out
    }

    /// Draw `text` with the top-left of its block at `pos`. Draws nothing
    /// until the atlas has a texture.
    pub fn draw_text(&self, gfx: &mut dyn Graphics, text: &str, pos: Vec2, color: Color) {
        let Some(texture) = self.texture else {
            return;
        };
        let mut baseline = pos.y + self.ascent;
        for line in text.split('\n') {
            let mut pen = pos.x;
            let mut prev = None;
            for c in line.chars() {
                let Some(glyph) = self.glyph_or_fallback(c) else {
                    continue;
                };
                pen += self.kern(prev, c);
                prev = Some(c);
                if glyph.src.width > 0.0 && glyph.src.height > 0.0 {
                    let top_left = (Vec2::new(pen, baseline) + glyph.offset).round();
                    let dst = Rect::new(top_left.x, top_left.y, glyph.src.width, glyph.src.height);
                    let sprite = Sprite::new(dst).source(glyph.src).tint(color);
                    gfx.draw_image(ImageSource::Texture(texture), &sprite);
                }
                pen += glyph.advance;
            }
            baseline += self.line_advance;
        }
    }

    /// Draw `text` centered on `center`.
    pub fn draw_centered(&self, gfx: &mut dyn Graphics, text: &str, center: Vec2, color: Color) {
        let size = self.measure(text);
        self.draw_text(gfx, text, (center - size / 2.0).round(), color);
    }
}

impl std::fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAtlas")
            .field("size", &self.size)
            .field("glyphs", &self.glyphs.len())
            .field("atlas_size", &self.atlas_size)
            .field("texture", &self.texture)
            .finish_non_exhaustive()
    }
}
