//! Built-in transition effects.

use std::f32::consts::PI;

use glam::{UVec2, Vec2};

use super::transition::{TransitionEffect, TransitionFrame, TransitionRole};
use crate::draw2d::{Color, Rect, Sprite};
use crate::graphics::{Graphics, ImageSource};

/// Peak tile rotation, reached halfway through each tile's animation.
const MAX_TILE_ROTATION: f32 = 5.0 * PI / 180.0;

/// Multiplies the scene's alpha by a time-based coefficient.
#[derive(Clone, Copy, Debug, Default)]
pub struct FadeEffect;

impl FadeEffect {
    /// Alpha for the given frame: `remaining / duration` when outgoing,
    /// `1 - remaining / duration` when incoming, shaped by the frame's easing.
    pub fn alpha(frame: &TransitionFrame) -> f32 {
        let remaining = frame.remaining_fraction();
        match frame.role {
            TransitionRole::Outgoing => 1.0 - frame.easing.apply(1.0 - remaining),
            TransitionRole::Incoming => frame.easing.apply(1.0 - remaining),
        }
    }
}

impl TransitionEffect for FadeEffect {
    fn render(&mut self, gfx: &mut dyn Graphics, frame: &TransitionFrame) {
        let bounds = Rect::from_size(frame.source_size_f32());
        let sprite = Sprite::new(bounds).tint(Color::WHITE.fade(Self::alpha(frame)));
        gfx.draw_image(ImageSource::Target(frame.source), &sprite);
    }
}

/// Splits the scene into a checkerboard of tiles that shrink (outgoing) or grow
/// (incoming) while spinning slightly.
///
/// "Odd" tiles are those whose column and row share parity. Even tiles animate
/// during the first half of the duration and odd tiles during the second.
#[derive(Clone, Copy, Debug)]
pub struct EvenOddTileEffect {
    tile_size: u32,
    columns: u32,
    rows: u32,
}

impl EvenOddTileEffect {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
            columns: 0,
            rows: 0,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Grid dimensions after `on_start`.
    pub fn grid(&self) -> UVec2 {
        UVec2::new(self.columns, self.rows)
    }

    /// True when the column and row are both even or both odd.
    pub fn is_odd(column: u32, row: u32) -> bool {
        (column % 2 == 0 && row % 2 == 0) || (column % 2 == 1 && row % 2 == 1)
    }

    /// How much of a tile's own half of the animation is still left, from 1
    /// down to 0, with easing applied.
    pub fn local_fraction(frame: &TransitionFrame, odd: bool) -> f32 {
        let half = frame.duration / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let time_left = if odd {
            frame.remaining.min(half)
        } else {
            (frame.remaining - half).max(0.0)
        };
        let fraction = (time_left / half).clamp(0.0, 1.0);
        1.0 - frame.easing.apply(1.0 - fraction)
    }

    /// Tile size multiplier for a local fraction.
    pub fn scale(role: TransitionRole, fraction: f32) -> f32 {
        match role {
            TransitionRole::Outgoing => fraction,
            TransitionRole::Incoming => 1.0 - fraction,
        }
    }

    /// Tile rotation in radians for a local fraction. Zero when a tile is
    /// fully open or fully closed; outgoing and incoming spin in opposite
    /// directions so an out/in pair mirrors itself.
    pub fn rotation(role: TransitionRole, fraction: f32) -> f32 {
        let spin = MAX_TILE_ROTATION * (PI * fraction.clamp(0.0, 1.0)).sin();
        match role {
            TransitionRole::Outgoing => -spin,
            TransitionRole::Incoming => spin,
        }
    }
}

impl TransitionEffect for EvenOddTileEffect {
    fn on_start(&mut self, source_size: UVec2) {
        self.columns = source_size.x.div_ceil(self.tile_size);
        self.rows = source_size.y.div_ceil(self.tile_size);
    }

    fn render(&mut self, gfx: &mut dyn Graphics, frame: &TransitionFrame) {
        let tile = self.tile_size as f32;
        for row in 0..self.rows {
            for column in 0..self.columns {
                let odd = Self::is_odd(column, row);
                let fraction = Self::local_fraction(frame, odd);
                let size = tile * Self::scale(frame.role, fraction);
                if size <= 0.0 {
                    continue;
                }

                let cell = Vec2::new(column as f32 * tile, row as f32 * tile);
                let center = cell + Vec2::splat(tile / 2.0);
                let sprite = Sprite::new(Rect::centered(center, Vec2::splat(size)))
                    .source(Rect::new(cell.x, cell.y, tile, tile))
                    .rotation(Self::rotation(frame.role, fraction));
                gfx.draw_image(ImageSource::Target(frame.source), &sprite);
            }
        }
    }
}
