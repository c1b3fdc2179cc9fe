//! An in-memory [`Graphics`] backend that records what would have been drawn.

use std::collections::HashMap;

use glam::UVec2;
use log::warn;

use super::{Graphics, ImageSource, TargetDescriptor, TargetId, TextureId};
use crate::draw2d::{Color, Rect, Sprite};
use crate::error::GraphicsError;

/// A single recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawRecord {
    Image { source: ImageSource, sprite: Sprite },
    Rect { rect: Rect, color: Color },
}

/// One bound target and everything drawn into it.
#[derive(Clone, Debug, PartialEq)]
pub struct PassRecord {
    /// `None` is the screen.
    pub target: Option<TargetId>,
    pub clear: Option<Color>,
    pub draws: Vec<DrawRecord>,
}

#[derive(Debug)]
struct HeadlessTarget {
    desc: TargetDescriptor,
    reloads: u32,
}

/// Records passes and resource lifetimes without touching a GPU.
///
/// Draws issued before any `begin_pass` in a frame, draws that sample an
/// unknown image, and draws that sample the target currently being drawn into
/// are counted as invalid and dropped.
#[derive(Debug)]
pub struct HeadlessGraphics {
    resolution: UVec2,
    next_id: u32,
    targets: HashMap<TargetId, HeadlessTarget>,
    textures: HashMap<TextureId, UVec2>,
    passes: Vec<PassRecord>,
    last_frame: Vec<PassRecord>,
    frames: u64,
    created_targets: usize,
    disposed_targets: usize,
    invalid_draws: usize,
}

impl HeadlessGraphics {
    pub fn new(resolution: UVec2) -> Self {
        Self {
            resolution,
            next_id: 1,
            targets: HashMap::new(),
            textures: HashMap::new(),
            passes: Vec::new(),
            last_frame: Vec::new(),
            frames: 0,
            created_targets: 0,
            disposed_targets: 0,
            invalid_draws: 0,
        }
    }

    /// Passes submitted by the most recent `end_frame`.
    pub fn last_frame(&self) -> &[PassRecord] {
        &self.last_frame
    }

    /// Passes recorded since the last `end_frame`.
    pub fn pending_passes(&self) -> &[PassRecord] {
        &self.passes
    }

    /// The last screen pass of the most recent frame.
    pub fn last_screen_pass(&self) -> Option<&PassRecord> {
        self.last_frame.iter().rev().find(|p| p.target.is_none())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn is_live(&self, id: TargetId) -> bool {
        self.targets.contains_key(&id)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn created_targets(&self) -> usize {
        self.created_targets
    }

    pub fn disposed_targets(&self) -> usize {
        self.disposed_targets
    }

    pub fn reload_count(&self, id: TargetId) -> u32 {
        self.targets.get(&id).map_or(0, |t| t.reloads)
    }

    pub fn target_label(&self, id: TargetId) -> Option<&str> {
        self.targets.get(&id).map(|t| t.desc.label.as_str())
    }

    pub fn invalid_draws(&self) -> usize {
        self.invalid_draws
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, draw: DrawRecord) {
        let Some(pass) = self.passes.last_mut() else {
            warn!("draw call with no bound target");
            self.invalid_draws += 1;
            return;
        };
        pass.draws.push(draw);
    }
}

impl Graphics for HeadlessGraphics {
    fn resolution(&self) -> UVec2 {
        self.resolution
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId, GraphicsError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GraphicsError::InvalidSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let id = TargetId(self.allocate_id());
        self.targets.insert(
            id,
            HeadlessTarget {
                desc: desc.clone(),
                reloads: 0,
            },
        );
        self.created_targets += 1;
        Ok(id)
    }

    fn reload_target(&mut self, id: TargetId) -> Result<(), GraphicsError> {
        let target = self
            .targets
            .get_mut(&id)
            .ok_or(GraphicsError::UnknownTarget(id))?;
        target.reloads += 1;
        Ok(())
    }

    fn dispose_target(&mut self, id: TargetId) {
        if self.targets.remove(&id).is_some() {
            self.disposed_targets += 1;
        }
    }

    fn target_size(&self, id: TargetId) -> Option<UVec2> {
        self.targets.get(&id).map(|t| t.desc.size())
    }

    fn create_texture(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        _label: &str,
    ) -> Result<TextureId, GraphicsError> {
        super::check_rgba(rgba, width, height)?;
        let id = TextureId(self.allocate_id());
        self.textures.insert(id, UVec2::new(width, height));
        Ok(id)
    }

    fn texture_size(&self, id: TextureId) -> Option<UVec2> {
        self.textures.get(&id).copied()
    }

    fn dispose_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn begin_pass(
        &mut self,
        target: Option<TargetId>,
        clear: Option<Color>,
    ) -> Result<(), GraphicsError> {
        if let Some(id) = target {
            if !self.targets.contains_key(&id) {
                return Err(GraphicsError::UnknownTarget(id));
            }
        }
        self.passes.push(PassRecord {
            target,
            clear,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw_image(&mut self, source: ImageSource, sprite: &Sprite) {
        let valid = match source {
            ImageSource::Target(id) => {
                self.targets.contains_key(&id)
                    && self.passes.last().is_some_and(|p| p.target != Some(id))
            }
            ImageSource::Texture(id) => self.textures.contains_key(&id),
        };
        if !valid {
            warn!("skipping draw from invalid source {source:?}");
            self.invalid_draws += 1;
            return;
        }
        self.record(DrawRecord::Image {
            source,
            sprite: *sprite,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.record(DrawRecord::Rect { rect, color });
    }

    fn end_frame(&mut self) -> Result<(), GraphicsError> {
        self.last_frame = std::mem::take(&mut self.passes);
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_passes_per_frame() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        let t = gfx
            .create_target(&TargetDescriptor::new(UVec2::new(16, 16), "scene"))
            .unwrap();
        gfx.begin_pass(Some(t), Some(Color::BLACK)).unwrap();
        gfx.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE);
        gfx.begin_pass(None, None).unwrap();
        gfx.draw_image(t.into(), &Sprite::new(Rect::new(0.0, 0.0, 16.0, 16.0)));
        gfx.end_frame().unwrap();

        assert_eq!(gfx.last_frame().len(), 2);
        assert_eq!(gfx.last_frame()[0].draws.len(), 1);
        let screen = gfx.last_screen_pass().unwrap();
        assert!(matches!(
            screen.draws[0],
            DrawRecord::Image { source: ImageSource::Target(id), .. } if id == t
        ));
        assert!(gfx.pending_passes().is_empty());
    }

    #[test]
    fn sampling_the_bound_target_is_rejected() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        let t = gfx
            .create_target(&TargetDescriptor::new(UVec2::new(16, 16), "scene"))
            .unwrap();
        gfx.begin_pass(Some(t), None).unwrap();
        gfx.draw_image(t.into(), &Sprite::new(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(gfx.invalid_draws(), 1);
    }

    #[test]
    fn binding_unknown_target_fails() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        assert!(matches!(
            gfx.begin_pass(Some(TargetId(99)), None),
            Err(GraphicsError::UnknownTarget(_))
        ));
    }

    #[test]
    fn texture_data_must_match_size() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        assert!(gfx.create_texture(&[0; 12], 2, 2, "bad").is_err());
        let id = gfx.create_texture(&[0; 16], 2, 2, "ok").unwrap();
        assert_eq!(gfx.texture_size(id), Some(UVec2::new(2, 2)));
    }

    #[test]
    fn huge_texture_is_an_error_not_an_overflow() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        assert!(matches!(
            gfx.create_texture(&[], 65536, 65536, "huge"),
            Err(GraphicsError::TextureDataSize { .. })
        ));
        assert_eq!(gfx.live_textures(), 0);
    }

    #[test]
    fn outline_draws_four_edges() {
        let mut gfx = HeadlessGraphics::new(UVec2::new(16, 16));
        gfx.begin_pass(None, None).unwrap();
        gfx.outline_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE, 1.0);
        assert_eq!(gfx.pending_passes()[0].draws.len(), 4);
    }
}
