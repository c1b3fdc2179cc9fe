//! Owned render targets.

use glam::{UVec2, Vec2};
use log::debug;

use super::{Graphics, TargetId};
use crate::draw2d::Rect;
use crate::error::GraphicsError;

/// Parameters for creating a render target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub width: u32,
    pub height: u32,
    /// Keep contents between passes that bind the target without clearing.
    /// When false, the backend discards contents on every bind.
    pub preserve_contents: bool,
    /// Debug label (visible in GPU debuggers).
    pub label: String,
}

impl TargetDescriptor {
    pub fn new(size: UVec2, label: impl Into<String>) -> Self {
        Self {
            width: size.x,
            height: size.y,
            preserve_contents: true,
            label: label.into(),
        }
    }

    pub fn preserve_contents(mut self, preserve: bool) -> Self {
        self.preserve_contents = preserve;
        self
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

/// An offscreen image buffer with exactly one owner.
///
/// The backend storage is released with [`dispose`](Self::dispose); dropping a
/// `RenderTarget` without disposing it leaks the backend resource until the
/// backend itself is dropped.
#[derive(Debug)]
pub struct RenderTarget {
    id: TargetId,
    desc: TargetDescriptor,
    disposed: bool,
}

impl RenderTarget {
    pub fn new(gfx: &mut dyn Graphics, desc: TargetDescriptor) -> Result<Self, GraphicsError> {
        let id = gfx.create_target(&desc)?;
        debug!("created render target '{}' {}x{}", desc.label, desc.width, desc.height);
        Ok(Self {
            id,
            desc,
            disposed: false,
        })
    }

    /// The backend handle, or an error once the target has been disposed.
    pub fn id(&self) -> Result<TargetId, GraphicsError> {
        if self.disposed {
            Err(GraphicsError::TargetDisposed(self.desc.label.clone()))
        } else {
            Ok(self.id)
        }
    }

    pub fn descriptor(&self) -> &TargetDescriptor {
        &self.desc
    }

    pub fn size(&self) -> UVec2 {
        self.desc.size()
    }

    /// The full target area as a rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(Vec2::new(self.desc.width as f32, self.desc.height as f32))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Recreate the backing storage after device loss. The handle stays the same.
    pub fn reload(&mut self, gfx: &mut dyn Graphics) -> Result<(), GraphicsError> {
        let id = self.id()?;
        gfx.reload_target(id)?;
        debug!("reloaded render target '{}'", self.desc.label);
        Ok(())
    }

    /// Release the backend storage. Calling this more than once is a no-op.
    pub fn dispose(&mut self, gfx: &mut dyn Graphics) {
        if !self.disposed {
            gfx.dispose_target(self.id);
            self.disposed = true;
            debug!("disposed render target '{}'", self.desc.label);
        }
    }
}
