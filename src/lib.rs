//! # Tinyframe
//!
//! **A tiny 2D game framework built around scenes and the transitions between them.**
//!
//! Every scene renders into its own offscreen target at a fixed game
//! resolution. The [`SceneManager`] decides which scene is live, runs fade and
//! tile transitions over their rendered images, and letterboxes the result
//! into the window.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tinyframe::*;
//!
//! #[derive(Default)]
//! struct Hello {
//!     font: Option<FontAtlas>,
//! }
//!
//! impl SceneLogic for Hello {
//!     fn load_content(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
//!         self.font = Some(ctx.content.default_font(ctx.graphics, 32.0)?);
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, ctx: &mut UpdateContext<'_>) {
//!         if ctx.input.key_pressed(KeyCode::Escape) {
//!             ctx.exit();
//!         }
//!     }
//!
//!     fn draw(&mut self, gfx: &mut dyn Graphics) {
//!         if let Some(font) = &self.font {
//!             font.draw_text(gfx, "Hello", Vec2::new(16.0, 16.0), Color::WHITE);
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), AppError> {
//!     run(AppConfig::new().title("Hello"), |ctx| {
//!         let hello = ctx.add(Scene::new("hello", Hello::default()));
//!         ctx.change_scene_with(hello, None, Some(Transition::fade(1.0)))?;
//!         Ok(())
//!     })
//! }
//! ```
//!
//! Tests and tools can drive the same scenes against [`HeadlessGraphics`],
//! which records draw calls instead of talking to a GPU.

mod app;
mod content;
mod draw2d;
mod error;
mod gpu;
pub mod graphics;
mod input;
pub mod scene;
mod text;
mod time;

pub use app::{AppConfig, SetupContext, run};
pub use content::Content;
pub use draw2d::{Color, Rect, Sprite};
pub use error::{AppError, ContentError, GraphicsError, SceneError};
pub use gpu::GpuContext;
pub use graphics::{
    GpuGraphics, Graphics, HeadlessGraphics, ImageSource, RenderTarget, TargetDescriptor, TargetId,
    TextureId, Viewport, letterbox,
};
pub use input::{Input, VirtualButton};
pub use scene::{
    ChangeOutcome, Easing, LoadContext, ManagerState, Scene, SceneCommand, SceneId, SceneLogic,
    SceneManager, SceneState, SceneTarget, Transition, TransitionEffect, TransitionFrame,
    TransitionRole, UpdateContext,
};
pub use text::{FontAtlas, GlyphInfo};
pub use time::Time;

// Re-export glam math types for convenience
pub use glam::{IVec2, UVec2, Vec2};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
