//! Scene management.
//!
//! Scenes are self-contained units of game content. Each scene owns an
//! offscreen render target at the game resolution plus a [`Content`] set for
//! its textures, and moves through a fixed lifecycle:
//!
//! ```text
//! Constructed -> Initializing -> Active (paused) -> Active -> Unloading -> Disposed
//! ```
//!
//! The [`SceneManager`] keeps one active scene, at most one pending scene, and
//! the transitions between them. Transitions sample a scene's render target and
//! render a processed image into their own target, which the manager then
//! composites to the screen.
//!
//! # Example
//!
//! ```ignore
//! use tinyframe::*;
//!
//! struct Title;
//!
//! impl SceneLogic for Title {
//!     fn update(&mut self, ctx: &mut UpdateContext<'_>) {
//!         if ctx.input.key_pressed(KeyCode::Enter) {
//!             ctx.change_scene_with(
//!                 Scene::new("play", Play::default()),
//!                 Some(Transition::fade(1.0)),
//!                 Some(Transition::fade(1.0)),
//!             );
//!         }
//!     }
//!
//!     fn draw(&mut self, gfx: &mut dyn Graphics) {
//!         gfx.fill_rect(Rect::new(0.0, 0.0, 64.0, 64.0), Color::WHITE);
//!     }
//! }
//! ```
//!
//! [`Content`]: crate::content::Content

mod effects;
mod manager;
#[allow(clippy::module_inception)]
pub(crate) mod scene;
mod transition;

pub use effects::{EvenOddTileEffect, FadeEffect};
pub use manager::{ChangeOutcome, ManagerState, SceneManager};
pub use scene::{
    LoadContext, Scene, SceneCommand, SceneId, SceneLogic, SceneState, SceneTarget, UpdateContext,
};
pub use transition::{Easing, Transition, TransitionEffect, TransitionFrame, TransitionRole};
