//! Scene definition and lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::UVec2;
use log::{debug, warn};

use super::transition::Transition;
use crate::content::Content;
use crate::draw2d::Color;
use crate::error::SceneError;
use crate::graphics::{Graphics, RenderTarget, TargetDescriptor};
use crate::input::Input;
use crate::time::Time;

static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a scene.
///
/// Ids are allocated when a [`Scene`] is constructed and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

impl SceneId {
    fn next() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a scene is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneState {
    Constructed,
    Initializing,
    Active,
    Unloading,
    Disposed,
}

/// Context for loading content and setting up scene state.
pub struct LoadContext<'a> {
    pub graphics: &'a mut dyn Graphics,
    pub content: &'a mut Content,
    /// The game resolution, which is also the size of the scene's render target.
    pub resolution: UVec2,
}

/// A scene to switch to: one already registered with the manager, or a new one.
pub enum SceneTarget {
    Registered(SceneId),
    New(Scene),
}

impl From<SceneId> for SceneTarget {
    fn from(id: SceneId) -> Self {
        SceneTarget::Registered(id)
    }
}

impl From<Scene> for SceneTarget {
    fn from(scene: Scene) -> Self {
        SceneTarget::New(scene)
    }
}

/// A request queued by a scene during its update.
pub enum SceneCommand {
    Change {
        target: SceneTarget,
        outgoing: Option<Transition>,
        incoming: Option<Transition>,
    },
    Exit,
}

/// Context passed to [`SceneLogic::update`].
pub struct UpdateContext<'a> {
    pub input: &'a Input,
    pub time: &'a mut Time,
    pub resolution: UVec2,
    pub(crate) commands: &'a mut Vec<SceneCommand>,
}

impl UpdateContext<'_> {
    /// Scaled delta time in seconds.
    pub fn dt(&self) -> f32 {
        self.time.delta()
    }

    /// Switch scenes without a visual transition.
    pub fn change_scene(&mut self, target: impl Into<SceneTarget>) {
        self.change_scene_with(target, None, None);
    }

    /// Switch scenes with optional outgoing and incoming transitions.
    ///
    /// The request is applied by the manager right after this update returns.
    pub fn change_scene_with(
        &mut self,
        target: impl Into<SceneTarget>,
        outgoing: Option<Transition>,
        incoming: Option<Transition>,
    ) {
        self.commands.push(SceneCommand::Change {
            target: target.into(),
            outgoing,
            incoming,
        });
    }

    /// Ask the application to shut down.
    pub fn exit(&mut self) {
        self.commands.push(SceneCommand::Exit);
    }
}

/// Game-specific behavior of a scene.
///
/// Only `update` and `draw` are required. `draw` renders into the scene's own
/// render target, which is already bound and cleared when it is called.
pub trait SceneLogic {
    /// Load textures and other resources. Called during `initialize`, after the
    /// render target has been created.
    fn load_content(&mut self, _ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    /// Set up scene state. Called after `load_content`.
    fn initialize(&mut self, _ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    /// Called once, when the scene has fully transitioned in.
    fn start(&mut self) {}

    fn update(&mut self, ctx: &mut UpdateContext<'_>);

    fn draw(&mut self, gfx: &mut dyn Graphics);

    /// Release anything not owned by the scene's [`Content`].
    fn unload_content(&mut self) {}

    fn on_client_size_changed(&mut self, _surface: UVec2) {}
}

/// A unit of game state with its own render target and content.
pub struct Scene {
    id: SceneId,
    name: String,
    logic: Box<dyn SceneLogic>,
    target: Option<RenderTarget>,
    content: Content,
    state: SceneState,
    paused: bool,
    started: bool,
    clear_color: Color,
}

impl Scene {
    pub fn new(name: impl Into<String>, logic: impl SceneLogic + 'static) -> Self {
        Self {
            id: SceneId::next(),
            name: name.into(),
            logic: Box::new(logic),
            target: None,
            content: Content::new("."),
            state: SceneState::Constructed,
            paused: true,
            started: false,
            clear_color: Color::TRANSPARENT,
        }
    }

    /// Color the render target is cleared to before each draw.
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Directory relative content paths are resolved against.
    pub fn with_content_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.content = Content::new(root);
        self
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    /// True until [`begin`](Self::begin) runs.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// The scene's render target. Errors before `initialize` and after `unload`.
    pub fn render_target(&self) -> Result<&RenderTarget, SceneError> {
        self.target
            .as_ref()
            .filter(|t| !t.is_disposed())
            .ok_or_else(|| SceneError::RenderTargetUnavailable(self.name.clone()))
    }

    /// Create the render target at the game resolution and load content.
    ///
    /// Allowed only from `Constructed` or `Disposed`. On failure everything
    /// partially loaded is released and the scene is `Disposed`.
    pub fn initialize(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        if !matches!(self.state, SceneState::Constructed | SceneState::Disposed) {
            return Err(SceneError::AlreadyInitialized(self.name.clone()));
        }
        self.state = SceneState::Initializing;
        self.paused = true;
        self.started = false;

        if let Err(e) = self.load(gfx) {
            warn!("scene '{}' failed to initialize: {e}", self.name);
            self.unload(gfx);
            return Err(e);
        }

        self.state = SceneState::Active;
        debug!("scene '{}' initialized", self.name);
        Ok(())
    }

    fn load(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let resolution = gfx.resolution();
        let desc = TargetDescriptor::new(resolution, format!("{} Target", self.name));
        self.target = Some(RenderTarget::new(gfx, desc)?);

        let mut ctx = LoadContext {
            graphics: gfx,
            content: &mut self.content,
            resolution,
        };
        self.logic.load_content(&mut ctx)?;
        self.logic.initialize(&mut ctx)
    }

    /// Unpause and run the one-time `start` hook. Later calls do nothing.
    pub fn begin(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.paused = false;
        debug!("scene '{}' begins", self.name);
        self.logic.start();
    }

    /// Run the scene's update unless it is paused or not loaded.
    pub(crate) fn update(
        &mut self,
        input: &Input,
        time: &mut Time,
        resolution: UVec2,
        commands: &mut Vec<SceneCommand>,
    ) {
        if self.paused || self.state != SceneState::Active {
            return;
        }
        let mut ctx = UpdateContext {
            input,
            time,
            resolution,
            commands,
        };
        self.logic.update(&mut ctx);
    }

    /// Bind and clear the scene's render target, then draw into it.
    pub fn draw(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        let id = self.render_target()?.id()?;
        gfx.begin_pass(Some(id), Some(self.clear_color))?;
        self.logic.draw(gfx);
        Ok(())
    }

    /// Release the render target and all content. Safe in any state.
    pub fn unload(&mut self, gfx: &mut dyn Graphics) {
        if self.state == SceneState::Constructed {
            return;
        }
        self.state = SceneState::Unloading;
        self.logic.unload_content();
        self.content.unload(gfx);
        if let Some(mut target) = self.target.take() {
            target.dispose(gfx);
        }
        self.paused = true;
        self.state = SceneState::Disposed;
        debug!("scene '{}' unloaded", self.name);
    }

    /// Recreate GPU storage after the device was created or reset. Logical
    /// state (timers, flags) is untouched.
    pub fn reload_graphics(&mut self, gfx: &mut dyn Graphics) -> Result<(), SceneError> {
        if self.state != SceneState::Active {
            return Ok(());
        }
        if let Some(target) = self.target.as_mut() {
            target.reload(gfx)?;
        }
        self.content.reload_targets(gfx)?;
        Ok(())
    }

    pub fn on_client_size_changed(&mut self, surface: UVec2) {
        self.logic.on_client_size_changed(surface);
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}
