//! Error types for the framework.
//!
//! Usage errors (calling an operation whose precondition does not hold) are
//! reported immediately as `Err` values instead of being tolerated. Device loss
//! is not an error at this level; it is recovered through the reload hooks on
//! [`SceneManager`](crate::scene::SceneManager).

use thiserror::Error;

use crate::graphics::{TargetId, TextureId};
use crate::scene::SceneId;

/// Errors raised by the scene and transition state machine.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The requested scene is already the active scene.
    #[error("a scene cannot change from itself to itself ({0})")]
    SelfTransition(SceneId),

    /// The id does not name a scene registered with the manager.
    #[error("scene {0} is not registered with the scene manager")]
    UnknownScene(SceneId),

    /// `initialize` was called on a scene that is already loaded.
    #[error("scene '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// The scene's render target was accessed before `initialize` or after unload.
    #[error("scene '{0}' has no render target (not initialized, or already unloaded)")]
    RenderTargetUnavailable(String),

    /// A transition's render target was accessed before `start`.
    #[error("transition has not been started")]
    TransitionNotStarted,

    /// Transitions are single-use; `start` was called a second time.
    #[error("transition has already been started")]
    TransitionAlreadyStarted,

    /// A scene swap was attempted with no pending scene.
    #[error("attempted to swap scenes but no scene is pending")]
    NoPendingScene,

    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Errors raised by a [`Graphics`](crate::graphics::Graphics) backend.
#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("render target {0:?} does not exist")]
    UnknownTarget(TargetId),

    #[error("texture {0:?} does not exist")]
    UnknownTexture(TextureId),

    #[error("render target '{0}' has been disposed")]
    TargetDisposed(String),

    #[error("invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureDataSize { expected: usize, actual: usize },

    #[error("failed to create surface: {0}")]
    CreateSurface(String),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to create device: {0}")]
    RequestDevice(String),

    /// The presentation surface was lost or outdated and has been reconfigured.
    /// Render targets must be reloaded.
    #[error("presentation surface lost")]
    SurfaceLost,

    #[error("surface error: {0}")]
    Surface(String),
}

/// Errors raised while loading scene content.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse font: {0}")]
    Font(String),

    #[error(transparent)]
    Graphics(#[from] GraphicsError),
}

/// Errors raised by the frame driver.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Graphics(#[from] GraphicsError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
