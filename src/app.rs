use std::sync::Arc;
use std::time::Instant;

use glam::UVec2;
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::draw2d::Color;
use crate::error::{AppError, GraphicsError, SceneError};
use crate::graphics::{GpuGraphics, Graphics};
use crate::input::Input;
use crate::scene::{ChangeOutcome, Scene, SceneId, SceneManager, Transition};
use crate::time::Time;

/// Longest frame step handed to scenes. Stalls (window drags, breakpoints)
/// would otherwise finish transitions in a single frame.
const MAX_FRAME_DELTA: f32 = 0.25;

/// Context provided during app setup.
///
/// Register the game's scenes here and request the first change; the first
/// scene is initialized on the first frame.
pub struct SetupContext<'a> {
    pub scenes: &'a mut SceneManager,
    pub graphics: &'a mut dyn Graphics,
    pub config: &'a AppConfig,
}

impl SetupContext<'_> {
    /// Register a scene with the manager.
    pub fn add(&mut self, scene: Scene) -> SceneId {
        self.scenes.add(scene)
    }

    pub fn change_scene(&mut self, id: SceneId) -> Result<ChangeOutcome, SceneError> {
        self.scenes.change_scene(self.graphics, id)
    }

    pub fn change_scene_with(
        &mut self,
        id: SceneId,
        outgoing: Option<Transition>,
        incoming: Option<Transition>,
    ) -> Result<ChangeOutcome, SceneError> {
        self.scenes
            .change_scene_with(self.graphics, id, outgoing, incoming)
    }

    pub fn resolution(&self) -> UVec2 {
        self.config.resolution
    }

    pub fn pixels_per_unit(&self) -> u32 {
        self.config.pixels_per_unit
    }
}

/// Configuration for the app window and game space.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Fixed game resolution. Scene render targets are this size and the
    /// result is letterboxed into the window.
    pub resolution: UVec2,
    pub resizable: bool,
    pub vsync: bool,
    /// Color around and behind the letterboxed game image.
    pub clear_color: Color,
    /// Size of one world unit in game pixels.
    pub pixels_per_unit: u32,
    /// Border kept between the window edge and the game image, in pixels.
    pub view_padding: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "tinyframe".to_string(),
            width: 1280,
            height: 720,
            resolution: UVec2::new(1280, 720),
            resizable: true,
            vsync: true,
            clear_color: Color::BLACK,
            pixels_per_unit: 32,
            view_padding: 0.0,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = UVec2::new(width.max(1), height.max(1));
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn pixels_per_unit(mut self, ppu: u32) -> Self {
        self.pixels_per_unit = ppu.max(1);
        self
    }

    pub fn view_padding(mut self, padding: f32) -> Self {
        self.view_padding = padding.max(0.0);
        self
    }
}

/// Run an application: open the window, call `setup` once the graphics
/// device exists, then drive the scene manager until a scene exits or the
/// window is closed.
///
/// # Example
/// ```ignore
/// tinyframe::run(AppConfig::new().title("Demo"), |ctx| {
///     let title = ctx.add(Scene::new("title", Title::default()));
///     ctx.change_scene(title)?;
///     Ok(())
/// })?;
/// ```
pub fn run<S>(config: AppConfig, setup: S) -> Result<(), AppError>
where
    S: FnOnce(&mut SetupContext) -> Result<(), SceneError> + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut driver = Driver {
        app: TinyApp::Pending {
            config,
            setup: Some(Box::new(setup)),
        },
        error: None,
    };
    event_loop.run_app(&mut driver)?;
    match driver.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

type SetupFn = Box<dyn FnOnce(&mut SetupContext) -> Result<(), SceneError>>;

enum TinyApp {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running(Box<Running>),
    Finished,
}

struct Running {
    window: Arc<Window>,
    config: AppConfig,
    graphics: GpuGraphics,
    scenes: SceneManager,
    input: Input,
    time: Time,
    last_frame: Instant,
}

/// Event-loop handler; keeps the first fatal error so `run` can return it.
struct Driver {
    app: TinyApp,
    error: Option<AppError>,
}

impl Driver {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        if let TinyApp::Running(running) = &mut self.app {
            running.scenes.shutdown(&mut running.graphics);
        }
        self.app = TinyApp::Finished;
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn start(
        event_loop: &ActiveEventLoop,
        config: AppConfig,
        setup: SetupFn,
    ) -> Result<Running, AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let mut graphics = GpuGraphics::new(
            window.clone(),
            config.resolution,
            config.vsync,
            config.view_padding,
        )?;

        let mut scenes = SceneManager::new();
        scenes.set_clear_color(config.clear_color);
        setup(&mut SetupContext {
            scenes: &mut scenes,
            graphics: &mut graphics,
            config: &config,
        })?;

        let mut input = Input::new();
        input.set_view(graphics.viewport(), config.resolution);
        info!(
            "running '{}' at {}x{}",
            config.title, config.resolution.x, config.resolution.y
        );

        Ok(Running {
            window,
            config,
            graphics,
            scenes,
            input,
            time: Time::new(),
            last_frame: Instant::now(),
        })
    }
}

impl ApplicationHandler for Driver {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        match &mut self.app {
            TinyApp::Pending { config, setup } => {
                let Some(setup) = setup.take() else {
                    return;
                };
                match Self::start(event_loop, config.clone(), setup) {
                    Ok(running) => {
                        running.window.request_redraw();
                        self.app = TinyApp::Running(Box::new(running));
                    }
                    Err(e) => self.fail(event_loop, e),
                }
            }
            TinyApp::Running(running) => {
                let Running {
                    scenes, graphics, ..
                } = running.as_mut();
                if let Err(e) = scenes.on_graphics_device_created(graphics) {
                    warn!("reloading graphics after resume failed: {e}");
                }
                running.last_frame = Instant::now();
                running.window.request_redraw();
            }
            TinyApp::Finished => {}
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TinyApp::Running(running) = &mut self.app else {
            return;
        };
        let Running {
            window,
            config,
            graphics,
            scenes,
            input,
            time,
            last_frame,
        } = running.as_mut();

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                scenes.shutdown(graphics);
                self.app = TinyApp::Finished;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                graphics.resize(size.width, size.height);
                input.set_view(graphics.viewport(), config.resolution);
                scenes.on_client_size_changed(UVec2::new(size.width, size.height));
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;
                time.advance(dt.min(MAX_FRAME_DELTA));

                if let Err(e) = scenes.update(graphics, input, time) {
                    error!("scene update failed: {e}");
                }
                if let Err(e) = scenes.render(graphics) {
                    error!("scene render failed: {e}");
                }
                match graphics.end_frame() {
                    Ok(()) => {}
                    Err(GraphicsError::SurfaceLost) => {
                        warn!("surface lost, reloading render targets");
                        if let Err(e) = scenes.on_graphics_device_reset(graphics) {
                            error!("device reset failed: {e}");
                        }
                    }
                    Err(e) => {
                        self.fail(event_loop, e.into());
                        return;
                    }
                }

                input.begin_frame();
                if scenes.exit_requested() {
                    info!("exiting");
                    scenes.shutdown(graphics);
                    self.app = TinyApp::Finished;
                    event_loop.exit();
                } else {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
