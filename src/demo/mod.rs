//! The "snae" demo: a splash screen, a title screen, and a Snake variant in
//! which uneaten food turns into walls every ten seconds.

mod play;
mod snake;
mod splash;
mod title;

use glam::Vec2;
use image::{Rgba, RgbaImage};
use splash::SplashScene;
use tinyframe::{
    Color, Graphics, ImageSource, KeyCode, LoadContext, Rect, Scene, SceneError, SetupContext,
    Sprite, TextureId, Transition, VirtualButton,
};

/// Height of the HUD strip along the bottom of the play and title screens.
pub const HUD_HEIGHT: f32 = 80.0;

pub const TITLE_BANNER: Color = Color::rgb(238.0 / 255.0, 1.0, 204.0 / 255.0);

/// Register the splash scene and fade it in.
pub fn setup(ctx: &mut SetupContext) -> Result<(), SceneError> {
    let unit = ctx.pixels_per_unit();
    let splash = ctx.add(Scene::new("splash", SplashScene::new(InputProfile::new(), unit)));
    ctx.change_scene_with(splash, None, Some(Transition::fade(1.0)))?;
    Ok(())
}

/// Every logical button the demo reads.
#[derive(Clone, Debug)]
pub struct InputProfile {
    pub move_up: VirtualButton,
    pub move_down: VirtualButton,
    pub move_left: VirtualButton,
    pub move_right: VirtualButton,
    pub pause: VirtualButton,
    pub retry: VirtualButton,
    pub title_action: VirtualButton,
    pub quit: VirtualButton,
}

impl Default for InputProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProfile {
    pub fn new() -> Self {
        Self {
            move_up: VirtualButton::new("up")
                .key(KeyCode::KeyW)
                .key(KeyCode::ArrowUp),
            move_down: VirtualButton::new("down")
                .key(KeyCode::KeyS)
                .key(KeyCode::ArrowDown),
            move_left: VirtualButton::new("left")
                .key(KeyCode::KeyA)
                .key(KeyCode::ArrowLeft),
            move_right: VirtualButton::new("right")
                .key(KeyCode::KeyD)
                .key(KeyCode::ArrowRight),
            pause: VirtualButton::new("pause").key(KeyCode::Escape),
            retry: VirtualButton::new("retry").key(KeyCode::Enter),
            title_action: VirtualButton::new("start").key(KeyCode::Enter),
            quit: VirtualButton::new("quit").key(KeyCode::Escape),
        }
    }
}

/// A diagonal stripe pattern, tiled across the whole screen.
fn pattern_image() -> RgbaImage {
    RgbaImage::from_fn(64, 64, |x, y| {
        if (x + y) % 32 < 16 {
            Rgba([46, 52, 64, 255])
        } else {
            Rgba([59, 66, 82, 255])
        }
    })
}

/// One grid cell with a 1 px border on its top and left edges, so tiling it
/// draws grid lines.
pub fn grid_cell_image(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if x == 0 || y == 0 {
            Rgba([255, 255, 255, 96])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Upload `image` into the scene's content set.
pub fn upload(ctx: &mut LoadContext<'_>, image: &RgbaImage, label: &str) -> Result<TextureId, SceneError> {
    let id = ctx
        .content
        .texture_from_rgba(ctx.graphics, image.as_raw(), image.width(), image.height(), label)?;
    Ok(id)
}

/// A scrolling, tiled background pattern.
pub struct Background {
    texture: Option<TextureId>,
    tile: Vec2,
    screen: Vec2,
    offset: Vec2,
    /// Scroll velocity in pixels per second.
    velocity: Vec2,
}

impl Background {
    pub fn new(velocity: Vec2) -> Self {
        Self {
            texture: None,
            tile: Vec2::ONE,
            screen: Vec2::ZERO,
            offset: Vec2::ZERO,
            velocity,
        }
    }

    pub fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        let image = pattern_image();
        self.tile = Vec2::new(image.width() as f32, image.height() as f32);
        self.screen = ctx.resolution.as_vec2();
        self.texture = Some(upload(ctx, &image, "background pattern")?);
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn update(&mut self, dt: f32) {
        self.offset = (self.offset + self.velocity * dt).rem_euclid(self.tile);
    }

    pub fn draw(&self, gfx: &mut dyn Graphics) {
        let Some(texture) = self.texture else {
            return;
        };
        let sprite = Sprite::new(Rect::from_size(self.screen))
            .source(Rect::new(self.offset.x, self.offset.y, self.screen.x, self.screen.y))
            .tint(Color::WHITE.fade(0.7));
        gfx.draw_image(ImageSource::Texture(texture), &sprite);
    }
}
