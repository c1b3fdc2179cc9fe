use glam::Vec2;
use log::info;
use tinyframe::{
    Color, FontAtlas, Graphics, LoadContext, Rect, Scene, SceneError, SceneLogic, Transition,
    UpdateContext,
};

use super::play::PlayScene;
use super::{Background, HUD_HEIGHT, InputProfile, TITLE_BANNER};

const TITLE: &str = "It's Snake, But Every 10 Seconds Food Turns Into Walls";
const BANNER_SIZE: Vec2 = Vec2::new(774.0, 214.0);
const TITLE_PX: f32 = 40.0;
const HUD_PX: f32 = 32.0;

pub struct TitleScene {
    input: InputProfile,
    unit: u32,
    background: Background,
    title_font: Option<FontAtlas>,
    hud_font: Option<FontAtlas>,
    banner: Rect,
    hud: Rect,
    /// The title, already wrapped to fit the banner.
    title: String,
    changing: bool,
}

impl TitleScene {
    pub fn new(input: InputProfile, unit: u32) -> Self {
        Self {
            input,
            unit,
            background: Background::new(Vec2::new(-60.0, -60.0)),
            title_font: None,
            hud_font: None,
            banner: Rect::default(),
            hud: Rect::default(),
            title: String::new(),
            changing: false,
        }
    }
}

impl SceneLogic for TitleScene {
    fn load_content(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        self.background.load(ctx)?;
        self.title_font = Some(ctx.content.default_font(ctx.graphics, TITLE_PX)?);
        self.hud_font = Some(ctx.content.default_font(ctx.graphics, HUD_PX)?);
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        let res = ctx.resolution.as_vec2();
        self.hud = Rect::new(0.0, res.y - HUD_HEIGHT, res.x, HUD_HEIGHT);
        let above_hud = Vec2::new(res.x / 2.0, (res.y - HUD_HEIGHT) / 2.0);
        self.banner = Rect::centered(above_hud.round(), BANNER_SIZE);
        if let Some(font) = &self.title_font {
            self.title = font.wrap(TITLE, BANNER_SIZE.x - 5.0);
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.background.update(ctx.dt());
        if self.changing {
            return;
        }
        if self.input.title_action.pressed(ctx.input) {
            info!("starting a new game");
            self.changing = true;
            let play = Scene::new("play", PlayScene::new(self.input.clone(), self.unit));
            ctx.change_scene_with(play, Some(Transition::fade(1.0)), Some(Transition::fade(1.0)));
        } else if self.input.quit.pressed(ctx.input) {
            ctx.exit();
        }
    }

    fn draw(&mut self, gfx: &mut dyn Graphics) {
        self.background.draw(gfx);

        gfx.fill_rect(self.banner, TITLE_BANNER);
        gfx.outline_rect(self.banner, Color::BLACK, 1.0);
        if let Some(font) = &self.title_font {
            font.draw_centered(gfx, &self.title, self.banner.center(), Color::BLACK);
        }

        gfx.fill_rect(self.hud, Color::BLACK);
        if let Some(font) = &self.hud_font {
            font.draw_centered(gfx, "Press Enter To Start", self.hud.center(), Color::WHITE);
        }
    }
}
