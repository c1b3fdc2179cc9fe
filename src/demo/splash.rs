use glam::Vec2;
use log::debug;
use tinyframe::{
    Color, FontAtlas, Graphics, LoadContext, Scene, SceneError, SceneLogic, Transition,
    UpdateContext,
};

use super::title::TitleScene;
use super::{Background, InputProfile};

const FADE_IN: f32 = 0.5;
const HOLD: f32 = 1.0;
const FADE_OUT: f32 = 0.5;

/// Opacity of the credit text `elapsed` seconds into the presentation.
fn presentation_alpha(elapsed: f32) -> f32 {
    if elapsed < FADE_IN {
        elapsed / FADE_IN
    } else if elapsed < FADE_IN + HOLD {
        1.0
    } else {
        (1.0 - (elapsed - FADE_IN - HOLD) / FADE_OUT).clamp(0.0, 1.0)
    }
}

/// Credit screen shown at launch. Fades its text in and out, then moves on to
/// the title screen; any key skips ahead.
pub struct SplashScene {
    input: InputProfile,
    /// Pixels per grid unit, handed on to the title screen.
    unit: u32,
    background: Background,
    font: Option<FontAtlas>,
    center: Vec2,
    /// Seconds since the scene started, `None` until it has.
    elapsed: Option<f32>,
    alpha: f32,
    changing: bool,
}

impl SplashScene {
    pub fn new(input: InputProfile, unit: u32) -> Self {
        Self {
            input,
            unit,
            background: Background::new(Vec2::new(60.0, -60.0)),
            font: None,
            center: Vec2::ZERO,
            elapsed: None,
            alpha: 0.0,
            changing: false,
        }
    }
}

impl SceneLogic for SplashScene {
    fn load_content(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        self.background.load(ctx)?;
        self.font = Some(ctx.content.default_font(ctx.graphics, 64.0)?);
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        self.center = ctx.resolution.as_vec2() / 2.0;
        Ok(())
    }

    fn start(&mut self) {
        self.elapsed = Some(0.0);
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.background.update(ctx.dt());
        let Some(elapsed) = self.elapsed.as_mut() else {
            return;
        };
        if self.changing {
            return;
        }

        *elapsed += ctx.dt();
        self.alpha = presentation_alpha(*elapsed);
        let done = *elapsed >= FADE_IN + HOLD + FADE_OUT;
        if done || ctx.input.any_key_pressed() {
            debug!("splash finished (skipped: {})", !done);
            self.changing = true;
            let title = Scene::new("title", TitleScene::new(self.input.clone(), self.unit));
            ctx.change_scene_with(
                title,
                Some(Transition::even_odd_tiles(self.unit, 1.0)),
                Some(Transition::even_odd_tiles(self.unit, 1.0)),
            );
        }
    }

    fn draw(&mut self, gfx: &mut dyn Graphics) {
        self.background.draw(gfx);
        if let Some(font) = &self.font {
            font.draw_centered(
                gfx,
                "Created With Tinyframe",
                self.center,
                Color::WHITE.fade(self.alpha),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_fades_in_holds_and_fades_out() {
        assert_eq!(presentation_alpha(0.0), 0.0);
        assert_eq!(presentation_alpha(0.25), 0.5);
        assert_eq!(presentation_alpha(1.0), 1.0);
        assert_eq!(presentation_alpha(1.75), 0.5);
        assert_eq!(presentation_alpha(5.0), 0.0);
    }
}
