use glam::{IVec2, Vec2};
use log::{debug, info};
use tinyframe::{
    Color, FontAtlas, Graphics, ImageSource, LoadContext, Rect, Scene, SceneError, SceneLogic,
    Sprite, TextureId, Transition, UpdateContext,
};

use super::snake::{Direction, Phase, SnakeGame};
use super::{Background, HUD_HEIGHT, InputProfile, grid_cell_image, upload};

const SCROLL_SPEED: f32 = 60.0;
const SHADOW_OFFSET: f32 = 4.0;
const FOOD: Color = Color::rgb(1.0, 0.85, 0.1);
const WALL: Color = Color::rgb(0.5, 0.5, 0.5);
const GAME_OVER_SIZE: Vec2 = Vec2::new(640.0, 240.0);

struct Fonts {
    hud: FontAtlas,
    big: FontAtlas,
    countdown: FontAtlas,
}

/// One round of the game. Retrying replaces the scene with a fresh one.
pub struct PlayScene {
    input: InputProfile,
    unit: u32,
    seed: u64,
    game: SnakeGame,
    background: Background,
    grid_texture: Option<TextureId>,
    grid: Rect,
    hud: Rect,
    game_over_box: Rect,
    /// Loaded with the rest of the scene's content.
    fonts: Option<Fonts>,
    changing: bool,
}

impl PlayScene {
    pub fn new(input: InputProfile, unit: u32) -> Self {
        Self::with_seed(input, unit, rand::random())
    }

    pub fn with_seed(input: InputProfile, unit: u32, seed: u64) -> Self {
        Self {
            input,
            unit: unit.max(1),
            seed,
            // Replaced by a game sized to the grid in `initialize`.
            game: SnakeGame::new(0, 0, seed),
            background: Background::new(Vec2::ZERO),
            grid_texture: None,
            grid: Rect::default(),
            hud: Rect::default(),
            game_over_box: Rect::default(),
            fonts: None,
            changing: false,
        }
    }

    fn cell_rect(&self, cell: IVec2) -> Rect {
        let unit = self.unit as f32;
        Rect::new(
            self.grid.x + cell.x as f32 * unit,
            self.grid.y + cell.y as f32 * unit,
            unit,
            unit,
        )
    }

    fn steer(&mut self, ctx: &UpdateContext<'_>) {
        let input = ctx.input;
        let steering = [
            (&self.input.move_up, Direction::North),
            (&self.input.move_down, Direction::South),
            (&self.input.move_left, Direction::West),
            (&self.input.move_right, Direction::East),
        ];
        if let Some(&(_, dir)) = steering.iter().find(|(button, _)| button.pressed(input)) {
            self.game.steer(dir);
        }
    }

    fn retry(&mut self, ctx: &mut UpdateContext<'_>) {
        info!("retrying after scoring {}", self.game.score());
        self.changing = true;
        let tile = (ctx.resolution.x / 4).max(1);
        let next = Scene::new("play", PlayScene::new(self.input.clone(), self.unit));
        ctx.change_scene_with(
            next,
            Some(Transition::even_odd_tiles(tile, 1.0)),
            Some(Transition::even_odd_tiles(tile, 1.0)),
        );
    }

    fn draw_grid(&self, gfx: &mut dyn Graphics) {
        let shadow = Rect::new(
            self.grid.x + SHADOW_OFFSET,
            self.grid.y + SHADOW_OFFSET,
            self.grid.width,
            self.grid.height,
        );
        gfx.fill_rect(shadow, Color::BLACK.fade(0.5));
        gfx.fill_rect(self.grid, Color::BLACK.fade(0.9));
        if let Some(texture) = self.grid_texture {
            let sprite = Sprite::new(self.grid)
                .source(Rect::from_size(self.grid.size()))
                .tint(Color::WHITE.fade(0.5));
            gfx.draw_image(ImageSource::Texture(texture), &sprite);
        }
        gfx.outline_rect(self.grid, Color::WHITE, 1.0);
    }

    fn draw_snake(&self, gfx: &mut dyn Graphics) {
        // The head grows into its cell and the tail shrinks out of its own
        // over the course of a tick.
        let fraction = match self.game.phase() {
            Phase::Playing | Phase::Paused => self.game.tick_fraction(),
            Phase::Countdown | Phase::GameOver => 1.0,
        };
        let last = self.game.len().saturating_sub(1);
        for (i, (cell, dir)) in self.game.segments().enumerate() {
            let rect = self.cell_rect(cell);
            let rect = if i == 0 {
                grow_toward(rect, dir, fraction)
            } else if i == last && self.game.tail_moving() {
                shrink_behind(rect, dir, fraction)
            } else {
                rect
            };
            gfx.fill_rect(rect, Color::WHITE);
        }
    }

    fn draw_hud(&self, gfx: &mut dyn Graphics) {
        gfx.fill_rect(self.hud, Color::BLACK.fade(0.8));
        gfx.outline_rect(self.hud, Color::WHITE, 1.0);
        let center = self.hud.center();
        let Some(fonts) = &self.fonts else {
            return;
        };

        match self.game.phase() {
            Phase::Countdown => {
                gfx.fill_rect(self.grid, Color::BLACK.fade(0.4));
                let count = self.game.countdown_seconds().to_string();
                fonts.countdown.draw_centered(gfx, &count, self.grid.center(), Color::WHITE);
            }
            Phase::GameOver => {
                let panel = self.game_over_box;
                gfx.fill_rect(panel, Color::BLACK.fade(0.8));
                gfx.outline_rect(panel, Color::WHITE, 1.0);
                let line = panel.height / 4.0;
                let top = panel.y;
                fonts.big.draw_centered(
                    gfx,
                    "Game Over",
                    Vec2::new(panel.center().x, top + line),
                    Color::WHITE,
                );
                let score = format!("Score: {}", self.game.score());
                fonts.hud.draw_centered(
                    gfx,
                    &score,
                    Vec2::new(panel.center().x, top + line * 2.0),
                    Color::WHITE,
                );
                fonts.hud.draw_centered(
                    gfx,
                    "Press Enter To Try Again",
                    Vec2::new(panel.center().x, top + line * 3.0),
                    Color::WHITE,
                );
            }
            Phase::Paused => {
                fonts.hud.draw_centered(
                    gfx,
                    "Paused! ESC to unpause or Enter to restart",
                    center,
                    Color::WHITE,
                );
            }
            Phase::Playing => {
                let margin = self.unit as f32;
                let score = format!("Score: {:09}", self.game.score());
                let size = fonts.hud.measure(&score);
                fonts.hud.draw_text(
                    gfx,
                    &score,
                    Vec2::new(self.hud.x + margin, center.y - size.y / 2.0).round(),
                    Color::WHITE,
                );
                let wave = format!("Next Wave in {}s", self.game.wave_seconds());
                let size = fonts.hud.measure(&wave);
                fonts.hud.draw_text(
                    gfx,
                    &wave,
                    Vec2::new(self.hud.right() - margin - size.x, center.y - size.y / 2.0).round(),
                    Color::WHITE,
                );
            }
        }
    }
}

/// The part of `cell` a segment moving in `dir` has entered after `fraction`
/// of a tick.
fn grow_toward(cell: Rect, dir: Direction, fraction: f32) -> Rect {
    let w = cell.width * fraction;
    let h = cell.height * fraction;
    match dir {
        Direction::East => Rect::new(cell.x, cell.y, w, cell.height),
        Direction::West => Rect::new(cell.right() - w, cell.y, w, cell.height),
        Direction::South => Rect::new(cell.x, cell.y, cell.width, h),
        Direction::North => Rect::new(cell.x, cell.bottom() - h, cell.width, h),
    }
}

/// The part of `cell` a segment moving in `dir` still covers after `fraction`
/// of a tick.
fn shrink_behind(cell: Rect, dir: Direction, fraction: f32) -> Rect {
    let opposite = match dir {
        Direction::East => Direction::West,
        Direction::West => Direction::East,
        Direction::North => Direction::South,
        Direction::South => Direction::North,
    };
    grow_toward(cell, opposite, 1.0 - fraction)
}

impl SceneLogic for PlayScene {
    fn load_content(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        self.background.load(ctx)?;
        let cell = grid_cell_image(self.unit);
        self.grid_texture = Some(upload(ctx, &cell, "grid cell")?);
        self.fonts = Some(Fonts {
            hud: ctx.content.default_font(ctx.graphics, 32.0)?,
            big: ctx.content.default_font(ctx.graphics, 64.0)?,
            countdown: ctx.content.default_font(ctx.graphics, 128.0)?,
        });
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), SceneError> {
        let res = ctx.resolution.as_vec2();
        let columns = ctx.resolution.x / self.unit;
        let rows = (res.y - HUD_HEIGHT).max(0.0) as u32 / self.unit;
        self.game = SnakeGame::new(columns, rows, self.seed);

        let unit = self.unit as f32;
        self.grid = Rect::new(
            0.0,
            0.0,
            self.game.columns() as f32 * unit,
            self.game.rows() as f32 * unit,
        );
        self.hud = Rect::new(0.0, res.y - HUD_HEIGHT, res.x, HUD_HEIGHT);
        self.game_over_box = Rect::centered(res / 2.0, GAME_OVER_SIZE);
        debug!("play grid is {}x{} cells", self.game.columns(), self.game.rows());
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.changing {
            return;
        }
        let input = ctx.input;
        match self.game.phase() {
            Phase::Playing | Phase::Paused if self.input.pause.pressed(input) => {
                self.game.toggle_pause();
            }
            Phase::Paused | Phase::GameOver if self.input.retry.pressed(input) => {
                self.retry(ctx);
                return;
            }
            _ => {}
        }

        self.steer(ctx);
        let report = self.game.update(ctx.dt());
        if report.wave {
            debug!("wave: {} walls on the board", self.game.walls().len());
        }
        if report.died {
            info!("game over with a score of {}", self.game.score());
        }

        let heading = self.game.heading().delta().as_vec2();
        self.background.set_velocity(heading * SCROLL_SPEED);
        self.background.update(ctx.dt());
    }

    fn draw(&mut self, gfx: &mut dyn Graphics) {
        self.background.draw(gfx);
        self.draw_grid(gfx);

        for &food in self.game.food() {
            gfx.fill_rect(self.cell_rect(food).inset(4.0), FOOD);
        }
        for &wall in self.game.walls() {
            let rect = self.cell_rect(wall);
            gfx.fill_rect(rect, WALL);
            gfx.outline_rect(rect, Color::WHITE, 1.0);
        }
        self.draw_snake(gfx);
        self.draw_hud(gfx);
    }
}
