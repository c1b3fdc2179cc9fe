//! Rules for "Snake, but every 10 seconds the food turns into walls".
//!
//! Pure game state: no drawing, no input devices. The play scene feeds it
//! steering and frame time and renders whatever it reports.

use std::collections::VecDeque;

use glam::IVec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seconds between snake moves.
pub const TICK: f32 = 0.1;
/// Seconds between food-to-wall waves.
pub const WAVE_INTERVAL: f32 = 10.0;
/// Countdown before the snake starts moving.
pub const COUNTDOWN: f32 = 3.0;
pub const FOOD_PER_WAVE: usize = 10;
pub const POINTS_PER_FOOD: u32 = 100;
pub const START_LENGTH: i32 = 5;
/// Column the head starts in.
pub const START_COLUMN: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::South => IVec2::new(0, 1),
            Direction::East => IVec2::new(1, 0),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Countdown,
    Playing,
    Paused,
    GameOver,
}

/// What the last tick did, for sound-effect style feedback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub moved: bool,
    pub ate: bool,
    pub wave: bool,
    pub died: bool,
}

pub struct SnakeGame {
    columns: i32,
    rows: i32,
    /// Head first. Each segment remembers the direction it was moving.
    body: VecDeque<(IVec2, Direction)>,
    next_heading: Direction,
    food: Vec<IVec2>,
    walls: Vec<IVec2>,
    score: u32,
    phase: Phase,
    countdown: f32,
    tick_timer: f32,
    wave_timer: f32,
    /// False right after eating, when the tail stays put for a tick.
    tail_moving: bool,
    rng: StdRng,
}

impl SnakeGame {
    /// A new round on a `columns` x `rows` wrapping grid.
    pub fn new(columns: u32, rows: u32, seed: u64) -> Self {
        let columns = columns.max(START_COLUMN as u32 + 1) as i32;
        let rows = rows.max(1) as i32;
        let body = (0..START_LENGTH)
            .map(|i| (IVec2::new(START_COLUMN - i, rows / 2), Direction::East))
            .collect();
        let mut game = Self {
            columns,
            rows,
            body,
            next_heading: Direction::East,
            food: Vec::new(),
            walls: Vec::new(),
            score: 0,
            phase: Phase::Countdown,
            countdown: COUNTDOWN,
            tick_timer: TICK,
            wave_timer: WAVE_INTERVAL,
            tail_moving: false,
            rng: StdRng::seed_from_u64(seed),
        };
        game.spawn_food(FOOD_PER_WAVE);
        game
    }

    pub fn columns(&self) -> i32 {
        self.columns
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn food(&self) -> &[IVec2] {
        &self.food
    }

    pub fn walls(&self) -> &[IVec2] {
        &self.walls
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn head(&self) -> IVec2 {
        self.body.front().map_or(IVec2::ZERO, |s| s.0)
    }

    pub fn heading(&self) -> Direction {
        self.body.front().map_or(Direction::East, |s| s.1)
    }

    /// Segments head to tail with the direction each is moving.
    pub fn segments(&self) -> impl Iterator<Item = (IVec2, Direction)> + '_ {
        self.body.iter().copied()
    }

    pub fn tail_moving(&self) -> bool {
        self.tail_moving
    }

    /// Whole seconds left on the start countdown, rounded up.
    pub fn countdown_seconds(&self) -> u32 {
        self.countdown.max(0.0).ceil() as u32
    }

    /// Whole seconds until the next wave, rounded up.
    pub fn wave_seconds(&self) -> u32 {
        self.wave_timer.max(0.0).ceil() as u32
    }

    /// How far the current tick has progressed, 0 right after a move.
    pub fn tick_fraction(&self) -> f32 {
        (1.0 - self.tick_timer / TICK).clamp(0.0, 1.0)
    }

    /// Queue a turn for the next move. Reversing onto the body is ignored.
    pub fn steer(&mut self, dir: Direction) {
        if dir.is_vertical() != self.heading().is_vertical() {
            self.next_heading = dir;
        }
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            Phase::Playing => Phase::Paused,
            Phase::Paused => Phase::Playing,
            other => other,
        };
    }

    /// Advance timers by `dt` seconds, moving the snake on each elapsed tick.
    pub fn update(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        match self.phase {
            Phase::Countdown => {
                self.countdown -= dt;
                if self.countdown <= 0.0 {
                    self.phase = Phase::Playing;
                }
            }
            Phase::Playing => {
                self.tick_timer -= dt;
                if self.tick_timer <= 0.0 {
                    self.tick_timer = TICK;
                    let tick = self.tick();
                    report.moved = tick.moved;
                    report.ate = tick.ate;
                    report.died = tick.died;
                }
                if self.phase == Phase::Playing {
                    self.wave_timer -= dt;
                    if self.wave_timer <= 0.0 {
                        self.wave_timer = WAVE_INTERVAL;
                        self.wave();
                        report.wave = true;
                    }
                }
            }
            Phase::Paused | Phase::GameOver => {}
        }
        report
    }

    /// Move the snake one cell.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.phase != Phase::Playing {
            return report;
        }
        let heading = self.next_heading;
        let next = self.wrap(self.head() + heading.delta());
        report.moved = true;

        if self.walls.contains(&next) {
            self.phase = Phase::GameOver;
            report.died = true;
            return report;
        }

        if let Some(front) = self.body.front_mut() {
            front.1 = heading;
        }
        if let Some(i) = self.food.iter().position(|&f| f == next) {
            self.food.swap_remove(i);
            self.score += POINTS_PER_FOOD;
            self.tail_moving = false;
            report.ate = true;
        } else {
            self.body.pop_back();
            self.tail_moving = true;
        }

        if self.body.iter().any(|s| s.0 == next) {
            self.phase = Phase::GameOver;
            report.died = true;
        }
        self.body.push_front((next, heading));
        report
    }

    /// Turn all remaining food into walls and spawn a fresh batch.
    pub fn wave(&mut self) {
        let food = std::mem::take(&mut self.food);
        self.walls.extend(food);
        self.spawn_food(FOOD_PER_WAVE);
    }

    fn wrap(&self, cell: IVec2) -> IVec2 {
        IVec2::new(cell.x.rem_euclid(self.columns), cell.y.rem_euclid(self.rows))
    }

    fn is_occupied(&self, cell: IVec2) -> bool {
        self.body.iter().any(|s| s.0 == cell) || self.food.contains(&cell) || self.walls.contains(&cell)
    }

    fn spawn_food(&mut self, count: usize) {
        let empty: Vec<IVec2> = (0..self.rows)
            .flat_map(|y| (0..self.columns).map(move |x| IVec2::new(x, y)))
            .filter(|&c| !self.is_occupied(c))
            .collect();
        let picked: Vec<IVec2> = empty
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        self.food.extend(picked);
    }

    #[cfg(test)]
    fn set_food(&mut self, food: Vec<IVec2>) {
        self.food = food;
    }

    #[cfg(test)]
    fn set_walls(&mut self, walls: Vec<IVec2>) {
        self.walls = walls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(columns: u32, rows: u32) -> SnakeGame {
        let mut game = SnakeGame::new(columns, rows, 7);
        game.set_food(Vec::new());
        game.update(COUNTDOWN);
        assert_eq!(game.phase(), Phase::Playing);
        game
    }

    #[test]
    fn starts_heading_east_in_middle_row() {
        let game = SnakeGame::new(40, 20, 1);
        let cells: Vec<_> = game.segments().map(|s| s.0).collect();
        assert_eq!(
            cells,
            (0..5).map(|i| IVec2::new(10 - i, 10)).collect::<Vec<_>>()
        );
        assert_eq!(game.heading(), Direction::East);
        assert_eq!(game.food().len(), FOOD_PER_WAVE);
        assert!(game.food().iter().all(|f| !cells.contains(f)));
        assert_eq!(game.phase(), Phase::Countdown);
    }

    #[test]
    fn countdown_reports_whole_seconds() {
        let mut game = SnakeGame::new(40, 20, 1);
        assert_eq!(game.countdown_seconds(), 3);
        game.update(0.5);
        assert_eq!(game.countdown_seconds(), 3);
        game.update(1.0);
        assert_eq!(game.countdown_seconds(), 2);
        game.update(1.5);
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test]
    fn moves_once_per_tick() {
        let mut game = playing(40, 20);
        game.update(TICK / 2.0);
        assert_eq!(game.head(), IVec2::new(10, 10));
        let report = game.update(TICK / 2.0);
        assert!(report.moved);
        assert_eq!(game.head(), IVec2::new(11, 10));
        assert_eq!(game.len(), 5);
    }

    #[test]
    fn cannot_reverse() {
        let mut game = playing(40, 20);
        game.steer(Direction::West);
        game.tick();
        assert_eq!(game.heading(), Direction::East);
        game.steer(Direction::North);
        game.tick();
        assert_eq!(game.heading(), Direction::North);
        assert_eq!(game.head(), IVec2::new(11, 9));
    }

    #[test]
    fn wraps_at_edges() {
        let mut game = playing(12, 3);
        game.tick();
        assert_eq!(game.head(), IVec2::new(11, 1));
        game.tick();
        assert_eq!(game.head(), IVec2::new(0, 1));
        game.steer(Direction::North);
        game.tick();
        game.tick();
        assert_eq!(game.head(), IVec2::new(0, 2));
    }

    #[test]
    fn eating_grows_and_scores() {
        let mut game = playing(40, 20);
        game.set_food(vec![IVec2::new(11, 10)]);
        let report = game.tick();
        assert!(report.ate);
        assert_eq!(game.len(), 6);
        assert_eq!(game.score(), POINTS_PER_FOOD);
        assert!(game.food().is_empty());
        assert!(!game.tail_moving());
    }

    #[test]
    fn hitting_a_wall_ends_the_game() {
        let mut game = playing(40, 20);
        game.set_walls(vec![IVec2::new(11, 10)]);
        assert!(game.tick().died);
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.head(), IVec2::new(10, 10));
        assert!(!game.update(1.0).moved);
    }

    #[test]
    fn biting_itself_ends_the_game() {
        let mut game = playing(40, 20);
        for _ in 0..5 {
            game.set_food(vec![game.head() + game.heading().delta()]);
            game.tick();
        }
        assert_eq!(game.len(), 10);
        for dir in [Direction::North, Direction::West, Direction::South] {
            game.steer(dir);
            game.tick();
        }
        assert_eq!(game.phase(), Phase::GameOver);
    }

    #[test]
    fn following_the_tail_is_safe() {
        // A 2x2 loop: the head moves into the cell the tail just left.
        let mut game = playing(40, 20);
        game.body = VecDeque::from(vec![
            (IVec2::new(0, 0), Direction::West),
            (IVec2::new(1, 0), Direction::West),
            (IVec2::new(1, 1), Direction::North),
            (IVec2::new(0, 1), Direction::East),
        ]);
        game.next_heading = Direction::South;
        game.tick();
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.head(), IVec2::new(0, 1));
    }

    #[test]
    fn wave_turns_food_into_walls() {
        let mut game = SnakeGame::new(40, 20, 3);
        let food: Vec<_> = game.food().to_vec();
        game.update(COUNTDOWN);
        game.set_food(food.clone());
        game.set_walls(Vec::new());
        game.wave();
        assert_eq!(game.walls(), food.as_slice());
        assert_eq!(game.food().len(), FOOD_PER_WAVE);
        assert!(game.food().iter().all(|f| !game.walls().contains(f)));
    }

    #[test]
    fn wave_fires_every_ten_seconds() {
        let mut game = playing(40, 20);
        game.set_walls(Vec::new());
        assert_eq!(game.wave_seconds(), 10);
        let mut waves = 0;
        // Keep heading east, wrapping around an empty grid.
        for _ in 0..105 {
            game.set_food(Vec::new());
            if game.update(TICK).wave {
                waves += 1;
            }
        }
        assert_eq!(waves, 1);
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test]
    fn pause_freezes_timers() {
        let mut game = playing(40, 20);
        game.toggle_pause();
        assert_eq!(game.phase(), Phase::Paused);
        game.update(5.0);
        assert_eq!(game.head(), IVec2::new(10, 10));
        game.toggle_pause();
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test]
    fn food_spawns_only_in_empty_cells() {
        // 11x1 grid: five snake cells leave six free cells for ten requested.
        let game = SnakeGame::new(11, 1, 9);
        assert_eq!(game.food().len(), 6);
    }
}
