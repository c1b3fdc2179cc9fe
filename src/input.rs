use std::collections::HashSet;

use glam::{UVec2, Vec2};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::graphics::Viewport;

/// Tracks input state for keyboard and mouse.
///
/// Cursor positions are reported in game coordinates once the frame driver
/// has supplied the current viewport with [`Input::set_view`].
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_buttons_released: HashSet<MouseButton>,
    window_position: Vec2,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    view: Option<(Viewport, UVec2)>,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            keys_released: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            mouse_buttons_pressed: HashSet::new(),
            mouse_buttons_released: HashSet::new(),
            window_position: Vec2::ZERO,
            mouse_position: Vec2::ZERO,
            mouse_delta: Vec2::ZERO,
            scroll_delta: Vec2::ZERO,
            view: None,
        }
    }
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.mouse_buttons_pressed.clear();
        self.mouse_buttons_released.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    /// Map future cursor positions from window space through `viewport` into a
    /// game space of size `resolution`.
    pub fn set_view(&mut self, viewport: Viewport, resolution: UVec2) {
        self.view = Some((viewport, resolution));
        self.mouse_position = self.to_game(self.window_position);
    }

    fn to_game(&self, window_pos: Vec2) -> Vec2 {
        match self.view {
            Some((viewport, resolution)) => viewport.to_game(window_pos, resolution),
            None => window_pos,
        }
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_mouse(*button),
                ElementState::Released => self.release_mouse(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 120.0
                    }
                };
                self.scroll_delta += d;
            }
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    /// Record a key press. Holding a key reports `pressed` only once.
    pub fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    pub fn press_mouse(&mut self, button: MouseButton) {
        if self.mouse_buttons_down.insert(button) {
            self.mouse_buttons_pressed.insert(button);
        }
    }

    pub fn release_mouse(&mut self, button: MouseButton) {
        if self.mouse_buttons_down.remove(&button) {
            self.mouse_buttons_released.insert(button);
        }
    }

    /// Move the cursor to a window-space position.
    pub fn move_cursor(&mut self, window_pos: Vec2) {
        let game_pos = self.to_game(window_pos);
        self.mouse_delta += game_pos - self.mouse_position;
        self.mouse_position = game_pos;
        self.window_position = window_pos;
    }

    /// Release everything held, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        let keys: Vec<_> = self.keys_down.drain().collect();
        self.keys_released.extend(keys);
        let buttons: Vec<_> = self.mouse_buttons_down.drain().collect();
        self.mouse_buttons_released.extend(buttons);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the key was released this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Returns true if any key was pressed this frame.
    pub fn any_key_pressed(&self) -> bool {
        !self.keys_pressed.is_empty()
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Returns true if the mouse button was released this frame.
    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse_buttons_released.contains(&button)
    }

    /// Current mouse position in game coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Current mouse position in window coordinates.
    pub fn window_mouse_position(&self) -> Vec2 {
        self.window_position
    }

    /// Mouse movement delta this frame, in game coordinates.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame (in "lines").
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

/// Several physical inputs queried as one logical button.
///
/// ```ignore
/// let confirm = VirtualButton::new("confirm")
///     .key(KeyCode::Enter)
///     .key(KeyCode::Space)
///     .mouse(MouseButton::Left);
/// if confirm.pressed(ctx.input) { /* ... */ }
/// ```
#[derive(Clone, Debug, Default)]
pub struct VirtualButton {
    name: String,
    keys: Vec<KeyCode>,
    buttons: Vec<MouseButton>,
}

impl VirtualButton {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            buttons: Vec::new(),
        }
    }

    pub fn key(mut self, key: KeyCode) -> Self {
        self.keys.push(key);
        self
    }

    pub fn mouse(mut self, button: MouseButton) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Held through any bound input.
    pub fn down(&self, input: &Input) -> bool {
        self.keys.iter().any(|&k| input.key_down(k))
            || self.buttons.iter().any(|&b| input.mouse_down(b))
    }

    /// Pressed this frame through any bound input.
    pub fn pressed(&self, input: &Input) -> bool {
        self.keys.iter().any(|&k| input.key_pressed(k))
            || self.buttons.iter().any(|&b| input.mouse_pressed(b))
    }

    /// Released this frame through any bound input, with nothing else still holding it.
    pub fn released(&self, input: &Input) -> bool {
        let released = self.keys.iter().any(|&k| input.key_released(k))
            || self.buttons.iter().any(|&b| input.mouse_released(b));
        released && !self.down(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::letterbox;

    #[test]
    fn pressed_is_per_frame_down_is_held() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyA);
        assert!(input.key_pressed(KeyCode::KeyA));
        assert!(input.any_key_pressed());

        input.begin_frame();
        input.press_key(KeyCode::KeyA);
        assert!(!input.key_pressed(KeyCode::KeyA));
        assert!(input.key_down(KeyCode::KeyA));

        input.release_key(KeyCode::KeyA);
        assert!(input.key_released(KeyCode::KeyA));
        assert!(!input.key_down(KeyCode::KeyA));
        input.begin_frame();
        assert!(!input.key_released(KeyCode::KeyA));
    }

    #[test]
    fn releasing_unheld_key_reports_nothing() {
        let mut input = Input::new();
        input.release_key(KeyCode::Escape);
        assert!(!input.key_released(KeyCode::Escape));
    }

    #[test]
    fn virtual_button_combines_keys_and_mouse() {
        let confirm = VirtualButton::new("confirm")
            .key(KeyCode::Enter)
            .key(KeyCode::Space)
            .mouse(MouseButton::Left);
        let mut input = Input::new();
        assert!(!confirm.down(&input));

        input.press_mouse(MouseButton::Left);
        assert!(confirm.pressed(&input));
        input.begin_frame();
        input.press_key(KeyCode::Space);
        input.release_mouse(MouseButton::Left);
        assert!(confirm.down(&input));
        assert!(!confirm.released(&input));

        input.begin_frame();
        input.release_key(KeyCode::Space);
        assert!(confirm.released(&input));
        assert_eq!(confirm.name(), "confirm");
    }

    #[test]
    fn cursor_maps_through_viewport() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(320.0, 180.0));
        assert_eq!(input.mouse_position(), Vec2::new(320.0, 180.0));

        let res = UVec2::new(1280, 720);
        input.set_view(letterbox(UVec2::new(640, 360), res, 0.0), res);
        assert_eq!(input.mouse_position(), Vec2::new(640.0, 360.0));
        assert_eq!(input.mouse_delta(), Vec2::new(320.0, 180.0));

        input.begin_frame();
        input.move_cursor(Vec2::new(0.0, 0.0));
        assert_eq!(input.mouse_position(), Vec2::ZERO);
        assert_eq!(input.mouse_delta(), Vec2::new(-640.0, -360.0));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = Input::new();
        input.press_key(KeyCode::ArrowUp);
        input.press_mouse(MouseButton::Right);
        input.release_all();
        assert!(!input.key_down(KeyCode::ArrowUp));
        assert!(input.key_released(KeyCode::ArrowUp));
        assert!(input.mouse_released(MouseButton::Right));
    }
}
