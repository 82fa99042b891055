//! Pointer and keyboard input for the diorama viewer.

use glam::Vec2;
use std::collections::HashSet;

/// Last observed pointer location in normalized device coordinates.
///
/// `x` grows to the right and `y` grows upwards, both in `[-1, 1]` while the
/// pointer is inside the viewport. Only the most recent sample matters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub ndc: Vec2,
}

impl PointerState {
    pub fn new(x: f32, y: f32) -> Self {
        Self { ndc: Vec2::new(x, y) }
    }

    /// Convert a window-space position (pixels, origin top-left) to NDC.
    pub fn from_window(position: Vec2, viewport: Vec2) -> Self {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return Self::default();
        }
        Self::new(
            (position.x / viewport.x) * 2.0 - 1.0,
            -(position.y / viewport.y) * 2.0 + 1.0,
        )
    }
}

/// Manages input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,

    /// Mouse buttons currently held.
    mouse_held: HashSet<MouseButton>,

    /// Pointer position in window coordinates.
    mouse_position: Vec2,
    /// Viewport size in physical pixels.
    viewport: Vec2,
    /// Mouse movement delta this frame.
    mouse_delta: Vec2,
    /// Raw motion accumulated since the last frame.
    accumulated_delta: Vec2,

    /// Wheel lines this frame (positive = away from the user).
    scroll: f32,
    accumulated_scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
        self.scroll = self.accumulated_scroll;
        self.accumulated_scroll = 0.0;
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process a mouse button event.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Process raw mouse movement.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.accumulated_delta.x += delta.0 as f32;
        self.accumulated_delta.y += delta.1 as f32;
    }

    /// Process cursor position update.
    pub fn process_cursor_position(&mut self, position: (f64, f64)) {
        self.mouse_position = Vec2::new(position.0 as f32, position.1 as f32);
    }

    /// Process a wheel event, in lines.
    pub fn process_scroll(&mut self, lines: f32) {
        self.accumulated_scroll += lines;
    }

    /// Record the viewport size (call on resize).
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
    }

    // Query methods

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a mouse button is held.
    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Get the mouse movement delta for this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Wheel lines scrolled this frame.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Latest pointer sample in normalized device coordinates.
    pub fn pointer(&self) -> PointerState {
        PointerState::from_window(self.mouse_position, self.viewport)
    }

    /// Rotate the view (left drag).
    pub fn is_orbiting(&self) -> bool {
        self.is_mouse_held(MouseButton::Left)
    }

    /// Pan the view (right or middle drag).
    pub fn is_panning(&self) -> bool {
        self.is_mouse_held(MouseButton::Right) || self.is_mouse_held(MouseButton::Middle)
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_corners_map_to_ndc_corners() {
        let viewport = Vec2::new(800.0, 600.0);
        assert_eq!(PointerState::from_window(Vec2::ZERO, viewport).ndc, Vec2::new(-1.0, 1.0));
        assert_eq!(PointerState::from_window(viewport, viewport).ndc, Vec2::new(1.0, -1.0));
        assert_eq!(
            PointerState::from_window(Vec2::new(400.0, 300.0), viewport).ndc,
            Vec2::ZERO
        );
    }

    #[test]
    fn zero_viewport_yields_centre() {
        let p = PointerState::from_window(Vec2::new(10.0, 10.0), Vec2::ZERO);
        assert_eq!(p.ndc, Vec2::ZERO);
    }

    #[test]
    fn pointer_tracks_latest_cursor_sample() {
        let mut input = InputState::new();
        input.set_viewport(200, 100);
        input.process_cursor_position((0.0, 0.0));
        input.process_cursor_position((200.0, 50.0));
        assert_eq!(input.pointer().ndc, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn motion_and_scroll_are_per_frame() {
        let mut input = InputState::new();
        input.process_mouse_motion((3.0, -2.0));
        input.process_mouse_motion((1.0, 1.0));
        input.process_scroll(1.5);
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, -1.0));
        assert_eq!(input.scroll(), 1.5);
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.scroll(), 0.0);
    }

    #[test]
    fn key_press_reported_once() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::Escape));
        input.begin_frame();
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        assert!(!input.is_key_pressed(KeyCode::Escape));
    }

    #[test]
    fn drag_buttons_select_orbit_or_pan() {
        let mut input = InputState::new();
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.is_orbiting());
        assert!(!input.is_panning());
        input.process_mouse_button(MouseButton::Left, ElementState::Released);
        input.process_mouse_button(MouseButton::Right, ElementState::Pressed);
        assert!(input.is_panning());
    }
}
