//! Window manager core.
//!
//! The manager owns the windows (a slab indexed by [`WindowId`]; windows
//! are never destroyed), the z-order, and the active-window focus. Input
//! routing lives in [`drag`] (mouse) and [`keyboard`] (focused-endpoint
//! dispatch); [`compositor`] turns the scene into pixels.

pub mod compositor;
pub mod drag;
pub mod keyboard;
pub mod layers;
pub mod window;

pub use layers::{LayerStack, MAX_WINDOWS};
pub use window::{Rect, Window, WindowStyle};

use alloc::vec::Vec;

pub type WindowId = usize;

pub struct WindowManager {
    windows: Vec<Window>,
    stack: LayerStack,
    active: Option<WindowId>,
    background_color: u32,
}

impl WindowManager {
    pub fn new(background_color: u32) -> Self {
        WindowManager {
            windows: Vec::new(),
            stack: LayerStack::new(),
            active: None,
            background_color,
        }
    }

    pub fn background_color(&self) -> u32 {
        self.background_color
    }

    /// Adds a window on top of the stack and focuses it. Rejects windows
    /// with an empty frame and fails when the stack is full.
    pub fn add_window(&mut self, window: Window) -> Option<WindowId> {
        if window.frame.width == 0 || window.frame.height == 0 {
            return None;
        }
        let id = self.windows.len();
        if !self.stack.push_back(id) {
            return None;
        }
        self.windows.push(window);
        self.active = Some(id);
        Some(id)
    }

    pub fn window(&self, id: WindowId) -> &Window {
        &self.windows[id]
    }

    pub fn window_mut(&mut self, id: WindowId) -> &mut Window {
        &mut self.windows[id]
    }

    pub fn window_count(&self) -> usize {
        self.stack.count()
    }

    pub fn window_at(&self, z_index: usize) -> Option<WindowId> {
        self.stack.get_at(z_index)
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.active
    }

    /// Topmost window containing the point, with its z-index.
    pub fn hit_test(&self, x: u32, y: u32) -> Option<(WindowId, usize)> {
        for z_index in (0..self.stack.count()).rev() {
            let id = self.stack.get_at(z_index)?;
            if self.windows[id].frame.contains(x, y) {
                return Some((id, z_index));
            }
        }
        None
    }

    /// Raise + focus.
    pub fn activate(&mut self, id: WindowId) -> bool {
        if !self.stack.move_to_front(id) {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn activate_at(&mut self, x: u32, y: u32) -> Option<WindowId> {
        let (id, _) = self.hit_test(x, y)?;
        self.activate(id).then_some(id)
    }
}
