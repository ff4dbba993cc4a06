//! Focus-based keyboard routing.
//!
//! Windows register a non-zero endpoint id; a single sink receives
//! `(endpoint_id, event)` pairs for whatever window currently holds focus.
//! Events arriving with no active window, or for a window without an
//! endpoint, are dropped; keystrokes never leak to an unfocused session.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{WindowId, WindowManager};
use crate::input::keyboard::{KeyEvent, Keyboard};

pub type KeySink = Box<dyn FnMut(u32, &KeyEvent) + Send>;

pub struct KeyboardRouter {
    endpoints: Vec<(WindowId, u32)>,
    sink: Option<KeySink>,
}

impl KeyboardRouter {
    pub fn new() -> Self {
        KeyboardRouter {
            endpoints: Vec::new(),
            sink: None,
        }
    }

    /// Binds (or rebinds) a window to an endpoint id. Zero is reserved.
    pub fn register_window(&mut self, window: WindowId, endpoint_id: u32) -> bool {
        if endpoint_id == 0 {
            return false;
        }
        if let Some(slot) = self.endpoints.iter_mut().find(|(w, _)| *w == window) {
            slot.1 = endpoint_id;
            return true;
        }
        if self.endpoints.len() >= super::MAX_WINDOWS {
            return false;
        }
        self.endpoints.push((window, endpoint_id));
        true
    }

    pub fn endpoint_for(&self, window: WindowId) -> Option<u32> {
        self.endpoints
            .iter()
            .find(|(w, _)| *w == window)
            .map(|&(_, id)| id)
    }

    pub fn set_sink(&mut self, sink: KeySink) {
        self.sink = Some(sink);
    }

    /// Drains decoded key events toward the focused endpoint. Returns how
    /// many events were delivered (dropped events are consumed silently).
    pub fn dispatch_pending(&mut self, keyboard: &mut Keyboard, wm: &WindowManager) -> u32 {
        let mut delivered = 0;
        while let Some(event) = keyboard.pop() {
            let Some(active) = wm.active_window() else {
                continue;
            };
            let Some(endpoint) = self.endpoint_for(active) else {
                continue;
            };
            if let Some(sink) = self.sink.as_mut() {
                sink(endpoint, &event);
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for KeyboardRouter {
    fn default() -> Self {
        Self::new()
    }
}
