//! Mouse routing and the drag state machine.
//!
//! Windows register with a task id; popped mouse events are dispatched to
//! the task bound to the window they land on. A left press in a title bar
//! starts a drag: while the button stays held, moves reposition the bound
//! window (saturating at the screen origin) and dispatch `Drag` instead of
//! `Move`. Release dispatches `ClickUp` and drops the binding.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{WindowId, WindowManager};
use crate::input::mouse::Mouse;
use crate::input::{MouseButtons, MouseEvent, MouseEventKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchKind {
    Move,
    Drag,
    ClickDown,
    ClickUp,
}

pub type MouseSink = Box<dyn FnMut(u32, DispatchKind, &MouseEvent) + Send>;

struct Binding {
    window: WindowId,
    task_id: u32,
}

pub struct DragRouter {
    bindings: Vec<Binding>,
    drag_binding: Option<usize>,
    drag_offset: (u32, u32),
    sink: Option<MouseSink>,
}

impl DragRouter {
    pub fn new() -> Self {
        DragRouter {
            bindings: Vec::new(),
            drag_binding: None,
            drag_offset: (0, 0),
            sink: None,
        }
    }

    pub fn register_window(&mut self, window: WindowId, task_id: u32) -> bool {
        if self.bindings.len() >= super::MAX_WINDOWS {
            return false;
        }
        self.bindings.push(Binding { window, task_id });
        true
    }

    pub fn set_sink(&mut self, sink: MouseSink) {
        self.sink = Some(sink);
    }

    fn binding_for(&self, window: WindowId) -> Option<usize> {
        self.bindings.iter().position(|b| b.window == window)
    }

    fn binding_at(&self, wm: &WindowManager, x: u32, y: u32) -> Option<usize> {
        let (window, _) = wm.hit_test(x, y)?;
        self.binding_for(window)
    }

    fn dispatch(&mut self, binding: usize, kind: DispatchKind, event: &MouseEvent) {
        let task_id = self.bindings[binding].task_id;
        if let Some(sink) = self.sink.as_mut() {
            sink(task_id, kind, event);
        }
    }

    /// Drains the mouse queue through the state machine. Returns how many
    /// events were consumed.
    pub fn dispatch_pending(&mut self, mouse: &mut Mouse, wm: &mut WindowManager) -> u32 {
        let mut processed = 0;
        while let Some(event) = mouse.pop() {
            self.process(&event, wm);
            processed += 1;
        }
        processed
    }

    fn process(&mut self, event: &MouseEvent, wm: &mut WindowManager) {
        match event.kind {
            MouseEventKind::Move => self.on_move(event, wm),
            MouseEventKind::ButtonDown => self.on_button_down(event, wm),
            MouseEventKind::ButtonUp => self.on_button_up(event, wm),
        }
    }

    fn on_move(&mut self, event: &MouseEvent, wm: &mut WindowManager) {
        if let Some(binding) = self.drag_binding {
            if event.buttons.contains(MouseButtons::LEFT) {
                let window = self.bindings[binding].window;
                let frame = &mut wm.window_mut(window).frame;
                frame.x = event.x.saturating_sub(self.drag_offset.0);
                frame.y = event.y.saturating_sub(self.drag_offset.1);
                self.dispatch(binding, DispatchKind::Drag, event);
                return;
            }
        }

        if let Some(binding) = self.binding_at(wm, event.x, event.y) {
            self.dispatch(binding, DispatchKind::Move, event);
        }
    }

    fn on_button_down(&mut self, event: &MouseEvent, wm: &mut WindowManager) {
        let Some(binding) = self.binding_at(wm, event.x, event.y) else {
            return;
        };
        let window = self.bindings[binding].window;

        wm.activate(window);
        self.dispatch(binding, DispatchKind::ClickDown, event);

        if event.button.contains(MouseButtons::LEFT) {
            let win = wm.window(window);
            if win.title_bar_rect().contains(event.x, event.y) {
                self.drag_binding = Some(binding);
                self.drag_offset = (event.x - win.frame.x, event.y - win.frame.y);
            }
        }
    }

    fn on_button_up(&mut self, event: &MouseEvent, wm: &mut WindowManager) {
        let binding = self
            .drag_binding
            .or_else(|| self.binding_at(wm, event.x, event.y));
        if let Some(binding) = binding {
            self.dispatch(binding, DispatchKind::ClickUp, event);
        }
        if event.button.contains(MouseButtons::LEFT) {
            self.drag_binding = None;
        }
    }
}

impl Default for DragRouter {
    fn default() -> Self {
        Self::new()
    }
}
