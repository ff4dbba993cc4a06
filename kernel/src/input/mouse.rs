//! Mouse front-end: latches pointer state and queues composed events.

use crossbeam_queue::ArrayQueue;

use super::{MouseButtons, MouseEvent, MouseEventKind, QUEUE_CAPACITY};

pub struct Mouse {
    x: u32,
    y: u32,
    buttons: MouseButtons,
    queue: ArrayQueue<MouseEvent>,
}

impl Mouse {
    pub fn new() -> Self {
        Mouse {
            x: 0,
            y: 0,
            buttons: MouseButtons::empty(),
            queue: ArrayQueue::new(QUEUE_CAPACITY),
        }
    }

    fn emit(&self, kind: MouseEventKind, button: MouseButtons) -> bool {
        self.queue
            .push(MouseEvent {
                kind,
                x: self.x,
                y: self.y,
                buttons: self.buttons,
                button,
            })
            .is_ok()
    }

    pub fn emit_move(&mut self, x: u32, y: u32, buttons: MouseButtons) -> bool {
        self.x = x;
        self.y = y;
        self.buttons = buttons;
        self.emit(MouseEventKind::Move, MouseButtons::empty())
    }

    pub fn emit_button_down(&mut self, x: u32, y: u32, button: MouseButtons) -> bool {
        self.x = x;
        self.y = y;
        self.buttons |= button;
        self.emit(MouseEventKind::ButtonDown, button)
    }

    pub fn emit_button_up(&mut self, x: u32, y: u32, button: MouseButtons) -> bool {
        self.x = x;
        self.y = y;
        self.buttons &= !button;
        self.emit(MouseEventKind::ButtonUp, button)
    }

    pub fn pop(&mut self) -> Option<MouseEvent> {
        self.queue.pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for Mouse {
    fn default() -> Self {
        Self::new()
    }
}
