//! Input event plumbing: bounded queues fed by the drivers and drained by
//! the window-manager routers.

pub mod keyboard;
pub mod mouse;

use bitflags::bitflags;

/// Capacity of each input queue. Pushing into a full queue fails; the
/// event is dropped at the driver.
pub const QUEUE_CAPACITY: usize = 64;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    ButtonDown,
    ButtonUp,
}

#[derive(Clone, Copy, Debug)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: u32,
    pub y: u32,
    /// Buttons held after this event.
    pub buttons: MouseButtons,
    /// The button that changed, for ButtonDown/ButtonUp.
    pub button: MouseButtons,
}
