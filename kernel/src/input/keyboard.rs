//! Set-1 scancode decoder.
//!
//! Raw scancode bytes come in one at a time; decoded events (printable text
//! or control keys) land in a bounded queue for the keyboard router. Shift
//! and caps-lock state live here, as does the extended-prefix rule: the
//! byte following `0xE0`/`0xE1` is consumed and ignored.

use crossbeam_queue::ArrayQueue;

use super::QUEUE_CAPACITY;

const EXTENDED_PREFIX_E0: u8 = 0xe0;
const EXTENDED_PREFIX_E1: u8 = 0xe1;
const BREAK_BIT: u8 = 0x80;
const LEFT_SHIFT: u8 = 0x2a;
const RIGHT_SHIFT: u8 = 0x36;
const CAPS_LOCK: u8 = 0x3a;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKey {
    Enter,
    Backspace,
    Tab,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Text { ch: char, scancode: u8 },
    Control { key: ControlKey, scancode: u8 },
}

pub struct Keyboard {
    queue: ArrayQueue<KeyEvent>,
    left_shift: bool,
    right_shift: bool,
    caps_lock: bool,
    extended_prefix: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard {
            queue: ArrayQueue::new(QUEUE_CAPACITY),
            left_shift: false,
            right_shift: false,
            caps_lock: false,
            extended_prefix: false,
        }
    }

    fn shift_down(&self) -> bool {
        self.left_shift || self.right_shift
    }

    /// Feeds one scancode byte. Returns false only when a decoded event had
    /// to be dropped because the queue was full; bytes that decode to
    /// nothing (breaks, unknown keys, prefixed codes) succeed trivially.
    pub fn handle_scancode(&mut self, scancode: u8) -> bool {
        if scancode == EXTENDED_PREFIX_E0 || scancode == EXTENDED_PREFIX_E1 {
            self.extended_prefix = true;
            return true;
        }
        if self.extended_prefix {
            self.extended_prefix = false;
            return true;
        }

        let is_break = scancode & BREAK_BIT != 0;
        let code = scancode & !BREAK_BIT;

        match code {
            LEFT_SHIFT => {
                self.left_shift = !is_break;
                return true;
            }
            RIGHT_SHIFT => {
                self.right_shift = !is_break;
                return true;
            }
            _ => {}
        }

        if is_break {
            return true;
        }

        if code == CAPS_LOCK {
            self.caps_lock = !self.caps_lock;
            return true;
        }

        if let Some(key) = control_for(code) {
            return self
                .queue
                .push(KeyEvent::Control {
                    key,
                    scancode: code,
                })
                .is_ok();
        }

        let Some(ch) = printable_for(code, self.shift_down(), self.caps_lock) else {
            return true;
        };
        self.queue
            .push(KeyEvent::Text {
                ch,
                scancode: code,
            })
            .is_ok()
    }

    pub fn pop(&mut self) -> Option<KeyEvent> {
        self.queue.pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

fn control_for(code: u8) -> Option<ControlKey> {
    match code {
        0x01 => Some(ControlKey::Escape),
        0x0e => Some(ControlKey::Backspace),
        0x0f => Some(ControlKey::Tab),
        0x1c => Some(ControlKey::Enter),
        _ => None,
    }
}

/// Letters follow shift XOR caps-lock; everything else only shift.
fn printable_for(code: u8, shift: bool, caps: bool) -> Option<char> {
    let letter = |ch: char| {
        Some(if shift ^ caps {
            ch.to_ascii_uppercase()
        } else {
            ch
        })
    };
    let pair = |base: char, shifted: char| Some(if shift { shifted } else { base });

    match code {
        0x02 => pair('1', '!'),
        0x03 => pair('2', '@'),
        0x04 => pair('3', '#'),
        0x05 => pair('4', '$'),
        0x06 => pair('5', '%'),
        0x07 => pair('6', '^'),
        0x08 => pair('7', '&'),
        0x09 => pair('8', '*'),
        0x0a => pair('9', '('),
        0x0b => pair('0', ')'),
        0x0c => pair('-', '_'),
        0x0d => pair('=', '+'),
        0x10 => letter('q'),
        0x11 => letter('w'),
        0x12 => letter('e'),
        0x13 => letter('r'),
        0x14 => letter('t'),
        0x15 => letter('y'),
        0x16 => letter('u'),
        0x17 => letter('i'),
        0x18 => letter('o'),
        0x19 => letter('p'),
        0x1a => pair('[', '{'),
        0x1b => pair(']', '}'),
        0x1e => letter('a'),
        0x1f => letter('s'),
        0x20 => letter('d'),
        0x21 => letter('f'),
        0x22 => letter('g'),
        0x23 => letter('h'),
        0x24 => letter('j'),
        0x25 => letter('k'),
        0x26 => letter('l'),
        0x27 => pair(';', ':'),
        0x28 => pair('\'', '"'),
        0x29 => pair('`', '~'),
        0x2b => pair('\\', '|'),
        0x2c => letter('z'),
        0x2d => letter('x'),
        0x2e => letter('c'),
        0x2f => letter('v'),
        0x30 => letter('b'),
        0x31 => letter('n'),
        0x32 => letter('m'),
        0x33 => pair(',', '<'),
        0x34 => pair('.', '>'),
        0x35 => pair('/', '?'),
        0x39 => Some(' '),
        _ => None,
    }
}
