//! Periodic tick source.
//!
//! The clock owns the timer deadline: every tick advances the deadline by
//! one interval, and when the handler ran late it skips however many
//! intervals were missed so the next deadline always lies in the future.

use core::fmt::Write;

use crate::timer::Timer;

/// Platform timer ticks between interrupts.
pub const TICK_INTERVAL: u64 = 1_000_000;

const TICK_LOG_LIMIT: u64 = 4;

pub struct Clock {
    ticks: u64,
    next_deadline: u64,
}

impl Clock {
    pub const fn new() -> Self {
        Clock {
            ticks: 0,
            next_deadline: 0,
        }
    }

    /// Programs the first deadline and unmasks timer interrupts.
    pub fn init(&mut self, timer: &mut dyn Timer) {
        self.ticks = 0;
        self.next_deadline = timer.now() + TICK_INTERVAL;
        timer.set_deadline(self.next_deadline);
        timer.enable_interrupts();
    }

    pub fn handle_tick(&mut self, timer: &mut dyn Timer, con: &mut dyn Write) {
        self.ticks += 1;
        if self.ticks <= TICK_LOG_LIMIT {
            let _ = con.write_str("TICK: periodic interrupt\n");
        }

        self.next_deadline += TICK_INTERVAL;
        let now = timer.now();
        if self.next_deadline <= now {
            // Catch up past every missed interval in one step.
            let missed = (now - self.next_deadline) / TICK_INTERVAL + 1;
            self.next_deadline += missed * TICK_INTERVAL;
        }
        timer.set_deadline(self.next_deadline);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
