//! Global kernel console.
//!
//! The console owns a single output sink: the UART on bare metal, a capture
//! buffer when a test wants to inspect boot output, or nothing at all.
//! Subsystems that need to emit observable log lines take a
//! `&mut dyn core::fmt::Write` instead of reaching for this global, so unit
//! tests can hand them a plain `String`; the global exists for the kernel
//! composition path and the `kernel_print!` family.

use alloc::string::String;
use conquer_once::spin::OnceCell;
use core::fmt;
use spin::Mutex;

pub enum Sink {
    #[cfg(target_arch = "riscv64")]
    Uart(crate::uart::Uart),
    Capture(String),
    Null,
}

pub struct Console {
    sink: Sink,
}

impl Console {
    pub const fn new(sink: Sink) -> Self {
        Console { sink }
    }

    /// Captured output so far, when the sink is a capture buffer.
    pub fn captured(&self) -> Option<&str> {
        match &self.sink {
            Sink::Capture(buf) => Some(buf),
            _ => None,
        }
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match &mut self.sink {
            #[cfg(target_arch = "riscv64")]
            Sink::Uart(uart) => uart.write_str(s),
            Sink::Capture(buf) => {
                buf.push_str(s);
                Ok(())
            }
            Sink::Null => Ok(()),
        }
    }
}

static CONSOLE: OnceCell<Mutex<Console>> = OnceCell::uninit();

pub fn init(sink: Sink) {
    CONSOLE
        .try_init_once(|| Mutex::new(Console::new(sink)))
        .expect("console::init should only be called once");
}

/// Runs `f` against the global console. A no-op before `init`, so early
/// code may log unconditionally. On bare metal the lock is taken with
/// interrupts masked, since the trap path logs through this console too.
pub fn with<R>(f: impl FnOnce(&mut Console) -> R) -> Option<R> {
    #[cfg(target_arch = "riscv64")]
    {
        CONSOLE
            .get()
            .map(|con| crate::arch::without_interrupts(|| f(&mut con.lock())))
    }
    #[cfg(not(target_arch = "riscv64"))]
    {
        CONSOLE.get().map(|con| f(&mut con.lock()))
    }
}

/// `fmt::Write` view of the global console, for handing the console to a
/// subsystem that wants a writer (e.g. the trap path).
pub struct Global;

impl fmt::Write for Global {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        with(|con| {
            let _ = con.write_str(s);
        });
        Ok(())
    }
}

#[macro_export]
macro_rules! kernel_print {
    ($($arg:tt)*) => {
        $crate::console::with(|con| {
            let _ = core::fmt::Write::write_fmt(con, format_args!($($arg)*));
        })
    };
}

#[macro_export]
macro_rules! kernel_println {
    () => {
        $crate::kernel_print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::kernel_print!("{}\n", format_args!($($arg)*))
    };
}
