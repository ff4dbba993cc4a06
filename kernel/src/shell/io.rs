//! Process-wide shell I/O table.
//!
//! One stdout destination (the console writer or a bounded capture buffer)
//! plus one optional stdin string. The executor flips stdout to capture
//! around the left side of a pipe and around redirected commands, then
//! moves the captured bytes where they belong.

use alloc::string::String;
use core::fmt;

pub const CAPTURE_CAP: usize = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StdoutMode {
    Console,
    Capture,
}

pub struct ShellIo<W: fmt::Write> {
    console: W,
    mode: StdoutMode,
    capture: String,
    stdin: Option<String>,
}

impl<W: fmt::Write> ShellIo<W> {
    pub fn new(console: W) -> Self {
        ShellIo {
            console,
            mode: StdoutMode::Console,
            capture: String::new(),
            stdin: None,
        }
    }

    pub fn console_mut(&mut self) -> &mut W {
        &mut self.console
    }

    pub fn into_console(self) -> W {
        self.console
    }

    pub fn set_stdout_console(&mut self) {
        self.mode = StdoutMode::Console;
    }

    /// Switches stdout to the capture buffer and resets it.
    pub fn set_stdout_capture(&mut self) {
        self.mode = StdoutMode::Capture;
        self.capture.clear();
    }

    pub fn set_stdin(&mut self, input: Option<&str>) {
        self.stdin = input.map(String::from);
    }

    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn has_stdin(&self) -> bool {
        self.stdin.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn capture(&self) -> &str {
        &self.capture
    }
}

impl<W: fmt::Write> fmt::Write for ShellIo<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.mode {
            StdoutMode::Console => self.console.write_str(s),
            StdoutMode::Capture => {
                // Bytes past the cap are dropped, not an error.
                for ch in s.chars() {
                    if self.capture.len() + ch.len_utf8() >= CAPTURE_CAP {
                        break;
                    }
                    self.capture.push(ch);
                }
                Ok(())
            }
        }
    }
}
