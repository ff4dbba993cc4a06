//! Terminal sessions and their multiplexer.
//!
//! Each window with a shell gets a session: a line buffer fed by routed
//! key events, a small command history, its own namespace (so working
//! directories stay independent), and a running FNV-1a marker folded over
//! everything the session executes and observes. The marker is the
//! bit-exact witness that two sessions received different input.

use alloc::collections::vec_deque::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::fs::namespace::{EntryKind, Namespace};
use crate::hash::Fnv32;
use crate::input::keyboard::{ControlKey, KeyEvent};
use crate::shell::parser;
use crate::wm::WindowId;

pub const INPUT_CAP: usize = 128;
pub const HISTORY_CAP: usize = 8;

const LS_MAX_ENTRIES: usize = 64;

pub struct TerminalSession {
    endpoint_id: u32,
    window: WindowId,
    ns: Namespace,
    input: String,
    history: VecDeque<String>,
    lines_executed: u32,
    marker: Fnv32,
    cwd_cache: String,
}

impl TerminalSession {
    pub fn new(endpoint_id: u32, window: WindowId) -> Self {
        let ns = Namespace::new();
        let cwd_cache = ns.pwd();
        let mut session = TerminalSession {
            endpoint_id,
            window,
            ns,
            input: String::new(),
            history: VecDeque::new(),
            lines_executed: 0,
            marker: Fnv32::new(),
            cwd_cache,
        };
        session.marker.write_u32(endpoint_id);
        session
    }

    pub fn endpoint_id(&self) -> u32 {
        self.endpoint_id
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(|s| s.as_str())
    }

    pub fn lines_executed(&self) -> u32 {
        self.lines_executed
    }

    pub fn marker(&self) -> u32 {
        self.marker.finish()
    }

    pub fn cwd(&self) -> &str {
        &self.cwd_cache
    }

    /// Text goes into the line buffer; Enter executes it; Backspace
    /// erases. Returns false when a byte had to be dropped at the cap.
    pub fn handle_event(&mut self, event: &KeyEvent) -> bool {
        match event {
            KeyEvent::Text { ch, .. } => {
                if !(' '..='~').contains(ch) {
                    return true;
                }
                if self.input.len() + 1 >= INPUT_CAP {
                    return false;
                }
                self.input.push(*ch);
                true
            }
            KeyEvent::Control { key, .. } => {
                match key {
                    ControlKey::Backspace => {
                        self.input.pop();
                    }
                    ControlKey::Enter => {
                        let line = core::mem::take(&mut self.input);
                        self.execute_line(&line);
                    }
                    _ => {}
                }
                true
            }
        }
    }

    fn hash_text(&mut self, text: &str) {
        self.marker.write_bytes(text.as_bytes());
        self.marker.write_u8(0);
    }

    fn store_history(&mut self, line: &str) {
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(String::from(line));
    }

    /// Runs one command line against the session namespace, folding the
    /// command and its observable results into the marker.
    pub fn execute_line(&mut self, line: &str) {
        let argv_owned: Vec<String> =
            parser::split_words(line).into_iter().map(String::from).collect();
        if argv_owned.is_empty() {
            return;
        }
        let argv: Vec<&str> = argv_owned.iter().map(|s| s.as_str()).collect();

        self.store_history(line);
        self.lines_executed += 1;
        self.hash_text(line);

        match argv[0] {
            "help" => {
                for name in ["help", "echo", "pwd", "cd", "mkdir", "ls", "cat"] {
                    self.hash_text(name);
                }
            }
            "echo" => {
                for arg in &argv[1..] {
                    self.hash_text(arg);
                }
            }
            "pwd" => {
                let cwd = self.ns.pwd();
                self.hash_text(&cwd);
            }
            "cd" => {
                let target = argv.get(1).copied().unwrap_or("/");
                if self.ns.cd(target).is_ok() {
                    self.hash_text("cd:ok");
                } else {
                    self.hash_text("cd:error");
                }
            }
            "mkdir" => {
                if argv.len() < 2 {
                    self.hash_text("mkdir:missing");
                } else {
                    for path in &argv[1..] {
                        self.hash_text(path);
                        if self.ns.mkdir(path).is_ok() {
                            self.hash_text("mkdir:ok");
                        } else {
                            self.hash_text("mkdir:error");
                        }
                    }
                }
            }
            "ls" => {
                let target = argv.get(1).copied().unwrap_or(".");
                match self.ns.ls(target, LS_MAX_ENTRIES) {
                    Ok(entries) => {
                        self.marker.write_u32(entries.len() as u32);
                        for entry in entries {
                            self.hash_text(&entry.name);
                            self.marker.write_u8(match entry.kind {
                                EntryKind::Dir => b'/',
                                EntryKind::File => b'f',
                            });
                        }
                    }
                    Err(_) => self.hash_text("ls:error"),
                }
            }
            "cat" => {
                if argv.len() < 2 {
                    self.hash_text("cat:missing");
                } else {
                    for path in &argv[1..] {
                        match self.ns.cat(path) {
                            Ok(contents) => {
                                let contents = Vec::from(contents);
                                self.marker.write_bytes(&contents);
                                self.marker.write_u8(0);
                            }
                            Err(_) => {
                                self.hash_text("cat:error");
                                self.hash_text(path);
                            }
                        }
                    }
                }
            }
            _ => self.hash_text("unknown"),
        }

        self.cwd_cache = self.ns.pwd();
    }
}

/// Owns every session and fans routed keyboard events out by endpoint id.
pub struct TerminalMultiplexer {
    sessions: Vec<TerminalSession>,
}

impl TerminalMultiplexer {
    pub fn new() -> Self {
        TerminalMultiplexer {
            sessions: Vec::new(),
        }
    }

    /// Creates a session bound to `window` and returns its endpoint id
    /// (non-zero, stable).
    pub fn create_session(&mut self, window: WindowId) -> u32 {
        let endpoint_id = self.sessions.len() as u32 + 1;
        self.sessions.push(TerminalSession::new(endpoint_id, window));
        endpoint_id
    }

    pub fn session(&self, endpoint_id: u32) -> Option<&TerminalSession> {
        self.sessions
            .iter()
            .find(|s| s.endpoint_id() == endpoint_id)
    }

    pub fn session_mut(&mut self, endpoint_id: u32) -> Option<&mut TerminalSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.endpoint_id() == endpoint_id)
    }

    pub fn deliver(&mut self, endpoint_id: u32, event: &KeyEvent) {
        if let Some(session) = self.session_mut(endpoint_id) {
            session.handle_event(event);
        }
    }
}

impl Default for TerminalMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}
