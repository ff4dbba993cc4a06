//! Shell builtins.
//!
//! Every builtin writes through the I/O table, never to the console
//! directly, so pipes and redirection see the same bytes an interactive
//! run would. Unknown commands are reported as [`Status::NotFound`] and
//! the executor decides what to do about it.

use core::fmt::Write;

use super::io::ShellIo;
use crate::fs::namespace::{EntryKind, Namespace};
use crate::memory::{PAGE_ALLOCATOR, PAGE_SIZE};

const LS_MAX_ENTRIES: usize = 64;

const HELP: &[(&str, &str)] = &[
    ("help", "show this help"),
    ("echo", "print arguments"),
    ("meminfo", "show allocator usage"),
    ("ls", "list files and directories"),
    ("cat", "print file contents"),
    ("pwd", "print current directory"),
    ("cd", "change current directory"),
    ("mkdir", "create directory"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

pub fn execute<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, argv: &[&str]) -> Status {
    let Some(&command) = argv.first() else {
        return Status::Ok;
    };
    match command {
        "help" => help(io),
        "echo" => echo(io, argv),
        "meminfo" => meminfo(io),
        "ls" => ls(io, ns, argv),
        "cat" => cat(io, ns, argv),
        "pwd" => pwd(io, ns),
        "cd" => cd(io, ns, argv),
        "mkdir" => mkdir(io, ns, argv),
        _ => return Status::NotFound,
    }
    Status::Ok
}

fn help<W: Write>(io: &mut ShellIo<W>) {
    let _ = io.write_str("available commands:\n");
    for (name, description) in HELP {
        let _ = writeln!(io, "  {} - {}", name, description);
    }
}

fn echo<W: Write>(io: &mut ShellIo<W>, argv: &[&str]) {
    let _ = io.write_str("echo:");
    for arg in &argv[1..] {
        let _ = io.write_str(" ");
        let _ = io.write_str(arg);
    }
    let _ = io.write_str("\n");
}

fn meminfo<W: Write>(io: &mut ShellIo<W>) {
    let pool = PAGE_ALLOCATOR.lock();
    let _ = writeln!(
        io,
        "meminfo: range=0x{:016x}-0x{:016x} page_size={} total_pages={} free_pages={} used_pages={}",
        pool.range_start(),
        pool.range_end(),
        PAGE_SIZE,
        pool.total_pages(),
        pool.free_pages(),
        pool.total_pages() - pool.free_pages(),
    );
}

fn ls<W: Write>(io: &mut ShellIo<W>, ns: &Namespace, argv: &[&str]) {
    let target = argv.get(1).copied().unwrap_or(".");
    match ns.ls(target, LS_MAX_ENTRIES) {
        Ok(entries) => {
            for entry in entries {
                let _ = io.write_str(&entry.name);
                if entry.kind == EntryKind::Dir {
                    let _ = io.write_str("/");
                }
                let _ = io.write_str("\n");
            }
        }
        Err(_) => {
            let _ = io.write_str("ls: cannot access\n");
        }
    }
}

fn cat<W: Write>(io: &mut ShellIo<W>, ns: &Namespace, argv: &[&str]) {
    if argv.len() < 2 {
        if io.has_stdin() {
            let input = alloc::string::String::from(io.stdin().unwrap_or(""));
            let _ = io.write_str(&input);
            if !input.ends_with('\n') {
                let _ = io.write_str("\n");
            }
            return;
        }
        let _ = io.write_str("cat: missing path\n");
        return;
    }

    for path in &argv[1..] {
        match ns.cat(path) {
            Ok(contents) => {
                let text = alloc::string::String::from_utf8_lossy(contents);
                let _ = io.write_str(&text);
                if !text.ends_with('\n') {
                    let _ = io.write_str("\n");
                }
            }
            Err(_) => {
                let _ = writeln!(io, "cat: not found: {}", path);
            }
        }
    }
}

fn pwd<W: Write>(io: &mut ShellIo<W>, ns: &Namespace) {
    let cwd = ns.pwd();
    let _ = io.write_str(&cwd);
    let _ = io.write_str("\n");
}

fn cd<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, argv: &[&str]) {
    let target = argv.get(1).copied().unwrap_or("/");
    if ns.cd(target).is_err() {
        let _ = io.write_str("cd: no such directory\n");
    }
}

fn mkdir<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, argv: &[&str]) {
    if argv.len() < 2 {
        let _ = io.write_str("mkdir: missing path\n");
        return;
    }
    for path in &argv[1..] {
        if ns.mkdir(path).is_err() {
            let _ = writeln!(io, "mkdir: failed: {}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn run(ns: &mut Namespace, argv: &[&str]) -> (Status, String) {
        let mut io = ShellIo::new(String::new());
        let status = execute(&mut io, ns, argv);
        (status, io.into_console())
    }

    #[test]
    fn help_lists_every_builtin() {
        let mut ns = Namespace::new();
        let (status, out) = run(&mut ns, &["help"]);
        assert_eq!(status, Status::Ok);
        assert!(out.starts_with("available commands:\n"));
        for (name, description) in HELP {
            assert!(out.contains(&alloc::format!("  {} - {}\n", name, description)));
        }
    }

    #[test]
    fn echo_joins_arguments() {
        let mut ns = Namespace::new();
        let (_, out) = run(&mut ns, &["echo", "shell", "ok"]);
        assert_eq!(out, "echo: shell ok\n");
        let (_, out) = run(&mut ns, &["echo"]);
        assert_eq!(out, "echo:\n");
    }

    #[test]
    fn meminfo_reports_pool_counters() {
        let mut pool = PAGE_ALLOCATOR.lock();
        pool.init(0x8020_0000, 0x8020_0000 + 2 * PAGE_SIZE);
        drop(pool);

        let mut ns = Namespace::new();
        let (_, out) = run(&mut ns, &["meminfo"]);
        assert!(out.starts_with("meminfo: range=0x"));
        assert!(out.contains(" page_size=4096 total_pages=2 free_pages=2"));
        assert!(out.contains(" used_pages=0"));
    }

    #[test]
    fn unknown_command_is_not_found() {
        let mut ns = Namespace::new();
        let (status, out) = run(&mut ns, &["not-a-command"]);
        assert_eq!(status, Status::NotFound);
        assert!(out.is_empty());
    }

    #[test]
    fn fs_builtins_walk_the_namespace() {
        let mut ns = Namespace::new();

        let (_, out) = run(&mut ns, &["pwd"]);
        assert_eq!(out, "/\n");

        let (_, out) = run(&mut ns, &["ls"]);
        assert_eq!(out, "etc/\nhello.txt\nhome/\ntmp/\n");

        let (_, out) = run(&mut ns, &["cat", "hello.txt"]);
        assert_eq!(out, "hello from shell fs\n");

        let (_, out) = run(&mut ns, &["mkdir", "projects"]);
        assert!(out.is_empty());
        let (_, out) = run(&mut ns, &["cd", "projects"]);
        assert!(out.is_empty());
        let (_, out) = run(&mut ns, &["pwd"]);
        assert_eq!(out, "/projects\n");

        let (_, out) = run(&mut ns, &["mkdir", "notes"]);
        assert!(out.is_empty());
        let (_, out) = run(&mut ns, &["ls"]);
        assert_eq!(out, "notes/\n");
    }

    #[test]
    fn cd_missing_reports_and_keeps_cwd() {
        let mut ns = Namespace::new();
        let (_, out) = run(&mut ns, &["cd", "/missing"]);
        assert_eq!(out, "cd: no such directory\n");
        let (_, out) = run(&mut ns, &["pwd"]);
        assert_eq!(out, "/\n");
    }

    #[test]
    fn cat_reads_stdin_without_arguments() {
        let mut ns = Namespace::new();
        let mut io = ShellIo::new(String::new());
        io.set_stdin(Some("piped data"));
        execute(&mut io, &mut ns, &["cat"]);
        assert_eq!(io.console_mut().as_str(), "piped data\n");

        let mut io = ShellIo::new(String::new());
        execute(&mut io, &mut ns, &["cat"]);
        assert_eq!(io.console_mut().as_str(), "cat: missing path\n");
    }

    #[test]
    fn cat_missing_file_reports_per_path() {
        let mut ns = Namespace::new();
        let (_, out) = run(&mut ns, &["cat", "nope", "hello.txt"]);
        assert_eq!(out, "cat: not found: nope\nhello from shell fs\n");
    }

    #[test]
    fn mkdir_failures_are_reported() {
        let mut ns = Namespace::new();
        let (_, out) = run(&mut ns, &["mkdir"]);
        assert_eq!(out, "mkdir: missing path\n");
        let (_, out) = run(&mut ns, &["mkdir", "/etc"]);
        assert_eq!(out, "mkdir: failed: /etc\n");
    }
}
