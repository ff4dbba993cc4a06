//! Pipeline execution.
//!
//! A parsed line runs in at most two stages. The left command always runs
//! first; with a pipe its output is captured and becomes the right
//! command's stdin (bounded by the capture buffer). Redirection captures
//! the final command's output and hands the bytes to the namespace file
//! writer. Unknown commands degrade to echoing the raw line.

use core::fmt::Write;

use super::builtins::{self, Status};
use super::io::ShellIo;
use super::parser::{self, RedirMode, Pipeline};
use crate::fs::namespace::Namespace;

const FALLBACK_TEXT_CAP: usize = 128;
const PIPE_INPUT_CAP: usize = 2048;

pub fn execute_line<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, line: &str) {
    let parsed = match parser::parse_pipeline(line) {
        Ok(parsed) => parsed,
        Err(_) => {
            io.set_stdout_console();
            let _ = io.write_str("parse: invalid command\n");
            return;
        }
    };

    if parsed.has_pipe {
        execute_pipe(io, ns, &parsed);
    } else {
        execute_single(io, ns, &parsed, line);
    }
}

fn run_or_fallback<W: Write>(
    io: &mut ShellIo<W>,
    ns: &mut Namespace,
    argv: &[&str],
    fallback_text: &str,
) {
    if builtins::execute(io, ns, argv) == Status::NotFound {
        let _ = io.write_str("echo: ");
        let _ = io.write_str(fallback_text);
        let _ = io.write_str("\n");
    }
}

fn write_redirection<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, parsed: &Pipeline) {
    let append = parsed.redir == RedirMode::Append;
    let path = parsed.redir_path.unwrap_or("");
    let captured = alloc::string::String::from(io.capture());
    if ns.write_file(path, captured.as_bytes(), append).is_err() {
        io.set_stdout_console();
        let _ = io.write_str("redir: write failed\n");
    }
}

fn execute_single<W: Write>(
    io: &mut ShellIo<W>,
    ns: &mut Namespace,
    parsed: &Pipeline,
    raw_line: &str,
) {
    if parsed.redir == RedirMode::None {
        io.set_stdout_console();
        io.set_stdin(None);
        run_or_fallback(io, ns, &parsed.left, raw_line);
        return;
    }

    io.set_stdout_capture();
    io.set_stdin(None);
    run_or_fallback(io, ns, &parsed.left, raw_line);
    write_redirection(io, ns, parsed);
}

/// Space-joined argv, bounded the way interactive fallback text is.
fn fallback_text(argv: &[&str]) -> alloc::string::String {
    let mut out = alloc::string::String::new();
    for (i, arg) in argv.iter().enumerate() {
        if i > 0 && out.len() + 1 < FALLBACK_TEXT_CAP {
            out.push(' ');
        }
        for ch in arg.chars() {
            if out.len() + ch.len_utf8() >= FALLBACK_TEXT_CAP {
                return out;
            }
            out.push(ch);
        }
    }
    out
}

fn execute_pipe<W: Write>(io: &mut ShellIo<W>, ns: &mut Namespace, parsed: &Pipeline) {
    let left_text = fallback_text(&parsed.left);
    let right_text = fallback_text(&parsed.right);

    io.set_stdout_capture();
    io.set_stdin(None);
    run_or_fallback(io, ns, &parsed.left, &left_text);

    // Single capture: whatever the left side produced (already bounded by
    // the capture buffer) becomes the right side's stdin.
    let mut pipe_input = alloc::string::String::from(io.capture());
    pipe_input.truncate(PIPE_INPUT_CAP - 1);
    io.set_stdin(Some(&pipe_input));

    if parsed.redir == RedirMode::None {
        io.set_stdout_console();
        run_or_fallback(io, ns, &parsed.right, &right_text);
        io.set_stdin(None);
        return;
    }

    io.set_stdout_capture();
    run_or_fallback(io, ns, &parsed.right, &right_text);
    io.set_stdin(None);
    write_redirection(io, ns, parsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn shell() -> (ShellIo<String>, Namespace) {
        (ShellIo::new(String::new()), Namespace::new())
    }

    fn run(io: &mut ShellIo<String>, ns: &mut Namespace, line: &str) -> String {
        io.console_mut().clear();
        execute_line(io, ns, line);
        io.console_mut().clone()
    }

    #[test]
    fn plain_command_writes_to_console() {
        let (mut io, mut ns) = shell();
        assert_eq!(run(&mut io, &mut ns, "echo shell ok"), "echo: shell ok\n");
    }

    #[test]
    fn parse_errors_are_reported() {
        let (mut io, mut ns) = shell();
        assert_eq!(run(&mut io, &mut ns, "echo |"), "parse: invalid command\n");
        assert_eq!(run(&mut io, &mut ns, "cat >"), "parse: invalid command\n");
    }

    #[test]
    fn unknown_command_echoes_raw_line() {
        let (mut io, mut ns) = shell();
        assert_eq!(
            run(&mut io, &mut ns, "frobnicate the disk"),
            "echo: frobnicate the disk\n"
        );
    }

    #[test]
    fn redirection_lands_in_namespace() {
        let (mut io, mut ns) = shell();
        let out = run(&mut io, &mut ns, "echo foo > /tmp/out");
        assert!(out.is_empty());
        assert_eq!(ns.cat("/tmp/out").unwrap(), b"echo: foo\n");

        run(&mut io, &mut ns, "echo bar >> /tmp/out");
        assert_eq!(ns.cat("/tmp/out").unwrap(), b"echo: foo\necho: bar\n");

        run(&mut io, &mut ns, "echo reset > /tmp/out");
        assert_eq!(ns.cat("/tmp/out").unwrap(), b"echo: reset\n");
    }

    #[test]
    fn failed_redirection_reports_on_console() {
        let (mut io, mut ns) = shell();
        assert_eq!(
            run(&mut io, &mut ns, "echo x > /no-such-dir/file"),
            "redir: write failed\n"
        );
    }

    #[test]
    fn pipe_feeds_right_side_stdin() {
        let (mut io, mut ns) = shell();
        assert_eq!(
            run(&mut io, &mut ns, "echo through pipe | cat"),
            "echo: through pipe\n"
        );
        // stdin is cleared again afterwards.
        assert!(!io.has_stdin());
    }

    #[test]
    fn pipe_with_redirection_captures_right_side() {
        let (mut io, mut ns) = shell();
        let out = run(&mut io, &mut ns, "echo piped | cat > /tmp/piped");
        assert!(out.is_empty());
        assert_eq!(ns.cat("/tmp/piped").unwrap(), b"echo: piped\n");
    }

    #[test]
    fn ls_pipes_into_cat() {
        let (mut io, mut ns) = shell();
        assert_eq!(
            run(&mut io, &mut ns, "ls / | cat"),
            "etc/\nhello.txt\nhome/\ntmp/\n"
        );
    }
}
