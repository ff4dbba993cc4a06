//! Command-line tokenization.
//!
//! Two entry points: [`split_words`] is the plain whitespace splitter the
//! terminal sessions use, and [`parse_pipeline`] understands the full
//! grammar `simple (| simple)? (> WORD | >> WORD)?`. Special characters
//! bind tighter than whitespace, so `a|b` and `echo>out` tokenize the same
//! as their spaced spellings.

use alloc::vec::Vec;

pub const ARGV_CAP: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirMode {
    None,
    Trunc,
    Append,
}

#[derive(Debug)]
pub struct Pipeline<'a> {
    pub left: Vec<&'a str>,
    pub right: Vec<&'a str>,
    pub has_pipe: bool,
    pub redir: RedirMode,
    pub redir_path: Option<&'a str>,
}

/// Splits on spaces and tabs only.
pub fn split_words(line: &str) -> Vec<&str> {
    line.split([' ', '\t']).filter(|w| !w.is_empty()).collect()
}

enum Token<'a> {
    Word(&'a str),
    Pipe,
    RedirTrunc,
    RedirAppend,
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    tokens.push(Token::RedirAppend);
                    i += 2;
                } else {
                    tokens.push(Token::RedirTrunc);
                    i += 1;
                }
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'|' | b'>') {
                    i += 1;
                }
                tokens.push(Token::Word(&line[start..i]));
            }
        }
    }
    tokens
}

pub fn parse_pipeline(line: &str) -> Result<Pipeline<'_>, ParseError> {
    let mut out = Pipeline {
        left: Vec::new(),
        right: Vec::new(),
        has_pipe: false,
        redir: RedirMode::None,
        redir_path: None,
    };
    let mut need_redir_path = false;

    for token in tokenize(line) {
        match token {
            Token::Word(word) => {
                if need_redir_path {
                    out.redir_path = Some(word);
                    need_redir_path = false;
                    continue;
                }
                if out.redir != RedirMode::None {
                    // Trailing words after the redirection target.
                    return Err(ParseError);
                }
                let current = if out.has_pipe {
                    &mut out.right
                } else {
                    &mut out.left
                };
                if current.len() >= ARGV_CAP {
                    return Err(ParseError);
                }
                current.push(word);
            }
            Token::Pipe => {
                if need_redir_path
                    || out.has_pipe
                    || out.redir != RedirMode::None
                    || out.left.is_empty()
                {
                    return Err(ParseError);
                }
                out.has_pipe = true;
            }
            Token::RedirTrunc | Token::RedirAppend => {
                if need_redir_path || out.redir != RedirMode::None {
                    return Err(ParseError);
                }
                out.redir = match token {
                    Token::RedirAppend => RedirMode::Append,
                    _ => RedirMode::Trunc,
                };
                need_redir_path = true;
            }
        }
    }

    if need_redir_path || out.left.is_empty() || (out.has_pipe && out.right.is_empty()) {
        return Err(ParseError);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_spaces_and_tabs() {
        assert_eq!(
            split_words(" \t  echo   alpha\tbeta  "),
            ["echo", "alpha", "beta"]
        );
        assert!(split_words("   \t ").is_empty());
    }

    #[test]
    fn parses_simple_command() {
        let p = parse_pipeline("echo hello world").unwrap();
        assert_eq!(p.left, ["echo", "hello", "world"]);
        assert!(!p.has_pipe);
        assert_eq!(p.redir, RedirMode::None);
    }

    #[test]
    fn parses_pipe_and_redirections() {
        let p = parse_pipeline("ls / | cat").unwrap();
        assert!(p.has_pipe);
        assert_eq!(p.left, ["ls", "/"]);
        assert_eq!(p.right, ["cat"]);

        let p = parse_pipeline("echo hi > /tmp/out").unwrap();
        assert_eq!(p.redir, RedirMode::Trunc);
        assert_eq!(p.redir_path, Some("/tmp/out"));

        let p = parse_pipeline("echo hi >> log").unwrap();
        assert_eq!(p.redir, RedirMode::Append);
        assert_eq!(p.redir_path, Some("log"));

        let p = parse_pipeline("echo a | cat > out").unwrap();
        assert!(p.has_pipe);
        assert_eq!(p.redir, RedirMode::Trunc);
    }

    #[test]
    fn specials_split_words_without_spaces() {
        let p = parse_pipeline("echo>out").unwrap();
        assert_eq!(p.left, ["echo"]);
        assert_eq!(p.redir_path, Some("out"));

        let p = parse_pipeline("a|b").unwrap();
        assert_eq!(p.left, ["a"]);
        assert_eq!(p.right, ["b"]);

        let p = parse_pipeline("echo>>x").unwrap();
        assert_eq!(p.redir, RedirMode::Append);
        assert_eq!(p.redir_path, Some("x"));
    }

    #[test]
    fn grammar_violations_fail() {
        for bad in [
            "",
            "   ",
            "| cat",
            "echo |",
            "echo >",
            "echo >>",
            "a | b | c",
            "echo > f > g",
            "echo > f extra",
            "echo | > f",
            "echo > | f",
        ] {
            assert!(parse_pipeline(bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn argv_is_capped() {
        let line = "w ".repeat(ARGV_CAP + 1);
        assert!(parse_pipeline(&line).is_err());
    }
}
