//! Command-line tokenizing for `runs` and `args` written as a single string.

use thiserror::Error;

/// Failure to split a command string into tokens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unclosed quote in command line: {0}")]
    UnclosedQuote(String),

    #[error("empty command line")]
    Empty,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Arg,
    Quoted(char),
}

/// Split `cmd` on spaces and tabs, keeping single- or double-quoted spans as
/// one token with the quotes removed.
///
/// A closing quote always ends the current token, so `a"b c"d` yields
/// `["ab c", "d"]`.
pub fn parse_command(cmd: &str) -> Result<Vec<String>, CommandParseError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut state = State::Start;

    for c in cmd.chars() {
        match state {
            State::Quoted(quote) => {
                if c == quote {
                    args.push(std::mem::take(&mut current));
                    state = State::Start;
                } else {
                    current.push(c);
                }
            }
            _ if c == '"' || c == '\'' => state = State::Quoted(c),
            State::Arg => {
                if c == ' ' || c == '\t' {
                    args.push(std::mem::take(&mut current));
                    state = State::Start;
                } else {
                    current.push(c);
                }
            }
            State::Start => {
                if c != ' ' && c != '\t' {
                    current.push(c);
                    state = State::Arg;
                }
            }
        }
    }

    if matches!(state, State::Quoted(_)) {
        return Err(CommandParseError::UnclosedQuote(cmd.to_string()));
    }
    if !current.is_empty() {
        args.push(current);
    }
    if args.is_empty() {
        return Err(CommandParseError::Empty);
    }
    Ok(args)
}
