//! Command domain model
//!
//! Commands are parsed once into argument vectors and rendered against the
//! [`PipelineContext`] right before execution. No shell is involved: a line
//! is split into words honouring single and double quotes, and `$VAR`
//! references are expanded everywhere except inside single quotes.

use crate::core::context::PipelineContext;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:"[^"]*"|'[^']*'|[^\s"'])+"#).expect("word pattern is a valid regex")
    })
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""([^"]*)"|'([^']*)'|([^"']+)"#).expect("segment pattern is a valid regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("command is empty")]
    Empty,

    #[error("unterminated quote in command: {0}")]
    UnterminatedQuote(String),
}

/// Part of a single argument
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Taken verbatim (single-quoted)
    Literal(String),
    /// Subject to variable expansion
    Expand(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Argument {
    segments: Vec<Segment>,
}

impl Argument {
    fn render(&self, context: &PipelineContext) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Expand(text) => context.expand(text),
            })
            .collect()
    }
}

/// Outcome of a finished command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CommandRecord {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A single command in a stage
#[derive(Debug, Clone)]
pub struct Command {
    /// The command as written in the descriptor
    pub line: String,

    args: Vec<Argument>,

    /// Populated once the command has run
    pub result: Option<CommandRecord>,
}

impl Command {
    /// Parse a command line into words
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let pattern = word_pattern();
        let mut args = Vec::new();
        let mut last_end = 0;

        for word in pattern.find_iter(line) {
            if !line[last_end..word.start()].trim().is_empty() {
                return Err(CommandParseError::UnterminatedQuote(line.to_string()));
            }
            args.push(Self::parse_word(word.as_str()));
            last_end = word.end();
        }

        if !line[last_end..].trim().is_empty() {
            return Err(CommandParseError::UnterminatedQuote(line.to_string()));
        }
        if args.is_empty() {
            return Err(CommandParseError::Empty);
        }

        Ok(Self {
            line: line.trim().to_string(),
            args,
            result: None,
        })
    }

    /// Build a command from an explicit argument list (no word splitting)
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Result<Self, CommandParseError> {
        let first = argv.first().map(|s| s.as_ref()).unwrap_or_default();
        if first.trim().is_empty() {
            return Err(CommandParseError::Empty);
        }

        let args = argv
            .iter()
            .map(|arg| Argument {
                segments: vec![Segment::Expand(arg.as_ref().to_string())],
            })
            .collect();

        let line = argv
            .iter()
            .map(|arg| {
                let arg = arg.as_ref();
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            line,
            args,
            result: None,
        })
    }

    fn parse_word(word: &str) -> Argument {
        let segments = segment_pattern()
            .captures_iter(word)
            .filter_map(|caps| {
                if let Some(double) = caps.get(1) {
                    Some(Segment::Expand(double.as_str().to_string()))
                } else if let Some(single) = caps.get(2) {
                    Some(Segment::Literal(single.as_str().to_string()))
                } else {
                    caps.get(3).map(|bare| Segment::Expand(bare.as_str().to_string()))
                }
            })
            .collect();
        Argument { segments }
    }

    /// Render the argument vector against a context
    pub fn render(&self, context: &PipelineContext) -> Vec<String> {
        self.args.iter().map(|arg| arg.render(context)).collect()
    }

    /// Argument count
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.result.as_ref().map(|r| r.exit_code)
    }
}
