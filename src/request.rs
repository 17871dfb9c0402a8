// src/request.rs
//! Analysis requests and the text command surface.
//!
//! A command line looks like
//!
//! ```text
//! ticker=ACME idea=long into earnings, expecting a beat command=risk-highlight
//! ```
//!
//! Keys may come in any order. A value runs until the next recognised `key=`,
//! so `idea` can hold spaces; values may also be wrapped in double quotes,
//! and a `key=` inside a quoted value is taken as text.
//! The command name is forwarded as-is and never interpreted here.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InvalidRequestError;

/// Command used when a caller does not name one.
pub const DEFAULT_COMMAND: &str = "analyze";

/// What the caller wants analysed. Built freely; validated by `validate`
/// (and therefore by `build_context`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub idea: String,
    pub command: String,
}

impl AnalysisRequest {
    pub fn new(ticker: &str, idea: &str, command: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            idea: idea.to_string(),
            command: command.to_string(),
        }
    }

    /// Ticker and idea must both carry non-blank text.
    pub fn validate(&self) -> Result<(), InvalidRequestError> {
        if self.ticker.trim().is_empty() {
            return Err(InvalidRequestError::EmptyTicker);
        }
        if self.idea.trim().is_empty() {
            return Err(InvalidRequestError::EmptyIdea);
        }
        Ok(())
    }
}

/// The caller-defined set of command names, with one default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    names: Vec<String>,
    default: String,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new(
            [DEFAULT_COMMAND, "risk-highlight", "question-generation", "summary"],
            DEFAULT_COMMAND,
        )
    }
}

impl CommandSet {
    /// Names are trimmed and lower-cased; the default is added if missing.
    pub fn new<I, S>(names: I, default: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for n in names {
            let n = n.as_ref().trim().to_ascii_lowercase();
            if !n.is_empty() && !out.contains(&n) {
                out.push(n);
            }
        }
        let mut default = default.trim().to_ascii_lowercase();
        if default.is_empty() {
            default = out
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        }
        if !out.contains(&default) {
            out.insert(0, default.clone());
        }
        Self {
            names: out,
            default,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn default_command(&self) -> &str {
        &self.default
    }

    pub fn contains(&self, name: &str) -> bool {
        let n = name.trim().to_ascii_lowercase();
        self.names.iter().any(|c| *c == n)
    }

    /// Missing or blank → default; known → canonical spelling; otherwise an error.
    pub fn resolve(&self, name: Option<&str>) -> Result<String, InvalidRequestError> {
        match name.map(str::trim) {
            None | Some("") => Ok(self.default.clone()),
            Some(n) if self.contains(n) => Ok(n.to_ascii_lowercase()),
            Some(n) => Err(InvalidRequestError::UnknownCommand(n.to_string())),
        }
    }
}

fn key_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|\s)(ticker|idea|command)=").unwrap())
}

fn unquote(v: &str) -> &str {
    let v = v.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

/// Parse `ticker=<symbol> idea=<free text> command=<name>`.
///
/// Missing `ticker`/`idea` keys produce empty fields (rejected later by
/// `validate`); a missing `command` resolves to the set's default. Text before
/// the first key, repeated keys, or an unknown command are errors.
pub fn parse_command_line(
    line: &str,
    commands: &CommandSet,
) -> Result<AnalysisRequest, InvalidRequestError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(InvalidRequestError::MalformedCommandLine(
            "empty command line".into(),
        ));
    }

    // (key, value start, match start)
    let mut keys: Vec<(String, usize, usize)> = Vec::new();
    // end of the quoted value being skipped; `key=` inside it is plain text
    let mut quoted_until = 0usize;
    for caps in key_regex().captures_iter(line) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < quoted_until {
            continue;
        }
        let key = key.as_str().to_ascii_lowercase();
        let value_start = whole.end();
        if let Some(rest) = line[value_start..].strip_prefix('"') {
            let Some(close) = rest.find('"') else {
                return Err(InvalidRequestError::MalformedCommandLine(format!(
                    "unterminated quote in `{key}`"
                )));
            };
            quoted_until = value_start + 1 + close + 1;
        }
        keys.push((key, value_start, whole.start()));
    }

    match keys.first() {
        None => {
            return Err(InvalidRequestError::MalformedCommandLine(
                "expected ticker=, idea= or command=".into(),
            ))
        }
        Some((_, _, start)) if *start != 0 => {
            return Err(InvalidRequestError::MalformedCommandLine(format!(
                "unexpected text before first key: `{}`",
                line[..*start].trim()
            )))
        }
        _ => {}
    }

    let mut ticker: Option<String> = None;
    let mut idea: Option<String> = None;
    let mut command: Option<String> = None;

    for (i, (key, value_start, _)) in keys.iter().enumerate() {
        let value_end = keys.get(i + 1).map(|k| k.2).unwrap_or(line.len());
        let value = unquote(&line[*value_start..value_end]).to_string();
        let slot = match key.as_str() {
            "ticker" => &mut ticker,
            "idea" => &mut idea,
            _ => &mut command,
        };
        if slot.is_some() {
            return Err(InvalidRequestError::MalformedCommandLine(format!(
                "`{key}` given more than once"
            )));
        }
        *slot = Some(value);
    }

    let command = commands.resolve(command.as_deref())?;
    Ok(AnalysisRequest {
        ticker: ticker.unwrap_or_default(),
        idea: idea.unwrap_or_default(),
        command,
    })
}
