//! Terminal commands for the registration REPL.
//!
//! Anything that does not start with `/` is an answer to the current
//! question.

use std::path::PathBuf;

use crate::form::Field;

/// Parses a line of terminal input into a Command.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(line: &str) -> Command {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        match lower.as_str() {
            "/skip" => Command::Skip,
            "/form" | "/values" => Command::ShowForm,
            "/submit" => Command::SubmitForm,
            "/restart" | "/start-over" => Command::StartOver,
            "/toggle" | "/chat" => Command::ToggleChat,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => parse_complex(trimmed),
        }
    }
}

fn parse_complex(trimmed: &str) -> Command {
    parse_upload(trimmed)
        .or_else(|| parse_choose(trimmed))
        .or_else(|| parse_set(trimmed))
        .or_else(|| parse_ask(trimmed))
        .unwrap_or_else(|| {
            if trimmed.starts_with('/') {
                Command::Invalid(format!("Unknown command: {trimmed}"))
            } else {
                Command::Answer(trimmed.to_string())
            }
        })
}

/// Text following `/<name>` (with at least one space), or `None` if the line
/// is a different command.
fn argument<'a>(trimmed: &'a str, name: &str) -> Option<&'a str> {
    let head = trimmed.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = &trimmed[name.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// `/upload <path> [path...]`: attach documents.
fn parse_upload(trimmed: &str) -> Option<Command> {
    let args = argument(trimmed, "/upload")?;
    if args.is_empty() {
        return Some(Command::Invalid("Usage: /upload <path> [path...]".into()));
    }
    Some(Command::Upload(
        args.split_whitespace().map(PathBuf::from).collect(),
    ))
}

/// `/choose <value>`: pick an option on the current step.
fn parse_choose(trimmed: &str) -> Option<Command> {
    let value = argument(trimmed, "/choose")?;
    if value.is_empty() {
        return Some(Command::Invalid("Usage: /choose <value>".into()));
    }
    Some(Command::Choose(value.to_string()))
}

/// `/set <field> <value>`: edit the form directly.
fn parse_set(trimmed: &str) -> Option<Command> {
    let args = argument(trimmed, "/set")?;
    let Some((field, value)) = args.split_once(char::is_whitespace) else {
        return Some(Command::Invalid("Usage: /set <field> <value>".into()));
    };
    match field.parse::<Field>() {
        Ok(field) => Some(Command::SetField {
            field,
            value: value.trim().to_string(),
        }),
        Err(e) => Some(Command::Invalid(e.to_string())),
    }
}

/// `/ask <question>`: send a question straight to the assistant fallback.
fn parse_ask(trimmed: &str) -> Option<Command> {
    let question = argument(trimmed, "/ask")?;
    if question.is_empty() {
        return Some(Command::Invalid("Usage: /ask <question>".into()));
    }
    Some(Command::Ask(question.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free-text answer to the current question.
    Answer(String),
    Skip,
    Upload(Vec<PathBuf>),
    Choose(String),
    SetField { field: Field, value: String },
    Ask(String),
    ShowForm,
    /// Submit through the form view rather than the dialogue.
    SubmitForm,
    StartOver,
    ToggleChat,
    Help,
    Quit,
    /// Malformed command; the message explains what was expected.
    Invalid(String),
}

pub const HELP: &str = "\
Answer each question and press Enter.
  /skip                  skip an optional question
  /choose <value>        pick an option (e.g. /choose no)
  /upload <path>...      attach documents
  /set <field> <value>   edit a form field directly
  /ask <question>        ask the assistant something
  /form                  show the current form values
  /submit                submit from the form
  /restart               start over
  /quit                  exit";
