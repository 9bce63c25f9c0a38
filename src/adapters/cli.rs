//! CLI adapter: line-oriented REPL over any async reader and writer.
//!
//! Plain lines are questions. Lines starting with `/` are commands. Each line
//! is fully handled (including the completion call) before the next is read.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::profile::{ProfileError, ProfileField};
use crate::prompt::Persona;
use crate::session::{ChatSession, Interaction, InteractionReport, Outcome};

/// Help text printed by `/help`.
pub const HELP: &str = "\
Type a question and press enter. Commands:
  /suggest              list suggested questions
  /suggest N            ask suggested question N
  /set FIELD VALUE      edit a profile field (name, roles, organizations,
                        interests, achievements, tone); use \\n for new lines
  /persona NAME         concierge, avatar or grounded
  /model NAME           switch completion model
  /temperature T        sampling temperature in [0.0, 1.2]
  /prompt               show the compiled system prompt
  /profile              show the profile as JSON
  /clear                clear the conversation
  /help                 show this help
  /quit                 exit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Blank line.
    Empty,
    /// Free-text question.
    Ask(String),
    /// Ask suggestion number N (1-based).
    Suggest(usize),
    /// List the suggestion catalog.
    ListSuggestions,
    /// Edit a profile field.
    Set {
        /// Field to edit.
        field: ProfileField,
        /// New value.
        value: String,
    },
    /// Switch persona.
    Persona(Persona),
    /// Switch model.
    Model(String),
    /// Change temperature.
    Temperature(f64),
    /// Print the compiled system prompt.
    ShowPrompt,
    /// Print the profile.
    ShowProfile,
    /// Clear the conversation.
    Clear,
    /// Print help.
    Help,
    /// Leave the REPL.
    Quit,
}

/// A REPL line that could not be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Unrecognised `/command`.
    #[error("unknown command '/{0}', try /help")]
    Unknown(String),
    /// Required argument missing.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Argument is not a number.
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
    /// Bad profile field or value.
    #[error(transparent)]
    Profile(#[from] ProfileError),
    /// Bad persona name.
    #[error("{0}")]
    Persona(String),
}

/// Parse one input line.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands or malformed arguments.
pub fn parse_line(line: &str) -> Result<ReplCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    let Some(command_line) = line.strip_prefix('/') else {
        return Ok(ReplCommand::Ask(line.to_owned()));
    };

    let (name, rest) = match command_line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command_line, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "suggest" | "s" if rest.is_empty() => Ok(ReplCommand::ListSuggestions),
        "suggest" | "s" => rest
            .parse()
            .map(ReplCommand::Suggest)
            .map_err(|_| CommandError::InvalidNumber(rest.to_owned())),
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage("/set FIELD VALUE"))?;
            Ok(ReplCommand::Set {
                field: field.parse()?,
                value: value.trim().replace("\\n", "\n"),
            })
        }
        "persona" if rest.is_empty() => Err(CommandError::Usage("/persona NAME")),
        "persona" => rest
            .parse()
            .map(ReplCommand::Persona)
            .map_err(CommandError::Persona),
        "model" if rest.is_empty() => Err(CommandError::Usage("/model NAME")),
        "model" => Ok(ReplCommand::Model(rest.to_owned())),
        "temperature" | "temp" if rest.is_empty() => Err(CommandError::Usage("/temperature T")),
        "temperature" | "temp" => rest
            .parse()
            .map(ReplCommand::Temperature)
            .map_err(|_| CommandError::InvalidNumber(rest.to_owned())),
        "prompt" => Ok(ReplCommand::ShowPrompt),
        "profile" => Ok(ReplCommand::ShowProfile),
        "clear" => Ok(ReplCommand::Clear),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

/// Why the REPL stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// The user typed `/quit`.
    Quit,
    /// Input reached end of file.
    EndOfInput,
    /// A terminal failure (missing credential) stopped the session.
    Halted,
}

/// Drive a session from `input`, writing everything user-visible to `output`.
///
/// # Errors
///
/// Returns an error only when reading input or writing output fails.
pub async fn run_repl<R, W>(
    session: &mut ChatSession,
    greeting: Option<&str>,
    mut input: R,
    output: &mut W,
) -> anyhow::Result<ReplExit>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    print_greeting(session, greeting, output)?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            writeln!(output)?;
            return Ok(ReplExit::EndOfInput);
        }

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "error: {e}")?;
                continue;
            }
        };

        let interaction = match command {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => return Ok(ReplExit::Quit),
            ReplCommand::Help => {
                writeln!(output, "{HELP}")?;
                continue;
            }
            ReplCommand::ListSuggestions => {
                for (number, question) in (1_usize..).zip(session.catalog().questions()) {
                    writeln!(output, "  {number}. {question}")?;
                }
                continue;
            }
            ReplCommand::ShowPrompt => {
                for warning in session.render() {
                    writeln!(output, "warning: {warning}")?;
                }
                writeln!(output, "{}", session.system_prompt())?;
                continue;
            }
            ReplCommand::ShowProfile => {
                writeln!(output, "{}", profile_preview(session))?;
                continue;
            }
            ReplCommand::Set { field, value } => {
                match session.set_field(field, &value) {
                    Ok(()) => writeln!(output, "updated {field:?}")?,
                    Err(e) => writeln!(output, "error: {e}")?,
                }
                continue;
            }
            ReplCommand::Persona(persona) => {
                session.set_persona(persona);
                writeln!(output, "persona set to {persona:?}")?;
                continue;
            }
            ReplCommand::Model(model) => {
                match session.set_model(&model) {
                    Ok(()) => writeln!(output, "model set to {}", session.params().model())?,
                    Err(e) => writeln!(output, "error: {e}")?,
                }
                continue;
            }
            ReplCommand::Temperature(t) => {
                match session.set_temperature(t) {
                    Ok(()) => writeln!(output, "temperature set to {t}")?,
                    Err(e) => writeln!(output, "error: {e}")?,
                }
                continue;
            }
            ReplCommand::Clear => Interaction::clear(),
            ReplCommand::Ask(text) => Interaction::typed(text),
            ReplCommand::Suggest(number) => match session.catalog().get(number) {
                Some(question) => {
                    writeln!(output, "you: {question}")?;
                    Interaction::suggestion(question)
                }
                None => {
                    writeln!(
                        output,
                        "error: no suggestion {number} (1-{})",
                        session.catalog().len()
                    )?;
                    continue;
                }
            },
        };

        let cleared = interaction.clear;
        let report = session.interact(interaction).await;
        if write_report(&report, output)? {
            return Ok(ReplExit::Halted);
        }
        if cleared {
            writeln!(output, "conversation cleared")?;
            print_greeting(session, greeting, output)?;
        }
    }
}

/// Print warnings and the outcome of one interaction.
///
/// Returns `true` when the failure must stop the session.
pub fn write_report<W: Write>(report: &InteractionReport, output: &mut W) -> std::io::Result<bool> {
    for warning in &report.warnings {
        writeln!(output, "warning: {warning}")?;
    }
    match &report.outcome {
        Outcome::Idle => Ok(false),
        Outcome::Replied(reply) => {
            writeln!(output, "assistant: {reply}")?;
            Ok(false)
        }
        Outcome::Failed(e) => {
            writeln!(output, "error: {e}")?;
            Ok(e.halts_session())
        }
    }
}

/// Pretty JSON of the editable profile plus any structured record.
pub fn profile_preview(session: &ChatSession) -> String {
    let mut preview = session.profile().to_json();
    if let (Some(record), Some(map)) = (&session.profile().record, preview.as_object_mut()) {
        map.insert(
            "record".to_owned(),
            serde_json::Value::Object(record.clone()),
        );
    }
    serde_json::to_string_pretty(&preview).unwrap_or_else(|_| preview.to_string())
}

fn print_greeting<W: Write>(
    session: &ChatSession,
    greeting: Option<&str>,
    output: &mut W,
) -> std::io::Result<()> {
    if let Some(greeting) = greeting {
        if session.log().history().next().is_none() {
            writeln!(output, "assistant: {greeting}")?;
        }
    }
    Ok(())
}
