//! Answer sources backed by the terminal.
//!
//! - [`DialogInput`]: `dialoguer` widgets, used when stdin is a terminal and
//!   the `interactive` feature is enabled.
//! - [`LineInput`]: one answer per line from any reader. Used for piped
//!   stdin, and for terminals in builds without the `interactive` feature.
//!
//! Both hand raw answers to the resolver, which coerces and validates them.
//! An empty reply is returned as [`Value::Null`] so the offered default
//! applies.
//!
//! [`confirm_hook`] asks whether a post-scaffold hook may run.

#[cfg(feature = "interactive")]
use std::io::{self, IsTerminal};

use stencil_core::application::RenderedHook;
use stencil_core::domain::{InputSource, Question, Value};

use crate::error::CliResult;

mod line;
pub use line::LineInput;

#[cfg(feature = "interactive")]
mod dialog;
#[cfg(feature = "interactive")]
pub use dialog::DialogInput;

/// The input source for an interactive run.
#[cfg(feature = "interactive")]
pub fn terminal() -> Box<dyn InputSource> {
    if io::stdin().is_terminal() && io::stderr().is_terminal() {
        Box::new(DialogInput::new())
    } else {
        Box::new(LineInput::stdin())
    }
}

/// The input source for an interactive run.
#[cfg(not(feature = "interactive"))]
pub fn terminal() -> Box<dyn InputSource> {
    Box::new(LineInput::stdin())
}

/// Ask whether `hook` may run, offering to show the script first. Without a
/// terminal to ask on the answer is no.
#[cfg(feature = "interactive")]
pub fn confirm_hook(hook: &RenderedHook) -> CliResult<bool> {
    if !(io::stdin().is_terminal() && io::stderr().is_terminal()) {
        return Ok(false);
    }
    dialog::confirm_hook(hook).map_err(|e| crate::error::CliError::InvalidInput {
        message: format!("could not ask about hook {}", hook.name),
        source: Some(Box::new(e)),
    })
}

#[cfg(not(feature = "interactive"))]
pub fn confirm_hook(_hook: &RenderedHook) -> CliResult<bool> {
    Ok(false)
}

/// Items of a comma separated reply, trimmed, empties dropped.
pub(crate) fn split_list(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// `Value::Null` for a blank reply, the trimmed text otherwise.
pub(crate) fn text_or_null(reply: &str) -> Value {
    let reply = reply.trim();
    if reply.is_empty() {
        Value::Null
    } else {
        Value::from(reply)
    }
}

/// A default as the user would type it.
pub(crate) fn shown(value: &Value) -> String {
    match value {
        Value::List(_) => value.to_string_list().join(", "),
        other => other.to_string(),
    }
}

/// Prompt text with the question's description appended.
pub(crate) fn label(question: &Question) -> String {
    match &question.prompt.description {
        Some(description) if !description.trim().is_empty() => {
            format!("{} ({})", question.prompt.message, description.trim())
        }
        _ => question.prompt.message.clone(),
    }
}
