//! Answers supplied ahead of time, for `--no-prompt` runs and tests.

use std::collections::VecDeque;

use tracing::debug;

use stencil_core::domain::{
    AnswerMap, DomainError, InputSource, PromptKind, Question, ValidationError, Value,
};

/// An [`InputSource`] that never blocks.
///
/// A question is answered from the script when present, otherwise with its
/// offered default, otherwise with an empty value of the prompt's shape
/// (so a required question fails validation).
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    answers: AnswerMap,
    /// Successive replies for one question, consumed front to back.
    queued: Vec<(String, VecDeque<Value>)>,
    asked: Vec<String>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: AnswerMap) -> Self {
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn answer(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers.insert(name, value);
        self
    }

    /// Replies handed out in order each time `name` is asked; after the last
    /// one the regular answer or default applies.
    pub fn replies<I, V>(mut self, name: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.queued
            .push((name.into(), replies.into_iter().map(Into::into).collect()));
        self
    }

    /// Names of the questions asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl InputSource for ScriptedInput {
    fn ask(&mut self, question: &Question, default: Option<Value>) -> Result<Value, DomainError> {
        self.asked.push(question.name.clone());

        let queued = self
            .queued
            .iter_mut()
            .find(|(name, _)| *name == question.name)
            .and_then(|(_, replies)| replies.pop_front());
        if let Some(reply) = queued {
            return Ok(reply);
        }
        if let Some(answer) = self.answers.get(&question.name) {
            return Ok(answer.clone());
        }
        Ok(default.unwrap_or_else(|| empty_for(&question.prompt.kind)))
    }

    fn is_interactive(&self) -> bool {
        !self.queued.is_empty()
    }

    fn rejected(&mut self, question: &Question, error: &ValidationError) {
        debug!(question = %question.name, error = %error, "scripted answer rejected");
    }
}

fn empty_for(kind: &PromptKind) -> Value {
    match kind {
        PromptKind::Confirm { .. } => Value::Bool(false),
        k if k.is_list() => Value::List(Vec::new()),
        _ => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_then_default_then_empty() {
        let mut input = ScriptedInput::new().answer("name", "api");

        let name = Question::text("name", "Name?");
        let db = Question::select("db", "DB?", ["pg", "sqlite"]);
        let docker = Question::confirm("docker", "Docker?");

        assert_eq!(input.ask(&name, None).unwrap(), Value::from("api"));
        assert_eq!(input.ask(&db, Some(Value::from("pg"))).unwrap(), Value::from("pg"));
        assert_eq!(input.ask(&docker, None).unwrap(), Value::Bool(false));
        assert_eq!(input.asked(), ["name", "db", "docker"]);
        assert!(!input.is_interactive());
    }

    #[test]
    fn queued_replies_are_consumed_in_order() {
        let mut input = ScriptedInput::new().replies("port", ["abc", "8080"]);
        let port = Question::text("port", "Port?");

        assert!(input.is_interactive());
        assert_eq!(input.ask(&port, None).unwrap(), Value::from("abc"));
        assert_eq!(input.ask(&port, None).unwrap(), Value::from("8080"));
        assert_eq!(input.ask(&port, None).unwrap(), Value::from(""));
    }
}
