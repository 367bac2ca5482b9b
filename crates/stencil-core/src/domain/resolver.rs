//! Answer resolution: walks the questions in declaration order and produces
//! the finalized [`AnswerMap`].

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::domain::entities::definition::{PromptKind, Question, ScaffoldDefinition};
use crate::domain::error::{DomainError, ValidationError};
use crate::domain::expression::{self, RenderContext};
use crate::domain::value_objects::{AnswerMap, Value, parse_bool};

/// Where answers come from when no preset supplies one.
///
/// Implementations must return a value shaped like the prompt variant
/// (string, bool or list of strings); the resolver coerces and validates it.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
    /// Ask one question. `default` is the value to offer; returning an empty
    /// value also selects it.
    fn ask(&mut self, question: &Question, default: Option<Value>) -> Result<Value, DomainError>;

    /// Whether a rejected answer can be asked for again.
    fn is_interactive(&self) -> bool;

    /// Called with the validation failure before a question is re-asked.
    fn rejected(&mut self, question: &Question, error: &ValidationError);
}

/// Answers supplied up front.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// Fixed answers (named preset, `--set` values). Never prompted.
    pub presets: AnswerMap,
    /// Replacement defaults offered to the input source.
    pub defaults: AnswerMap,
}

pub struct AnswerResolver<'a> {
    definition: &'a ScaffoldDefinition,
    base: RenderContext,
}

impl<'a> AnswerResolver<'a> {
    /// `base` carries the built-ins (`.Project`, `.Year`) and the strict flag.
    pub fn new(definition: &'a ScaffoldDefinition, base: &RenderContext) -> Self {
        Self {
            definition,
            base: base.clone().declare(definition.declared_names()),
        }
    }

    #[instrument(skip_all, fields(questions = self.definition.questions.len()))]
    pub fn resolve(
        &self,
        input: &ResolveInput,
        source: &mut dyn InputSource,
    ) -> Result<AnswerMap, DomainError> {
        for name in input.presets.names() {
            if self.definition.question(name).is_none() {
                warn!(name, "preset value does not match any question; ignored");
            }
        }

        let mut answers = AnswerMap::new();
        for question in &self.definition.questions {
            let ctx = self.base.with_answers(&answers);
            if let Some(when) = &question.when {
                let ask = expression::evaluate_condition(when, &ctx).map_err(|e| {
                    DomainError::expression(format!("when of question '{}'", question.name), e)
                })?;
                if !ask {
                    debug!(question = %question.name, "skipped by when");
                    continue;
                }
            }

            let value = match input.presets.get(&question.name) {
                Some(preset) => {
                    let value = coerce(question, preset)?;
                    validate_answer(question, &value)?;
                    value
                }
                None => self.ask(question, input, source)?,
            };
            debug!(question = %question.name, value = %value, "answered");
            answers.insert(question.name.clone(), value);
        }

        for (name, expr) in self.definition.computed.iter() {
            let ctx = self.base.with_answers(&answers);
            let rendered = expression::evaluate(expr, &ctx)
                .map_err(|e| DomainError::expression(format!("computed '{name}'"), e))?
                .to_string();
            let value = match rendered.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(rendered),
            };
            debug!(computed = name, value = %value, "computed");
            answers.insert_computed(name, value);
        }

        Ok(answers)
    }

    fn ask(
        &self,
        question: &Question,
        input: &ResolveInput,
        source: &mut dyn InputSource,
    ) -> Result<Value, DomainError> {
        let default = match input.defaults.get(&question.name) {
            Some(v) => Some(coerce(question, v)?),
            None => question.prompt.kind.default_value(),
        };

        loop {
            let raw = source.ask(question, default.clone())?;
            let raw = match (&default, raw.is_empty()) {
                (Some(d), true) => d.clone(),
                _ => raw,
            };

            let checked = coerce(question, &raw).and_then(|value| {
                validate_answer(question, &value)?;
                Ok(value)
            });
            match checked {
                Ok(value) => return Ok(value),
                Err(DomainError::Validation(err)) if source.is_interactive() => {
                    debug!(question = %question.name, error = %err, "answer rejected");
                    source.rejected(question, &err);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Convert a supplied value to the shape of the question's prompt.
pub fn coerce(question: &Question, value: &Value) -> Result<Value, DomainError> {
    let shape = |expected: &'static str| -> DomainError {
        ValidationError::Shape {
            question: question.name.clone(),
            expected,
            found: value.type_name().to_string(),
        }
        .into()
    };

    let coerced = match &question.prompt.kind {
        PromptKind::Text { .. } => match value {
            Value::String(_) | Value::Int(_) | Value::Bool(_) => Value::String(value.to_string()),
            Value::Null => Value::String(String::new()),
            _ => return Err(shape("a string")),
        },
        PromptKind::Confirm { .. } => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) => Value::Bool(parse_bool(s.trim()).ok_or_else(|| shape("a boolean"))?),
            Value::Null => Value::Bool(false),
            _ => return Err(shape("a boolean")),
        },
        PromptKind::Select { options, .. } => {
            let chosen = match value {
                Value::String(_) | Value::Int(_) | Value::Bool(_) => value.to_string(),
                Value::Null => String::new(),
                _ => return Err(shape("one option")),
            };
            if !chosen.is_empty() && !options.contains(&chosen) {
                return Err(ValidationError::NotAnOption {
                    question: question.name.clone(),
                    value: chosen,
                }
                .into());
            }
            Value::String(chosen)
        }
        PromptKind::MultiSelect { options, .. } => {
            let items = list_items(value).ok_or_else(|| shape("a list of options"))?;
            if let Some(bad) = items.iter().find(|i| !options.contains(i)) {
                return Err(ValidationError::NotAnOption {
                    question: question.name.clone(),
                    value: bad.clone(),
                }
                .into());
            }
            Value::list(items)
        }
        PromptKind::MultiText { .. } | PromptKind::LoopText { .. } => {
            Value::list(list_items(value).ok_or_else(|| shape("a list of strings"))?)
        }
    };
    Ok(coerced)
}

/// Lists stay lists; a single string becomes a one-item list (an empty
/// string an empty list).
fn list_items(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::List(_) => Some(value.to_string_list()),
        Value::String(s) if s.is_empty() => Some(Vec::new()),
        Value::String(s) => Some(vec![s.clone()]),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

/// Apply a question's validator to an already coerced value.
///
/// An empty answer to an optional question is accepted without checking
/// `match`, `min` or `max`.
pub fn validate_answer(question: &Question, value: &Value) -> Result<(), DomainError> {
    let rules = &question.validate;
    let name = || question.name.clone();

    if value.is_empty() {
        if rules.required {
            return Err(ValidationError::Required { question: name() }.into());
        }
        return Ok(());
    }

    if let Some(rule) = &rules.pattern {
        let re = Regex::new(&rule.regex).map_err(|e| {
            DomainError::InvalidDefinition(format!(
                "question '{}': invalid regex '{}': {e}",
                question.name, rule.regex
            ))
        })?;
        let texts: Vec<String> = match value {
            Value::List(_) => value.to_string_list(),
            other => vec![other.to_string()],
        };
        if texts.iter().any(|t| !re.is_match(t)) {
            return Err(ValidationError::Pattern {
                question: name(),
                pattern: rule.regex.clone(),
                message: rule.message.clone(),
            }
            .into());
        }
    }

    if rules.min.is_some() || rules.max.is_some() {
        let actual = match value {
            Value::List(items) => items.len(),
            Value::Bool(_) => return Ok(()),
            other => other.to_string().chars().count(),
        };
        let below = rules.min.is_some_and(|min| actual < min);
        let above = rules.max.is_some_and(|max| actual > max);
        if below || above {
            return Err(ValidationError::Bounds {
                question: name(),
                unit: question.prompt.kind.bound_unit(),
                actual,
                min: rules.min,
                max: rules.max,
            }
            .into());
        }
    }
    Ok(())
}

/// Resolve answers for `definition`. See [`AnswerResolver`].
pub fn resolve(
    definition: &ScaffoldDefinition,
    base: &RenderContext,
    input: &ResolveInput,
    source: &mut dyn InputSource,
) -> Result<AnswerMap, DomainError> {
    AnswerResolver::new(definition, base).resolve(input, source)
}

#[cfg(test)]
mod tests {
    use mockall::predicate::always;

    use super::*;
    use crate::domain::entities::definition::{MatchRule, Validator};

    /// Input source that must never be consulted.
    fn silent() -> MockInputSource {
        let mut mock = MockInputSource::new();
        mock.expect_ask().never();
        mock.expect_is_interactive().return_const(false);
        mock
    }

    fn base() -> RenderContext {
        RenderContext::new()
    }

    fn presets(answers: AnswerMap) -> ResolveInput {
        ResolveInput {
            presets: answers,
            defaults: AnswerMap::new(),
        }
    }

    #[test]
    fn answers_contain_exactly_asked_questions_and_computed() {
        let def = ScaffoldDefinition::new()
            .with_question(Question::confirm("docker", "Use docker?"))
            .with_question(Question::text("image", "Image?").when("{{ .docker }}"))
            .with_question(Question::text("port", "Port?").when(".docker"))
            .with_computed("tag", "{{ .docker }}-tag");

        let input = presets(
            AnswerMap::new()
                .with("docker", false)
                .with("image", "alpine")
                .with("port", "80"),
        );
        let answers = resolve(&def, &base(), &input, &mut silent()).unwrap();
        let names: Vec<_> = answers.names().collect();
        assert_eq!(names, vec!["docker", "tag"]);
        assert!(answers.is_computed("tag"));
        assert_eq!(answers.get("tag"), Some(&Value::from("false-tag")));
    }

    #[test]
    fn computed_values_see_earlier_entries_and_become_booleans() {
        let def = ScaffoldDefinition::new()
            .with_question(Question::text("name", "Name?"))
            .with_computed("snake", "{{ .name | snakecase }}")
            .with_computed("is_long", "{{ gt (len .snake) 5 }}")
            .with_computed("path", "src/{{ .Computed.snake }}");
        let answers = resolve(
            &def,
            &base(),
            &presets(AnswerMap::new().with("name", "MyWidget")),
            &mut silent(),
        )
        .unwrap();
        assert_eq!(answers.get("snake"), Some(&Value::from("my_widget")));
        assert_eq!(answers.get("is_long"), Some(&Value::Bool(true)));
        assert_eq!(answers.get("path"), Some(&Value::from("src/my_widget")));
    }

    #[test]
    fn required_question_left_empty_is_fatal_without_a_terminal() {
        let def = ScaffoldDefinition::new().with_question(Question::text("name", "Name?").required());
        let mut source = MockInputSource::new();
        source
            .expect_ask()
            .times(1)
            .returning(|_, _| Ok(Value::from("")));
        source.expect_is_interactive().return_const(false);
        source.expect_rejected().never();

        let err = resolve(&def, &base(), &ResolveInput::default(), &mut source).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::Required { .. })));
    }

    #[test]
    fn interactive_source_is_asked_again_after_rejection() {
        let def = ScaffoldDefinition::new().with_question(Question::text("slug", "Slug?").validate(
            Validator {
                pattern: Some(MatchRule {
                    regex: "^[a-z]+$".into(),
                    message: Some("lowercase only".into()),
                }),
                ..Validator::default()
            },
        ));

        let mut replies = vec![Value::from("Bad Slug"), Value::from("good")].into_iter();
        let mut source = MockInputSource::new();
        source
            .expect_ask()
            .times(2)
            .returning(move |_, _| Ok(replies.next().unwrap_or_default()));
        source.expect_is_interactive().return_const(true);
        source.expect_rejected().times(1).with(always(), always()).return_const(());

        let answers = resolve(&def, &base(), &ResolveInput::default(), &mut source).unwrap();
        assert_eq!(answers.get("slug"), Some(&Value::from("good")));
    }

    #[test]
    fn preset_failures_are_fatal() {
        let def = ScaffoldDefinition::new()
            .with_question(Question::select("db", "Database?", ["postgres", "mysql"]));
        let err = resolve(
            &def,
            &base(),
            &presets(AnswerMap::new().with("db", "oracle")),
            &mut silent(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationError::NotAnOption { .. })));
    }

    #[test]
    fn empty_reply_selects_the_default() {
        let def = ScaffoldDefinition::new().with_question(
            Question::text("name", "Name?").with_kind(PromptKind::Text {
                default: Some("app".into()),
            }),
        );
        let mut source = MockInputSource::new();
        source
            .expect_ask()
            .withf(|_, default| default == &Some(Value::from("app")))
            .returning(|_, _| Ok(Value::from("")));
        source.expect_is_interactive().return_const(true);

        let answers = resolve(&def, &base(), &ResolveInput::default(), &mut source).unwrap();
        assert_eq!(answers.get("name"), Some(&Value::from("app")));
    }

    #[test]
    fn configured_defaults_replace_declared_ones() {
        let def = ScaffoldDefinition::new().with_question(
            Question::text("author", "Author?").with_kind(PromptKind::Text {
                default: Some("nobody".into()),
            }),
        );
        let input = ResolveInput {
            presets: AnswerMap::new(),
            defaults: AnswerMap::new().with("author", "Ada"),
        };
        let mut source = MockInputSource::new();
        source
            .expect_ask()
            .returning(|_, default| Ok(default.unwrap_or_default()));
        source.expect_is_interactive().return_const(false);

        let answers = resolve(&def, &base(), &input, &mut source).unwrap();
        assert_eq!(answers.get("author"), Some(&Value::from("Ada")));
    }

    #[test]
    fn bounds_follow_the_prompt_shape() {
        let bounded = Validator {
            min: Some(2),
            max: Some(3),
            ..Validator::default()
        };
        let text = Question::text("t", "T?").validate(bounded.clone());
        assert!(validate_answer(&text, &Value::from("abcd")).is_err());
        assert!(validate_answer(&text, &Value::from("héé")).is_ok());

        let multi = Question::text("m", "M?")
            .with_kind(PromptKind::MultiText { default: None })
            .validate(bounded);
        assert!(validate_answer(&multi, &Value::list(["long-item-one"])).is_err());
        assert!(validate_answer(&multi, &Value::list(["a", "b"])).is_ok());
    }

    #[test]
    fn optional_empty_answer_skips_other_rules() {
        let q = Question::text("opt", "Opt?").validate(Validator {
            min: Some(3),
            ..Validator::default()
        });
        assert!(validate_answer(&q, &Value::from("")).is_ok());
    }

    #[test]
    fn coercion_by_shape() {
        let confirm = Question::confirm("c", "C?");
        assert_eq!(coerce(&confirm, &Value::from("TRUE")).unwrap(), Value::Bool(true));
        assert!(coerce(&confirm, &Value::from("maybe")).is_err());

        let multi = Question::text("m", "M?").with_kind(PromptKind::LoopText { default: None });
        assert_eq!(coerce(&multi, &Value::from("one")).unwrap(), Value::list(["one"]));

        let text = Question::text("t", "T?");
        assert!(coerce(&text, &Value::list(["a"])).is_err());
    }

    #[test]
    fn malformed_when_is_an_expression_error() {
        let def = ScaffoldDefinition::new().with_question(Question::text("a", "A?").when("{{ .x"));
        let err = resolve(&def, &base(), &ResolveInput::default(), &mut silent()).unwrap_err();
        assert!(matches!(err, DomainError::Expression { .. }));
    }

    #[test]
    fn strict_mode_allows_skipped_questions_but_not_typos() {
        let strict = RenderContext::new().strict(true);
        let def = ScaffoldDefinition::new()
            .with_question(Question::confirm("a", "A?").when("false"))
            .with_question(Question::text("b", "B?").when("{{ not .a }}"));
        let answers = resolve(
            &def,
            &strict,
            &presets(AnswerMap::new().with("b", "x")),
            &mut silent(),
        )
        .unwrap();
        assert_eq!(answers.get("b"), Some(&Value::from("x")));

        let typo = ScaffoldDefinition::new().with_question(Question::text("b", "B?").when("{{ .typo }}"));
        assert!(resolve(&typo, &strict, &ResolveInput::default(), &mut silent()).is_err());
    }
}
