//! Scaffold definition model.
//!
//! A [`ScaffoldDefinition`] is loaded once per run and never mutated by the
//! engine. The types deserialize directly from the on-disk definition file
//! (the adapters crate picks the format); shape checks that serde cannot
//! express live in [`crate::domain::validation`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::domain::error::DomainError;
use crate::domain::value_objects::{AnswerMap, InjectMode, Value, parse_bool};

// ============================================================================
// ScaffoldDefinition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ScaffoldDefinition {
    pub questions: Vec<Question>,
    pub computed: ComputedValues,
    pub rewrites: Vec<Rewrite>,
    /// Globs excluded from the output entirely.
    pub skips: Vec<String>,
    /// Globs copied byte-for-byte without rendering. Older definitions call
    /// this list `skip`; it never meant exclusion there.
    #[serde(alias = "skip")]
    pub raw: Vec<String>,
    pub inject: Vec<InjectDirective>,
    pub messages: Messages,
    pub features: Vec<Feature>,
    pub delimiters: Vec<DelimiterOverride>,
    pub each: Vec<EachConfig>,
    #[serde(alias = "presents", alias = "tests")]
    pub presets: BTreeMap<String, AnswerMap>,
}

impl ScaffoldDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(&self, name: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.name == name)
    }

    /// Question names followed by computed names, in declaration order.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.questions
            .iter()
            .map(|q| q.name.as_str())
            .chain(self.computed.iter().map(|(name, _)| name))
    }

    pub fn preset(&self, name: &str) -> Result<&AnswerMap, DomainError> {
        self.presets
            .get(name)
            .ok_or_else(|| DomainError::UnknownPreset(name.to_string()))
    }

    // ── builder-style helpers ────────────────────────────────────────────────

    pub fn with_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self
    }

    pub fn with_computed(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.computed.push(name, expr);
        self
    }

    pub fn with_rewrite(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rewrites.push(Rewrite {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn with_skip(mut self, glob: impl Into<String>) -> Self {
        self.skips.push(glob.into());
        self
    }

    pub fn with_raw(mut self, glob: impl Into<String>) -> Self {
        self.raw.push(glob.into());
        self
    }

    pub fn with_feature<I, S>(mut self, value: impl Into<String>, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.push(Feature {
            value: value.into(),
            globs: globs.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_inject(mut self, directive: InjectDirective) -> Self {
        self.inject.push(directive);
        self
    }

    pub fn with_preset(mut self, name: impl Into<String>, answers: AnswerMap) -> Self {
        self.presets.insert(name.into(), answers);
        self
    }
}

// ============================================================================
// Computed values
// ============================================================================

/// `name → expression` pairs kept in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComputedValues(Vec<(String, String)>);

impl ComputedValues {
    pub fn push(&mut self, name: impl Into<String>, expr: impl Into<String>) {
        self.0.push((name.into(), expr.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, e)| (n.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ComputedValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ComputedValues;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of computed names to template expressions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = ComputedValues::default();
                while let Some((name, expr)) = map.next_entry::<String, String>()? {
                    out.push(name, expr);
                }
                Ok(out)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(ComputedValues::default())
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

// ============================================================================
// Questions and prompts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    pub name: String,
    pub prompt: Prompt,
    /// Condition deciding whether the question is asked at all.
    pub when: Option<String>,
    /// UI grouping only.
    pub group: Option<String>,
    pub validate: Validator,
}

impl Question {
    pub fn new(name: impl Into<String>, prompt: Prompt) -> Self {
        Self {
            name: name.into(),
            prompt,
            when: None,
            group: None,
            validate: Validator::default(),
        }
    }

    pub fn text(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Prompt::new(message, PromptKind::Text { default: None }))
    }

    pub fn confirm(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Prompt::new(message, PromptKind::Confirm { default: None }))
    }

    pub fn select<I, S>(name: impl Into<String>, message: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(
            name,
            Prompt::new(
                message,
                PromptKind::Select {
                    options,
                    default: None,
                },
            ),
        )
    }

    pub fn when(mut self, expr: impl Into<String>) -> Self {
        self.when = Some(expr.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.validate.required = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = validator;
        self
    }

    pub fn with_kind(mut self, kind: PromptKind) -> Self {
        self.prompt.kind = kind;
        self
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuestion {
    name: String,
    prompt: Prompt,
    #[serde(default)]
    when: Option<String>,
    #[serde(default)]
    group: Option<String>,
    /// Deprecated spelling of `validate.required`.
    #[serde(default)]
    required: bool,
    #[serde(default)]
    validate: Validator,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("question name must not be empty".into());
        }
        let mut validate = raw.validate;
        validate.required |= raw.required;
        Ok(Self {
            name: raw.name,
            prompt: raw.prompt,
            when: raw.when.filter(|w| !w.trim().is_empty()),
            group: raw.group,
            validate,
        })
    }
}

/// A prompt: label plus a closed set of input shapes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPrompt")]
pub struct Prompt {
    pub message: String,
    pub description: Option<String>,
    pub kind: PromptKind,
}

impl Prompt {
    pub fn new(message: impl Into<String>, kind: PromptKind) -> Self {
        Self {
            message: message.into(),
            description: None,
            kind,
        }
    }
}

/// The six prompt shapes, distinguished in the definition file by which
/// keys are present (`confirm`, `options`, `multi`, `loop`).
#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    /// Single line of text.
    Text { default: Option<String> },
    /// Several values collected in one prompt cycle.
    MultiText { default: Option<Vec<String>> },
    /// Values collected one by one until an empty entry.
    LoopText { default: Option<Vec<String>> },
    Confirm { default: Option<bool> },
    Select {
        options: Vec<String>,
        default: Option<String>,
    },
    MultiSelect {
        options: Vec<String>,
        default: Option<Vec<String>>,
    },
}

impl PromptKind {
    /// Whether answers are lists.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::MultiText { .. } | Self::LoopText { .. } | Self::MultiSelect { .. }
        )
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::Select { options, .. } | Self::MultiSelect { options, .. } => Some(options),
            _ => None,
        }
    }

    /// The declared default as an answer value.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Text { default } | Self::Select { default, .. } => {
                default.clone().map(Value::String)
            }
            Self::MultiText { default }
            | Self::LoopText { default }
            | Self::MultiSelect { default, .. } => default.clone().map(Value::list),
            Self::Confirm { default } => default.map(Value::Bool),
        }
    }

    /// Unit used by `min`/`max` for this shape.
    pub fn bound_unit(&self) -> &'static str {
        match self {
            Self::Text { .. } | Self::Select { .. } => "length",
            Self::MultiSelect { .. } => "selection count",
            Self::MultiText { .. } | Self::LoopText { .. } => "item count",
            Self::Confirm { .. } => "value",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::MultiText { .. } => "multi-text",
            Self::LoopText { .. } => "loop",
            Self::Confirm { .. } => "confirm",
            Self::Select { .. } => "select",
            Self::MultiSelect { .. } => "multi-select",
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPrompt {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confirm: Option<String>,
    #[serde(default)]
    multi: bool,
    #[serde(default, rename = "loop")]
    looped: bool,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    default: Option<Value>,
}

impl TryFrom<RawPrompt> for Prompt {
    type Error = String;

    fn try_from(raw: RawPrompt) -> Result<Self, Self::Error> {
        let RawPrompt {
            message,
            description,
            confirm,
            multi,
            looped,
            options,
            default,
        } = raw;

        if let Some(confirm) = confirm {
            if message.is_some() {
                return Err("a confirm prompt uses 'confirm' instead of 'message'".into());
            }
            if multi || looped || options.is_some() {
                return Err("a confirm prompt cannot use 'multi', 'loop' or 'options'".into());
            }
            let default = default.map(|d| default_bool(&d)).transpose()?;
            return Ok(Self {
                message: confirm,
                description,
                kind: PromptKind::Confirm { default },
            });
        }

        let message = message.ok_or("a prompt needs a 'message' (or 'confirm')")?;
        let kind = match (options, multi, looped) {
            (Some(_), _, true) => return Err("'loop' cannot be combined with 'options'".into()),
            (_, true, true) => return Err("'loop' cannot be combined with 'multi'".into()),
            (Some(options), true, false) => PromptKind::MultiSelect {
                options,
                default: default.map(|d| default_list(&d)).transpose()?,
            },
            (Some(options), false, false) => PromptKind::Select {
                options,
                default: default.map(|d| default_scalar(&d)).transpose()?,
            },
            (None, true, false) => PromptKind::MultiText {
                default: default.map(|d| default_list(&d)).transpose()?,
            },
            (None, false, true) => PromptKind::LoopText {
                default: default.map(|d| default_list(&d)).transpose()?,
            },
            (None, false, false) => PromptKind::Text {
                default: default.map(|d| default_scalar(&d)).transpose()?,
            },
        };

        Ok(Self {
            message,
            description,
            kind,
        })
    }
}

fn default_scalar(v: &Value) -> Result<String, String> {
    match v {
        Value::String(_) | Value::Bool(_) | Value::Int(_) => Ok(v.to_string()),
        other => Err(format!("default must be a single value, got {}", other.type_name())),
    }
}

fn default_list(v: &Value) -> Result<Vec<String>, String> {
    match v {
        Value::List(_) | Value::String(_) => Ok(v.to_string_list()),
        other => Err(format!("default must be a list, got {}", other.type_name())),
    }
}

fn default_bool(v: &Value) -> Result<bool, String> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => parse_bool(s).ok_or_else(|| format!("'{s}' is not a boolean")),
        other => Err(format!("default must be a boolean, got {}", other.type_name())),
    }
}

// ============================================================================
// Validator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Validator {
    pub required: bool,
    #[serde(rename = "match")]
    pub pattern: Option<MatchRule>,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator {
    pub fn is_empty(&self) -> bool {
        !self.required && self.pattern.is_none() && self.min.is_none() && self.max.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchRule {
    pub regex: String,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// File rules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rewrite {
    /// Glob matched against the source path.
    pub from: String,
    /// Destination path template.
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectDirective {
    #[serde(default)]
    pub mode: InjectMode,
    pub name: String,
    /// Target path relative to the output root (may be templated).
    pub path: String,
    /// Literal anchor text.
    pub at: String,
    pub template: String,
}

impl InjectDirective {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        at: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            mode: InjectMode::default(),
            name: name.into(),
            path: path.into(),
            at: at.into(),
            template: template.into(),
        }
    }

    pub fn mode(mut self, mode: InjectMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Messages {
    pub pre: Option<String>,
    pub post: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    /// Condition enabling the feature.
    pub value: String,
    pub globs: Vec<String>,
}

/// Custom action delimiters for files matching `glob`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelimiterOverride {
    pub glob: String,
    pub left: String,
    pub right: String,
}

/// Expands a `[var]` path segment once per item of the list answer `var`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EachConfig {
    pub var: String,
    /// Template for the replacement text; defaults to the item itself.
    #[serde(default, rename = "as")]
    pub as_template: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(json: &str) -> Result<Prompt, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn prompt_shapes_are_decoded_structurally() {
        let p = prompt(r#"{"message": "Name?"}"#).unwrap();
        assert_eq!(p.kind, PromptKind::Text { default: None });

        let p = prompt(r#"{"message": "Tags?", "multi": true}"#).unwrap();
        assert!(matches!(p.kind, PromptKind::MultiText { .. }));

        let p = prompt(r#"{"message": "More?", "loop": true, "default": ["a"]}"#).unwrap();
        assert_eq!(
            p.kind,
            PromptKind::LoopText {
                default: Some(vec!["a".into()])
            }
        );

        let p = prompt(r#"{"confirm": "Docker?", "default": true}"#).unwrap();
        assert_eq!(p.message, "Docker?");
        assert_eq!(p.kind, PromptKind::Confirm { default: Some(true) });

        let p = prompt(r#"{"message": "DB?", "options": ["pg", "mysql"], "default": "pg"}"#).unwrap();
        assert!(matches!(p.kind, PromptKind::Select { ref default, .. } if default.as_deref() == Some("pg")));

        let p = prompt(r#"{"message": "Langs?", "options": ["go"], "multi": true, "default": "go"}"#)
            .unwrap();
        assert!(matches!(p.kind, PromptKind::MultiSelect { ref default, .. } if default == &Some(vec!["go".to_string()])));
    }

    #[test]
    fn unrecognizable_prompts_are_rejected() {
        assert!(prompt(r#"{"description": "nothing else"}"#).is_err());
        assert!(prompt(r#"{"message": "x", "confirm": "y"}"#).is_err());
        assert!(prompt(r#"{"message": "x", "loop": true, "options": ["a"]}"#).is_err());
        assert!(prompt(r#"{"message": "x", "bogus": 1}"#).is_err());
    }

    #[test]
    fn deprecated_required_is_folded_into_validator() {
        let q: Question =
            serde_json::from_str(r#"{"name": "n", "prompt": {"message": "m"}, "required": true}"#)
                .unwrap();
        assert!(q.validate.required);
    }

    #[test]
    fn definition_accepts_alternate_keys_and_keeps_computed_order() {
        let def: ScaffoldDefinition = serde_json::from_str(
            r#"{
                "questions": [],
                "computed": {"zeta": "1", "alpha": "2"},
                "skip": ["*.log"],
                "presents": {"default": {"name": "x", "flag": true}}
            }"#,
        )
        .unwrap();
        let names: Vec<_> = def.computed.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(def.raw, vec!["*.log".to_string()]);
        assert!(def.skips.is_empty());
        let preset = def.preset("default").unwrap();
        assert_eq!(preset.get("flag"), Some(&Value::Bool(true)));
        assert!(def.preset("missing").is_err());
    }

    #[test]
    fn inject_mode_defaults_to_after() {
        let d: InjectDirective = serde_json::from_str(
            r#"{"name": "route", "path": "main.go", "at": "// routes", "template": "x"}"#,
        )
        .unwrap();
        assert_eq!(d.mode, InjectMode::After);
    }

    #[test]
    fn declared_names_include_computed() {
        let def = ScaffoldDefinition::new()
            .with_question(Question::text("name", "Name?"))
            .with_computed("upper", "{{ .name | upper }}");
        assert_eq!(def.declared_names().collect::<Vec<_>>(), vec!["name", "upper"]);
    }
}
