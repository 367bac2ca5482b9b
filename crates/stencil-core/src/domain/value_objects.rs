//! Domain value objects: [`Value`], [`AnswerMap`], [`InjectMode`].
//!
//! # Design
//!
//! These are pure value types with equality-by-value and no identity.
//! [`Value`] is the single currency of the expression evaluator: answers,
//! computed entries, built-in variables and intermediate function results
//! are all values.
//!
//! Answers only ever take three shapes (string, bool, ordered list of
//! strings). `Int`, `Map` and `Null` exist for the evaluator's benefit:
//! `len` returns an integer, namespaces such as `.Scaffold` are maps, and a
//! missing lookup in non-strict mode yields `Null`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

// ── Value ────────────────────────────────────────────────────────────────────

/// A dynamically typed value flowing through templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a list value from anything yielding strings.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    /// Template truthiness: `false`, `0`, `null` and empty strings, lists and
    /// maps are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Whether the value counts as "no answer" for `required` validation.
    ///
    /// Booleans are never empty: `false` is a legitimate confirm answer.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(_) | Self::Int(_) => false,
            Self::String(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// List items rendered as strings; a scalar becomes a one-item list.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            Self::Null => Vec::new(),
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    /// Rendering form used when a value is interpolated into text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Self::list(items)
    }
}

/// Parse a boolean the way condition results are interpreted.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// ── AnswerMap ────────────────────────────────────────────────────────────────

/// Resolved answers keyed by question or computed name.
///
/// Built incrementally by the answer resolver, then frozen and shared
/// read-only by every downstream component. Computed entries are tracked
/// separately so the `.Computed` namespace can be exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnswerMap {
    entries: BTreeMap<String, Value>,
    #[serde(skip)]
    computed: BTreeSet<String>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a question answer.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.computed.remove(&name);
        self.entries.insert(name, value.into());
    }

    /// Record a computed value.
    pub fn insert_computed(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        self.computed.insert(name.clone());
        self.entries.insert(name, value.into());
    }

    /// Builder-style insert, handy for presets and tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.computed.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merged(mut self, other: &AnswerMap) -> Self {
        for (name, value) in other.iter() {
            self.insert(name, value.clone());
        }
        self
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de> Deserialize<'de> for AnswerMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

// ── InjectMode ───────────────────────────────────────────────────────────────

/// Where injected text goes relative to the anchor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectMode {
    Before,
    #[default]
    After,
}

impl InjectMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for InjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InjectMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" | "" => Ok(Self::After),
            other => Err(DomainError::InvalidDefinition(format!(
                "unknown inject mode '{other}' (expected 'before' or 'after')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_template_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::list(["a"]).is_truthy());
        assert!(!Value::Int(0).is_truthy());
    }

    #[test]
    fn false_confirm_is_not_empty() {
        assert!(!Value::Bool(false).is_empty());
        assert!(Value::from("   ").is_empty());
        assert!(Value::List(vec![]).is_empty());
    }

    #[test]
    fn list_display_matches_go_style() {
        assert_eq!(Value::list(["a", "b"]).to_string(), "[a b]");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn parse_bool_accepts_canonical_forms() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn answer_map_tracks_computed_names() {
        let mut answers = AnswerMap::new();
        answers.insert("name", "widget");
        answers.insert_computed("upper", "WIDGET");

        assert!(!answers.is_computed("name"));
        assert!(answers.is_computed("upper"));
        assert_eq!(answers.len(), 2);
    }

    #[test]
    fn merged_overrides_left_side() {
        let base = AnswerMap::new().with("a", "1").with("b", "2");
        let top = AnswerMap::new().with("b", "3");
        let merged = base.merged(&top);
        assert_eq!(merged.get("b"), Some(&Value::from("3")));
        assert_eq!(merged.get("a"), Some(&Value::from("1")));
    }

    #[test]
    fn inject_mode_parses_and_defaults_to_after() {
        assert_eq!(InjectMode::default(), InjectMode::After);
        assert_eq!("before".parse::<InjectMode>().unwrap(), InjectMode::Before);
        assert!("sideways".parse::<InjectMode>().is_err());
    }

    #[test]
    fn value_deserializes_untagged() {
        let v: Value = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(v, Value::list(["a", "b"]));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
