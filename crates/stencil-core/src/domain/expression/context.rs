//! Evaluation context: the variables a template can see.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::Template;
use super::eval::map_of;
use super::functions::{to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};
use crate::domain::value_objects::{AnswerMap, Value};

/// Names the engine provides on its own, never declared by a scaffold.
pub const BUILTIN_NAMES: &[&str] = &[
    "Project",
    "ProjectSnake",
    "ProjectKebab",
    "ProjectCamel",
    "ProjectPascal",
    "Year",
    "Each",
    "Scaffold",
    "Computed",
];

/// Variables visible to a template plus the strictness policy.
///
/// Answers appear at the top level (`.name`) and again under their
/// namespace (`.Scaffold.name` for questions, `.Computed.name` for computed
/// entries).
///
/// ```
/// use stencil_core::domain::{AnswerMap, RenderContext, Template};
///
/// let answers = AnswerMap::new().with("name", "widget");
/// let ctx = RenderContext::from_answers(&answers).with_project("My App");
/// let tpl = Template::parse("{{ .ProjectSnake }}/{{ .Scaffold.name }}").unwrap();
/// assert_eq!(tpl.render(&ctx).unwrap(), "my_app/widget");
/// ```
#[derive(Debug, Clone)]
pub struct RenderContext {
    root: Value,
    declared: BTreeSet<String>,
    strict: bool,
    partials: Arc<BTreeMap<String, Template>>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            root: Value::Map(BTreeMap::new()),
            declared: BTreeSet::new(),
            strict: false,
            partials: Arc::default(),
        }
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_answers(answers: &AnswerMap) -> Self {
        Self::new().with_answers(answers)
    }

    /// Copy of this context with `answers` layered on top. Built-ins such as
    /// `.Project` and `.Year` are kept.
    pub fn with_answers(&self, answers: &AnswerMap) -> Self {
        let mut ctx = self.clone();
        let mut scaffold = BTreeMap::new();
        let mut computed = BTreeMap::new();
        for (name, value) in answers.iter() {
            if answers.is_computed(name) {
                computed.insert(name.to_string(), value.clone());
            } else {
                scaffold.insert(name.to_string(), value.clone());
            }
            ctx.set(name, value.clone());
            ctx.declared.insert(name.to_string());
        }
        ctx.set("Scaffold", Value::Map(scaffold));
        ctx.set("Computed", Value::Map(computed));
        ctx
    }

    /// Expose `.Project` and its case variants.
    pub fn with_project(mut self, name: &str) -> Self {
        self.set("Project", Value::from(name));
        self.set("ProjectSnake", Value::from(to_snake_case(name)));
        self.set("ProjectKebab", Value::from(to_kebab_case(name)));
        self.set("ProjectCamel", Value::from(to_camel_case(name)));
        self.set("ProjectPascal", Value::from(to_pascal_case(name)));
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.set("Year", Value::Int(i64::from(year)));
        self
    }

    /// Child context for one `each` expansion item.
    pub fn with_each(&self, item: &str, index: usize) -> Self {
        let mut child = self.clone();
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        child.set(
            "Each",
            map_of([("Item", Value::from(item)), ("Index", Value::Int(index))]),
        );
        child
    }

    /// Mark names as declared (questions whose `when` was false are declared
    /// but absent).
    pub fn declare<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.extend(names.into_iter().map(Into::into));
        self
    }

    /// Templates callable as `{{ partial "name" . }}`.
    pub fn with_partials(mut self, partials: BTreeMap<String, Template>) -> Self {
        self.partials = Arc::new(partials);
        self
    }

    pub(crate) fn partial(&self, name: &str) -> Option<&Template> {
        self.partials.get(name)
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Declared by the scaffold or provided by the engine.
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name) || self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match &self.root {
            Value::Map(map) => map.get(name),
            _ => None,
        }
    }

    pub(crate) fn root(&self) -> &Value {
        &self.root
    }

    fn set(&mut self, name: &str, value: Value) {
        if let Value::Map(map) = &mut self.root {
            map.insert(name.to_string(), value);
        }
    }
}
