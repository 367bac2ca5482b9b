//! Template expression language.
//!
//! A small Go-template dialect: `{{ .name }}` lookups, pipelines through
//! built-in functions, `if`/`else if`/`else`/`end`, `range`, comments and
//! trim markers. It is used for file contents, destination paths, `when`
//! conditions, feature values, computed entries and inject templates.
//!
//! Shared snippets registered with [`RenderContext::with_partials`] are
//! rendered in place by `{{ partial "name" . }}`.
//!
//! ## Two layers
//!
//! - [`Template::render`] interpolates values into text.
//! - [`evaluate_condition`] renders a condition and interprets the result
//!   as a boolean (`1 t T TRUE true True` / `0 f F FALSE false False`;
//!   anything else is false).
//!
//! Evaluation is pure: a template plus a [`RenderContext`] in, a string or
//! [`Value`] out.

mod context;
mod eval;
mod functions;
mod lexer;
mod parser;

use std::collections::BTreeSet;

pub use context::{BUILTIN_NAMES, RenderContext};
pub use functions::{names as function_names, to_camel_case, to_kebab_case, to_pascal_case, to_snake_case};

use crate::domain::error::ExpressionError;
use crate::domain::value_objects::{Value, parse_bool};
use eval::Evaluator;
use parser::{Access, Node, Pipeline, Term, TermKind};

pub const DEFAULT_LEFT: &str = "{{";
pub const DEFAULT_RIGHT: &str = "}}";

/// Action delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT, DEFAULT_RIGHT)
    }
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse with the default `{{` `}}` delimiters.
    pub fn parse(src: &str) -> Result<Self, ExpressionError> {
        Self::parse_with(src, &Delimiters::default())
    }

    pub fn parse_with(src: &str, delims: &Delimiters) -> Result<Self, ExpressionError> {
        Ok(Self {
            nodes: parser::parse(src, delims)?,
        })
    }

    pub fn render(&self, ctx: &RenderContext) -> Result<String, ExpressionError> {
        Evaluator::new(ctx).render(&self.nodes)
    }

    /// True when the source contained no actions at all.
    pub fn is_static(&self) -> bool {
        self.nodes.iter().all(|n| matches!(n, Node::Text(_)))
    }

    /// Top-level names this template looks up (`.name`, `$.name`,
    /// `.Scaffold.name`, `.Computed.name`). Lookups relative to a `range`
    /// item are not included.
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_nodes(&self.nodes, true, &mut out);
        out
    }

    /// The single pipeline when the template is exactly one action.
    fn sole_pipeline(&self) -> Option<&Pipeline> {
        match self.nodes.as_slice() {
            [Node::Action(pipe)] => Some(pipe),
            _ => None,
        }
    }
}

/// Parse and render in one step.
pub fn render_str(src: &str, ctx: &RenderContext) -> Result<String, ExpressionError> {
    if !src.contains(DEFAULT_LEFT) {
        return Ok(src.to_string());
    }
    Template::parse(src)?.render(ctx)
}

/// Accept both `{{ expr }}` and a bare `expr`.
pub fn normalize_expression(expr: &str) -> String {
    if expr.contains(DEFAULT_LEFT) {
        expr.to_string()
    } else {
        format!("{DEFAULT_LEFT} {} {DEFAULT_RIGHT}", expr.trim())
    }
}

/// Parse a condition or value expression (see [`normalize_expression`]).
pub fn parse_expression(expr: &str) -> Result<Template, ExpressionError> {
    Template::parse(&normalize_expression(expr))
}

/// Evaluate an expression to a typed [`Value`].
///
/// A lone action yields its value unchanged (`{{ .list }}` is a list);
/// anything with surrounding text renders to a string.
pub fn evaluate(expr: &str, ctx: &RenderContext) -> Result<Value, ExpressionError> {
    let template = parse_expression(expr)?;
    match template.sole_pipeline() {
        Some(pipe) => Evaluator::new(ctx).pipeline(pipe, ctx.root()),
        None => template.render(ctx).map(Value::String),
    }
}

/// Evaluate a `when` condition or feature value.
///
/// An empty expression counts as true (no condition).
pub fn evaluate_condition(expr: &str, ctx: &RenderContext) -> Result<bool, ExpressionError> {
    if expr.trim().is_empty() {
        return Ok(true);
    }
    condition_result(&parse_expression(expr)?, ctx)
}

/// Interpret an already parsed condition.
pub fn condition_result(template: &Template, ctx: &RenderContext) -> Result<bool, ExpressionError> {
    let rendered = template.render(ctx)?;
    Ok(parse_bool(rendered.trim()).unwrap_or(false))
}

// ── reference collection ─────────────────────────────────────────────────────

fn collect_nodes(nodes: &[Node], dot_is_root: bool, out: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Action(pipe) => collect_pipeline(pipe, dot_is_root, out),
            Node::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    collect_pipeline(cond, dot_is_root, out);
                    collect_nodes(body, dot_is_root, out);
                }
                collect_nodes(otherwise, dot_is_root, out);
            }
            Node::Range {
                pipe,
                body,
                otherwise,
            } => {
                collect_pipeline(pipe, dot_is_root, out);
                collect_nodes(body, false, out);
                collect_nodes(otherwise, dot_is_root, out);
            }
        }
    }
}

fn collect_pipeline(pipe: &Pipeline, dot_is_root: bool, out: &mut BTreeSet<String>) {
    for command in &pipe.commands {
        for term in &command.args {
            collect_term(term, dot_is_root, out);
        }
    }
}

fn collect_term(term: &Term, dot_is_root: bool, out: &mut BTreeSet<String>) {
    let rooted = match &term.kind {
        TermKind::Dot => dot_is_root,
        TermKind::Root => true,
        TermKind::Sub(pipe) => {
            collect_pipeline(pipe, dot_is_root, out);
            false
        }
        TermKind::Function(_) | TermKind::Literal(_) => false,
    };

    for step in &term.access {
        if let Access::Index(index) = step {
            collect_term(index, dot_is_root, out);
        }
    }

    if !rooted {
        return;
    }
    let mut fields = term.access.iter().map_while(|a| match a {
        Access::Field(name) => Some(name.as_str()),
        Access::Index(_) => None,
    });
    match fields.next() {
        Some(ns @ ("Scaffold" | "Computed")) => match fields.next() {
            Some(name) => out.insert(name.to_string()),
            None => out.insert(ns.to_string()),
        },
        Some(name) => out.insert(name.to_string()),
        None => false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Position;
    use crate::domain::value_objects::AnswerMap;

    fn ctx() -> RenderContext {
        let answers = AnswerMap::new()
            .with("name", "widget")
            .with("db", "postgres")
            .with("useDocker", true)
            .with("tags", Value::list(["api", "cli"]));
        RenderContext::from_answers(&answers).with_year(2026)
    }

    fn render(src: &str) -> String {
        Template::parse(src).unwrap().render(&ctx()).unwrap()
    }

    #[test]
    fn interpolates_paths() {
        assert_eq!(render("pkg/{{.name}}.go"), "pkg/widget.go");
        assert_eq!(render("{{ .Scaffold.name | upper }}"), "WIDGET");
        assert_eq!(render("(c) {{ .Year }}"), "(c) 2026");
    }

    #[test]
    fn control_flow() {
        assert_eq!(
            render(r#"{{ if eq .db "mysql" }}my{{ else if eq .db "postgres" }}pg{{ else }}none{{ end }}"#),
            "pg"
        );
        assert_eq!(render("{{ range .tags }}[{{ . }}]{{ end }}"), "[api][cli]");
        assert_eq!(render("{{ range .missing }}x{{ else }}empty{{ end }}"), "empty");
        assert_eq!(render("{{ range .tags }}{{ $.name }}{{ end }}"), "widgetwidget");
    }

    #[test]
    fn index_and_parenthesized_calls() {
        assert_eq!(render("{{ .tags[1] }}"), "cli");
        assert_eq!(render(r#"{{ (split "-" "a-b")[1] }}"#), "b");
        assert_eq!(render(r#"{{ join "," (split "-" "a-b") }}"#), "a,b");
    }

    #[test]
    fn missing_names_render_empty_unless_strict() {
        assert_eq!(render("[{{ .nope }}]"), "[]");

        let strict = ctx().strict(true);
        let err = Template::parse("{{ .nope }}")
            .unwrap()
            .render(&strict)
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Undeclared { ref name, .. } if name == "nope"));

        let err = Template::parse("{{ .Computed.nope }}")
            .unwrap()
            .render(&strict)
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Undeclared { .. }));
    }

    #[test]
    fn strict_mode_allows_declared_but_unanswered() {
        let strict = ctx().declare(["skipped"]).strict(true);
        let out = Template::parse("[{{ .skipped }}]")
            .unwrap()
            .render(&strict)
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn evaluate_keeps_types() {
        assert_eq!(evaluate(".tags", &ctx()).unwrap(), Value::list(["api", "cli"]));
        assert_eq!(evaluate("{{ .useDocker }}", &ctx()).unwrap(), Value::Bool(true));
        assert_eq!(
            evaluate("x-{{ .name }}", &ctx()).unwrap(),
            Value::from("x-widget")
        );
    }

    #[test]
    fn conditions_parse_rendered_booleans() {
        let c = ctx();
        assert!(evaluate_condition("{{ .useDocker }}", &c).unwrap());
        assert!(evaluate_condition(r#"eq .db "postgres""#, &c).unwrap());
        assert!(!evaluate_condition("{{ .name }}", &c).unwrap());
        assert!(!evaluate_condition("{{ .missing }}", &c).unwrap());
        assert!(evaluate_condition("", &c).unwrap());
        assert!(evaluate_condition("  {{ not false }}\n", &c).unwrap());
    }

    #[test]
    fn delimiter_collisions_are_rejected() {
        let err = Template::parse("<div>{{ console.log('hi') }}</div>").unwrap_err();
        assert!(matches!(err, ExpressionError::UndefinedFunction { ref name, .. } if name == "console"));

        let err = Template::parse("open {{ .name").unwrap_err();
        assert_eq!(err.position(), Position::new(1, 6));
    }

    #[test]
    fn delimiters_can_be_escaped() {
        assert_eq!(render(r#"{{ "{{" }} x }}"#), "{{ x }}");
        assert_eq!(render("{{ wraptmpl `.Values` }}"), "{{ .Values }}");
        let tpl = Template::parse_with("{{ keep }} <% .name %>", &Delimiters::new("<%", "%>")).unwrap();
        assert_eq!(tpl.render(&ctx()).unwrap(), "{{ keep }} widget");
    }

    #[test]
    fn render_is_deterministic() {
        let tpl = Template::parse("{{ range .tags }}{{ . | kebabcase }}\n{{ end }}").unwrap();
        let c = ctx();
        assert_eq!(tpl.render(&c).unwrap(), tpl.render(&c).unwrap());
    }

    #[test]
    fn references_cover_namespaces_and_skip_range_items() {
        let tpl = Template::parse(
            "{{ .a }}{{ .Scaffold.b }}{{ if .Computed.c }}{{ end }}{{ range .d }}{{ .item }}{{ $.e }}{{ end }}",
        )
        .unwrap();
        let refs: Vec<_> = tpl.references().into_iter().collect();
        assert_eq!(refs, vec!["a", "b", "c", "d", "e"]);
    }

    fn with_partials(entries: &[(&str, &str)]) -> RenderContext {
        let partials = entries
            .iter()
            .map(|(name, src)| (name.to_string(), Template::parse(src).unwrap()))
            .collect();
        ctx().with_partials(partials)
    }

    #[test]
    fn partials_render_with_the_given_dot() {
        let c = with_partials(&[
            ("license/header", "// {{ .Year }} {{ .name }}"),
            ("item", "<{{ . }}>"),
        ]);
        let tpl = Template::parse(
            r#"{{ partial "license/header" . }}|{{ range .tags }}{{ partial "item" . }}{{ end }}"#,
        )
        .unwrap();
        assert_eq!(tpl.render(&c).unwrap(), "// 2026 widget|<api><cli>");

        let piped = Template::parse(r#"{{ .db | partial "item" }}"#).unwrap();
        assert_eq!(piped.render(&c).unwrap(), "<postgres>");
    }

    #[test]
    fn partial_without_data_sees_the_current_dot() {
        let c = with_partials(&[("name", "{{ .name | upper }}")]);
        let tpl = Template::parse(r#"[{{ partial "name" }}]"#).unwrap();
        assert_eq!(tpl.render(&c).unwrap(), "[WIDGET]");
    }

    #[test]
    fn unknown_and_runaway_partials_fail() {
        let c = with_partials(&[("loop", r#"{{ partial "loop" }}"#)]);

        let err = Template::parse(r#"{{ partial "nope" }}"#)
            .unwrap()
            .render(&c)
            .unwrap_err();
        assert!(err.to_string().contains("partial not found: nope"));

        let err = Template::parse(r#"{{ partial "loop" }}"#)
            .unwrap()
            .render(&c)
            .unwrap_err();
        assert!(err.to_string().contains("nested more than 32 deep"));
    }

    #[test]
    fn inflection_in_templates() {
        let c = RenderContext::from_answers(&AnswerMap::new().with("model", "person"));
        let tpl = Template::parse("{{ .model | toPlural | pascalcase }}").unwrap();
        assert_eq!(tpl.render(&c).unwrap(), "People");
    }

    #[test]
    fn static_text_is_detected() {
        assert!(Template::parse("plain text").unwrap().is_static());
        assert!(!Template::parse("{{ .x }}").unwrap().is_static());
    }
}
