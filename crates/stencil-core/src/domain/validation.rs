use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use tracing::warn;

use crate::domain::entities::definition::{PromptKind, Question, ScaffoldDefinition};
use crate::domain::entities::plan::SourceFile;
use crate::domain::error::DomainError;
use crate::domain::expression::{self, BUILTIN_NAMES, Delimiters, Template};
use crate::domain::planner::Glob;
use crate::domain::renderer::is_binary;

/// Centralized checks on a loaded definition.
///
/// `validate` rejects definitions the engine cannot run. `lint` reports
/// likely mistakes that are still legal.
pub struct DefinitionValidator;

impl DefinitionValidator {
    pub fn validate(def: &ScaffoldDefinition) -> Result<(), DomainError> {
        let mut names = BTreeSet::new();
        for question in &def.questions {
            check_identifier("question", &question.name)?;
            if !names.insert(question.name.as_str()) {
                return Err(invalid(format!("duplicate question name '{}'", question.name)));
            }
            validate_question(question)?;
        }
        for (name, expr) in def.computed.iter() {
            check_identifier("computed value", name)?;
            if !names.insert(name) {
                return Err(invalid(format!(
                    "computed value '{name}' reuses an existing name"
                )));
            }
            parse(format!("computed '{name}'"), expr)?;
        }

        for glob in def.skips.iter().chain(&def.raw) {
            Glob::new(glob)?;
        }
        for feature in &def.features {
            parse(format!("feature '{}'", feature.value), &expression::normalize_expression(&feature.value))?;
            for glob in &feature.globs {
                Glob::new(glob)?;
            }
        }
        for rewrite in &def.rewrites {
            Glob::new(&rewrite.from)?;
            parse(format!("rewrite to '{}'", rewrite.to), &rewrite.to)?;
        }
        for directive in &def.inject {
            if directive.name.trim().is_empty() {
                return Err(invalid("inject directive without a name"));
            }
            if directive.at.is_empty() {
                return Err(invalid(format!("inject '{}': 'at' must not be empty", directive.name)));
            }
            parse(format!("inject '{}' path", directive.name), &directive.path)?;
            parse(format!("inject '{}' template", directive.name), &directive.template)?;
        }
        for delims in &def.delimiters {
            Glob::new(&delims.glob)?;
            if delims.left.is_empty() || delims.right.is_empty() {
                return Err(invalid(format!(
                    "delimiters for '{}' must not be empty",
                    delims.glob
                )));
            }
        }
        for each in &def.each {
            check_identifier("each variable", &each.var)?;
            if let Some(tpl) = &each.as_template {
                parse(format!("each '{}'", each.var), tpl)?;
            }
        }
        if let Some(pre) = &def.messages.pre {
            parse("pre message", pre)?;
        }
        if let Some(post) = &def.messages.post {
            parse("post message", post)?;
        }
        Ok(())
    }

    /// Likely typos: template references to names that are neither
    /// questions, computed values nor built-ins, in the definition itself and
    /// in any renderable source file.
    pub fn lint(def: &ScaffoldDefinition, sources: &[SourceFile]) -> Vec<LintWarning> {
        let declared: BTreeSet<&str> = def.declared_names().chain(BUILTIN_NAMES.iter().copied()).collect();
        let mut warnings = Vec::new();

        let mut check = |location: String, template: Option<Template>| {
            let Some(template) = template else { return };
            for name in template.references() {
                if !declared.contains(name.as_str()) {
                    warnings.push(LintWarning::UndeclaredReference {
                        location: location.clone(),
                        name,
                    });
                }
            }
        };

        for q in &def.questions {
            if let Some(when) = &q.when {
                check(format!("when of '{}'", q.name), expression::parse_expression(when).ok());
            }
        }
        for (name, expr) in def.computed.iter() {
            check(format!("computed '{name}'"), Template::parse(expr).ok());
        }
        for f in &def.features {
            check(format!("feature '{}'", f.value), expression::parse_expression(&f.value).ok());
        }
        for r in &def.rewrites {
            check(format!("rewrite '{}'", r.from), Template::parse(&r.to).ok());
        }
        for d in &def.inject {
            check(format!("inject '{}'", d.name), Template::parse(&d.template).ok());
            check(format!("inject '{}' path", d.name), Template::parse(&d.path).ok());
        }

        for source in sources {
            check(source.path.to_string(), Template::parse(source.path.as_str()).ok());
            if is_binary(&source.path, &source.content) {
                continue;
            }
            let delims = delimiters_for(def, source);
            let text = String::from_utf8_lossy(&source.content);
            check(source.path.to_string(), Template::parse_with(&text, &delims).ok());
        }

        for name in def.presets.values().flat_map(|p| p.names()) {
            if def.question(name).is_none() {
                warnings.push(LintWarning::UnknownPresetKey {
                    name: name.to_string(),
                });
            }
        }
        for each in &def.each {
            if def.question(&each.var).is_none() {
                warnings.push(LintWarning::UndeclaredEachVar {
                    var: each.var.clone(),
                });
            }
        }

        warnings.sort();
        warnings.dedup();
        for w in &warnings {
            warn!("{w}");
        }
        warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LintWarning {
    UndeclaredReference { location: String, name: String },
    UnknownPresetKey { name: String },
    UndeclaredEachVar { var: String },
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndeclaredReference { location, name } => write!(
                f,
                "{location}: '.{name}' is not a question or computed value (possible typo)"
            ),
            Self::UnknownPresetKey { name } => {
                write!(f, "preset key '{name}' does not match any question")
            }
            Self::UndeclaredEachVar { var } => {
                write!(f, "each variable '{var}' is not a question")
            }
        }
    }
}

fn validate_question(q: &Question) -> Result<(), DomainError> {
    if let Some(when) = &q.when {
        parse(format!("when of question '{}'", q.name), &expression::normalize_expression(when))?;
    }
    match &q.prompt.kind {
        PromptKind::Select { options, default } => {
            require_options(q, options)?;
            if let Some(d) = default {
                check_option(q, options, d)?;
            }
        }
        PromptKind::MultiSelect { options, default } => {
            require_options(q, options)?;
            for d in default.iter().flatten() {
                check_option(q, options, d)?;
            }
        }
        _ => {}
    }

    let rules = &q.validate;
    if let Some(rule) = &rules.pattern {
        Regex::new(&rule.regex).map_err(|e| {
            invalid(format!("question '{}': invalid regex '{}': {e}", q.name, rule.regex))
        })?;
    }
    if let (Some(min), Some(max)) = (rules.min, rules.max) {
        if min > max {
            return Err(invalid(format!(
                "question '{}': min ({min}) is greater than max ({max})",
                q.name
            )));
        }
    }
    Ok(())
}

fn require_options(q: &Question, options: &[String]) -> Result<(), DomainError> {
    if options.is_empty() {
        return Err(invalid(format!("question '{}' has no options", q.name)));
    }
    Ok(())
}

fn check_option(q: &Question, options: &[String], value: &str) -> Result<(), DomainError> {
    if !options.iter().any(|o| o == value) {
        return Err(invalid(format!(
            "question '{}': default '{value}' is not one of its options",
            q.name
        )));
    }
    Ok(())
}

fn check_identifier(kind: &str, name: &str) -> Result<(), DomainError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(invalid(format!(
            "{kind} name '{name}' must be a letter or '_' followed by letters, digits or '_'"
        )));
    }
    if BUILTIN_NAMES.contains(&name) {
        return Err(invalid(format!("{kind} name '{name}' is reserved")));
    }
    Ok(())
}

fn parse(context: impl Into<String>, src: &str) -> Result<(), DomainError> {
    Template::parse(src)
        .map(drop)
        .map_err(|e| DomainError::expression(context, e))
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidDefinition(msg.into())
}

fn delimiters_for(def: &ScaffoldDefinition, source: &SourceFile) -> Delimiters {
    def.delimiters
        .iter()
        .rev()
        .find(|d| Glob::new(&d.glob).is_ok_and(|g| g.matches(&source.path)))
        .map(|d| Delimiters::new(&d.left, &d.right))
        .unwrap_or_default()
}
