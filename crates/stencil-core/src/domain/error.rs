// ============================================================================
// domain/error.rs - GENERATION ERROR TAXONOMY
// ============================================================================

use std::fmt;

use thiserror::Error;

/// A 1-based line/column location inside a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (reports and retries hold on to them)
/// - Categorizable (for CLI display and exit codes)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Scaffold authoring errors
    // ========================================================================
    #[error("expression error in {context}: {error}")]
    Expression {
        context: String,
        #[source]
        error: ExpressionError,
    },

    #[error("invalid scaffold definition: {0}")]
    InvalidDefinition(String),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Inject(#[from] InjectError),

    // ========================================================================
    // Answer errors (recoverable interactively)
    // ========================================================================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("preset '{0}' is not defined by this scaffold")]
    UnknownPreset(String),

    #[error("could not read an answer for '{question}': {reason}")]
    Input { question: String, reason: String },
}

impl DomainError {
    /// Wrap an expression error with the definition field it came from.
    pub fn expression(context: impl Into<String>, error: ExpressionError) -> Self {
        Self::Expression {
            context: context.into(),
            error,
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Expression { error, .. } => error.suggestions(),
            Self::InvalidDefinition(_) => vec![
                "Check the scaffold definition file against the documented schema".into(),
                "Run: stencil lint <scaffold>".into(),
            ],
            Self::InvalidPath { .. } => vec![
                "Paths must be relative and must not contain '..' segments".into(),
            ],
            Self::Plan(PlanError::InvalidPattern { .. }) => vec![
                "Glob patterns use '*' within a path segment and '**' across segments".into(),
            ],
            Self::Plan(PlanError::DuplicateDestination { .. }) => vec![
                "Two source files render to the same output path".into(),
                "Adjust the rewrite rules or each expansions so destinations are unique".into(),
            ],
            Self::Plan(_) => vec!["Check the rewrite and each rules of the scaffold".into()],
            Self::Render(e) => {
                let mut out = e.error.suggestions();
                out.push(format!(
                    "Add '{}' to the scaffold's raw globs to copy it without rendering",
                    e.path
                ));
                out
            }
            Self::Inject(InjectError::NoMatch { at, .. }) => vec![
                format!("The anchor text '{at}' was not found in the target file"),
                "Update the directive's 'at' value, or pass --lenient-inject".into(),
            ],
            Self::Inject(_) => vec!["Check the scaffold's inject directives".into()],
            Self::Validation(e) => vec![
                format!("Provide a different value for '{}'", e.question()),
            ],
            Self::UnknownPreset(_) => vec![
                "List the presets declared under 'presets' in the scaffold definition".into(),
            ],
            Self::Input { question, .. } => vec![
                format!("Pass a value with --set {question}=<value>"),
                "Or run with a preset: --preset <name>".into(),
            ],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::UnknownPreset(_) => ErrorCategory::NotFound,
            Self::Input { .. } => ErrorCategory::Internal,
            Self::Expression { .. }
            | Self::InvalidDefinition(_)
            | Self::InvalidPath { .. }
            | Self::Plan(_)
            | Self::Render(_)
            | Self::Inject(_) => ErrorCategory::Scaffold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// An answer failed its validator.
    Validation,
    /// The scaffold itself is broken (definition, templates, directives).
    Scaffold,
    NotFound,
    Internal,
}

// ============================================================================
// ExpressionError
// ============================================================================

/// Malformed or unresolvable template expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("{position}: unclosed action, missing '{delimiter}'")]
    Unclosed {
        position: Position,
        delimiter: String,
    },

    #[error("{position}: {message}")]
    Syntax { position: Position, message: String },

    #[error("{position}: function \"{name}\" not defined")]
    UndefinedFunction { position: Position, name: String },

    #[error("{position}: \"{name}\" is not a declared question or computed value")]
    Undeclared { position: Position, name: String },

    #[error("{position}: {message}")]
    Eval { position: Position, message: String },
}

impl ExpressionError {
    pub fn position(&self) -> Position {
        match self {
            Self::Unclosed { position, .. }
            | Self::Syntax { position, .. }
            | Self::UndefinedFunction { position, .. }
            | Self::Undeclared { position, .. }
            | Self::Eval { position, .. } => *position,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Unclosed { .. } | Self::UndefinedFunction { .. } => vec![
                "If this text belongs to the generated file, escape it with {{ \"{{\" }} or wraptmpl".into(),
                "Or configure custom delimiters / a raw glob for the file".into(),
            ],
            Self::Undeclared { name, .. } => vec![
                format!("Declare '{name}' as a question or computed value"),
                "Or disable strict mode to render missing names as empty".into(),
            ],
            Self::Syntax { .. } | Self::Eval { .. } => {
                vec!["Check the expression syntax near the reported position".into()]
            }
        }
    }
}

// ============================================================================
// ValidationError
// ============================================================================

/// An answer failed its question's validator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{question}' is required")]
    Required { question: String },

    #[error("{}", pattern_message(.question, .pattern, .message.as_deref()))]
    Pattern {
        question: String,
        pattern: String,
        message: Option<String>,
    },

    #[error("'{question}' {unit} must be between {} and {} (got {actual})",
        bound(.min, "0"), bound(.max, "unbounded"))]
    Bounds {
        question: String,
        unit: &'static str,
        actual: usize,
        min: Option<usize>,
        max: Option<usize>,
    },

    #[error("'{question}': '{value}' is not one of the available options")]
    NotAnOption { question: String, value: String },

    #[error("'{question}' expects {expected}, got {found}")]
    Shape {
        question: String,
        expected: &'static str,
        found: String,
    },
}

fn bound(limit: &Option<usize>, open: &str) -> String {
    limit.map_or_else(|| open.to_string(), |n| n.to_string())
}

fn pattern_message(question: &str, pattern: &str, message: Option<&str>) -> String {
    match message {
        Some(m) => format!("'{question}': {m}"),
        None => format!("'{question}' must match /{pattern}/"),
    }
}

impl ValidationError {
    pub fn question(&self) -> &str {
        match self {
            Self::Required { question }
            | Self::Pattern { question, .. }
            | Self::Bounds { question, .. }
            | Self::NotAnOption { question, .. }
            | Self::Shape { question, .. } => question,
        }
    }
}

// ============================================================================
// PlanError
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("rewrite of '{source_path}' failed: {error}")]
    RewriteEval {
        source_path: String,
        #[source]
        error: ExpressionError,
    },

    #[error("destination '{path}' (from '{source_path}') is invalid: {reason}")]
    InvalidDestination {
        source_path: String,
        path: String,
        reason: String,
    },

    #[error("'{first}' and '{second}' both produce '{path}'")]
    DuplicateDestination {
        path: String,
        first: String,
        second: String,
    },

    #[error("each expansion of '{var}' in '{source_path}' failed: {reason}")]
    Each {
        var: String,
        source_path: String,
        reason: String,
    },
}

// ============================================================================
// RenderError
// ============================================================================

/// Template syntax or evaluation failure inside a file.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{path}:{error}{}", excerpt(.source_line))]
pub struct RenderError {
    pub path: String,
    #[source]
    pub error: ExpressionError,
    /// The offending line of the template, when known.
    pub source_line: Option<String>,
}

fn excerpt(line: &Option<String>) -> String {
    match line {
        Some(l) => format!("\n  | {l}"),
        None => String::new(),
    }
}

impl RenderError {
    /// Build an error for `path`, extracting the offending line from `text`.
    pub fn new(path: impl Into<String>, text: &str, error: ExpressionError) -> Self {
        let line = error.position().line;
        let source_line = line
            .checked_sub(1)
            .and_then(|idx| text.lines().nth(idx))
            .map(|l| l.trim_end().to_string());
        Self {
            path: path.into(),
            error,
            source_line,
        }
    }

    pub fn position(&self) -> Position {
        self.error.position()
    }
}

// ============================================================================
// InjectError
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InjectError {
    #[error("inject '{name}': anchor '{at}' not found in '{path}'")]
    NoMatch {
        name: String,
        path: String,
        at: String,
    },

    #[error("inject '{name}': target '{path}' does not exist")]
    TargetMissing { name: String, path: String },

    #[error("inject '{name}': target '{path}' is not a UTF-8 text file")]
    NotText { name: String, path: String },

    #[error("inject '{name}': template failed: {error}")]
    Template {
        name: String,
        #[source]
        error: ExpressionError,
    },

    #[error("inject '{name}': {reason}")]
    Malformed { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_captures_offending_line() {
        let err = RenderError::new(
            "src/app.jsx",
            "first\n{{ console.log('x') }}\nthird",
            ExpressionError::UndefinedFunction {
                position: Position::new(2, 4),
                name: "console".into(),
            },
        );
        assert_eq!(err.source_line.as_deref(), Some("{{ console.log('x') }}"));
        let msg = err.to_string();
        assert!(msg.starts_with("src/app.jsx:2:4"));
        assert!(msg.contains("console"));
    }

    #[test]
    fn bounds_message_mentions_limits() {
        let err = ValidationError::Bounds {
            question: "name".into(),
            unit: "length",
            actual: 1,
            min: Some(3),
            max: None,
        };
        assert_eq!(
            err.to_string(),
            "'name' length must be between 3 and unbounded (got 1)"
        );
    }

    #[test]
    fn pattern_message_prefers_custom_text() {
        let err = ValidationError::Pattern {
            question: "slug".into(),
            pattern: "^[a-z]+$".into(),
            message: Some("lowercase letters only".into()),
        };
        assert_eq!(err.to_string(), "'slug': lowercase letters only");
    }

    #[test]
    fn categories() {
        let v: DomainError = ValidationError::Required {
            question: "q".into(),
        }
        .into();
        assert_eq!(v.category(), ErrorCategory::Validation);
        assert_eq!(
            DomainError::InvalidDefinition("x".into()).category(),
            ErrorCategory::Scaffold
        );
        assert_eq!(
            DomainError::UnknownPreset("p".into()).category(),
            ErrorCategory::NotFound
        );
    }
}
