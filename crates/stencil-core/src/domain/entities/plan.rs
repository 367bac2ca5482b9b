use std::fmt;

use super::DomainError;
use super::common::{Permissions, RelativePath};
use super::definition::InjectDirective;
use crate::domain::expression::Delimiters;

/// One file of the template tree as handed over by a source provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: RelativePath,
    pub content: Vec<u8>,
    pub permissions: Permissions,
}

impl SourceFile {
    pub fn new(path: RelativePath, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            content: content.into(),
            permissions: Permissions::read_write(),
        }
    }

    /// Build from a `/`-separated path, rejecting anything that would escape
    /// the template root.
    pub fn try_new(path: &str, content: impl Into<Vec<u8>>) -> Result<Self, DomainError> {
        Ok(Self::new(RelativePath::try_new(path)?, content))
    }

    pub fn executable(mut self) -> Self {
        self.permissions = Permissions::executable();
        self
    }
}

/// What happens to a planned file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Treat the content as a template (unless it sniffs as binary).
    Render(Delimiters),
    /// Copy byte-for-byte (`raw` globs).
    Copy,
}

impl FileAction {
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

/// The item bound to a file produced by an `each` expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EachBinding {
    pub var: String,
    pub item: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub source: RelativePath,
    pub destination: RelativePath,
    pub action: FileAction,
    pub permissions: Permissions,
    pub each: Option<EachBinding>,
}

/// An inject directive whose target path has been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInjection {
    pub directive: InjectDirective,
    pub target: RelativePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a `skips` glob.
    Skipped { glob: String },
    /// Matched the glob of a feature whose value was false.
    FeatureDisabled { value: String },
    /// Expanded over an empty list answer.
    EmptyEach { var: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { glob } => write!(f, "matches skip glob '{glob}'"),
            Self::FeatureDisabled { value } => write!(f, "feature '{value}' is disabled"),
            Self::EmptyEach { var } => write!(f, "'{var}' has no items"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedFile {
    pub source: RelativePath,
    pub reason: SkipReason,
}

/// Ordered output of the plan builder. Files are in lexical source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePlan {
    pub files: Vec<PlannedFile>,
    pub injections: Vec<BoundInjection>,
    pub excluded: Vec<ExcludedFile>,
}

impl FilePlan {
    pub fn destinations(&self) -> impl Iterator<Item = &RelativePath> {
        self.files.iter().map(|f| &f.destination)
    }

    pub fn file_for(&self, destination: &RelativePath) -> Option<&PlannedFile> {
        self.files.iter().find(|f| &f.destination == destination)
    }

    /// Whether `destination` receives at least one injection.
    pub fn is_inject_target(&self, destination: &RelativePath) -> bool {
        self.injections.iter().any(|i| &i.target == destination)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.injections.is_empty()
    }
}
