//! Inputs and outputs of a generation run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::domain::{AnswerMap, ExcludedFile, FileOutcome, RelativePath};

/// How a directive whose anchor is missing is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectPolicy {
    /// Zero matches fails the run.
    #[default]
    Strict,
    /// Zero matches is logged and reported, the run continues.
    Lenient,
}

/// Shared flag polled between phases. Cancelling after commit started has
/// no effect.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Undeclared root names fail instead of rendering empty.
    pub strict: bool,
    /// Plan and render, but write nothing.
    pub dry_run: bool,
    /// Leave existing destination files untouched.
    pub no_clobber: bool,
    pub inject_policy: InjectPolicy,
    pub cancel: CancelFlag,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub output_root: PathBuf,
    /// Exposed as `.Project`; asked for when the source needs it and this
    /// is `None`.
    pub project_name: Option<String>,
    /// Name of a preset declared by the scaffold.
    pub preset: Option<String>,
    /// Fixed answers layered over the named preset (`--set`).
    pub answers: AnswerMap,
    /// Lowest-precedence defaults (user configuration).
    pub defaults: AnswerMap,
    /// Overrides the current year (`.Year`).
    pub year: Option<i32>,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            project_name: None,
            preset: None,
            answers: AnswerMap::new(),
            defaults: AnswerMap::new(),
            year: None,
            options: GenerateOptions::default(),
        }
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn preset(mut self, name: impl Into<String>) -> Self {
        self.preset = Some(name.into());
        self
    }

    pub fn answers(mut self, answers: AnswerMap) -> Self {
        self.answers = answers;
        self
    }

    pub fn defaults(mut self, defaults: AnswerMap) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub source: String,
    pub destination: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
    Applied,
    /// Anchor missing, tolerated by [`InjectPolicy::Lenient`].
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    pub name: String,
    pub target: String,
    pub matches: usize,
    pub outcome: InjectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedReport {
    pub source: String,
    pub reason: String,
}

impl From<&ExcludedFile> for ExcludedReport {
    fn from(e: &ExcludedFile) -> Self {
        Self {
            source: e.source.to_string(),
            reason: e.reason.to_string(),
        }
    }
}

/// Everything a run did (or, for a dry run, would do).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub output_root: PathBuf,
    pub answers: AnswerMap,
    pub files: Vec<FileReport>,
    pub excluded: Vec<ExcludedReport>,
    pub injections: Vec<InjectionReport>,
    pub pre_message: Option<String>,
    pub post_message: Option<String>,
    /// Rendered post-scaffold hook, run by the caller after commit.
    pub post_hook: Option<RenderedHook>,
    pub dry_run: bool,
}

/// A hook script rendered with the run's answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedHook {
    /// File name inside the scaffold's hooks directory.
    pub name: String,
    pub script: String,
}

impl GenerationReport {
    pub(crate) fn new(output_root: &Path, dry_run: bool) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            answers: AnswerMap::new(),
            files: Vec::new(),
            excluded: Vec::new(),
            injections: Vec::new(),
            pre_message: None,
            post_message: None,
            post_hook: None,
            dry_run,
        }
    }

    pub(crate) fn record_file(&mut self, source: &RelativePath, destination: &RelativePath, outcome: FileOutcome) {
        self.files.push(FileReport {
            source: source.to_string(),
            destination: destination.to_string(),
            outcome,
        });
    }

    /// Files written (or that would be written).
    pub fn written(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.outcome.is_written())
    }

    pub fn outcome_of(&self, destination: &str) -> Option<FileOutcome> {
        self.files
            .iter()
            .find(|f| f.destination == destination)
            .map(|f| f.outcome)
    }
}
