//! Generation Service - main application orchestrator.
//!
//! Sequences one run:
//! 1. Validate the definition, render the pre message
//! 2. Resolve answers
//! 3. Build the file plan
//! 4. Render or copy every planned file into an in-memory tree
//! 5. Apply inject directives against the complete tree
//! 6. Stage the tree next to the output directory and commit it
//!
//! Nothing outside the staging directory is touched before step 6, and a
//! failure anywhere before commit removes the staging directory.
//!
//! The post-scaffold hook is rendered during the run but executed by
//! [`GenerationService::run_post_hook`], after the caller has decided
//! whether to allow it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::{
        ApplicationError,
        ports::{Filesystem, HookRunner, InputSource, SourceTree},
        services::request::{
            GenerateRequest, GenerationReport, InjectPolicy, InjectionOutcome, InjectionReport,
            RenderedHook,
        },
    },
    domain::{
        DefinitionValidator, DomainError, FileOutcome, InjectError, LintWarning,
        Permissions, ProjectStructure, PromptKind, Prompt, Question, RelativePath, RenderContext,
        ResolveInput, ScaffoldDefinition, SourceFile, Template, build_plan, expression, inject,
        render_file, resolve,
    },
    error::{StencilError, StencilResult},
};

/// Name of the question prepended when a project-mode scaffold runs without
/// a project name.
pub const PROJECT_QUESTION: &str = "Project";

/// Hook scripts whose file name starts with this run after a successful
/// commit. With several, the last by name wins.
pub const POST_SCAFFOLD_HOOK: &str = "post_scaffold";

/// Directory inside staging that holds files a merge overwrote.
const BACKUP_DIR: &str = ".stencil-backup";

/// Main generation service.
pub struct GenerationService {
    filesystem: Box<dyn Filesystem>,
}

impl GenerationService {
    /// Create a new generation service writing through `filesystem`.
    pub fn new(filesystem: Box<dyn Filesystem>) -> Self {
        Self { filesystem }
    }

    /// Run a scaffold.
    #[instrument(
        skip_all,
        fields(
            source = %source.describe(),
            output = %request.output_root.display(),
            dry_run = request.options.dry_run,
        )
    )]
    pub fn generate(
        &self,
        definition: &ScaffoldDefinition,
        source: &dyn SourceTree,
        input: &mut dyn InputSource,
        request: &GenerateRequest,
    ) -> StencilResult<GenerationReport> {
        DefinitionValidator::validate(definition)?;

        let options = &request.options;
        let mut report = GenerationReport::new(&request.output_root, options.dry_run);

        let definition = with_project_question(definition, source, request);
        let base = base_context(&definition, source, request)?;

        if let Some(pre) = &definition.messages.pre {
            report.pre_message = Some(render_message("pre message", pre, &base)?);
        }

        // 1. Answers
        let fixed = match &request.preset {
            Some(name) => definition.preset(name)?.clone().merged(&request.answers),
            None => request.answers.clone(),
        };
        let resolve_input = ResolveInput {
            presets: fixed,
            defaults: request.defaults.clone(),
        };
        let answers = resolve(&definition, &base, &resolve_input, input)?;
        info!(answers = answers.len(), "Answers resolved");

        let ctx = match (&request.project_name, answers.get(PROJECT_QUESTION)) {
            (None, Some(name)) => base.with_project(&name.to_string()),
            _ => base,
        }
        .with_answers(&answers);
        self.check_cancelled(request)?;

        // 2. Plan
        let sources = source.files()?;
        let plan = build_plan(&sources, &definition, &ctx)?;
        info!(
            files = plan.files.len(),
            excluded = plan.excluded.len(),
            injections = plan.injections.len(),
            "Plan built"
        );
        report.excluded = plan.excluded.iter().map(Into::into).collect();
        self.check_cancelled(request)?;

        // 3. Render into the in-memory tree
        let mut tree = ProjectStructure::new();
        for file in &plan.files {
            if options.no_clobber && self.exists_in_output(request, &file.destination) {
                debug!(destination = %file.destination, "exists, not clobbering");
                report.record_file(&file.source, &file.destination, FileOutcome::SkippedExists);
                continue;
            }
            let content = source_content(&sources, &file.source)?;
            let rendered = render_file(file, content, &ctx)?;
            if rendered.outcome.is_written() {
                tree.insert(file.destination.clone(), rendered.content, file.permissions);
            }
            report.record_file(&file.source, &file.destination, rendered.outcome);
        }

        // 4. Injections, strictly after every file is in the tree
        for binding in &plan.injections {
            let name = &binding.directive.name;
            let target = &binding.target;
            if !tree.contains(target) {
                let existing = self.read_existing(request, name, target)?;
                tree.insert(target.clone(), existing, Permissions::read_write());
            }
            let text = tree
                .get(target)
                .and_then(|f| f.text())
                .ok_or_else(|| InjectError::NotText {
                    name: name.clone(),
                    path: target.to_string(),
                })
                .map_err(DomainError::from)?
                .to_string();

            let outcome = match inject(&text, &binding.directive, &ctx) {
                Ok(done) => {
                    tree.replace_content(target, done.content.into_bytes());
                    InjectionReport {
                        name: name.clone(),
                        target: target.to_string(),
                        matches: done.matches,
                        outcome: InjectionOutcome::Applied,
                    }
                }
                Err(DomainError::Inject(InjectError::NoMatch { .. }))
                    if options.inject_policy == InjectPolicy::Lenient =>
                {
                    warn!(directive = %name, target = %target, "anchor not found; injection skipped");
                    InjectionReport {
                        name: name.clone(),
                        target: target.to_string(),
                        matches: 0,
                        outcome: InjectionOutcome::NoMatch,
                    }
                }
                Err(e) => return Err(e.into()),
            };
            report.injections.push(outcome);
        }

        if let Some(post) = &definition.messages.post {
            report.post_message = Some(render_message("post message", post, &ctx)?);
        }
        report.post_hook = render_post_hook(source, &ctx)?;
        report.answers = answers;
        self.check_cancelled(request)?;

        if options.dry_run {
            info!(files = tree.len(), "Dry run, nothing written");
            return Ok(report);
        }

        // 5. Stage and commit
        let staging = staging_dir(&request.output_root);
        if let Err(e) = self.stage(&staging, &tree) {
            self.rollback(&staging);
            return Err(e);
        }
        if let Err(e) = self.check_cancelled(request) {
            self.rollback(&staging);
            return Err(e);
        }
        self.commit(&staging, &request.output_root, &tree)?;

        info!(files = tree.len(), bytes = tree.total_bytes(), "Generation completed successfully");
        Ok(report)
    }

    /// Render only the pre message, so a caller can show it before the
    /// first question is asked. Answers are not known yet.
    pub fn pre_message(
        &self,
        definition: &ScaffoldDefinition,
        source: &dyn SourceTree,
        request: &GenerateRequest,
    ) -> StencilResult<Option<String>> {
        let Some(pre) = &definition.messages.pre else {
            return Ok(None);
        };
        let definition = with_project_question(definition, source, request);
        let base = base_context(&definition, source, request)?;
        render_message("pre message", pre, &base).map(Some)
    }

    /// Run the post-scaffold hook of a committed run inside its output
    /// directory. Returns whether a hook ran.
    #[instrument(skip_all, fields(output = %report.output_root.display()))]
    pub fn run_post_hook(
        &self,
        report: &GenerationReport,
        runner: &dyn HookRunner,
    ) -> StencilResult<bool> {
        let Some(hook) = report.post_hook.as_ref().filter(|_| !report.dry_run) else {
            return Ok(false);
        };
        info!(hook = %hook.name, "Running post-scaffold hook");
        runner.run(hook, &report.output_root)?;
        info!(hook = %hook.name, "Hook finished");
        Ok(true)
    }

    /// Validate a definition and report likely typos in it and its sources.
    pub fn lint(
        &self,
        definition: &ScaffoldDefinition,
        source: &dyn SourceTree,
    ) -> StencilResult<Vec<LintWarning>> {
        DefinitionValidator::validate(definition)?;
        let sources = source.files()?;
        Ok(DefinitionValidator::lint(definition, &sources))
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn check_cancelled(&self, request: &GenerateRequest) -> StencilResult<()> {
        if request.options.cancel.is_cancelled() {
            warn!("Generation cancelled");
            return Err(ApplicationError::Cancelled {
                output: request.output_root.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn exists_in_output(&self, request: &GenerateRequest, path: &RelativePath) -> bool {
        self.filesystem
            .exists(&request.output_root.join(path.to_path_buf()))
    }

    /// Content of an injection target this run did not produce.
    fn read_existing(
        &self,
        request: &GenerateRequest,
        name: &str,
        target: &RelativePath,
    ) -> StencilResult<Vec<u8>> {
        let path = request.output_root.join(target.to_path_buf());
        if !self.filesystem.exists(&path) {
            return Err(DomainError::from(InjectError::TargetMissing {
                name: name.to_string(),
                path: target.to_string(),
            })
            .into());
        }
        self.filesystem.read_file(&path).map_err(|e| {
            ApplicationError::InjectTargetUnreadable {
                path,
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write the whole tree below `staging`.
    fn stage(&self, staging: &Path, tree: &ProjectStructure) -> StencilResult<()> {
        let fail = |path: &Path, e: StencilError| -> StencilError {
            ApplicationError::StagingFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        };

        self.filesystem
            .create_dir_all(staging)
            .map_err(|e| fail(staging, e))?;
        for dir in tree.directories() {
            let path = staging.join(dir.to_path_buf());
            self.filesystem
                .create_dir_all(&path)
                .map_err(|e| fail(&path, e))?;
        }
        for (rel, file) in tree.files() {
            let path = staging.join(rel.to_path_buf());
            self.filesystem
                .write_file(&path, &file.content)
                .map_err(|e| fail(&path, e))?;
            if file.permissions.is_executable() {
                self.filesystem
                    .set_permissions(&path, true)
                    .map_err(|e| fail(&path, e))?;
            }
        }
        debug!(staging = %staging.display(), files = tree.len(), "Staged");
        Ok(())
    }

    /// Move staged output into place. A missing output root is created by
    /// renaming the staging directory itself.
    ///
    /// Merging into an existing root moves one file at a time. Overwritten
    /// files are parked under the staging directory first, so a failure
    /// part-way can put every moved file back and restore what it replaced.
    fn commit(&self, staging: &Path, output: &Path, tree: &ProjectStructure) -> StencilResult<()> {
        if !self.filesystem.exists(output) {
            let moved = output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or(Ok(()), |parent| {
                    self.filesystem
                        .create_dir_all(parent)
                        .map_err(|e| commit_failed(parent, e))
                })
                .and_then(|()| {
                    self.filesystem
                        .rename(staging, output)
                        .map_err(|e| commit_failed(output, e))
                });
            if moved.is_err() {
                self.rollback(staging);
            }
            return moved;
        }

        let mut journal = CommitJournal::default();
        let merged = self.merge(staging, output, tree, &mut journal);
        if merged.is_err() {
            self.undo(&journal);
        }
        self.rollback(staging);
        merged
    }

    fn merge(
        &self,
        staging: &Path,
        output: &Path,
        tree: &ProjectStructure,
        journal: &mut CommitJournal,
    ) -> StencilResult<()> {
        for dir in tree.directories() {
            let path = output.join(dir.to_path_buf());
            if self.filesystem.exists(&path) {
                continue;
            }
            self.filesystem
                .create_dir_all(&path)
                .map_err(|e| commit_failed(&path, e))?;
            journal.created_dirs.push(path);
        }

        let parked = staging.join(BACKUP_DIR);
        for (rel, _) in tree.files() {
            let destination = output.join(rel.to_path_buf());
            let staged = staging.join(rel.to_path_buf());

            let backup = if self.filesystem.exists(&destination) {
                let backup = parked.join(rel.to_path_buf());
                if let Some(parent) = backup.parent() {
                    self.filesystem
                        .create_dir_all(parent)
                        .map_err(|e| commit_failed(parent, e))?;
                }
                self.filesystem
                    .rename(&destination, &backup)
                    .map_err(|e| commit_failed(&destination, e))?;
                Some(backup)
            } else {
                None
            };
            journal.moves.push(CommitMove {
                destination: destination.clone(),
                staged: staged.clone(),
                backup,
                placed: false,
            });

            self.filesystem
                .rename(&staged, &destination)
                .map_err(|e| commit_failed(&destination, e))?;
            if let Some(last) = journal.moves.last_mut() {
                last.placed = true;
            }
        }
        Ok(())
    }

    /// Reverse a partial merge, newest step first. Failures are logged and
    /// the remaining steps still run.
    fn undo(&self, journal: &CommitJournal) {
        for step in journal.moves.iter().rev() {
            if step.placed {
                if let Err(e) = self.filesystem.rename(&step.destination, &step.staged) {
                    warn!(error = %e, path = %step.destination.display(), "Could not withdraw file");
                }
            }
            if let Some(backup) = &step.backup {
                if let Err(e) = self.filesystem.rename(backup, &step.destination) {
                    warn!(error = %e, path = %step.destination.display(), "Could not restore file");
                }
            }
        }
        for dir in journal.created_dirs.iter().rev() {
            if let Err(e) = self.filesystem.remove_dir_all(dir) {
                warn!(error = %e, path = %dir.display(), "Could not remove directory");
            }
        }
        info!(files = journal.moves.len(), "Partial commit reverted");
    }

    /// Best-effort removal of the staging directory.
    fn rollback(&self, staging: &Path) {
        if !self.filesystem.exists(staging) {
            return;
        }
        if let Err(e) = self.filesystem.remove_dir_all(staging) {
            warn!(
                error = %e,
                path = %staging.display(),
                "Rollback failed"
            );
        } else {
            debug!(path = %staging.display(), "Staging removed");
        }
    }
}

/// Steps taken while merging staged files into an existing output root.
#[derive(Debug, Default)]
struct CommitJournal {
    created_dirs: Vec<PathBuf>,
    moves: Vec<CommitMove>,
}

#[derive(Debug)]
struct CommitMove {
    destination: PathBuf,
    staged: PathBuf,
    backup: Option<PathBuf>,
    placed: bool,
}

fn commit_failed(path: &Path, e: StencilError) -> StencilError {
    ApplicationError::CommitFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
    .into()
}

/// Sibling directory `.<name>.stencil-<uuid>` next to the output root, so the
/// final rename stays on one filesystem.
pub fn staging_dir(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let staged = format!(".{name}.stencil-{}", Uuid::new_v4().simple());
    match output.parent() {
        Some(parent) => parent.join(staged),
        None => PathBuf::from(staged),
    }
}

/// Prepend a required `Project` question for project-mode sources run
/// without a name.
fn with_project_question(
    definition: &ScaffoldDefinition,
    source: &dyn SourceTree,
    request: &GenerateRequest,
) -> ScaffoldDefinition {
    let mut definition = definition.clone();
    if request.project_name.is_none()
        && source.requires_project_name()
        && definition.question(PROJECT_QUESTION).is_none()
    {
        let question = Question::new(
            PROJECT_QUESTION,
            Prompt::new("Project name", PromptKind::Text { default: None }),
        )
        .required();
        definition.questions.insert(0, question);
    }
    definition
}

/// Context shared by every template of a run before answers exist.
fn base_context(
    definition: &ScaffoldDefinition,
    source: &dyn SourceTree,
    request: &GenerateRequest,
) -> StencilResult<RenderContext> {
    let year = request.year.unwrap_or_else(|| chrono::Local::now().year());
    let mut base = RenderContext::new()
        .with_year(year)
        .strict(request.options.strict)
        .declare(definition.declared_names())
        .with_partials(load_partials(source)?);
    if let Some(name) = &request.project_name {
        base = base.with_project(name);
    }
    Ok(base)
}

/// Parse every partial, keyed by its path without the final extension
/// (`license/header.tmpl` is `license/header`).
fn load_partials(source: &dyn SourceTree) -> StencilResult<BTreeMap<String, Template>> {
    let mut partials = BTreeMap::new();
    for file in source.partials()? {
        let name = match (file.path.extension(), file.path.as_str().rsplit_once('.')) {
            (Some(_), Some((stem, _))) => stem.to_string(),
            _ => file.path.to_string(),
        };
        let text = source_text(source, "partial", &file)?;
        let template = Template::parse(text)
            .map_err(|e| DomainError::expression(format!("partial {name}"), e))?;
        partials.insert(name, template);
    }
    debug!(count = partials.len(), "Partials loaded");
    Ok(partials)
}

fn render_post_hook(
    source: &dyn SourceTree,
    ctx: &RenderContext,
) -> StencilResult<Option<RenderedHook>> {
    let mut hooks = source.hooks()?;
    hooks.retain(|h| h.path.file_name().starts_with(POST_SCAFFOLD_HOOK));
    hooks.sort_by(|a, b| a.path.cmp(&b.path));
    let Some(hook) = hooks.pop() else {
        return Ok(None);
    };

    let name = hook.path.to_string();
    let script = expression::render_str(source_text(source, "hook", &hook)?, ctx)
        .map_err(|e| DomainError::expression(format!("hook {name}"), e))?;
    debug!(hook = %name, "Hook rendered");
    Ok(Some(RenderedHook { name, script }))
}

fn source_text<'a>(
    source: &dyn SourceTree,
    what: &str,
    file: &'a SourceFile,
) -> StencilResult<&'a str> {
    std::str::from_utf8(&file.content).map_err(|_| {
        ApplicationError::SourceUnavailable {
            source_name: source.describe(),
            reason: format!("{what} '{}' is not UTF-8 text", file.path),
        }
        .into()
    })
}

fn render_message(what: &str, src: &str, ctx: &RenderContext) -> StencilResult<String> {
    expression::render_str(src, ctx)
        .map(|s| s.trim().to_string())
        .map_err(|e| DomainError::expression(what, e).into())
}

fn source_content<'a>(sources: &'a [SourceFile], path: &RelativePath) -> StencilResult<&'a [u8]> {
    sources
        .iter()
        .find(|s| &s.path == path)
        .map(|s| s.content.as_slice())
        .ok_or_else(|| StencilError::Internal {
            message: format!("planned source '{path}' is not in the source tree"),
        })
}
