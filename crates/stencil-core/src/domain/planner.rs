//! File plan builder: decides, per source file, whether it is skipped,
//! where it lands and how its content is treated.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::debug;

use crate::domain::entities::common::RelativePath;
use crate::domain::entities::definition::{EachConfig, ScaffoldDefinition};
use crate::domain::entities::plan::{
    BoundInjection, EachBinding, ExcludedFile, FileAction, FilePlan, PlannedFile, SkipReason,
    SourceFile,
};
use crate::domain::error::{DomainError, PlanError};
use crate::domain::expression::{self, Delimiters, RenderContext, Template};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled glob that remembers its source text.
#[derive(Debug, Clone)]
pub struct Glob {
    text: String,
    pattern: Pattern,
}

impl Glob {
    pub fn new(text: &str) -> Result<Self, PlanError> {
        let pattern = Pattern::new(text).map_err(|e| PlanError::InvalidPattern {
            pattern: text.to_string(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self {
            text: text.to_string(),
            pattern,
        })
    }

    pub fn matches(&self, path: &RelativePath) -> bool {
        self.pattern.matches_with(path.as_str(), MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn compile_all<'a>(texts: impl IntoIterator<Item = &'a String>) -> Result<Vec<Glob>, PlanError> {
    texts.into_iter().map(|t| Glob::new(t)).collect()
}

struct CompiledFeature {
    value: String,
    enabled: bool,
    globs: Vec<Glob>,
}

struct CompiledRewrite {
    from: Glob,
    to: Template,
}

struct Expansion {
    binding: EachBinding,
    token: String,
    replacement: String,
}

struct CompiledEach<'a> {
    config: &'a EachConfig,
    as_template: Option<Template>,
}

/// Builds a [`FilePlan`] from a source tree, a definition and the finalized
/// answers in `ctx`.
pub struct PlanBuilder<'a> {
    definition: &'a ScaffoldDefinition,
    ctx: &'a RenderContext,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(definition: &'a ScaffoldDefinition, ctx: &'a RenderContext) -> Self {
        Self { definition, ctx }
    }

    /// Every pattern and template is compiled before the first file is
    /// looked at, so a broken rule fails the run even if no file matches it.
    pub fn build(&self, sources: &[SourceFile]) -> Result<FilePlan, DomainError> {
        let def = self.definition;
        let skips = compile_all(&def.skips)?;
        let raw = compile_all(&def.raw)?;
        let features = self.compile_features()?;
        let rewrites = self.compile_rewrites()?;
        let delimiters = def
            .delimiters
            .iter()
            .map(|d| Ok((Glob::new(&d.glob)?, Delimiters::new(&d.left, &d.right))))
            .collect::<Result<Vec<_>, PlanError>>()?;
        let each = self.compile_each()?;

        let mut ordered: Vec<&SourceFile> = sources.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));

        let mut plan = FilePlan::default();
        let mut seen: BTreeMap<RelativePath, RelativePath> = BTreeMap::new();

        for source in ordered {
            let path = &source.path;

            if let Some(glob) = skips.iter().find(|g| g.matches(path)) {
                debug!(source = %path, glob = glob.as_str(), "skipped");
                plan.excluded.push(ExcludedFile {
                    source: path.clone(),
                    reason: SkipReason::Skipped {
                        glob: glob.as_str().to_string(),
                    },
                });
                continue;
            }

            // Conjunctive gating: every feature whose globs match must be on.
            if let Some(off) = features
                .iter()
                .find(|f| !f.enabled && f.globs.iter().any(|g| g.matches(path)))
            {
                debug!(source = %path, feature = %off.value, "feature disabled");
                plan.excluded.push(ExcludedFile {
                    source: path.clone(),
                    reason: SkipReason::FeatureDisabled {
                        value: off.value.clone(),
                    },
                });
                continue;
            }

            let action = if raw.iter().any(|g| g.matches(path)) {
                FileAction::Copy
            } else {
                let delims = delimiters
                    .iter()
                    .rev()
                    .find(|(g, _)| g.matches(path))
                    .map(|(_, d)| d.clone())
                    .unwrap_or_default();
                FileAction::Render(delims)
            };

            let rewrite = rewrites.iter().find(|r| r.from.matches(path));
            let own_template;
            let template = match rewrite {
                Some(r) => &r.to,
                None => {
                    own_template = source_template(path)?;
                    &own_template
                }
            };
            let runs: Vec<Option<Expansion>> = match self.expand_each(path, &each)? {
                None => vec![None],
                Some(expansions) if expansions.is_empty() => {
                    let var = each_token(path.as_str()).map_or("", |(var, _)| var);
                    debug!(source = %path, var, "each list is empty");
                    plan.excluded.push(ExcludedFile {
                        source: path.clone(),
                        reason: SkipReason::EmptyEach {
                            var: var.to_string(),
                        },
                    });
                    continue;
                }
                Some(expansions) => expansions.into_iter().map(Some).collect(),
            };

            for run in runs {
                let scoped = run
                    .as_ref()
                    .map(|e| self.ctx.with_each(&e.binding.item, e.binding.index));
                let ctx = scoped.as_ref().unwrap_or(self.ctx);

                let rendered = template.render(ctx).map_err(|error| PlanError::RewriteEval {
                    source_path: path.to_string(),
                    error,
                })?;
                let rendered = match &run {
                    Some(e) => rendered.replacen(e.token.as_str(), &e.replacement, 1),
                    None => rendered,
                };
                let destination = destination_path(path, rendered)?;

                if let Some(first) = seen.get(&destination) {
                    return Err(PlanError::DuplicateDestination {
                        path: destination.to_string(),
                        first: first.to_string(),
                        second: path.to_string(),
                    }
                    .into());
                }
                seen.insert(destination.clone(), path.clone());

                debug!(source = %path, destination = %destination, "planned");
                plan.files.push(PlannedFile {
                    source: path.clone(),
                    destination,
                    action: action.clone(),
                    permissions: source.permissions,
                    each: run.map(|e| e.binding),
                });
            }
        }

        plan.injections = self.bind_injections()?;
        Ok(plan)
    }

    fn compile_features(&self) -> Result<Vec<CompiledFeature>, DomainError> {
        self.definition
            .features
            .iter()
            .map(|f| {
                let globs = compile_all(&f.globs)?;
                let enabled = expression::evaluate_condition(&f.value, self.ctx)
                    .map_err(|e| DomainError::expression(format!("feature '{}'", f.value), e))?;
                Ok(CompiledFeature {
                    value: f.value.clone(),
                    enabled,
                    globs,
                })
            })
            .collect()
    }

    fn compile_rewrites(&self) -> Result<Vec<CompiledRewrite>, DomainError> {
        self.definition
            .rewrites
            .iter()
            .map(|r| {
                let from = Glob::new(&r.from)?;
                let to = Template::parse(&r.to)
                    .map_err(|e| DomainError::expression(format!("rewrite to '{}'", r.to), e))?;
                Ok(CompiledRewrite { from, to })
            })
            .collect()
    }

    fn compile_each(&self) -> Result<Vec<CompiledEach<'a>>, DomainError> {
        self.definition
            .each
            .iter()
            .map(|config| {
                let as_template = config
                    .as_template
                    .as_deref()
                    .map(Template::parse)
                    .transpose()
                    .map_err(|e| DomainError::expression(format!("each '{}'", config.var), e))?;
                Ok(CompiledEach {
                    config,
                    as_template,
                })
            })
            .collect()
    }

    /// One expansion per list item when the path contains a `[var]`
    /// segment declared under `each`; `None` when it does not.
    fn expand_each(
        &self,
        path: &RelativePath,
        each: &[CompiledEach<'_>],
    ) -> Result<Option<Vec<Expansion>>, DomainError> {
        let Some((var, token)) = each_token(path.as_str()) else {
            return Ok(None);
        };
        let Some(compiled) = each.iter().find(|e| e.config.var == var) else {
            return Ok(None);
        };

        let items = self
            .ctx
            .get(var)
            .map(|v| v.to_string_list())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let replacement = match &compiled.as_template {
                Some(tpl) => {
                    let ctx = self.ctx.with_each(&item, index);
                    let rendered = tpl.render(&ctx).map_err(|e| PlanError::Each {
                        var: var.to_string(),
                        source_path: path.to_string(),
                        reason: e.to_string(),
                    })?;
                    if rendered.is_empty() {
                        return Err(self.each_error(var, path, "'as' rendered an empty string"));
                    }
                    if rendered.contains('/') {
                        return Err(self.each_error(
                            var,
                            path,
                            &format!("'as' rendered '{rendered}', which contains a path separator"),
                        ));
                    }
                    rendered
                }
                None => item.clone(),
            };
            out.push(Expansion {
                binding: EachBinding {
                    var: var.to_string(),
                    item,
                    index,
                },
                token: token.to_string(),
                replacement,
            });
        }
        Ok(Some(out))
    }

    fn each_error(&self, var: &str, path: &RelativePath, reason: &str) -> DomainError {
        PlanError::Each {
            var: var.to_string(),
            source_path: path.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }

    fn bind_injections(&self) -> Result<Vec<BoundInjection>, DomainError> {
        let mut bound = Vec::with_capacity(self.definition.inject.len());
        for directive in &self.definition.inject {
            let context = format!("inject '{}'", directive.name);
            // Parse the template now so a broken one fails before any write.
            Template::parse(&directive.template)
                .map_err(|e| DomainError::expression(&context, e))?;
            let target = expression::render_str(&directive.path, self.ctx)
                .map_err(|e| DomainError::expression(&context, e))?;
            let target = RelativePath::try_new(&target)?;
            bound.push(BoundInjection {
                directive: directive.clone(),
                target,
            });
        }
        Ok(bound)
    }
}

/// Source paths may themselves be templates (`{{ .Project }}/README.md`).
fn source_template(path: &RelativePath) -> Result<Template, DomainError> {
    Template::parse(path.as_str()).map_err(|error| {
        PlanError::RewriteEval {
            source_path: path.to_string(),
            error,
        }
        .into()
    })
}

/// Check a rendered destination stays inside the output root.
fn destination_path(source: &RelativePath, rendered: String) -> Result<RelativePath, PlanError> {
    RelativePath::try_new(&rendered).map_err(|e| {
        let reason = match e {
            DomainError::InvalidPath { reason, .. } => reason,
            other => other.to_string(),
        };
        PlanError::InvalidDestination {
            source_path: source.to_string(),
            path: rendered.clone(),
            reason,
        }
    })
}

/// First `[identifier]` token in a path: `(var, "[var]")`.
fn each_token(path: &str) -> Option<(&str, &str)> {
    static PATTERN: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*)\]").ok())
        .as_ref()?;
    let caps = re.captures(path)?;
    Some((caps.get(1)?.as_str(), caps.get(0)?.as_str()))
}

/// Build the plan for `sources`. See [`PlanBuilder`].
pub fn build_plan(
    sources: &[SourceFile],
    definition: &ScaffoldDefinition,
    ctx: &RenderContext,
) -> Result<FilePlan, DomainError> {
    PlanBuilder::new(definition, ctx).build(sources)
}
