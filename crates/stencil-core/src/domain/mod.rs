// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Stencil.
//!
//! Pure generation logic: no filesystem, no terminal, no clock. Everything
//! that touches the outside world is reached through the ports defined in
//! the application layer.
//!
//! ## Pipeline
//!
//! 1. [`resolver`] turns questions, presets and an [`InputSource`] into an
//!    [`AnswerMap`].
//! 2. [`planner`] maps the source tree to a [`FilePlan`].
//! 3. [`renderer`] produces the bytes of each planned file.
//! 4. [`injector`] inserts text into already rendered files.
//!
//! The [`expression`] module is the shared leaf all of them evaluate with.

pub mod entities;
pub mod error;
pub mod expression;
pub mod injector;
pub mod planner;
pub mod renderer;
pub mod resolver;
pub mod value_objects;

mod validation;

pub use entities::{
    common::{Permissions, RelativePath},
    definition::{
        ComputedValues, DelimiterOverride, EachConfig, Feature, InjectDirective, MatchRule,
        Messages, Prompt, PromptKind, Question, Rewrite, ScaffoldDefinition, Validator,
    },
    plan::{
        BoundInjection, EachBinding, ExcludedFile, FileAction, FilePlan, PlannedFile, SkipReason,
        SourceFile,
    },
    project_structure::{GeneratedFile, ProjectStructure},
};

pub use error::{
    DomainError, ErrorCategory, ExpressionError, InjectError, PlanError, Position, RenderError,
    ValidationError,
};

pub use expression::{Delimiters, RenderContext, Template};
pub use injector::{Injected, inject};
pub use planner::{PlanBuilder, build_plan};
pub use renderer::{FileOutcome, RenderedFile, is_binary, render_file};
pub use resolver::{AnswerResolver, InputSource, ResolveInput, resolve};
pub use validation::{DefinitionValidator, LintWarning};
pub use value_objects::{AnswerMap, InjectMode, Value};

#[cfg(test)]
pub use resolver::MockInputSource;

#[cfg(test)]
mod tests {
    use super::*;

    /// The whole domain pipeline, without any port.
    #[test]
    fn resolve_plan_render_inject() {
        let def = ScaffoldDefinition::new()
            .with_question(Question::text("name", "Name?").required())
            .with_question(Question::confirm("docker", "Docker?"))
            .with_computed("pkg", "{{ .name | snakecase }}")
            .with_rewrite("pkg/NAME.go", "pkg/{{ .pkg }}.go")
            .with_feature(".docker", ["Dockerfile"])
            .with_inject(InjectDirective::new(
                "register",
                "main.go",
                "// packages",
                "import \"app/pkg/{{ .pkg }}\"",
            ));
        DefinitionValidator::validate(&def).unwrap();

        let mut source = MockInputSource::new();
        source.expect_ask().never();
        source.expect_is_interactive().return_const(false);
        let input = ResolveInput {
            presets: AnswerMap::new().with("name", "UserStore").with("docker", false),
            defaults: AnswerMap::new(),
        };
        let answers = resolve(&def, &RenderContext::new(), &input, &mut source).unwrap();
        let ctx = RenderContext::from_answers(&answers);

        let sources = vec![
            SourceFile::try_new("pkg/NAME.go", "package {{ .pkg }}\n").unwrap(),
            SourceFile::try_new("Dockerfile", "FROM scratch\n").unwrap(),
            SourceFile::try_new("main.go", "package main\n\n// packages\n").unwrap(),
        ];
        let plan = build_plan(&sources, &def, &ctx).unwrap();
        let dests: Vec<_> = plan.destinations().map(RelativePath::as_str).collect();
        assert_eq!(dests, vec!["main.go", "pkg/user_store.go"]);

        let mut tree = ProjectStructure::new();
        for file in &plan.files {
            let source = sources.iter().find(|s| s.path == file.source).unwrap();
            let out = render_file(file, &source.content, &ctx).unwrap();
            tree.insert(file.destination.clone(), out.content, file.permissions);
        }
        let pkg = tree.get(&RelativePath::new("pkg/user_store.go")).unwrap();
        assert_eq!(pkg.text(), Some("package user_store\n"));

        let binding = &plan.injections[0];
        let main = tree.get(&binding.target).unwrap().text().unwrap().to_string();
        let injected = inject(&main, &binding.directive, &ctx).unwrap();
        assert_eq!(
            injected.content,
            "package main\n\n// packages\nimport \"app/pkg/user_store\"\n"
        );
    }
}
