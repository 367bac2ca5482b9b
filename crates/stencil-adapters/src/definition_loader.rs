//! Scaffold definition loading.
//!
//! Finds `scaffold.yaml`, `scaffold.yml` or `scaffold.toml` at the root of a
//! scaffold directory and deserializes it into a core
//! [`ScaffoldDefinition`]. Shape checks serde cannot express (identifiers,
//! expressions, globs) are left to the core validator.
//!
//! # `scaffold.yaml` format
//!
//! ```yaml
//! messages:
//!   pre: "Creating a new command"
//!   post: "Run `go run . {{ .name }}`"
//!
//! questions:
//!   - name: name
//!     prompt:
//!       message: "Command name"
//!     validate:
//!       required: true
//!       match:
//!         regex: "^[a-z]+$"
//!   - name: database
//!     prompt:
//!       message: "Database"
//!       options: [postgres, sqlite]
//!
//! computed:
//!   pkg: "{{ .name | snakecase }}"
//!
//! rewrites:
//!   - from: cmd/NAME.go
//!     to: "cmd/{{ .name }}.go"
//!
//! inject:
//!   - name: register
//!     path: main.go
//!     at: "// stencil:commands"
//!     template: "app.Register({{ .pkg }}.New())"
//!
//! presets:
//!   default:
//!     name: serve
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use stencil_core::{
    application::ApplicationError,
    domain::{DomainError, ScaffoldDefinition},
    error::StencilResult,
};

use crate::source::DirectorySource;

/// Definition file names, in lookup order.
pub const DEFINITION_FILES: &[&str] = &["scaffold.yaml", "scaffold.yml", "scaffold.toml"];

/// On-disk syntax of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Yaml,
    Toml,
}

impl DefinitionFormat {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// A scaffold directory: its definition plus its template tree.
#[derive(Debug, Clone)]
pub struct Scaffold {
    /// Directory name, used in logs and output.
    pub name: String,
    pub dir: PathBuf,
    pub definition_file: PathBuf,
    pub definition: ScaffoldDefinition,
    pub source: DirectorySource,
}

/// Load the definition and locate the template root of `dir`.
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn load_scaffold(dir: impl AsRef<Path>) -> StencilResult<Scaffold> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ApplicationError::SourceUnavailable {
            source_name: dir.display().to_string(),
            reason: "scaffold directory not found".into(),
        }
        .into());
    }

    let definition_file = find_definition(dir)?;
    let definition = load_definition(&definition_file)?;
    let source = DirectorySource::discover(dir)?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    debug!(
        scaffold = %name,
        questions = definition.questions.len(),
        "loaded scaffold"
    );
    Ok(Scaffold {
        name,
        dir: dir.to_path_buf(),
        definition_file,
        definition,
        source,
    })
}

/// The first definition file present in `dir`.
pub fn find_definition(dir: &Path) -> StencilResult<PathBuf> {
    DEFINITION_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            ApplicationError::SourceUnavailable {
                source_name: dir.display().to_string(),
                reason: format!("none of {} exists", DEFINITION_FILES.join(", ")),
            }
            .into()
        })
}

/// Read and parse one definition file.
pub fn load_definition(path: &Path) -> StencilResult<ScaffoldDefinition> {
    let raw = fs::read_to_string(path).map_err(|e| ApplicationError::SourceUnavailable {
        source_name: path.display().to_string(),
        reason: format!("failed to read: {e}"),
    })?;
    let format = DefinitionFormat::from_path(path).unwrap_or(DefinitionFormat::Yaml);
    parse_definition(&raw, format).map_err(|e| match e {
        DomainError::InvalidDefinition(msg) => {
            DomainError::InvalidDefinition(format!("{}: {msg}", path.display())).into()
        }
        other => other.into(),
    })
}

/// Parse definition text. An empty document is an empty definition.
pub fn parse_definition(text: &str, format: DefinitionFormat) -> Result<ScaffoldDefinition, DomainError> {
    if text.trim().is_empty() {
        return Ok(ScaffoldDefinition::default());
    }
    match format {
        DefinitionFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|e| DomainError::InvalidDefinition(format!("failed to parse YAML: {e}"))),
        DefinitionFormat::Toml => toml::from_str(text)
            .map_err(|e| DomainError::InvalidDefinition(format!("failed to parse TOML: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::domain::{InjectMode, PromptKind, Value};
    use tempfile::TempDir;

    fn yaml(text: &str) -> ScaffoldDefinition {
        parse_definition(text, DefinitionFormat::Yaml).unwrap()
    }

    #[test]
    fn prompt_shapes_decode_to_variants() {
        let def = yaml(
            r#"
questions:
  - name: name
    prompt: { message: "Name" }
  - name: docker
    prompt: { confirm: "Docker?" }
  - name: db
    prompt: { message: "DB", options: [pg, sqlite], default: sqlite }
  - name: extras
    prompt: { message: "Extras", options: [a, b], multi: true }
  - name: tags
    prompt: { message: "Tags", multi: true }
  - name: services
    prompt: { message: "Service", loop: true }
"#,
        );
        let kinds: Vec<&str> = def.questions.iter().map(|q| q.prompt.kind.name()).collect();
        assert_eq!(kinds.len(), 6);
        assert!(matches!(def.questions[1].prompt.kind, PromptKind::Confirm { .. }));
        assert_eq!(def.questions[2].prompt.kind.default_value(), Some(Value::from("sqlite")));
        assert!(matches!(def.questions[3].prompt.kind, PromptKind::MultiSelect { .. }));
        assert!(matches!(def.questions[4].prompt.kind, PromptKind::MultiText { .. }));
        assert!(matches!(def.questions[5].prompt.kind, PromptKind::LoopText { .. }));
    }

    #[test]
    fn computed_keeps_declaration_order() {
        let def = yaml("computed:\n  zeta: \"1\"\n  alpha: \"{{ .zeta }}\"\n");
        let names: Vec<&str> = def.computed.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn presets_accept_legacy_keys() {
        let def = yaml("presents:\n  smoke:\n    name: demo\n");
        assert_eq!(def.preset("smoke").unwrap().get("name"), Some(&Value::from("demo")));

        let def = yaml("tests:\n  ci:\n    docker: true\n");
        assert_eq!(def.preset("ci").unwrap().get("docker"), Some(&Value::Bool(true)));
    }

    #[test]
    fn deprecated_required_is_folded_into_validate() {
        let def = yaml("questions:\n  - name: n\n    required: true\n    prompt: { message: N }\n");
        assert!(def.questions[0].validate.required);
    }

    #[test]
    fn toml_definitions_are_supported() {
        let def = parse_definition(
            r#"
skips = ["**/*.bak"]

[[inject]]
name = "imports"
path = "main.go"
at = "import ("
mode = "after"
template = "\"fmt\""
"#,
            DefinitionFormat::Toml,
        )
        .unwrap();
        assert_eq!(def.skips, vec!["**/*.bak"]);
        assert_eq!(def.inject[0].mode, InjectMode::After);
    }

    #[test]
    fn confirm_mixed_with_options_is_rejected() {
        let err = parse_definition(
            "questions:\n  - name: x\n    prompt: { confirm: X, options: [a] }\n",
            DefinitionFormat::Yaml,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidDefinition(_)));
    }

    #[test]
    fn load_scaffold_finds_definition_and_templates() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("scaffold.yml"), "skip: [\"*.md\"]\n").unwrap();
        fs::create_dir_all(temp.path().join("templates")).unwrap();
        fs::write(temp.path().join("templates/README.md"), "x").unwrap();

        let scaffold = load_scaffold(temp.path()).unwrap();
        assert_eq!(scaffold.definition.raw, vec!["*.md"]);
        assert!(scaffold.definition.skips.is_empty());
        assert!(scaffold.definition_file.ends_with("scaffold.yml"));
    }

    #[test]
    fn missing_definition_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("templates")).unwrap();
        let err = load_scaffold(temp.path()).unwrap_err();
        assert!(err.to_string().contains("scaffold.yaml"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scaffold.yaml");
        fs::write(&path, "questions: {not: [a list").unwrap();
        let err = load_definition(&path).unwrap_err();
        assert!(err.to_string().contains("scaffold.yaml"));
    }
}
