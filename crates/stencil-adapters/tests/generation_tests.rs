//! End-to-end generation through the adapters.

use std::fs;
use std::path::Path;

use stencil_adapters::{
    LocalFilesystem, MemoryFilesystem, MemorySource, ProcessHookRunner, ScriptedInput, load_scaffold,
    parse_definition, definition_loader::DefinitionFormat,
};
use stencil_core::{
    application::{GenerateRequest, GenerationService},
    domain::{AnswerMap, FileOutcome, ScaffoldDefinition},
    error::{ErrorCategory, StencilError},
};
use tempfile::TempDir;

const DEFINITION: &str = r#"
questions:
  - name: name
    prompt:
      message: "Command name"
    validate:
      required: true
      match:
        regex: "^[a-z]+$"
  - name: docker
    prompt:
      confirm: "Add a Dockerfile?"
  - name: services
    prompt:
      message: "Services"
      multi: true

computed:
  pkg: "{{ .name | snakecase }}"

rewrites:
  - from: cmd/NAME.go
    to: "cmd/{{ .name }}.go"

features:
  - value: "{{ .docker }}"
    globs: ["Dockerfile"]

each:
  - var: services

inject:
  - name: register
    path: main.go
    at: "// stencil:commands"
    template: "app.Register({{ .pkg }}.New())"

messages:
  post: "Run go run . {{ .name }}"

presets:
  smoke:
    name: serve
    docker: true
    services: [users, orders]
"#;

fn definition() -> ScaffoldDefinition {
    parse_definition(DEFINITION, DefinitionFormat::Yaml).unwrap()
}

fn source() -> MemorySource {
    MemorySource::new()
        .with_file("cmd/NAME.go", "package {{ .pkg }}\n")
        .with_file("main.go", "func main() {\n\t// stencil:commands\n}\n")
        .with_file("Dockerfile", "FROM golang\n")
        .with_file("svc/[services]/handler.go", "package {{ .Each.Item }} // {{ .Each.Index }}\n")
        .with_executable("run.sh", "#!/bin/sh\n")
}

fn run(fs: &MemoryFilesystem, request: &GenerateRequest) -> Result<stencil_core::application::GenerationReport, StencilError> {
    let service = GenerationService::new(Box::new(fs.clone()));
    service.generate(&definition(), &source(), &mut ScriptedInput::new(), request)
}

#[test]
fn preset_run_generates_the_whole_tree() {
    let fs = MemoryFilesystem::new();
    let report = run(&fs, &GenerateRequest::new("/out").preset("smoke")).unwrap();

    assert_eq!(
        fs.files_under("/out"),
        vec![
            "Dockerfile",
            "cmd/serve.go",
            "main.go",
            "run.sh",
            "svc/orders/handler.go",
            "svc/users/handler.go",
        ]
    );
    assert_eq!(fs.read_text("/out/cmd/serve.go").as_deref(), Some("package serve\n"));
    assert_eq!(
        fs.read_text("/out/main.go").as_deref(),
        Some("func main() {\n\t// stencil:commands\n\tapp.Register(serve.New())\n}\n")
    );
    assert_eq!(fs.read_text("/out/svc/orders/handler.go").as_deref(), Some("package orders // 1\n"));
    assert!(fs.is_executable("/out/run.sh"));
    assert_eq!(report.post_message.as_deref(), Some("Run go run . serve"));
}

#[test]
fn disabled_feature_excludes_its_files() {
    let fs = MemoryFilesystem::new();
    let answers = AnswerMap::new()
        .with("name", "db")
        .with("docker", false)
        .with("services", Vec::<String>::new());
    let report = run(&fs, &GenerateRequest::new("/out").answers(answers)).unwrap();

    let files = fs.files_under("/out");
    assert!(!files.contains(&"Dockerfile".to_string()));
    assert!(!files.iter().any(|f| f.starts_with("svc/")));
    assert_eq!(report.excluded.len(), 2);
}

#[test]
fn rejected_answer_writes_nothing() {
    let fs = MemoryFilesystem::new();
    let answers = AnswerMap::new().with("name", "Not Valid");
    let err = run(&fs, &GenerateRequest::new("/out").answers(answers)).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(fs.list_files().is_empty());
}

#[test]
fn missing_required_answer_writes_nothing() {
    let fs = MemoryFilesystem::new();
    let err = run(&fs, &GenerateRequest::new("/out")).unwrap_err();
    assert!(err.validation().is_some());
    assert!(fs.list_files().is_empty());
}

#[test]
fn malformed_expression_is_caught_before_any_write() {
    let fs = MemoryFilesystem::new();
    let mut def = definition();
    def.rewrites[0].to = "cmd/{{ .name.go".into();

    let service = GenerationService::new(Box::new(fs.clone()));
    let err = service
        .generate(
            &def,
            &source(),
            &mut ScriptedInput::new(),
            &GenerateRequest::new("/out").preset("smoke"),
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Scaffold);
    assert!(fs.list_files().is_empty());
}

#[test]
fn identical_inputs_render_identical_trees() {
    let first = MemoryFilesystem::new();
    let second = MemoryFilesystem::new();
    let request = GenerateRequest::new("/out").preset("smoke").year(2030);
    run(&first, &request).unwrap();
    run(&second, &request).unwrap();

    for path in first.list_files() {
        assert_eq!(first.read_text(&path), second.read_text(&path), "{}", path.display());
    }
    assert_eq!(first.list_files(), second.list_files());
}

#[test]
fn second_run_into_existing_output_injects_again() {
    let fs = MemoryFilesystem::new();
    run(&fs, &GenerateRequest::new("/out").preset("smoke")).unwrap();

    let answers = AnswerMap::new().with("name", "worker").with("docker", false);
    let service = GenerationService::new(Box::new(fs.clone()));
    let only_cmd = MemorySource::new().with_file("cmd/NAME.go", "package {{ .pkg }}\n");
    let report = service
        .generate(
            &definition(),
            &only_cmd,
            &mut ScriptedInput::new(),
            &GenerateRequest::new("/out").answers(answers),
        )
        .unwrap();

    assert_eq!(report.outcome_of("cmd/worker.go"), Some(FileOutcome::Rendered));
    assert_eq!(
        fs.read_text("/out/main.go").as_deref(),
        Some(
            "func main() {\n\t// stencil:commands\n\tapp.Register(worker.New())\n\tapp.Register(serve.New())\n}\n"
        )
    );
    assert!(fs.read_text("/out/cmd/serve.go").is_some());
}

#[test]
fn project_scaffold_on_disk_generates_named_directory() {
    let scaffold = TempDir::new().unwrap();
    let write = |rel: &str, content: &str| {
        let path = scaffold.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    };
    write("scaffold.yaml", "questions:\n  - name: license\n    prompt: { message: License, default: MIT }\n");
    write("{{ .ProjectKebab }}/README.md", "# {{ .Project }}\n\nLicensed {{ .license }} {{ .Year }}\n");
    write("{{ .ProjectKebab }}/logo.png", "\u{0}PNG");

    let loaded = load_scaffold(scaffold.path()).unwrap();
    let work = TempDir::new().unwrap();
    let out = work.path().join("projects");
    let service = GenerationService::new(Box::new(LocalFilesystem::new()));
    service
        .generate(
            &loaded.definition,
            &loaded.source,
            &mut ScriptedInput::new(),
            &GenerateRequest::new(&out).project_name("Billing API").year(2025),
        )
        .unwrap();

    let readme = fs::read_to_string(out.join("billing-api/README.md")).unwrap();
    assert_eq!(readme, "# Billing API\n\nLicensed MIT 2025\n");
    assert_eq!(fs::read(out.join("billing-api/logo.png")).unwrap(), b"\0PNG");
    assert_no_staging_left(work.path());
}

#[test]
fn memory_partials_render_inside_files() {
    let fs = MemoryFilesystem::new();
    let source = source()
        .with_file("README.md", "{{ partial \"badge\" .name }}\n")
        .with_partial("badge.md", "![{{ . }}](https://ci/{{ . }}.svg)");
    let service = GenerationService::new(Box::new(fs.clone()));
    service
        .generate(
            &definition(),
            &source,
            &mut ScriptedInput::new(),
            &GenerateRequest::new("/out").preset("smoke").year(2024),
        )
        .unwrap();
    assert_eq!(
        fs.read_text("/out/README.md").as_deref(),
        Some("![serve](https://ci/serve.svg)\n")
    );
}

#[cfg(unix)]
#[test]
fn scaffold_hook_runs_in_the_generated_directory() {
    let scaffold = TempDir::new().unwrap();
    let write = |rel: &str, content: &str| {
        let path = scaffold.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    };
    write("scaffold.yaml", "questions:\n  - name: name\n    prompt: { message: Name, default: api }\n");
    write("templates/main.go", "{{ partial \"header\" . }}\npackage main\n");
    write("partials/header.tmpl", "// {{ .name }}");
    write("hooks/post_scaffold.sh", "#!/bin/sh\necho {{ .name }} > hook.txt\n");

    let loaded = load_scaffold(scaffold.path()).unwrap();
    let work = TempDir::new().unwrap();
    let out = work.path().join("app");
    let service = GenerationService::new(Box::new(LocalFilesystem::new()));
    let report = service
        .generate(
            &loaded.definition,
            &loaded.source,
            &mut ScriptedInput::new(),
            &GenerateRequest::new(&out),
        )
        .unwrap();
    assert_eq!(fs::read_to_string(out.join("main.go")).unwrap(), "// api\npackage main\n");

    assert!(service.run_post_hook(&report, &ProcessHookRunner::new()).unwrap());
    assert_eq!(fs::read_to_string(out.join("hook.txt")).unwrap(), "api\n");
    assert_no_staging_left(work.path());
}

fn assert_no_staging_left(dir: &Path) {
    let leftovers: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().contains(".stencil-"))
        .collect();
    assert!(leftovers.is_empty(), "staging directories left behind: {leftovers:?}");
}
