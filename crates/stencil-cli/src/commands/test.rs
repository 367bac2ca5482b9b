//! `stencil test`: run one preset of a scaffold entirely in memory.
//!
//! Nothing is prompted and nothing touches the disk; the generated tree is
//! printed so a scaffold author can check it.

use std::path::Path;

use tracing::{info, instrument};

use stencil_adapters::{MemoryFilesystem, ScriptedInput};
use stencil_core::application::{
    GenerateOptions, GenerateRequest, GenerationService, InjectionOutcome,
};

use crate::{
    cli::{OutputFormat, TestArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Virtual output directory inside the in-memory filesystem.
const TEST_ROOT: &str = "/stencil-test/output";

#[instrument(skip_all, fields(scaffold = %args.scaffold, preset = %args.preset))]
pub fn execute(args: TestArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let scaffold = super::open_scaffold(&args.scaffold, &config)?;

    let memory = MemoryFilesystem::new();
    let service = GenerationService::new(Box::new(memory.clone()));
    let request = GenerateRequest::new(TEST_ROOT)
        .preset(&args.preset)
        .project_name(&args.name)
        .options(GenerateOptions {
            strict: args.strict,
            ..GenerateOptions::default()
        });

    let report = service.generate(
        &scaffold.definition,
        &scaffold.source,
        &mut ScriptedInput::new(),
        &request,
    )?;
    let files = memory.files_under(TEST_ROOT);
    info!(files = files.len(), "preset generated");

    if output.format() == OutputFormat::Json {
        output.json(&serde_json::json!({
            "scaffold": scaffold.name,
            "preset": args.preset,
            "files": files,
            "report": report,
        }))?;
        return Ok(());
    }

    output.header(&format!("{} (preset '{}')", scaffold.name, args.preset))?;
    for file in &files {
        let executable = memory.is_executable(Path::new(TEST_ROOT).join(file));
        output.print(&format!("  {file}{}", if executable { " *" } else { "" }))?;
    }
    for injection in &report.injections {
        if injection.outcome == InjectionOutcome::NoMatch {
            output.warning(&format!(
                "injection '{}' found no anchor in {}",
                injection.name, injection.target
            ))?;
        }
    }
    output.print("")?;
    output.success(&format!(
        "{} file{} generated",
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    ))?;
    Ok(())
}
