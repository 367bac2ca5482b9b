//! `stencil lint`: validate a scaffold and report likely typos.

use tracing::instrument;

use stencil_adapters::MemoryFilesystem;
use stencil_core::application::GenerationService;

use crate::{
    cli::{LintArgs, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Structural problems fail the command; typo warnings do not.
#[instrument(skip_all, fields(scaffold = %args.scaffold))]
pub fn execute(args: LintArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let scaffold = super::open_scaffold(&args.scaffold, &config)?;

    // Linting only reads the source tree; nothing is written.
    let service = GenerationService::new(Box::new(MemoryFilesystem::new()));
    let warnings = service.lint(&scaffold.definition, &scaffold.source)?;

    if output.format() == OutputFormat::Json {
        let warnings: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        output.json(&serde_json::json!({
            "scaffold": scaffold.name,
            "definition": scaffold.definition_file,
            "warnings": warnings,
        }))?;
        return Ok(());
    }

    for warning in &warnings {
        output.warning(&warning.to_string())?;
    }
    match warnings.len() {
        0 => output.success(&format!("{}: no problems found", scaffold.name))?,
        n => output.info(&format!(
            "{}: {n} warning{}",
            scaffold.name,
            if n == 1 { "" } else { "s" }
        ))?,
    }
    Ok(())
}
