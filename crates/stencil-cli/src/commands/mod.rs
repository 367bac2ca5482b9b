//! Command handlers. Each translates parsed arguments into calls on the
//! core services and prints the result; no generation logic lives here.

pub mod completions;
pub mod config;
pub mod lint;
pub mod new;
pub mod test;

use tracing::debug;

use stencil_adapters::{Scaffold, load_scaffold};

use crate::config::AppConfig;
use crate::error::{CliResult, IntoCli};

/// Resolve a scaffold argument against the working directory and load it.
pub(crate) fn open_scaffold(arg: &str, config: &AppConfig) -> CliResult<Scaffold> {
    let cwd = std::env::current_dir().with_cli_context(|| "cannot read the working directory")?;
    let dir = config.resolve_scaffold(arg, &cwd)?;
    debug!(scaffold = arg, dir = %dir.display(), "scaffold resolved");
    load_scaffold(&dir).with_cli_context(|| format!("loading {}", dir.display()))
}
