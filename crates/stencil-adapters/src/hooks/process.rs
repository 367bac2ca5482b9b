//! Runs rendered hook scripts as child processes.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::Builder;
use tracing::{debug, instrument};

use stencil_core::{
    application::{ApplicationError, RenderedHook, ports::HookRunner},
    error::{StencilError, StencilResult},
};

/// Writes the script to a private temp file and executes it, so its shebang
/// line picks the interpreter. The child inherits stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHookRunner {
    stdout_to_stderr: bool,
}

impl ProcessHookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the script's stdout to stderr, for callers whose stdout carries
    /// a machine-readable document.
    pub fn stdout_to_stderr(mut self) -> Self {
        self.stdout_to_stderr = true;
        self
    }
}

impl HookRunner for ProcessHookRunner {
    #[instrument(skip_all, fields(hook = %hook.name, dir = %working_dir.display()))]
    fn run(&self, hook: &RenderedHook, working_dir: &Path) -> StencilResult<()> {
        let failed = |reason: String| -> StencilError {
            ApplicationError::HookFailed {
                hook: hook.name.clone(),
                reason,
            }
            .into()
        };

        let mut file = Builder::new()
            .prefix("stencil-hook-")
            .tempfile()
            .map_err(|e| failed(format!("cannot create temp file: {e}")))?;
        file.write_all(hook.script.as_bytes())
            .map_err(|e| failed(format!("cannot write script: {e}")))?;
        // Closes the write handle; the file is deleted when `script` drops.
        let script = file.into_temp_path();
        make_executable(&script).map_err(|e| failed(format!("cannot mark executable: {e}")))?;

        let mut command = Command::new(&*script);
        command.current_dir(working_dir);
        if self.stdout_to_stderr {
            command.stdout(std::io::stderr());
        }
        let status = command
            .status()
            .map_err(|e| failed(format!("cannot start: {e}")))?;
        debug!(%status, "hook exited");

        if !status.success() {
            return Err(failed(format!("exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
