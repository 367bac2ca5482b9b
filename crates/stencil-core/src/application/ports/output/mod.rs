//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `stencil-adapters` crate provides implementations.

use std::path::Path;

use crate::application::services::RenderedHook;
use crate::domain::SourceFile;
use crate::error::StencilResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `stencil_adapters::filesystem::LocalFilesystem` (production)
/// - `stencil_adapters::filesystem::MemoryFilesystem` (testing, `stencil test`)
///
/// The generation service only writes through this port, and only inside a
/// staging directory until commit.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> StencilResult<()>;

    /// Write content to a file, replacing it if present.
    fn write_file(&self, path: &Path, content: &[u8]) -> StencilResult<()>;

    fn read_file(&self, path: &Path) -> StencilResult<Vec<u8>>;

    /// Set file permissions.
    fn set_permissions(&self, path: &Path, executable: bool) -> StencilResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Move a file or directory. The destination's parent must exist.
    fn rename(&self, from: &Path, to: &Path) -> StencilResult<()>;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> StencilResult<()>;
}

/// Port for reading a scaffold's template tree.
///
/// Implemented by:
/// - `stencil_adapters::source::DirectorySource` (local directory)
/// - `stencil_adapters::source::MemorySource` (tests)
#[cfg_attr(test, mockall::automock)]
pub trait SourceTree: Send + Sync {
    /// Every file, with paths relative to the template root.
    fn files(&self) -> StencilResult<Vec<SourceFile>>;

    /// Shared templates for `{{ partial "name" }}`, with paths relative to
    /// the partials directory.
    fn partials(&self) -> StencilResult<Vec<SourceFile>> {
        Ok(Vec::new())
    }

    /// Scripts from the hooks directory, with bare file names as paths.
    fn hooks(&self) -> StencilResult<Vec<SourceFile>> {
        Ok(Vec::new())
    }

    /// Whether paths are rooted in a `{{ .Project }}`-style directory, so a
    /// project name must be known before planning.
    fn requires_project_name(&self) -> bool;

    /// Human-readable origin for logs and errors.
    fn describe(&self) -> String;
}

/// Port for running a rendered hook script.
///
/// Implemented by `stencil_adapters::hooks::ProcessHookRunner`.
#[cfg_attr(test, mockall::automock)]
pub trait HookRunner: Send + Sync {
    /// Run `hook` with `working_dir` as its current directory. A non-zero
    /// exit is an error.
    fn run(&self, hook: &RenderedHook, working_dir: &Path) -> StencilResult<()>;
}
