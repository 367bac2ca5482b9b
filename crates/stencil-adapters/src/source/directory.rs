//! Template tree read from a scaffold directory on disk.
//!
//! # Directory layout expected
//!
//! ```text
//! my-scaffold/
//! ├── scaffold.yaml            ← definition (loaded separately)
//! ├── partials/                ← optional, `{{ partial "license/header" . }}`
//! │   └── license/header.tmpl
//! ├── hooks/                   ← optional, `post_scaffold*` runs after commit
//! │   └── post_scaffold.sh
//! └── templates/               ← files land directly in the output directory
//!     └── cmd/NAME.go
//! ```
//!
//! or, in project mode:
//!
//! ```text
//! my-scaffold/
//! ├── scaffold.yaml
//! └── {{ .ProjectKebab }}/     ← rendered into the project directory name
//!     └── main.go
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use stencil_core::{
    application::{ApplicationError, ports::SourceTree},
    domain::{Permissions, RelativePath, SourceFile},
    error::{StencilError, StencilResult},
};

/// Template root for scaffolds that write straight into the output directory.
pub const TEMPLATES_DIR: &str = "templates";

/// Shared templates callable from any file.
pub const PARTIALS_DIR: &str = "partials";

/// Hook scripts; only top-level files are read.
pub const HOOKS_DIR: &str = "hooks";

/// Template roots whose name is rendered into the project directory name.
pub const PROJECT_DIR_NAMES: &[&str] = &[
    "{{ .Project }}",
    "{{ .ProjectSnake }}",
    "{{ .ProjectKebab }}",
    "{{ .ProjectCamel }}",
    "{{ .ProjectPascal }}",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    Templates,
    Project(String),
}

/// [`SourceTree`] over a local scaffold directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    scaffold_dir: PathBuf,
    layout: Layout,
}

impl DirectorySource {
    /// Find the template root inside `scaffold_dir`. Project directories are
    /// preferred over `templates/`.
    pub fn discover(scaffold_dir: impl Into<PathBuf>) -> StencilResult<Self> {
        let scaffold_dir = scaffold_dir.into();

        let layout = PROJECT_DIR_NAMES
            .iter()
            .find(|name| scaffold_dir.join(name).is_dir())
            .map(|name| Layout::Project((*name).to_string()))
            .or_else(|| scaffold_dir.join(TEMPLATES_DIR).is_dir().then_some(Layout::Templates))
            .ok_or_else(|| ApplicationError::SourceUnavailable {
                source_name: scaffold_dir.display().to_string(),
                reason: format!(
                    "expected a '{TEMPLATES_DIR}' directory or a project directory such as '{{{{ .ProjectKebab }}}}'"
                ),
            })?;

        debug!(dir = %scaffold_dir.display(), layout = ?layout, "template root found");
        Ok(Self { scaffold_dir, layout })
    }

    /// Directory the walk starts from.
    pub fn root(&self) -> PathBuf {
        match &self.layout {
            Layout::Templates => self.scaffold_dir.join(TEMPLATES_DIR),
            Layout::Project(name) => self.scaffold_dir.join(name),
        }
    }

    pub fn scaffold_dir(&self) -> &Path {
        &self.scaffold_dir
    }

    fn unavailable(&self, reason: impl Into<String>) -> StencilError {
        ApplicationError::SourceUnavailable {
            source_name: self.describe(),
            reason: reason.into(),
        }
        .into()
    }

    fn with_layout(&self, inner: RelativePath) -> StencilResult<RelativePath> {
        Ok(match &self.layout {
            Layout::Templates => inner,
            Layout::Project(name) => RelativePath::try_new(format!("{name}/{inner}"))?,
        })
    }

    /// Every regular file below `root` up to `max_depth`, with paths
    /// relative to `root`. A missing `root` is an empty tree.
    fn walk(&self, root: &Path, max_depth: usize) -> StencilResult<Vec<SourceFile>> {
        let mut files = Vec::new();
        if !root.is_dir() {
            return Ok(files);
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| self.unavailable(format!("directory walk error: {e}")))?;
            if !entry.file_type().is_file() {
                continue; // Skip directories, symlinks and other special types.
            }

            let abs = entry.path();
            let rel = abs.strip_prefix(root).map_err(|_| {
                self.unavailable(format!(
                    "failed to relativise '{}' against '{}'",
                    abs.display(),
                    root.display()
                ))
            })?;
            let content = fs::read(abs)
                .map_err(|e| self.unavailable(format!("failed to read '{}': {e}", abs.display())))?;

            files.push(SourceFile {
                path: RelativePath::from_path(rel)?,
                content,
                permissions: Permissions::from_executable(is_executable(&entry)),
            });
        }
        Ok(files)
    }
}

impl SourceTree for DirectorySource {
    #[instrument(skip(self), fields(root = %self.root().display()))]
    fn files(&self) -> StencilResult<Vec<SourceFile>> {
        let files = self
            .walk(&self.root(), usize::MAX)?
            .into_iter()
            .map(|file| {
                Ok(SourceFile {
                    path: self.with_layout(file.path)?,
                    ..file
                })
            })
            .collect::<StencilResult<Vec<_>>>()?;

        debug!(count = files.len(), "source files read");
        Ok(files)
    }

    fn partials(&self) -> StencilResult<Vec<SourceFile>> {
        let partials = self.walk(&self.scaffold_dir.join(PARTIALS_DIR), usize::MAX)?;
        debug!(count = partials.len(), "partials read");
        Ok(partials)
    }

    fn hooks(&self) -> StencilResult<Vec<SourceFile>> {
        self.walk(&self.scaffold_dir.join(HOOKS_DIR), 1)
    }

    fn requires_project_name(&self) -> bool {
        matches!(self.layout, Layout::Project(_))
    }

    fn describe(&self) -> String {
        self.root().display().to_string()
    }
}

#[cfg(unix)]
fn is_executable(entry: &walkdir::DirEntry) -> bool {
    use std::os::unix::fs::PermissionsExt;
    entry
        .metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_entry: &walkdir::DirEntry) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scaffold(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (rel, content) in files {
            let full = temp.path().join(rel);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        temp
    }

    #[test]
    fn templates_dir_paths_are_relative_to_it() {
        let temp = scaffold(&[
            ("scaffold.yaml", "questions: []"),
            ("templates/b.txt", "b"),
            ("templates/src/a.rs", "a"),
        ]);
        let source = DirectorySource::discover(temp.path()).unwrap();
        assert!(!source.requires_project_name());

        let paths: Vec<String> = source.files().unwrap().iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, vec!["b.txt", "src/a.rs"]);
    }

    #[test]
    fn project_dir_keeps_its_templated_name() {
        let temp = scaffold(&[("{{ .ProjectKebab }}/main.go", "package main")]);
        let source = DirectorySource::discover(temp.path()).unwrap();
        assert!(source.requires_project_name());

        let files = source.files().unwrap();
        assert_eq!(files[0].path.as_str(), "{{ .ProjectKebab }}/main.go");
        assert_eq!(files[0].content, b"package main");
    }

    #[test]
    fn missing_template_root_is_not_found() {
        let temp = scaffold(&[("scaffold.yaml", "")]);
        let err = DirectorySource::discover(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            StencilError::Application(ApplicationError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn partials_keep_nested_paths_and_hooks_stay_flat() {
        let temp = scaffold(&[
            ("templates/a.txt", "a"),
            ("partials/license/header.tmpl", "// header"),
            ("partials/footer.tmpl", "// footer"),
            ("hooks/post_scaffold.sh", "make"),
            ("hooks/lib/helper.sh", "not a hook"),
        ]);
        let source = DirectorySource::discover(temp.path()).unwrap();

        let partials: Vec<String> =
            source.partials().unwrap().iter().map(|f| f.path.to_string()).collect();
        assert_eq!(partials, vec!["footer.tmpl", "license/header.tmpl"]);

        let hooks: Vec<String> = source.hooks().unwrap().iter().map(|f| f.path.to_string()).collect();
        assert_eq!(hooks, vec!["post_scaffold.sh"]);
    }

    #[test]
    fn missing_partials_and_hooks_are_empty() {
        let temp = scaffold(&[("templates/a.txt", "a")]);
        let source = DirectorySource::discover(temp.path()).unwrap();
        assert!(source.partials().unwrap().is_empty());
        assert!(source.hooks().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn executable_files_are_flagged() {
        use std::os::unix::fs::PermissionsExt;

        let temp = scaffold(&[("templates/run.sh", "#!/bin/sh")]);
        let script = temp.path().join("templates/run.sh");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let files = DirectorySource::discover(temp.path()).unwrap().files().unwrap();
        assert!(files[0].permissions.is_executable());
    }
}
