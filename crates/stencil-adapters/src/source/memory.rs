//! In-memory source tree.

use stencil_core::{application::ports::SourceTree, domain::SourceFile, error::StencilResult};

/// A fixed list of template files, for tests and embedded scaffolds.
///
/// Paths are checked when the tree is read, so a bad path surfaces as an
/// `InvalidPath` error from [`SourceTree::files`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Vec<Entry>,
    partials: Vec<Entry>,
    hooks: Vec<Entry>,
    project_mode: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    path: String,
    content: Vec<u8>,
    executable: bool,
}

impl Entry {
    fn new(path: &str, content: impl Into<Vec<u8>>, executable: bool) -> Self {
        Self {
            path: path.to_string(),
            content: content.into(),
            executable,
        }
    }

    fn to_source_file(&self) -> StencilResult<SourceFile> {
        let file = SourceFile::try_new(&self.path, self.content.clone())?;
        Ok(if self.executable { file.executable() } else { file })
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push(Entry::new(path, content, false));
        self
    }

    pub fn with_executable(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push(Entry::new(path, content, true));
        self
    }

    /// Register a partial; `name` may carry an extension (`header.tmpl`).
    pub fn with_partial(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.partials.push(Entry::new(name, content, false));
        self
    }

    pub fn with_hook(mut self, name: &str, script: impl Into<Vec<u8>>) -> Self {
        self.hooks.push(Entry::new(name, script, true));
        self
    }

    /// Paths start with a templated project directory.
    pub fn project_mode(mut self) -> Self {
        self.project_mode = true;
        self
    }
}

impl SourceTree for MemorySource {
    fn files(&self) -> StencilResult<Vec<SourceFile>> {
        self.files.iter().map(Entry::to_source_file).collect()
    }

    fn partials(&self) -> StencilResult<Vec<SourceFile>> {
        self.partials.iter().map(Entry::to_source_file).collect()
    }

    fn hooks(&self) -> StencilResult<Vec<SourceFile>> {
        self.hooks.iter().map(Entry::to_source_file).collect()
    }

    fn requires_project_name(&self) -> bool {
        self.project_mode
    }

    fn describe(&self) -> String {
        format!("memory ({} files)", self.files.len())
    }
}
