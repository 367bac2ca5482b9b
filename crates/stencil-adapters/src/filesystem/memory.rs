//! In-memory filesystem adapter for tests and `stencil test`.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use stencil_core::{
    application::{ApplicationError, ports::Filesystem},
    error::{StencilError, StencilResult},
};

/// In-memory filesystem. Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, Vec<u8>>,
    directories: BTreeSet<PathBuf>,
    executables: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryFilesystemInner::default())),
        }
    }

    /// Seed a file, creating its parent directories (testing helper).
    pub fn with_file(self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                inner.add_dirs(parent);
            }
            inner.files.insert(path.to_path_buf(), content.as_ref().to_vec());
        }
        self
    }

    /// A file's content as UTF-8 text (testing helper).
    pub fn read_text(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.read().ok()?;
        let bytes = inner.files.get(path.as_ref())?;
        String::from_utf8(bytes.clone()).ok()
    }

    /// Check if a file is marked executable.
    pub fn is_executable(&self, path: impl AsRef<Path>) -> bool {
        self.inner
            .read()
            .map(|inner| inner.executables.contains(path.as_ref()))
            .unwrap_or(false)
    }

    /// All files, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Files below `root`, as sorted `/`-separated relative paths.
    pub fn files_under(&self, root: impl AsRef<Path>) -> Vec<String> {
        let root = root.as_ref();
        self.list_files()
            .iter()
            .filter_map(|p| p.strip_prefix(root).ok())
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    /// Clear all contents.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.clear();
            inner.directories.clear();
            inner.executables.clear();
        }
    }

    fn read(&self) -> StencilResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StencilResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFilesystemInner {
    fn add_dirs(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> StencilResult<()> {
        let mut inner = self.write()?;
        if inner.files.contains_key(path) {
            return Err(fs_error(path, "a file exists at this path"));
        }
        inner.add_dirs(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> StencilResult<()> {
        let mut inner = self.write()?;

        // Ensure parent exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.is_dir(parent) {
                return Err(fs_error(path, "Parent directory does not exist"));
            }
        }
        if inner.is_dir(path) {
            return Err(fs_error(path, "is a directory"));
        }

        inner.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> StencilResult<Vec<u8>> {
        let inner = self.read()?;
        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| fs_error(path, "No such file"))
    }

    fn set_permissions(&self, path: &Path, executable: bool) -> StencilResult<()> {
        let mut inner = self.write()?;
        if !inner.files.contains_key(path) {
            return Err(fs_error(path, "No such file"));
        }

        if executable {
            inner.executables.insert(path.to_path_buf());
        } else {
            inner.executables.remove(path);
        }

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.is_dir(path))
            .unwrap_or(false)
    }

    fn rename(&self, from: &Path, to: &Path) -> StencilResult<()> {
        let mut inner = self.write()?;

        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() && !inner.is_dir(parent) {
                return Err(fs_error(to, "Parent directory does not exist"));
            }
        }

        if let Some(content) = inner.files.remove(from) {
            if inner.is_dir(to) {
                return Err(fs_error(to, "is a directory"));
            }
            let executable = inner.executables.remove(from);
            inner.files.insert(to.to_path_buf(), content);
            if executable {
                inner.executables.insert(to.to_path_buf());
            } else {
                inner.executables.remove(to);
            }
            return Ok(());
        }

        if !inner.is_dir(from) {
            return Err(fs_error(from, "No such file or directory"));
        }
        if inner.files.contains_key(to) || inner.is_dir(to) {
            return Err(fs_error(to, "destination exists"));
        }

        let moved = |p: &Path| -> Option<PathBuf> { p.strip_prefix(from).ok().map(|rest| to.join(rest)) };

        let files: Vec<_> = inner
            .files
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in files {
            if let (Some(content), Some(new)) = (inner.files.remove(&old), moved(&old)) {
                inner.files.insert(new, content);
            }
        }
        let dirs: Vec<_> = inner
            .directories
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in dirs {
            inner.directories.remove(&old);
            if let Some(new) = moved(&old) {
                inner.directories.insert(new);
            }
        }
        let executables: Vec<_> = inner
            .executables
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in executables {
            inner.executables.remove(&old);
            if let Some(new) = moved(&old) {
                inner.executables.insert(new);
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> StencilResult<()> {
        let mut inner = self.write()?;
        if !inner.is_dir(path) {
            return Err(fs_error(path, "No such directory"));
        }

        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));
        inner.executables.retain(|p| !p.starts_with(path));

        Ok(())
    }
}

fn fs_error(path: &Path, reason: &str) -> StencilError {
    ApplicationError::FilesystemError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

fn poisoned() -> StencilError {
    StencilError::Internal {
        message: "memory filesystem lock poisoned".into(),
    }
}
