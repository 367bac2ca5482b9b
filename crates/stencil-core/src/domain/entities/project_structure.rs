use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::common::{Permissions, RelativePath};

/// In-memory arena of generated files, keyed by destination path.
///
/// Rendering and injection only ever touch this structure; the application
/// layer materializes it into a staging directory once every step succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectStructure {
    files: BTreeMap<RelativePath, GeneratedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub content: Vec<u8>,
    pub permissions: Permissions,
}

impl GeneratedFile {
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl ProjectStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: RelativePath, content: Vec<u8>, permissions: Permissions) {
        self.files.insert(
            path,
            GeneratedFile {
                content,
                permissions,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(RelativePath::new(path), content.into(), Permissions::read_write());
        self
    }

    pub fn get(&self, path: &RelativePath) -> Option<&GeneratedFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.files.contains_key(path)
    }

    /// Replace the content of an existing entry, keeping its permissions.
    /// Returns `false` if there is no such file.
    pub fn replace_content(&mut self, path: &RelativePath, content: Vec<u8>) -> bool {
        match self.files.get_mut(path) {
            Some(file) => {
                file.content = content;
                true
            }
            None => false,
        }
    }

    pub fn files(&self) -> impl Iterator<Item = (&RelativePath, &GeneratedFile)> {
        self.files.iter()
    }

    /// Every directory implied by the file paths, parents first.
    pub fn directories(&self) -> BTreeSet<RelativePath> {
        let mut dirs = BTreeSet::new();
        for path in self.files.keys() {
            let mut current = path.parent();
            while let Some(dir) = current {
                current = dir.parent();
                dirs.insert(dir);
            }
        }
        dirs
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.values().map(GeneratedFile::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_derived_from_files() {
        let tree = ProjectStructure::new()
            .with_file("app/src/main.rs", "fn main() {}")
            .with_file("app/Cargo.toml", "[package]")
            .with_file("README.md", "# hi");
        let dirs: Vec<_> = tree.directories().iter().map(|d| d.to_string()).collect();
        assert_eq!(dirs, vec!["app", "app/src"]);
    }

    #[test]
    fn replace_content_keeps_permissions() {
        let mut tree = ProjectStructure::new();
        let path = RelativePath::new("run.sh");
        tree.insert(path.clone(), b"echo".to_vec(), Permissions::executable());
        assert!(tree.replace_content(&path, b"echo hi".to_vec()));
        let file = tree.get(&path).unwrap();
        assert!(file.permissions.is_executable());
        assert_eq!(file.text(), Some("echo hi"));
        assert!(!tree.replace_content(&RelativePath::new("missing"), Vec::new()));
    }
}
