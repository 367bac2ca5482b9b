use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::DomainError;

/// A `/`-separated path relative to a template or output root.
///
/// Invariant: non-empty, never absolute, no `..` components, no empty or
/// `.` segments. Enforced at construction so that a rendered destination
/// can never escape the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    #[cfg(test)]
    pub(crate) fn new(path: &str) -> Self {
        Self::try_new(path).unwrap()
    }

    /// Validate and normalize `path`. Backslashes are treated as separators.
    pub fn try_new(path: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = path.as_ref();
        let invalid = |reason: &str| DomainError::InvalidPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let unified = raw.replace('\\', "/");
        if unified.trim().is_empty() {
            return Err(invalid("path is empty"));
        }
        if unified.starts_with('/') || Path::new(raw).is_absolute() || has_drive_prefix(&unified) {
            return Err(invalid("absolute paths are not allowed"));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(invalid("'..' segments are not allowed")),
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid("path is empty"));
        }
        Ok(Self(segments.join("/")))
    }

    /// Build from a native path relative to some root.
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath {
                        path: path.display().to_string(),
                        reason: "expected a plain relative path".into(),
                    });
                }
            }
        }
        Self::try_new(parts.join("/"))
    }

    /// Join a relative segment.
    pub fn join(&self, segment: impl AsRef<str>) -> Result<Self, DomainError> {
        Self::try_new(format!("{}/{}", self.0, segment.as_ref()))
    }

    /// Parent directory, `None` at the top level.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Strip a leading directory (`prefix/rest` → `rest`).
    pub fn strip_prefix(&self, prefix: &str) -> Option<Self> {
        let rest = self.0.strip_prefix(prefix)?.strip_prefix('/')?;
        Self::try_new(rest).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Native path for handing to a filesystem.
    pub fn to_path_buf(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File mode carried from source to destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    executable: bool,
}

impl Permissions {
    pub const fn read_write() -> Self {
        Self { executable: false }
    }

    pub const fn executable() -> Self {
        Self { executable: true }
    }

    pub const fn from_executable(executable: bool) -> Self {
        Self { executable }
    }

    pub const fn is_executable(&self) -> bool {
        self.executable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_dots() {
        let p = RelativePath::try_new("./src\\bin//main.rs").unwrap();
        assert_eq!(p.as_str(), "src/bin/main.rs");
        assert_eq!(p.file_name(), "main.rs");
        assert_eq!(p.parent().unwrap().as_str(), "src/bin");
        assert_eq!(p.extension().as_deref(), Some("rs"));
    }

    #[test]
    fn rejects_escapes_and_absolute_paths() {
        assert!(RelativePath::try_new("../etc/passwd").is_err());
        assert!(RelativePath::try_new("a/../../b").is_err());
        assert!(RelativePath::try_new("/etc/passwd").is_err());
        assert!(RelativePath::try_new("C:/x").is_err());
        assert!(RelativePath::try_new("").is_err());
        assert!(RelativePath::try_new("./").is_err());
    }

    #[test]
    fn conversion_from_str_reports_bad_paths() {
        assert_eq!(RelativePath::try_from("a/./b").unwrap().as_str(), "a/b");
        assert!(matches!(
            RelativePath::try_from("../outside"),
            Err(DomainError::InvalidPath { .. })
        ));
    }

    #[test]
    fn dotfiles_have_no_extension() {
        assert_eq!(RelativePath::new(".gitignore").extension(), None);
        assert_eq!(RelativePath::new("logo.PNG").extension().as_deref(), Some("png"));
    }

    #[test]
    fn strip_prefix_removes_root_dir() {
        let p = RelativePath::new("templates/src/lib.rs");
        assert_eq!(p.strip_prefix("templates").unwrap().as_str(), "src/lib.rs");
        assert!(p.strip_prefix("temp").is_none());
    }

    #[test]
    fn top_level_file_has_no_parent() {
        assert!(RelativePath::new("README.md").parent().is_none());
    }
}
