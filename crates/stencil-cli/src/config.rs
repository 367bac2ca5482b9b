//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only ever sees the answer defaults
//! it carries.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. Environment variables: `STENCIL__SETTINGS__LOG_LEVEL=debug`
//! 3. Config file (`--config`, or [`AppConfig::config_path`])
//! 4. Built-in defaults
//!
//! The file is never written by the CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stencil_core::domain::{AnswerMap, Value};

use crate::error::{CliError, CliResult};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "STENCIL";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: Settings,
    /// Name → scaffold directory.
    pub aliases: BTreeMap<String, String>,
    /// Prefix → location, used as `prefix:rest`.
    pub shorts: BTreeMap<String, String>,
    /// Answer defaults, offered below presets and `--set` values.
    pub defaults: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level used when neither `-v` nor `-q` is given.
    pub log_level: Option<String>,
    /// Also write logs to this file.
    pub log_file: Option<PathBuf>,
    pub no_color: bool,
    /// Directories searched for a bare scaffold name.
    pub scaffold_dirs: Vec<PathBuf>,
    /// Whether a scaffold's post-scaffold hook may run.
    pub run_hooks: RunHooks,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: None,
            log_file: None,
            no_color: false,
            scaffold_dirs: vec![PathBuf::from(".scaffold")],
            run_hooks: RunHooks::default(),
        }
    }
}

/// `settings.run_hooks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunHooks {
    Never,
    Always,
    /// Ask on a terminal; skip when nobody can answer.
    #[default]
    Prompt,
}

impl AppConfig {
    /// Load configuration from `config_file` (which must exist) or from the
    /// default location (which may not), then overlay the environment.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let file = match config_file {
            Some(path) => config::File::from(path.as_path()).required(true),
            None => config::File::from(Self::config_path()).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        debug!(
            aliases = config.aliases.len(),
            shorts = config.shorts.len(),
            defaults = config.defaults.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.stencil.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "stencil", "stencil")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".stencil.toml"))
    }

    /// Configured answer defaults.
    pub fn default_answers(&self) -> AnswerMap {
        self.defaults
            .iter()
            .fold(AnswerMap::new(), |map, (name, value)| map.with(name, value.clone()))
    }

    /// Turn a scaffold argument into a local directory.
    ///
    /// Aliases are looked up first, then `short:rest` expansions. A bare
    /// name is searched for in `settings.scaffold_dirs`, then in `cwd`.
    pub fn resolve_scaffold(&self, arg: &str, cwd: &Path) -> CliResult<PathBuf> {
        let mut target = match self.aliases.get(arg) {
            Some(aliased) => {
                debug!(alias = arg, target = %aliased, "alias expanded");
                expand_home(aliased)
            }
            None => arg.to_string(),
        };

        if let Some(expanded) = self.expand_short(&target) {
            debug!(short = %target, expanded = %expanded, "short expanded");
            target = expand_home(&expanded);
        }
        if is_remote(&target) {
            return Err(CliError::RemoteScaffold { location: target });
        }

        let path = Path::new(&target);
        let candidates: Vec<PathBuf> = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else if target.contains('/') || target.starts_with('.') {
            vec![cwd.join(path)]
        } else {
            self.settings
                .scaffold_dirs
                .iter()
                .map(|dir| cwd.join(dir).join(path))
                .chain(std::iter::once(cwd.join(path)))
                .collect()
        };

        candidates
            .iter()
            .find(|candidate| candidate.is_dir())
            .cloned()
            .ok_or(CliError::ScaffoldNotFound {
                name: arg.to_string(),
                searched: candidates,
            })
    }

    fn expand_short(&self, arg: &str) -> Option<String> {
        let (short, rest) = arg.split_once(':')?;
        let base = self.shorts.get(short)?;
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            rest.trim_start_matches('/')
        ))
    }
}

fn is_remote(location: &str) -> bool {
    location.contains("://") || location.starts_with("git@")
}

fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return path.to_string(),
    };
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(rest).display().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_search_the_scaffold_directory() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.settings.scaffold_dirs, vec![PathBuf::from(".scaffold")]);
        assert!(cfg.settings.log_level.is_none());
        assert_eq!(cfg.settings.run_hooks, RunHooks::Prompt);
        assert!(cfg.default_answers().is_empty());
    }

    #[test]
    fn run_hooks_reads_lowercase_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[settings]\nrun_hooks = \"always\"\n").unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap().settings.run_hooks, RunHooks::Always);

        fs::write(&path, "[settings]\nrun_hooks = \"sometimes\"\n").unwrap();
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn load_reads_an_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[settings]
log_level = "debug"

[aliases]
api = "/srv/scaffolds/api"

[defaults]
license = "MIT"
docker = true
"#,
        )
        .unwrap();

        let cfg = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.settings.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.aliases.get("api").map(String::as_str), Some("/srv/scaffolds/api"));
        let defaults = cfg.default_answers();
        assert_eq!(defaults.get("license"), Some(&Value::from("MIT")));
        assert_eq!(defaults.get("docker"), Some(&Value::Bool(true)));
        // Unset sections keep their defaults.
        assert_eq!(cfg.settings.scaffold_dirs, vec![PathBuf::from(".scaffold")]);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn config_path_is_not_empty() {
        assert!(!AppConfig::config_path().as_os_str().is_empty());
    }

    fn workspace() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".scaffold/api")).unwrap();
        fs::create_dir_all(temp.path().join("local/cli")).unwrap();
        temp
    }

    #[test]
    fn bare_names_are_found_in_scaffold_dirs() {
        let temp = workspace();
        let path = AppConfig::default().resolve_scaffold("api", temp.path()).unwrap();
        assert_eq!(path, temp.path().join(".scaffold/api"));
    }

    #[test]
    fn paths_are_relative_to_the_working_directory() {
        let temp = workspace();
        let path = AppConfig::default().resolve_scaffold("local/cli", temp.path()).unwrap();
        assert_eq!(path, temp.path().join("local/cli"));
    }

    #[test]
    fn aliases_and_local_shorts_resolve() {
        let temp = workspace();
        let mut cfg = AppConfig::default();
        cfg.aliases.insert(
            "svc".into(),
            temp.path().join(".scaffold/api").display().to_string(),
        );
        cfg.shorts.insert("loc".into(), temp.path().join("local").display().to_string());

        assert_eq!(
            cfg.resolve_scaffold("svc", temp.path()).unwrap(),
            temp.path().join(".scaffold/api")
        );
        assert_eq!(
            cfg.resolve_scaffold("loc:cli", temp.path()).unwrap(),
            temp.path().join("local/cli")
        );
    }

    #[test]
    fn remote_locations_are_rejected() {
        let temp = workspace();
        let mut cfg = AppConfig::default();
        cfg.shorts.insert("gh".into(), "https://github.com".into());

        let err = cfg.resolve_scaffold("gh:acme/scaffolds", temp.path()).unwrap_err();
        assert!(matches!(
            err,
            CliError::RemoteScaffold { ref location } if location == "https://github.com/acme/scaffolds"
        ));
    }

    #[test]
    fn unknown_scaffold_lists_searched_paths() {
        let temp = workspace();
        let err = AppConfig::default().resolve_scaffold("missing", temp.path()).unwrap_err();
        let CliError::ScaffoldNotFound { name, searched } = err else {
            panic!("expected ScaffoldNotFound");
        };
        assert_eq!(name, "missing");
        assert_eq!(searched.len(), 2);
    }
}
