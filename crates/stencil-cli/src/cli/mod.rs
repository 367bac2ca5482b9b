//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "stencil",
    bin_name = "stencil",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Question-driven project scaffolding",
    long_about = "Stencil asks the questions a scaffold declares, then renders its \
                  template tree into a directory, injecting snippets into files \
                  that already exist.",
    after_help = "EXAMPLES:\n\
        \x20 stencil new ./scaffolds/go-cmd --output .\n\
        \x20 stencil new api --name billing --set db=postgres --no-prompt\n\
        \x20 stencil lint ./scaffolds/go-cmd\n\
        \x20 stencil test ./scaffolds/go-cmd --preset default\n\
        \x20 stencil completions bash > /usr/share/bash-completion/completions/stencil",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate files from a scaffold.
    #[command(
        visible_alias = "n",
        about = "Generate files from a scaffold",
        after_help = "SCAFFOLD is a directory, a configured alias, or a short such as 'local:api'.\n\n\
            EXAMPLES:\n\
            \x20 stencil new ./scaffolds/service --output services\n\
            \x20 stencil new service --preset minimal --set port=8080\n\
            \x20 stencil new project --name \"Billing API\" --dry-run"
    )]
    New(NewArgs),

    /// Validate a scaffold definition.
    #[command(
        about = "Check a scaffold for errors and likely typos",
        after_help = "EXAMPLES:\n\
            \x20 stencil lint ./scaffolds/service"
    )]
    Lint(LintArgs),

    /// Run a preset in memory.
    #[command(
        about = "Run a preset without prompting or writing to disk",
        after_help = "EXAMPLES:\n\
            \x20 stencil test ./scaffolds/service --preset default\n\
            \x20 stencil test service --preset full --output-format json"
    )]
    Test(TestArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 stencil completions bash > ~/.local/share/bash-completion/completions/stencil\n\
            \x20 stencil completions zsh  > ~/.zfunc/_stencil\n\
            \x20 stencil completions fish > ~/.config/fish/completions/stencil.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Stencil configuration.
    #[command(
        about = "Show configuration",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 stencil config path\n\
            \x20 stencil config get settings.log_level\n\
            \x20 stencil config list"
    )]
    Config(ConfigCommands),
}

// ── new ───────────────────────────────────────────────────────────────────────

/// Arguments for `stencil new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Scaffold directory, alias or short.
    #[arg(value_name = "SCAFFOLD", help = "Scaffold directory, alias or short")]
    pub scaffold: String,

    /// Directory the scaffold is generated into.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = ".",
        help = "Output directory"
    )]
    pub output: PathBuf,

    /// Project name for scaffolds with a templated project directory.
    #[arg(
        short = 'n',
        long = "name",
        value_name = "NAME",
        help = "Project name (project scaffolds only)"
    )]
    pub name: Option<String>,

    /// Answer with a named preset from the scaffold.
    #[arg(
        short = 'p',
        long = "preset",
        value_name = "PRESET",
        help = "Use a preset from the scaffold"
    )]
    pub preset: Option<String>,

    /// Fixed answers; repeating a key builds a list.
    #[arg(
        short = 's',
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Answer a question (repeat a key for list answers)"
    )]
    pub set: Vec<(String, String)>,

    /// Never prompt; unanswered questions take their defaults.
    #[arg(long = "no-prompt", help = "Do not prompt; use defaults for unanswered questions")]
    pub no_prompt: bool,

    /// Preview what would be written without touching the output.
    #[arg(long = "dry-run", help = "Show what would be written without writing")]
    pub dry_run: bool,

    /// Leave files that already exist in the output untouched.
    #[arg(long = "no-clobber", help = "Do not overwrite existing files")]
    pub no_clobber: bool,

    /// Fail on references to undeclared names.
    #[arg(long = "strict", help = "Treat undeclared template names as errors")]
    pub strict: bool,

    /// Report missing injection anchors instead of failing.
    #[arg(long = "lenient-inject", help = "Do not fail when an injection anchor is missing")]
    pub lenient_inject: bool,
}

// ── lint ──────────────────────────────────────────────────────────────────────

/// Arguments for `stencil lint`.
#[derive(Debug, Args)]
pub struct LintArgs {
    /// Scaffold directory, alias or short.
    #[arg(value_name = "SCAFFOLD")]
    pub scaffold: String,
}

// ── test ──────────────────────────────────────────────────────────────────────

/// Arguments for `stencil test`.
#[derive(Debug, Args)]
pub struct TestArgs {
    /// Scaffold directory, alias or short.
    #[arg(value_name = "SCAFFOLD")]
    pub scaffold: String,

    /// Preset providing the answers.
    #[arg(short = 'p', long = "preset", value_name = "PRESET", help = "Preset to run")]
    pub preset: String,

    /// Project name used for project scaffolds.
    #[arg(
        short = 'n',
        long = "name",
        value_name = "NAME",
        default_value = "example",
        help = "Project name (project scaffolds only)"
    )]
    pub name: String,

    /// Fail on references to undeclared names.
    #[arg(long = "strict", help = "Treat undeclared template names as errors")]
    pub strict: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `stencil completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `stencil config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `settings.log_level` or `aliases.api`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

/// `KEY=VALUE` → `(KEY, VALUE)`. The value may be empty or contain `=`.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_new_command() {
        let cli = Cli::parse_from([
            "stencil",
            "new",
            "./scaffolds/api",
            "--output",
            "out",
            "--set",
            "db=postgres",
            "--set",
            "tags=a=b",
            "--no-prompt",
        ]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.scaffold, "./scaffolds/api");
        assert_eq!(args.output, PathBuf::from("out"));
        assert_eq!(
            args.set,
            vec![
                ("db".to_string(), "postgres".to_string()),
                ("tags".to_string(), "a=b".to_string())
            ]
        );
        assert!(args.no_prompt);
        assert!(!args.dry_run);
    }

    #[test]
    fn output_defaults_to_current_directory() {
        let cli = Cli::parse_from(["stencil", "n", "api"]);
        let Commands::New(args) = cli.command else {
            panic!("expected New command");
        };
        assert_eq!(args.output, PathBuf::from("."));
    }

    #[test]
    fn set_without_equals_is_rejected() {
        assert!(Cli::try_parse_from(["stencil", "new", "api", "--set", "db"]).is_err());
        assert!(Cli::try_parse_from(["stencil", "new", "api", "--set", "=x"]).is_err());
    }

    #[test]
    fn test_requires_a_preset() {
        assert!(Cli::try_parse_from(["stencil", "test", "api"]).is_err());
        let cli = Cli::parse_from(["stencil", "test", "api", "-p", "default"]);
        let Commands::Test(args) = cli.command else {
            panic!("expected Test command");
        };
        assert_eq!(args.preset, "default");
        assert_eq!(args.name, "example");
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["stencil", "--quiet", "--verbose", "lint", "x"]);
        assert!(result.is_err());
    }
}
