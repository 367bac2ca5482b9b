//! Flags shared by every `stencil` subcommand.
//!
//! Flattened into [`super::Cli`]; each is `global = true`, so
//! `stencil new svc -q` and `stencil -q new svc` mean the same thing.

use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Log more. Repeat for more detail; conflicts with `--quiet`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv, -vvv)",
        long_help = "Increase logging verbosity:
    (none)  - Warnings and errors (or settings.log_level from the config file)
    -v      - Info level (scaffold loaded, files written)
    -vv     - Debug level (answers, planned files, injections)
    -vvv    - Trace level (every render step)"
    )]
    pub verbose: u8,

    /// Print only errors and requested JSON documents.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Honoured from `NO_COLOR` as well (<https://no-color.org>).
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Use this file instead of the per-user `config.toml`.
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Configuration file path"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "output-format",
        global = true,
        value_enum,
        default_value = "auto",
        help = "Output format (json never prompts)"
    )]
    pub output_format: OutputFormat,
}

impl GlobalArgs {
    /// `--output-format json` was requested.
    pub fn json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

/// How results and reports are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human when stdout is a terminal, plain otherwise.
    #[default]
    Auto,
    /// Coloured, with status symbols.
    Human,
    /// Same text, no colour.
    Plain,
    /// One JSON document per run (report, lint result or error).
    Json,
}
