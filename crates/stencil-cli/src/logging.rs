//! Tracing subscriber initialisation.
//!
//! Only the CLI crate is allowed to call [`init_logging`]; `stencil-core`
//! and `stencil-adapters` only *emit* spans and events.
//!
//! # Verbosity mapping
//!
//! | Flag(s)  | Filter level                          |
//! |----------|---------------------------------------|
//! | (none)   | `settings.log_level`, otherwise WARN  |
//! | `-v`     | INFO                                  |
//! | `-vv`    | DEBUG                                 |
//! | `-vvv`   | TRACE                                 |
//! | `--quiet`| ERROR                                 |
//!
//! `RUST_LOG` overrides all of the above if set. When `settings.log_file`
//! is configured, events are also appended to that file without colour.

use std::fs;
use std::io::IsTerminal as _;
use std::path::Path;

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::GlobalArgs;
use crate::config::Settings;

const LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Initialise the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros fire. The
/// returned guard flushes the log file on drop and must outlive the run.
pub fn init_logging(args: &GlobalArgs, settings: &Settings) -> anyhow::Result<Option<WorkerGuard>> {
    let level = derive_level(args, settings.log_level.as_deref());

    // RUST_LOG wins; otherwise every stencil crate gets the same level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "stencil={level},stencil_core={level},stencil_adapters={level}"
        ))
    });

    let use_ansi = !args.no_color && !settings.no_color && std::io::stderr().is_terminal();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &settings.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))?;

    Ok(guard)
}

fn file_writer(
    path: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log file '{}' has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory '{}'", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Translate the verbosity counter, quiet flag and configured level to a
/// level string. Flags win over the configuration; an unknown configured
/// level falls back to WARN.
fn derive_level<'a>(args: &GlobalArgs, configured: Option<&'a str>) -> &'a str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => configured
            .and_then(|level| {
                LEVELS
                    .iter()
                    .copied()
                    .find(|known| known.eq_ignore_ascii_case(level.trim()))
            })
            .unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    fn args_with(verbose: u8, quiet: bool) -> GlobalArgs {
        GlobalArgs {
            verbose,
            quiet,
            no_color: true,
            config: None,
            output_format: OutputFormat::Auto,
        }
    }

    #[test]
    fn level_quiet() {
        assert_eq!(derive_level(&args_with(0, true), None), "error");
    }

    #[test]
    fn level_default() {
        assert_eq!(derive_level(&args_with(0, false), None), "warn");
    }

    #[test]
    fn level_verbose_one() {
        assert_eq!(derive_level(&args_with(1, false), None), "info");
    }

    #[test]
    fn level_verbose_two() {
        assert_eq!(derive_level(&args_with(2, false), None), "debug");
    }

    #[test]
    fn level_verbose_three_plus() {
        assert_eq!(derive_level(&args_with(3, false), None), "trace");
        assert_eq!(derive_level(&args_with(10, false), None), "trace");
    }

    #[test]
    fn quiet_overrides_verbose() {
        assert_eq!(derive_level(&args_with(3, true), None), "error");
    }

    #[test]
    fn configured_level_applies_without_flags() {
        assert_eq!(derive_level(&args_with(0, false), Some("DEBUG")), "debug");
        assert_eq!(derive_level(&args_with(1, false), Some("trace")), "info");
        assert_eq!(derive_level(&args_with(0, true), Some("trace")), "error");
    }

    #[test]
    fn unknown_configured_level_falls_back_to_warn() {
        assert_eq!(derive_level(&args_with(0, false), Some("loud")), "warn");
    }
}
