//! Output management and formatting.

use std::io::{self, IsTerminal};

use console::Term;
use owo_colors::OwoColorize;
use serde::Serialize;

use stencil_core::application::{GenerationReport, InjectionOutcome};
use stencil_core::domain::FileOutcome;

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        // Resolve Auto → Human (TTY) or Plain (piped/redirected).
        let resolved_format = if args.output_format == OutputFormat::Auto {
            if io::stdout().is_terminal() {
                OutputFormat::Human
            } else {
                OutputFormat::Plain
            }
        } else {
            args.output_format
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            no_color: args.no_color
                || config.settings.no_color
                || resolved_format != OutputFormat::Human,
            term: Term::stdout(),
        }
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Error indicator: `✗ <msg>`.  *Not* suppressed in quiet mode.
    pub fn error(&self, msg: &str) -> io::Result<()> {
        let line = if self.no_color {
            format!("\u{2717} {msg}") // ✗
        } else {
            format!("{} {}", "\u{2717}".red().bold(), msg.red())
        };
        self.term.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.term.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}") // ℹ
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    /// Pretty-printed JSON document. Written even in quiet mode, since it
    /// is the command's result rather than commentary.
    pub fn json<T: Serialize>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    /// Files, injections and messages of a generation run.
    pub fn report(&self, report: &GenerationReport) -> io::Result<()> {
        if self.resolved_format == OutputFormat::Json {
            return self.json(report);
        }

        for file in &report.files {
            let marker = outcome_marker(file.outcome);
            let line = match outcome_note(file.outcome) {
                Some(note) => format!("  {marker} {} ({note})", file.destination),
                None => format!("  {marker} {}", file.destination),
            };
            if self.no_color || file.outcome.is_written() {
                self.print(&line)?;
            } else {
                self.print(&line.dimmed().to_string())?;
            }
        }
        for injection in &report.injections {
            match injection.outcome {
                InjectionOutcome::Applied => self.print(&format!(
                    "  ~ {} (injected '{}' at {} anchor{})",
                    injection.target,
                    injection.name,
                    injection.matches,
                    if injection.matches == 1 { "" } else { "s" }
                ))?,
                InjectionOutcome::NoMatch => self.warning(&format!(
                    "injection '{}' found no anchor in {}",
                    injection.name, injection.target
                ))?,
            }
        }

        self.print("")?;
        let line = summary_line(report);
        if report.dry_run {
            self.info(&line)
        } else {
            self.success(&line)
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if ANSI colours are enabled.
    pub fn supports_color(&self) -> bool {
        !self.no_color
    }

    /// `true` if quiet mode suppresses most output.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

fn outcome_marker(outcome: FileOutcome) -> char {
    match outcome {
        FileOutcome::Rendered | FileOutcome::Copied => '+',
        FileOutcome::SkippedEmpty => '-',
        FileOutcome::SkippedExists => '=',
    }
}

fn outcome_note(outcome: FileOutcome) -> Option<&'static str> {
    match outcome {
        FileOutcome::Rendered => None,
        FileOutcome::Copied => Some("copied"),
        FileOutcome::SkippedEmpty => Some("empty, not written"),
        FileOutcome::SkippedExists => Some("exists, kept"),
    }
}

fn summary_line(report: &GenerationReport) -> String {
    let written = report.written().count();
    let files = if written == 1 { "file" } else { "files" };
    let output = report.output_root.display();
    if report.dry_run {
        format!("Dry run: {written} {files} would be written to {output}")
    } else {
        format!("Wrote {written} {files} to {output}")
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
