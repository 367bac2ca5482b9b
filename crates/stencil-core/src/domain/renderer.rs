//! Content renderer: turns one planned file into the bytes that get staged.
//!
//! Binary files (by extension or by a NUL/invalid UTF-8 sniff) and files
//! matched by a `raw` glob are copied unchanged. Everything else is parsed
//! with the file's delimiters and rendered against the run context, scoped
//! to the current item for `each` expansions. Output that is only whitespace
//! is reported as [`FileOutcome::SkippedEmpty`] and never written.

use serde::Serialize;

use crate::domain::entities::common::RelativePath;
use crate::domain::entities::plan::{FileAction, PlannedFile};
use crate::domain::error::{DomainError, ExpressionError, RenderError};
use crate::domain::expression::{RenderContext, Template};

/// Extensions that are always copied verbatim.
pub const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "icns", "webp", "tif", "tiff", "psd",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // archives
    "zip", "gz", "tgz", "bz2", "xz", "7z", "rar", "tar", "jar", "war",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt",
    // executables and objects
    "exe", "dll", "so", "dylib", "a", "o", "class", "wasm", "bin",
    // media
    "mp3", "mp4", "wav", "ogg", "mov", "avi", "webm",
    // data
    "sqlite", "db",
];

/// Bytes inspected for a NUL when sniffing content.
pub const SNIFF_LEN: usize = 8000;

/// Whether a file is copied byte-for-byte instead of rendered.
pub fn is_binary(path: &RelativePath, content: &[u8]) -> bool {
    if path
        .extension()
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
    {
        return true;
    }
    let head = &content[..content.len().min(SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(content).is_err()
}

/// What became of a planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Rendered,
    Copied,
    /// Rendered to nothing but whitespace; not written.
    SkippedEmpty,
    /// Destination already existed and clobbering was disabled.
    SkippedExists,
}

impl FileOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Rendered | Self::Copied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Copied => "copied",
            Self::SkippedEmpty => "skipped (empty)",
            Self::SkippedExists => "skipped (exists)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub outcome: FileOutcome,
    pub content: Vec<u8>,
}

/// Produce the final bytes of one planned file.
///
/// A syntax or evaluation error is fatal for the file and carries the source
/// path, position and offending line.
pub fn render_file(
    file: &PlannedFile,
    content: &[u8],
    ctx: &RenderContext,
) -> Result<RenderedFile, DomainError> {
    let delimiters = match &file.action {
        FileAction::Render(d) if !is_binary(&file.source, content) => d,
        _ => {
            return Ok(RenderedFile {
                outcome: FileOutcome::Copied,
                content: content.to_vec(),
            });
        }
    };

    // is_binary already rejected invalid UTF-8.
    let text = String::from_utf8_lossy(content);
    let scoped = file
        .each
        .as_ref()
        .map(|each| ctx.with_each(&each.item, each.index));
    let ctx = scoped.as_ref().unwrap_or(ctx);

    let to_error = |error: ExpressionError| RenderError::new(file.source.as_str(), &text, error);
    let rendered = Template::parse_with(&text, delimiters)
        .and_then(|tpl| tpl.render(ctx))
        .map_err(to_error)?;

    if rendered.trim().is_empty() {
        return Ok(RenderedFile {
            outcome: FileOutcome::SkippedEmpty,
            content: Vec::new(),
        });
    }
    Ok(RenderedFile {
        outcome: FileOutcome::Rendered,
        content: rendered.into_bytes(),
    })
}
