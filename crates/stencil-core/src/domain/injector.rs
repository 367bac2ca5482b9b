//! Line-oriented text injection.
//!
//! Every occurrence of the anchor text is an insertion point. The rendered
//! template is inserted on its own lines directly before or after the line
//! holding the occurrence, indented like that line; a line that holds the
//! anchor twice receives the block twice. Injection is not deduplicated:
//! running the same directive twice inserts twice. Authors who want a
//! once-only injection point should anchor on a marker comment that the
//! inserted text rewrites (e.g. inject `// stencil:routes:done` *before*
//! `// stencil:routes` and remove the original marker in the template).

use crate::domain::entities::definition::InjectDirective;
use crate::domain::error::{DomainError, InjectError};
use crate::domain::expression::{RenderContext, Template};
use crate::domain::value_objects::InjectMode;

/// Result of applying one directive to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    pub content: String,
    /// Number of anchor occurrences that received the template.
    pub matches: usize,
}

/// Render `directive.template` and insert it around every anchor line in
/// `content`.
///
/// Zero anchor matches yields `InjectError::NoMatch`; callers that tolerate
/// drift can downgrade it. A template that renders to nothing but blank
/// lines leaves the file unchanged.
pub fn inject(
    content: &str,
    directive: &InjectDirective,
    ctx: &RenderContext,
) -> Result<Injected, DomainError> {
    if directive.at.is_empty() {
        return Err(InjectError::Malformed {
            name: directive.name.clone(),
            reason: "'at' must not be empty".into(),
        }
        .into());
    }

    let rendered = Template::parse(&directive.template)
        .and_then(|tpl| tpl.render(ctx))
        .map_err(|error| InjectError::Template {
            name: directive.name.clone(),
            error,
        })?;

    let insert: Vec<&str> = rendered
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let (content, matches) = insert_lines(content, &directive.at, &insert, directive.mode);
    if matches == 0 {
        return Err(InjectError::NoMatch {
            name: directive.name.clone(),
            path: directive.path.clone(),
            at: directive.at.clone(),
        }
        .into());
    }
    Ok(Injected { content, matches })
}

/// Pure insertion step. Preserves the file's line ending style and whether
/// it ends with a newline.
pub fn insert_lines(content: &str, at: &str, insert: &[&str], mode: InjectMode) -> (String, usize) {
    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(content.len() + insert.iter().map(|l| l.len() + 8).sum::<usize>());
    let mut matches = 0;

    let push_block = |out: &mut String, indent: &str| {
        for line in insert {
            out.push_str(indent);
            out.push_str(line);
            out.push_str(eol);
        }
    };

    for raw in content.split_inclusive('\n') {
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');
        let hits = line.matches(at).count();
        if hits == 0 {
            out.push_str(raw);
            continue;
        }
        matches += hits;
        let indent = indentation(line);
        match mode {
            InjectMode::Before => {
                for _ in 0..hits {
                    push_block(&mut out, indent);
                }
                out.push_str(raw);
            }
            InjectMode::After => {
                out.push_str(raw);
                if !raw.ends_with('\n') && !insert.is_empty() {
                    out.push_str(eol);
                    for _ in 0..hits {
                        push_block(&mut out, indent);
                    }
                    // Keep "no trailing newline" as it was.
                    out.truncate(out.len() - eol.len());
                } else {
                    for _ in 0..hits {
                        push_block(&mut out, indent);
                    }
                }
            }
        }
    }
    (out, matches)
}

fn indentation(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}
