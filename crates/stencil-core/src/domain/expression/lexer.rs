//! On-demand tokenizer for template sources.
//!
//! The lexer alternates between two modes: outside an action it scans for
//! the left delimiter and yields text, inside an action it yields the tokens
//! of a pipeline until the right delimiter. Tokens are produced lazily so the
//! parser reports the first problem it meets in source order.
//!
//! Trim markers (`{{- ` and ` -}}`) and comments (`{{/* … */}}`) are handled
//! here and never reach the parser.

use std::collections::VecDeque;

use super::Delimiters;
use crate::domain::error::{ExpressionError, Position};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Text(String),
    LeftDelim,
    RightDelim,
    /// A bare `.`
    Dot,
    /// `.a.b.c`
    Field(Vec<String>),
    /// `$` optionally followed by `.a.b`
    Variable(Vec<String>),
    Ident(String),
    Str(String),
    Int(i64),
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Text(_) => "text".into(),
            Self::LeftDelim => "left delimiter".into(),
            Self::RightDelim => "right delimiter".into(),
            Self::Dot => "'.'".into(),
            Self::Field(names) => format!("field .{}", names.join(".")),
            Self::Variable(_) => "'$'".into(),
            Self::Ident(name) => format!("'{name}'"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Int(n) => format!("number {n}"),
            Self::Pipe => "'|'".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::LBracket => "'['".into(),
            Self::RBracket => "']'".into(),
            Self::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    /// Whitespace separated this token from the previous one.
    pub spaced: bool,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    delims: &'a Delimiters,
    pos: usize,
    in_action: bool,
    action_start: usize,
    trim_next_text: bool,
    pending: VecDeque<Token>,
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(src: &'a str, delims: &'a Delimiters) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            src,
            delims,
            pos: 0,
            in_action: false,
            action_start: 0,
            trim_next_text: false,
            pending: VecDeque::new(),
            line_starts,
        }
    }

    /// 1-based line/column of a byte offset.
    pub(crate) fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let start = self.line_starts[line];
        let column = self.src[start..offset.min(self.src.len())].chars().count() + 1;
        Position::new(line + 1, column)
    }

    fn syntax(&self, offset: usize, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Syntax {
            position: self.position(offset),
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, ExpressionError> {
        if let Some(tok) = self.pending.pop_front() {
            return Ok(tok);
        }
        if self.in_action {
            self.lex_action()
        } else {
            self.lex_text()
        }
    }

    // ── text mode ────────────────────────────────────────────────────────────

    fn lex_text(&mut self) -> Result<Token, ExpressionError> {
        loop {
            let start = self.pos;
            if start >= self.src.len() {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    offset: self.src.len(),
                    spaced: false,
                });
            }

            let Some(found) = self.rest().find(self.delims.left.as_str()) else {
                self.pos = self.src.len();
                let text = self.take_text(start, self.src.len(), false);
                if text.is_empty() {
                    continue;
                }
                return Ok(Token {
                    kind: TokenKind::Text(text),
                    offset: start,
                    spaced: false,
                });
            };

            let delim_at = start + found;
            let mut after = delim_at + self.delims.left.len();
            let trim_left = is_trim_marker(&self.src[after..]);
            if trim_left {
                after += 1;
            }

            let text = self.take_text(start, delim_at, trim_left);
            self.action_start = delim_at;

            // Comments are consumed whole, including an optional trim marker.
            let body = self.src[after..].trim_start_matches([' ', '\t', '\r', '\n']);
            if body.starts_with("/*") {
                let comment_at = self.src.len() - body.len();
                self.pos = self.skip_comment(comment_at)?;
                if !text.is_empty() {
                    return Ok(Token {
                        kind: TokenKind::Text(text),
                        offset: start,
                        spaced: false,
                    });
                }
                continue;
            }

            self.pos = after;
            self.in_action = true;
            let delim = Token {
                kind: TokenKind::LeftDelim,
                offset: delim_at,
                spaced: false,
            };
            if text.is_empty() {
                return Ok(delim);
            }
            self.pending.push_back(delim);
            return Ok(Token {
                kind: TokenKind::Text(text),
                offset: start,
                spaced: false,
            });
        }
    }

    /// Slice `[start, end)` applying pending and requested trim markers.
    fn take_text(&mut self, start: usize, end: usize, trim_right: bool) -> String {
        let mut text = &self.src[start..end];
        if std::mem::take(&mut self.trim_next_text) {
            text = text.trim_start();
        }
        if trim_right {
            text = text.trim_end();
        }
        text.to_string()
    }

    /// Skip `/* … */` plus the closing delimiter, returning the new position.
    fn skip_comment(&mut self, comment_at: usize) -> Result<usize, ExpressionError> {
        let body = &self.src[comment_at + 2..];
        let Some(close) = body.find("*/") else {
            return Err(self.syntax(comment_at, "unclosed comment"));
        };
        let mut at = comment_at + 2 + close + 2;
        let tail = &self.src[at..];
        let trimmed = tail.trim_start_matches([' ', '\t', '\r', '\n']);
        let ws = tail.len() - trimmed.len();
        if ws > 0 && trimmed.starts_with('-') && trimmed[1..].starts_with(self.delims.right.as_str()) {
            self.trim_next_text = true;
            at += ws + 1;
        } else if !tail.starts_with(self.delims.right.as_str()) {
            return Err(self.syntax(at, "comment ends before closing delimiter"));
        }
        Ok(at + self.delims.right.len())
    }

    // ── action mode ──────────────────────────────────────────────────────────

    fn lex_action(&mut self) -> Result<Token, ExpressionError> {
        let skipped = self.rest().len() - self.rest().trim_start().len();
        self.pos += skipped;
        let spaced = skipped > 0;
        let start = self.pos;

        let rest = self.rest();
        if rest.is_empty() {
            return Err(ExpressionError::Unclosed {
                position: self.position(self.action_start),
                delimiter: self.delims.right.clone(),
            });
        }

        if rest.starts_with(self.delims.right.as_str()) {
            self.pos += self.delims.right.len();
            self.in_action = false;
            return Ok(self.token(TokenKind::RightDelim, start, spaced));
        }
        if spaced && rest.starts_with('-') && rest[1..].starts_with(self.delims.right.as_str()) {
            self.pos += 1 + self.delims.right.len();
            self.in_action = false;
            self.trim_next_text = true;
            return Ok(self.token(TokenKind::RightDelim, start, spaced));
        }

        let mut chars = rest.chars();
        let c = chars.next().unwrap_or_default();
        let next = chars.next();

        let kind = match c {
            '|' => self.single(TokenKind::Pipe),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '.' if next.is_some_and(is_ident_start) => TokenKind::Field(self.field_chain()),
            '.' => self.single(TokenKind::Dot),
            '$' => {
                self.pos += 1;
                if self.rest().starts_with(is_ident_start) {
                    return Err(self.syntax(start, "template variables are not supported"));
                }
                TokenKind::Variable(self.field_chain())
            }
            '"' => TokenKind::Str(self.quoted(start)?),
            '`' => TokenKind::Str(self.raw_string(start)?),
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                TokenKind::Int(self.number(start)?)
            }
            c if is_ident_start(c) => {
                let len = rest
                    .find(|ch: char| !is_ident_char(ch))
                    .unwrap_or(rest.len());
                self.pos += len;
                TokenKind::Ident(rest[..len].to_string())
            }
            other => {
                return Err(self.syntax(start, format!("unexpected {other:?} in action")));
            }
        };
        Ok(self.token(kind, start, spaced))
    }

    fn token(&self, kind: TokenKind, offset: usize, spaced: bool) -> Token {
        Token {
            kind,
            offset,
            spaced,
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    /// Consume `.ident` repetitions.
    fn field_chain(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        loop {
            let rest = self.rest();
            let mut chars = rest.chars();
            if chars.next() != Some('.') || !chars.next().is_some_and(is_ident_start) {
                break;
            }
            let body = &rest[1..];
            let len = body.find(|ch: char| !is_ident_char(ch)).unwrap_or(body.len());
            names.push(body[..len].to_string());
            self.pos += 1 + len;
        }
        names
    }

    fn quoted(&mut self, start: usize) -> Result<String, ExpressionError> {
        let mut out = String::new();
        let mut chars = self.src[start + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos = start + 1 + i + 1;
                    return Ok(out);
                }
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '"')) => out.push('"'),
                    Some((j, other)) => {
                        return Err(self.syntax(
                            start + 1 + j,
                            format!("unknown escape sequence '\\{other}'"),
                        ));
                    }
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(self.syntax(start, "unterminated quoted string"))
    }

    fn raw_string(&mut self, start: usize) -> Result<String, ExpressionError> {
        let body = &self.src[start + 1..];
        match body.find('`') {
            Some(end) => {
                self.pos = start + 1 + end + 1;
                Ok(body[..end].to_string())
            }
            None => Err(self.syntax(start, "unterminated raw string")),
        }
    }

    fn number(&mut self, start: usize) -> Result<i64, ExpressionError> {
        let rest = self.rest();
        let sign = usize::from(rest.starts_with('-'));
        let len = rest[sign..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - sign)
            + sign;
        let literal = &rest[..len];
        if rest[len..].starts_with(is_ident_char) {
            return Err(self.syntax(start, format!("bad number syntax near {literal:?}")));
        }
        self.pos += len;
        literal
            .parse()
            .map_err(|_| self.syntax(start, format!("number out of range: {literal}")))
    }
}

fn is_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let delims = Delimiters::default();
        let mut lexer = Lexer::new(src, &delims);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn text_and_field_chain() {
        assert_eq!(
            kinds("hi {{ .a.b }}!"),
            vec![
                TokenKind::Text("hi ".into()),
                TokenKind::LeftDelim,
                TokenKind::Field(vec!["a".into(), "b".into()]),
                TokenKind::RightDelim,
                TokenKind::Text("!".into()),
            ]
        );
    }

    #[test]
    fn trim_markers_eat_surrounding_whitespace() {
        assert_eq!(
            kinds("a  \n{{- .x -}}\n  b"),
            vec![
                TokenKind::Text("a".into()),
                TokenKind::LeftDelim,
                TokenKind::Field(vec!["x".into()]),
                TokenKind::RightDelim,
                TokenKind::Text("b".into()),
            ]
        );
    }

    #[test]
    fn comments_disappear() {
        assert_eq!(
            kinds("a{{/* note */}}b"),
            vec![TokenKind::Text("a".into()), TokenKind::Text("b".into())]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds(r#"{{ eq "a\"b" `raw` -3 $.x }}"#),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Ident("eq".into()),
                TokenKind::Str("a\"b".into()),
                TokenKind::Str("raw".into()),
                TokenKind::Int(-3),
                TokenKind::Variable(vec!["x".into()]),
                TokenKind::RightDelim,
            ]
        );
    }

    #[test]
    fn custom_delimiters() {
        let delims = Delimiters::new("[[", "]]");
        let mut lexer = Lexer::new("{{ keep }} [[ .x ]]", &delims);
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Text("{{ keep }} ".into())
        );
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::LeftDelim);
    }

    #[test]
    fn unclosed_action_reports_start() {
        let delims = Delimiters::default();
        let mut lexer = Lexer::new("line\n  {{ .x ", &delims);
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Unclosed {
                position: Position::new(2, 3),
                delimiter: "}}".into()
            }
        );
    }

    #[test]
    fn position_counts_chars() {
        let delims = Delimiters::default();
        let lexer = Lexer::new("ab\ncé{{", &delims);
        assert_eq!(lexer.position(0), Position::new(1, 1));
        assert_eq!(lexer.position(3), Position::new(2, 1));
        assert_eq!(lexer.position(6), Position::new(2, 3));
    }
}
