//! Recursive-descent parser producing the template tree.
//!
//! Function names are checked against the built-in table while parsing, so
//! a template that calls an unknown function never renders at all. This is
//! what turns an accidental delimiter collision (`{{ console.log(x) }}` in a
//! JSX file) into a positioned parse error.

use super::Delimiters;
use super::functions;
use super::lexer::{Lexer, Token, TokenKind};
use crate::domain::error::{ExpressionError, Position};
use crate::domain::value_objects::Value;

const KEYWORDS: &[&str] = &["if", "else", "end", "range"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    Range {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Term>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Term {
    pub kind: TermKind,
    pub access: Vec<Access>,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TermKind {
    /// The current scope (`.`).
    Dot,
    /// The template root (`$`).
    Root,
    Function(String),
    Literal(Value),
    Sub(Box<Pipeline>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Access {
    Field(String),
    Index(Box<Term>),
}

/// How a list of nodes was terminated.
enum Terminator {
    Eof(Position),
    End(Position),
    Else(Position),
    ElseIf(Pipeline, Position),
}

pub(crate) fn parse(src: &str, delims: &Delimiters) -> Result<Vec<Node>, ExpressionError> {
    let mut parser = Parser {
        lexer: Lexer::new(src, delims),
        peeked: None,
    };
    let (nodes, term) = parser.parse_list()?;
    match term {
        Terminator::Eof(_) => Ok(nodes),
        Terminator::End(pos) => Err(syntax(pos, "unexpected {{end}}")),
        Terminator::Else(pos) | Terminator::ElseIf(_, pos) => {
            Err(syntax(pos, "unexpected {{else}}"))
        }
    }
}

fn syntax(position: Position, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Syntax {
        position,
        message: message.into(),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl Parser<'_> {
    fn next(&mut self) -> Result<Token, ExpressionError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self) -> Result<&Token, ExpressionError> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(tok))
    }

    fn pos(&self, tok: &Token) -> Position {
        self.lexer.position(tok.offset)
    }

    fn peek_keyword(&mut self) -> Result<Option<&'static str>, ExpressionError> {
        let tok = self.peek()?;
        Ok(match &tok.kind {
            TokenKind::Ident(name) => KEYWORDS.iter().copied().find(|k| *k == name.as_str()),
            _ => None,
        })
    }

    fn expect_right_delim(&mut self, context: &str) -> Result<(), ExpressionError> {
        let tok = self.next()?;
        if tok.kind == TokenKind::RightDelim {
            return Ok(());
        }
        Err(syntax(
            self.pos(&tok),
            format!("unexpected {} in {context}", tok.kind.describe()),
        ))
    }

    // ── structure ────────────────────────────────────────────────────────────

    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), ExpressionError> {
        let mut nodes = Vec::new();
        loop {
            let tok = self.next()?;
            let pos = self.pos(&tok);
            match tok.kind {
                TokenKind::Text(text) => nodes.push(Node::Text(text)),
                TokenKind::Eof => return Ok((nodes, Terminator::Eof(pos))),
                TokenKind::LeftDelim => match self.peek_keyword()? {
                    Some("if") => {
                        self.next()?;
                        let cond = self.parse_pipeline(TokenKind::RightDelim, "if")?;
                        nodes.push(self.parse_if(cond, pos)?);
                    }
                    Some("range") => {
                        self.next()?;
                        let pipe = self.parse_pipeline(TokenKind::RightDelim, "range")?;
                        nodes.push(self.parse_range(pipe, pos)?);
                    }
                    Some("else") => {
                        self.next()?;
                        if self.peek_keyword()? == Some("if") {
                            self.next()?;
                            let cond = self.parse_pipeline(TokenKind::RightDelim, "else if")?;
                            return Ok((nodes, Terminator::ElseIf(cond, pos)));
                        }
                        self.expect_right_delim("else")?;
                        return Ok((nodes, Terminator::Else(pos)));
                    }
                    Some("end") => {
                        self.next()?;
                        self.expect_right_delim("end")?;
                        return Ok((nodes, Terminator::End(pos)));
                    }
                    _ => {
                        let pipe = self.parse_pipeline(TokenKind::RightDelim, "command")?;
                        nodes.push(Node::Action(pipe));
                    }
                },
                other => {
                    return Err(syntax(pos, format!("unexpected {}", other.describe())));
                }
            }
        }
    }

    fn parse_if(&mut self, cond: Pipeline, start: Position) -> Result<Node, ExpressionError> {
        let mut branches = Vec::new();
        let mut cond = cond;
        loop {
            let (body, term) = self.parse_list()?;
            branches.push((cond, body));
            match term {
                Terminator::End(_) => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    });
                }
                Terminator::ElseIf(next, _) => cond = next,
                Terminator::Else(_) => {
                    let (otherwise, term) = self.parse_list()?;
                    return match term {
                        Terminator::End(_) => Ok(Node::If {
                            branches,
                            otherwise,
                        }),
                        Terminator::Eof(_) => Err(unclosed_block("if", start)),
                        Terminator::Else(pos) | Terminator::ElseIf(_, pos) => {
                            Err(syntax(pos, "expected {{end}} after {{else}} branch"))
                        }
                    };
                }
                Terminator::Eof(_) => return Err(unclosed_block("if", start)),
            }
        }
    }

    fn parse_range(&mut self, pipe: Pipeline, start: Position) -> Result<Node, ExpressionError> {
        let (body, term) = self.parse_list()?;
        match term {
            Terminator::End(_) => Ok(Node::Range {
                pipe,
                body,
                otherwise: Vec::new(),
            }),
            Terminator::Else(_) => {
                let (otherwise, term) = self.parse_list()?;
                match term {
                    Terminator::End(_) => Ok(Node::Range {
                        pipe,
                        body,
                        otherwise,
                    }),
                    Terminator::Eof(_) => Err(unclosed_block("range", start)),
                    Terminator::Else(pos) | Terminator::ElseIf(_, pos) => {
                        Err(syntax(pos, "expected {{end}} after {{else}} branch"))
                    }
                }
            }
            Terminator::ElseIf(_, pos) => Err(syntax(pos, "{{else if}} is not valid in range")),
            Terminator::Eof(_) => Err(unclosed_block("range", start)),
        }
    }

    // ── pipelines ────────────────────────────────────────────────────────────

    /// Parse commands separated by `|` up to and including `end`.
    fn parse_pipeline(&mut self, end: TokenKind, context: &str) -> Result<Pipeline, ExpressionError> {
        let mut commands = Vec::new();
        loop {
            let start = self.peek()?.clone();
            let command = self.parse_command()?;
            if command.args.is_empty() {
                return Err(syntax(
                    self.pos(&start),
                    format!("missing value for {context}"),
                ));
            }
            commands.push(command);

            let tok = self.next()?;
            if tok.kind == TokenKind::Pipe {
                continue;
            }
            if tok.kind == end {
                break;
            }
            return Err(syntax(
                self.pos(&tok),
                format!("unexpected {} in {context}", tok.kind.describe()),
            ));
        }
        Ok(Pipeline { commands })
    }

    fn parse_command(&mut self) -> Result<Command, ExpressionError> {
        let start = self.peek()?.clone();
        let mut args = Vec::new();
        loop {
            let kind = &self.peek()?.kind;
            if matches!(
                kind,
                TokenKind::Pipe | TokenKind::RightDelim | TokenKind::RParen
            ) {
                break;
            }
            if *kind == TokenKind::Eof {
                return Err(syntax(self.pos(&start), "unexpected end of input in action"));
            }
            args.push(self.parse_term()?);
        }
        Ok(Command {
            args,
            pos: self.pos(&start),
        })
    }

    fn parse_term(&mut self) -> Result<Term, ExpressionError> {
        let tok = self.next()?;
        let pos = self.pos(&tok);
        let (kind, mut access) = match tok.kind {
            TokenKind::Dot => (TermKind::Dot, Vec::new()),
            TokenKind::Field(names) => (TermKind::Dot, names.into_iter().map(Access::Field).collect()),
            TokenKind::Variable(names) => {
                (TermKind::Root, names.into_iter().map(Access::Field).collect())
            }
            TokenKind::Str(s) => (TermKind::Literal(Value::String(s)), Vec::new()),
            TokenKind::Int(n) => (TermKind::Literal(Value::Int(n)), Vec::new()),
            TokenKind::LParen => {
                let pipe = self.parse_pipeline(TokenKind::RParen, "parenthesized pipeline")?;
                (TermKind::Sub(Box::new(pipe)), Vec::new())
            }
            TokenKind::Ident(name) => return ident_term(name, pos),
            other => {
                return Err(syntax(pos, format!("unexpected {} in command", other.describe())));
            }
        };

        // Postfix chains: `.a.b[0].c`, `(pipe).x`
        loop {
            let next = self.peek()?;
            let chained = !next.spaced;
            let is_index = next.kind == TokenKind::LBracket;
            if chained && matches!(next.kind, TokenKind::Field(_)) {
                if let TokenKind::Field(names) = self.next()?.kind {
                    access.extend(names.into_iter().map(Access::Field));
                }
            } else if chained && is_index {
                self.next()?;
                let index = self.parse_term()?;
                let close = self.next()?;
                if close.kind != TokenKind::RBracket {
                    return Err(syntax(
                        self.pos(&close),
                        format!("expected ']' but found {}", close.kind.describe()),
                    ));
                }
                access.push(Access::Index(Box::new(index)));
            } else {
                break;
            }
        }

        Ok(Term { kind, access, pos })
    }
}

/// Identifiers are literals, keywords (invalid here) or function names.
fn ident_term(name: String, pos: Position) -> Result<Term, ExpressionError> {
    let kind = match name.as_str() {
        "true" => TermKind::Literal(Value::Bool(true)),
        "false" => TermKind::Literal(Value::Bool(false)),
        "nil" => TermKind::Literal(Value::Null),
        kw if KEYWORDS.contains(&kw) => {
            return Err(syntax(pos, format!("unexpected keyword '{kw}' in command")));
        }
        known if functions::is_defined(known) => TermKind::Function(name.clone()),
        _ => {
            return Err(ExpressionError::UndefinedFunction {
                position: pos,
                name,
            });
        }
    };
    Ok(Term {
        kind,
        access: Vec::new(),
        pos,
    })
}

fn unclosed_block(keyword: &str, start: Position) -> ExpressionError {
    syntax(start, format!("unexpected end of input: {{{{{keyword}}}}} has no matching {{{{end}}}}"))
}
