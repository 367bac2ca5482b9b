//! Tree-walking evaluator.

use std::collections::BTreeMap;

use super::context::RenderContext;
use super::functions;
use super::parser::{Access, Command, Node, Pipeline, Term, TermKind};
use crate::domain::error::{ExpressionError, Position};
use crate::domain::value_objects::Value;

/// Namespaces whose members are subject to the strict-mode declaration check.
const NAMESPACES: &[&str] = &["Scaffold", "Computed"];

/// Partials calling partials stop here; a partial that includes itself
/// would otherwise never end.
const MAX_PARTIAL_DEPTH: usize = 32;

pub(crate) struct Evaluator<'a> {
    ctx: &'a RenderContext,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: &'a RenderContext) -> Self {
        Self { ctx, depth: 0 }
    }

    pub(crate) fn render(&self, nodes: &[Node]) -> Result<String, ExpressionError> {
        let mut out = String::new();
        self.exec(nodes, self.ctx.root(), &mut out)?;
        Ok(out)
    }

    fn exec(&self, nodes: &[Node], dot: &Value, out: &mut String) -> Result<(), ExpressionError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipe) => {
                    let value = self.pipeline(pipe, dot)?;
                    out.push_str(&value.to_string());
                }
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let mut taken = false;
                    for (cond, body) in branches {
                        if self.pipeline(cond, dot)?.is_truthy() {
                            self.exec(body, dot, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        self.exec(otherwise, dot, out)?;
                    }
                }
                Node::Range {
                    pipe,
                    body,
                    otherwise,
                } => {
                    let items = match self.pipeline(pipe, dot)? {
                        Value::List(items) => items,
                        Value::Map(map) => map.into_values().collect(),
                        Value::Null => Vec::new(),
                        other => {
                            return Err(eval_error(
                                first_pos(pipe),
                                format!("range can't iterate over {}", other.type_name()),
                            ));
                        }
                    };
                    if items.is_empty() {
                        self.exec(otherwise, dot, out)?;
                    }
                    for item in &items {
                        self.exec(body, item, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn pipeline(&self, pipe: &Pipeline, dot: &Value) -> Result<Value, ExpressionError> {
        let mut piped = None;
        for command in &pipe.commands {
            piped = Some(self.command(command, dot, piped)?);
        }
        Ok(piped.unwrap_or_default())
    }

    fn command(
        &self,
        command: &Command,
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value, ExpressionError> {
        let Some((head, rest)) = command.args.split_first() else {
            return Err(eval_error(command.pos, "empty command"));
        };

        if let TermKind::Function(name) = &head.kind {
            let mut args = rest
                .iter()
                .map(|t| self.term(t, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped);
            return self.invoke(name, &args, dot, head.pos);
        }

        if !rest.is_empty() || piped.is_some() {
            return Err(eval_error(
                command.pos,
                "can't give argument to non-function",
            ));
        }
        self.term(head, dot)
    }

    fn term(&self, term: &Term, dot: &Value) -> Result<Value, ExpressionError> {
        match &term.kind {
            TermKind::Dot => {
                let at_root = std::ptr::eq(dot, self.ctx.root());
                self.access(dot, &term.access, at_root, term.pos, dot)
            }
            TermKind::Root => self.access(self.ctx.root(), &term.access, true, term.pos, dot),
            TermKind::Literal(value) => Ok(value.clone()),
            TermKind::Function(name) => self.invoke(name, &[], dot, term.pos),
            TermKind::Sub(pipe) => {
                let value = self.pipeline(pipe, dot)?;
                self.access(&value, &term.access, false, term.pos, dot)
            }
        }
    }

    fn invoke(
        &self,
        name: &str,
        args: &[Value],
        dot: &Value,
        pos: Position,
    ) -> Result<Value, ExpressionError> {
        if name == functions::PARTIAL {
            return self
                .partial(args, dot)
                .map_err(|message| eval_error(pos, format!("error calling {name}: {message}")));
        }
        call(name, args, pos)
    }

    /// `partial "name"` renders with the current dot, `partial "name" data`
    /// with `data` as dot.
    fn partial(&self, args: &[Value], dot: &Value) -> Result<Value, String> {
        let (name, data) = match args {
            [name] => (name.to_string(), dot),
            [name, data] => (name.to_string(), data),
            _ => {
                return Err(format!(
                    "wrong number of args for partial: want 1 or 2 got {}",
                    args.len()
                ));
            }
        };
        let template = self
            .ctx
            .partial(&name)
            .ok_or_else(|| format!("partial not found: {name}"))?;
        if self.depth >= MAX_PARTIAL_DEPTH {
            return Err(format!("partial {name} nested more than {MAX_PARTIAL_DEPTH} deep"));
        }

        let nested = Evaluator {
            ctx: self.ctx,
            depth: self.depth + 1,
        };
        let mut out = String::new();
        nested
            .exec(&template.nodes, data, &mut out)
            .map_err(|e| format!("in partial {name}: {e}"))?;
        Ok(Value::String(out))
    }

    /// Walk `path` from `base`. Missing map keys yield `Null` unless the
    /// context is strict and the name is not declared.
    fn access(
        &self,
        base: &Value,
        path: &[Access],
        at_root: bool,
        pos: Position,
        dot: &Value,
    ) -> Result<Value, ExpressionError> {
        let mut current = base;
        for (depth, step) in path.iter().enumerate() {
            let key = match step {
                Access::Field(name) => Value::String(name.clone()),
                Access::Index(index) => self.term(index, dot)?,
            };

            current = match (current, &key) {
                (Value::Map(map), Value::String(k)) => match map.get(k) {
                    Some(v) => v,
                    None => {
                        let checked = at_root
                            && (depth == 0
                                || (depth == 1 && in_namespace(path)));
                        if checked && self.ctx.is_strict() && !self.ctx.is_declared(k) {
                            return Err(ExpressionError::Undeclared {
                                position: pos,
                                name: k.clone(),
                            });
                        }
                        return Ok(Value::Null);
                    }
                },
                (Value::List(items), Value::Int(i)) => {
                    let idx = usize::try_from(*i).ok().filter(|&i| i < items.len());
                    match idx {
                        Some(idx) => &items[idx],
                        None => {
                            return Err(eval_error(
                                pos,
                                format!("index out of range: {i} (length {})", items.len()),
                            ));
                        }
                    }
                }
                (Value::Null, _) => return Ok(Value::Null),
                (other, key) => {
                    let message = match key {
                        Value::String(field) => {
                            format!("can't evaluate field {field} in type {}", other.type_name())
                        }
                        key => format!("can't index {} with {}", other.type_name(), key.type_name()),
                    };
                    return Err(eval_error(pos, message));
                }
            };
        }
        Ok(current.clone())
    }
}

fn in_namespace(path: &[Access]) -> bool {
    matches!(path.first(), Some(Access::Field(ns)) if NAMESPACES.contains(&ns.as_str()))
}

fn call(name: &str, args: &[Value], pos: Position) -> Result<Value, ExpressionError> {
    let func = functions::lookup(name).ok_or_else(|| ExpressionError::UndefinedFunction {
        position: pos,
        name: name.to_string(),
    })?;
    func(args).map_err(|message| eval_error(pos, format!("error calling {name}: {message}")))
}

fn first_pos(pipe: &Pipeline) -> Position {
    pipe.commands.first().map(|c| c.pos).unwrap_or_default()
}

fn eval_error(position: Position, message: impl Into<String>) -> ExpressionError {
    ExpressionError::Eval {
        position,
        message: message.into(),
    }
}

/// Build a map value from string pairs.
pub(crate) fn map_of<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}
