use std::io::{self, BufRead, IsTerminal};

use console::Term;
use tracing::debug;

use stencil_core::domain::{DomainError, InputSource, PromptKind, Question, ValidationError, Value};

use super::{label, shown, split_list, text_or_null};

/// Reads one answer per line. Prompts go to stderr.
pub struct LineInput<R> {
    reader: R,
    term: Term,
    interactive: bool,
}

impl LineInput<io::StdinLock<'static>> {
    /// Answers from stdin. Rejected answers are asked again only when stdin
    /// is a terminal.
    pub fn stdin() -> Self {
        let interactive = io::stdin().is_terminal();
        Self::new(io::stdin().lock(), interactive)
    }
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R, interactive: bool) -> Self {
        Self {
            reader,
            term: Term::stderr(),
            interactive,
        }
    }

    /// Next line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn reply(&mut self, prompt: &str) -> io::Result<String> {
        self.term.write_str(prompt)?;
        Ok(self.read_line()?.unwrap_or_default())
    }

    fn list_options(&self, options: &[String]) -> io::Result<()> {
        for (i, option) in options.iter().enumerate() {
            self.term.write_line(&format!("  {}) {option}", i + 1))?;
        }
        Ok(())
    }

    fn read_answer(&mut self, question: &Question, default: Option<&Value>) -> io::Result<Value> {
        let label = label(question);
        let hint = match default {
            Some(d) if !d.is_empty() => format!(" [{}]", shown(d)),
            _ => String::new(),
        };

        let value = match &question.prompt.kind {
            PromptKind::Text { .. } => text_or_null(&self.reply(&format!("{label}{hint}: "))?),
            PromptKind::Confirm { .. } => {
                yes_no(&self.reply(&format!("{label} (y/n){hint}: "))?)
            }
            PromptKind::Select { options, .. } => {
                self.term.write_line(&label)?;
                self.list_options(options)?;
                let reply = self.reply(&format!("Choose{hint}: "))?;
                match pick(options, reply.trim()) {
                    Some(option) => Value::String(option),
                    None => text_or_null(&reply),
                }
            }
            PromptKind::MultiSelect { options, .. } => {
                self.term.write_line(&label)?;
                self.list_options(options)?;
                let reply = self.reply(&format!("Choose, comma separated{hint}: "))?;
                let items: Vec<String> = split_list(&reply)
                    .into_iter()
                    .map(|item| pick(options, &item).unwrap_or(item))
                    .collect();
                list_or_null(items)
            }
            PromptKind::MultiText { .. } => {
                list_or_null(split_list(&self.reply(&format!("{label}, comma separated{hint}: "))?))
            }
            PromptKind::LoopText { .. } => {
                self.term.write_line(&format!("{label}{hint} (empty line to finish)"))?;
                let mut items = Vec::new();
                loop {
                    let reply = self.reply("> ")?;
                    if reply.trim().is_empty() {
                        break;
                    }
                    items.push(reply.trim().to_string());
                }
                list_or_null(items)
            }
        };
        Ok(value)
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn ask(&mut self, question: &Question, default: Option<Value>) -> Result<Value, DomainError> {
        self.read_answer(question, default.as_ref())
            .map_err(|e| DomainError::Input {
                question: question.name.clone(),
                reason: e.to_string(),
            })
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn rejected(&mut self, question: &Question, error: &ValidationError) {
        debug!(question = %question.name, "asking again");
        // A failed write only loses the hint; the question is still re-asked.
        let _ = self.term.write_line(&format!("\u{2717} {error}"));
    }
}

/// `y`/`yes`/`n`/`no` in any case; anything else is left for the resolver.
fn yes_no(reply: &str) -> Value {
    match reply.trim().to_ascii_lowercase().as_str() {
        "" => Value::Null,
        "y" | "yes" => Value::Bool(true),
        "n" | "no" => Value::Bool(false),
        _ => Value::from(reply.trim()),
    }
}

/// An option chosen by its 1-based number or by name.
fn pick(options: &[String], reply: &str) -> Option<String> {
    if let Ok(n) = reply.parse::<usize>() {
        if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
            return Some(option.clone());
        }
    }
    options.iter().find(|o| o.as_str() == reply).cloned()
}

fn list_or_null(items: Vec<String>) -> Value {
    if items.is_empty() {
        Value::Null
    } else {
        Value::list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input(text: &str) -> LineInput<Cursor<Vec<u8>>> {
        LineInput::new(Cursor::new(text.as_bytes().to_vec()), false)
    }

    fn options() -> Vec<String> {
        vec!["postgres".into(), "sqlite".into()]
    }

    #[test]
    fn text_replies_and_blank_lines() {
        let mut src = input("billing\n\n");
        let q = Question::text("name", "Name");
        assert_eq!(src.ask(&q, None).unwrap(), Value::from("billing"));
        assert_eq!(src.ask(&q, Some(Value::from("x"))).unwrap(), Value::Null);
    }

    #[test]
    fn end_of_input_selects_the_default() {
        let mut src = input("");
        assert_eq!(src.ask(&Question::text("name", "Name"), None).unwrap(), Value::Null);
    }

    #[test]
    fn confirm_understands_yes_and_no() {
        let mut src = input("Y\nno\ntrue\n");
        let q = Question::confirm("docker", "Docker?");
        assert_eq!(src.ask(&q, None).unwrap(), Value::Bool(true));
        assert_eq!(src.ask(&q, None).unwrap(), Value::Bool(false));
        assert_eq!(src.ask(&q, None).unwrap(), Value::from("true"));
    }

    #[test]
    fn select_by_number_or_name() {
        let mut src = input("2\npostgres\n9\n");
        let q = Question::select("db", "Database", options());
        assert_eq!(src.ask(&q, None).unwrap(), Value::from("sqlite"));
        assert_eq!(src.ask(&q, None).unwrap(), Value::from("postgres"));
        // Out of range is passed on for the resolver to reject.
        assert_eq!(src.ask(&q, None).unwrap(), Value::from("9"));
    }

    #[test]
    fn multi_select_mixes_numbers_and_names() {
        let mut src = input("1, sqlite\n");
        let q = Question::select("dbs", "Databases", options()).with_kind(PromptKind::MultiSelect {
            options: options(),
            default: None,
        });
        assert_eq!(src.ask(&q, None).unwrap(), Value::list(["postgres", "sqlite"]));
    }

    #[test]
    fn loop_text_reads_until_blank_line() {
        let mut src = input("users\norders\n\nnext\n");
        let q = Question::text("services", "Service").with_kind(PromptKind::LoopText { default: None });
        assert_eq!(src.ask(&q, None).unwrap(), Value::list(["users", "orders"]));
        assert_eq!(
            src.ask(&Question::text("after", "After"), None).unwrap(),
            Value::from("next")
        );
    }

    #[test]
    fn interactivity_is_configurable() {
        assert!(!input("").is_interactive());
        assert!(LineInput::new(Cursor::new(Vec::new()), true).is_interactive());
    }
}
