use console::Term;
use dialoguer::{Confirm, FuzzySelect, Input, MultiSelect, Select, theme::ColorfulTheme};
use tracing::debug;

use stencil_core::application::RenderedHook;
use stencil_core::domain::{DomainError, InputSource, PromptKind, Question, ValidationError, Value};

use super::{label, shown, split_list, text_or_null};

/// Lists longer than this get a fuzzy finder instead of arrow selection.
const FUZZY_THRESHOLD: usize = 10;

const HOOK_CHOICES: &[&str] = &["Run it", "Skip it", "Show the script"];

/// Terminal widgets for each prompt shape.
pub struct DialogInput {
    theme: ColorfulTheme,
    term: Term,
}

impl DialogInput {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            term: Term::stderr(),
        }
    }

    fn text(&self, prompt: &str, default: Option<&Value>) -> dialoguer::Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default.filter(|d| !d.is_empty()) {
            input = input.default(shown(default));
        }
        input.interact_text_on(&self.term)
    }

    fn read_answer(&self, question: &Question, default: Option<&Value>) -> dialoguer::Result<Value> {
        let prompt = label(question);

        let value = match &question.prompt.kind {
            PromptKind::Text { .. } => text_or_null(&self.text(&prompt, default)?),
            PromptKind::Confirm { .. } => {
                let initial = default.and_then(Value::as_bool).unwrap_or(false);
                Value::Bool(
                    Confirm::with_theme(&self.theme)
                        .with_prompt(prompt)
                        .default(initial)
                        .interact_on(&self.term)?,
                )
            }
            PromptKind::Select { options, .. } => {
                let initial = default
                    .and_then(Value::as_str)
                    .and_then(|d| options.iter().position(|o| o == d))
                    .unwrap_or(0);
                let index = if options.len() > FUZZY_THRESHOLD {
                    FuzzySelect::with_theme(&self.theme)
                        .with_prompt(prompt)
                        .items(options)
                        .default(initial)
                        .interact_on(&self.term)?
                } else {
                    Select::with_theme(&self.theme)
                        .with_prompt(prompt)
                        .items(options)
                        .default(initial)
                        .interact_on(&self.term)?
                };
                options.get(index).cloned().map_or(Value::Null, Value::String)
            }
            PromptKind::MultiSelect { options, .. } => {
                let chosen = default.map(Value::to_string_list).unwrap_or_default();
                let checked: Vec<bool> = options.iter().map(|o| chosen.contains(o)).collect();
                let picked = MultiSelect::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .items(options)
                    .defaults(&checked)
                    .interact_on(&self.term)?;
                // An empty selection is a real answer here, not "use the default".
                Value::list(picked.into_iter().filter_map(|i| options.get(i).cloned()))
            }
            PromptKind::MultiText { .. } => {
                let reply = self.text(&format!("{prompt} (comma separated)"), default)?;
                Value::list(split_list(&reply))
            }
            PromptKind::LoopText { .. } => {
                let mut items = Vec::new();
                loop {
                    let reply = self.text(&format!("{prompt} (empty to finish)"), None)?;
                    if reply.trim().is_empty() {
                        break;
                    }
                    items.push(reply.trim().to_string());
                }
                if items.is_empty() {
                    Value::Null
                } else {
                    Value::list(items)
                }
            }
        };
        Ok(value)
    }
}

impl Default for DialogInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for DialogInput {
    fn ask(&mut self, question: &Question, default: Option<Value>) -> Result<Value, DomainError> {
        self.read_answer(question, default.as_ref())
            .map_err(|e| DomainError::Input {
                question: question.name.clone(),
                reason: e.to_string(),
            })
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn rejected(&mut self, question: &Question, error: &ValidationError) {
        debug!(question = %question.name, "asking again");
        let _ = self.term.write_line(&format!("\u{2717} {error}"));
    }
}

/// Run, skip, or print the script and ask again.
pub fn confirm_hook(hook: &RenderedHook) -> dialoguer::Result<bool> {
    let theme = ColorfulTheme::default();
    let term = Term::stderr();
    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt(format!("This scaffold has a post-scaffold hook ({})", hook.name))
            .items(HOOK_CHOICES)
            .default(0)
            .interact_on(&term)?;
        match choice {
            0 => return Ok(true),
            2 => {
                term.write_line("")?;
                term.write_line(hook.script.trim_end())?;
                term.write_line("")?;
            }
            _ => return Ok(false),
        }
    }
}
