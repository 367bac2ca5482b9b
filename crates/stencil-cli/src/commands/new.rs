//! Implementation of the `stencil new` command.
//!
//! Responsibility: turn CLI arguments into a `GenerateRequest`, pick an
//! answer source, run the generation service against the local filesystem,
//! and display the report. No business logic lives here.

use std::collections::BTreeMap;

use tracing::{info, instrument};

use stencil_adapters::{LocalFilesystem, ProcessHookRunner, ScriptedInput};
use stencil_core::{
    application::{
        GenerateOptions, GenerateRequest, GenerationReport, GenerationService, InjectPolicy,
        RenderedHook,
    },
    domain::{AnswerMap, InputSource, Value},
};

use crate::{
    cli::{NewArgs, OutputFormat, global::GlobalArgs},
    config::{AppConfig, RunHooks},
    error::CliResult,
    output::OutputManager,
    prompt,
};

/// Execute the `stencil new` command.
///
/// 1. Resolve and load the scaffold
/// 2. Build the request from flags, `--set` answers and configured defaults
/// 3. Print the pre message, prompt (unless `--no-prompt`), generate, commit
/// 4. Print the report, run the post-scaffold hook if allowed, print the
///    post message
#[instrument(skip_all, fields(scaffold = %args.scaffold))]
pub fn execute(
    args: NewArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let scaffold = super::open_scaffold(&args.scaffold, &config)?;
    let request = build_request(&args, &config);
    let json = output.format() == OutputFormat::Json;

    if !json {
        output.header(&format!(
            "{} '{}' into {}",
            if args.dry_run { "Previewing" } else { "Generating" },
            scaffold.name,
            args.output.display()
        ))?;
    }

    let service = GenerationService::new(Box::new(LocalFilesystem::new()));

    // JSON runs never prompt: stdout belongs to the report.
    let asks = !(args.no_prompt || json);
    let mut input: Box<dyn InputSource> = if asks {
        if let Some(pre) = service.pre_message(&scaffold.definition, &scaffold.source, &request)? {
            output.print(&pre)?;
            output.print("")?;
        }
        prompt::terminal()
    } else {
        Box::new(ScriptedInput::new())
    };

    let report = service.generate(
        &scaffold.definition,
        &scaffold.source,
        input.as_mut(),
        &request,
    )?;
    info!(
        written = report.written().count(),
        dry_run = report.dry_run,
        "scaffold generated"
    );

    if json {
        output.json(&report)?;
        return run_hook(&service, &report, config.settings.run_hooks, asks, json, &output);
    }

    output.report(&report)?;
    run_hook(&service, &report, config.settings.run_hooks, asks, json, &output)?;
    if let Some(post) = &report.post_message {
        if !global.quiet {
            output.print("")?;
            output.print(post)?;
        }
    }
    Ok(())
}

/// Run the committed report's post-scaffold hook when `policy` allows it.
fn run_hook(
    service: &GenerationService,
    report: &GenerationReport,
    policy: RunHooks,
    asks: bool,
    json: bool,
    output: &OutputManager,
) -> CliResult<()> {
    let Some(hook) = report.post_hook.as_ref().filter(|_| !report.dry_run) else {
        return Ok(());
    };
    if !hook_allowed(policy, asks, hook, prompt::confirm_hook)? {
        info!(hook = %hook.name, policy = ?policy, "hook skipped");
        if !json {
            output.info(&format!("Skipped hook {}", hook.name))?;
        }
        return Ok(());
    }

    let runner = if json {
        ProcessHookRunner::new().stdout_to_stderr()
    } else {
        ProcessHookRunner::new()
    };
    service.run_post_hook(report, &runner)?;
    if !json {
        output.success(&format!("Ran hook {}", hook.name))?;
    }
    Ok(())
}

/// `ask` is only consulted for [`RunHooks::Prompt`] when prompting is
/// allowed at all.
fn hook_allowed(
    policy: RunHooks,
    asks: bool,
    hook: &RenderedHook,
    ask: impl FnOnce(&RenderedHook) -> CliResult<bool>,
) -> CliResult<bool> {
    match policy {
        RunHooks::Never => Ok(false),
        RunHooks::Always => Ok(true),
        RunHooks::Prompt if asks => ask(hook),
        RunHooks::Prompt => Ok(false),
    }
}

fn build_request(args: &NewArgs, config: &AppConfig) -> GenerateRequest {
    let options = GenerateOptions {
        strict: args.strict,
        dry_run: args.dry_run,
        no_clobber: args.no_clobber,
        inject_policy: if args.lenient_inject {
            InjectPolicy::Lenient
        } else {
            InjectPolicy::Strict
        },
        ..GenerateOptions::default()
    };

    let mut request = GenerateRequest::new(&args.output)
        .answers(set_answers(&args.set))
        .defaults(config.default_answers())
        .options(options);
    if let Some(name) = &args.name {
        request = request.project_name(name);
    }
    if let Some(preset) = &args.preset {
        request = request.preset(preset);
    }
    request
}

/// `--set` pairs as answers. A key given more than once becomes a list.
fn set_answers(pairs: &[(String, String)]) -> AnswerMap {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
        .into_iter()
        .fold(AnswerMap::new(), |map, (key, values)| match values.as_slice() {
            [single] => map.with(key, *single),
            many => map.with(key, Value::list(many.iter().copied())),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    fn new_args(argv: &[&str]) -> NewArgs {
        let mut full = vec!["stencil", "new", "scaffold"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::New(args) => args,
            _ => panic!("expected New command"),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn single_values_stay_strings() {
        let answers = set_answers(&pairs(&[("db", "postgres"), ("docker", "true")]));
        assert_eq!(answers.get("db"), Some(&Value::from("postgres")));
        assert_eq!(answers.get("docker"), Some(&Value::from("true")));
    }

    #[test]
    fn repeated_keys_become_lists() {
        let answers = set_answers(&pairs(&[
            ("services", "users"),
            ("name", "api"),
            ("services", "orders"),
        ]));
        assert_eq!(answers.get("services"), Some(&Value::list(["users", "orders"])));
        assert_eq!(answers.get("name"), Some(&Value::from("api")));
    }

    #[test]
    fn flags_map_onto_the_request() {
        let args = new_args(&[
            "-o",
            "out",
            "--name",
            "Billing",
            "--preset",
            "ci",
            "--dry-run",
            "--no-clobber",
            "--strict",
            "--lenient-inject",
        ]);
        let mut config = AppConfig::default();
        config.defaults.insert("license".into(), Value::from("MIT"));

        let request = build_request(&args, &config);
        assert_eq!(request.output_root, std::path::PathBuf::from("out"));
        assert_eq!(request.project_name.as_deref(), Some("Billing"));
        assert_eq!(request.preset.as_deref(), Some("ci"));
        assert_eq!(request.defaults.get("license"), Some(&Value::from("MIT")));
        assert!(request.options.dry_run);
        assert!(request.options.no_clobber);
        assert!(request.options.strict);
        assert_eq!(request.options.inject_policy, InjectPolicy::Lenient);
    }

    fn hook() -> RenderedHook {
        RenderedHook {
            name: "post_scaffold.sh".into(),
            script: "make".into(),
        }
    }

    #[test]
    fn hook_policy_never_and_always_ignore_the_prompt() {
        let unasked = |_: &RenderedHook| -> CliResult<bool> { panic!("must not ask") };
        assert!(!hook_allowed(RunHooks::Never, true, &hook(), unasked).unwrap());
        assert!(hook_allowed(RunHooks::Always, false, &hook(), unasked).unwrap());
    }

    #[test]
    fn hook_policy_prompt_asks_only_when_prompting() {
        let unasked = |_: &RenderedHook| -> CliResult<bool> { panic!("must not ask") };
        assert!(!hook_allowed(RunHooks::Prompt, false, &hook(), unasked).unwrap());
        assert!(hook_allowed(RunHooks::Prompt, true, &hook(), |_| Ok(true)).unwrap());
        assert!(!hook_allowed(RunHooks::Prompt, true, &hook(), |_| Ok(false)).unwrap());
    }

    #[test]
    fn injection_is_strict_by_default() {
        let request = build_request(&new_args(&[]), &AppConfig::default());
        assert_eq!(request.options.inject_policy, InjectPolicy::Strict);
        assert!(request.project_name.is_none());
        assert!(request.answers.is_empty());
    }
}
