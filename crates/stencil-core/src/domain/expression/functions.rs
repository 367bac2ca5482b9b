//! Built-in template functions.
//!
//! Argument order follows the pipeline convention: the value being operated
//! on comes last, so `{{ .name | replace "-" "_" }}` reads naturally.

use crate::domain::value_objects::Value;

pub(crate) type Func = fn(&[Value]) -> Result<Value, String>;

/// Renders a named partial. Handled by the evaluator because it needs the
/// context, so it has no entry in the table below.
pub(crate) const PARTIAL: &str = "partial";

const FUNCTIONS: &[(&str, Func)] = &[
    // Comparison and logic
    ("eq", eq),
    ("ne", ne),
    ("lt", lt),
    ("gt", gt),
    ("not", not),
    ("and", and),
    ("or", or),
    // Collections
    ("len", len),
    ("contains", contains),
    ("join", join),
    ("split", split),
    ("default", default),
    // Strings
    ("hasPrefix", has_prefix),
    ("hasSuffix", has_suffix),
    ("lower", lower),
    ("upper", upper),
    ("title", title),
    ("trim", trim),
    ("replace", replace),
    ("quote", quote),
    ("wraptmpl", wraptmpl),
    // Identifier casing
    ("snakecase", snakecase),
    ("kebabcase", kebabcase),
    ("camelcase", camelcase),
    ("pascalcase", pascalcase),
    // Inflection
    ("toPlural", to_plural),
    ("toSingular", to_singular),
    ("isPlural", is_plural),
    ("isSingular", is_singular),
];

pub(crate) fn lookup(name: &str) -> Option<Func> {
    FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

pub(crate) fn is_defined(name: &str) -> bool {
    name == PARTIAL || lookup(name).is_some()
}

/// Names of every built-in, for diagnostics.
pub fn names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS
        .iter()
        .map(|(n, _)| *n)
        .chain(std::iter::once(PARTIAL))
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn arity(name: &str, args: &[Value], n: usize) -> Result<(), String> {
    if args.len() == n {
        Ok(())
    } else {
        Err(format!(
            "wrong number of args for {name}: want {n} got {}",
            args.len()
        ))
    }
}

fn at_least(name: &str, args: &[Value], n: usize) -> Result<(), String> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(format!(
            "wrong number of args for {name}: want at least {n} got {}",
            args.len()
        ))
    }
}

fn text(v: &Value) -> String {
    v.to_string()
}

fn map_str(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, String> {
    arity(name, args, 1)?;
    Ok(Value::String(f(&text(&args[0]))))
}

/// Compare two values, treating booleans and integers as equal to their
/// textual spelling so `eq .flag "true"` behaves for preset answers.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::Bool(_) | Value::Int(_))
        | (Value::Bool(_) | Value::Int(_), Value::String(s)) => {
            let other = if matches!(a, Value::String(_)) { b } else { a };
            *s == other.to_string()
        }
        _ => a == b,
    }
}

// ── comparison ───────────────────────────────────────────────────────────────

fn eq(args: &[Value]) -> Result<Value, String> {
    at_least("eq", args, 2)?;
    let first = &args[0];
    Ok(Value::Bool(args[1..].iter().any(|v| loosely_equal(first, v))))
}

fn ne(args: &[Value]) -> Result<Value, String> {
    arity("ne", args, 2)?;
    Ok(Value::Bool(!loosely_equal(&args[0], &args[1])))
}

fn ordering(name: &str, args: &[Value]) -> Result<std::cmp::Ordering, String> {
    arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (a, b) => Err(format!(
            "{name}: incompatible types for comparison ({} and {})",
            a.type_name(),
            b.type_name()
        )),
    }
}

fn lt(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(ordering("lt", args)?.is_lt()))
}

fn gt(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(ordering("gt", args)?.is_gt()))
}

fn not(args: &[Value]) -> Result<Value, String> {
    arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// First falsy argument, or the last one.
fn and(args: &[Value]) -> Result<Value, String> {
    at_least("and", args, 1)?;
    Ok(args
        .iter()
        .find(|v| !v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

/// First truthy argument, or the last one.
fn or(args: &[Value]) -> Result<Value, String> {
    at_least("or", args, 1)?;
    Ok(args
        .iter()
        .find(|v| v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

// ── collections ──────────────────────────────────────────────────────────────

fn len(args: &[Value]) -> Result<Value, String> {
    arity("len", args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Null => 0,
        other => return Err(format!("len of {}", other.type_name())),
    };
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

/// `contains NEEDLE HAYSTACK`: substring test for strings, membership for lists.
fn contains(args: &[Value]) -> Result<Value, String> {
    arity("contains", args, 2)?;
    let needle = &args[0];
    Ok(Value::Bool(match &args[1] {
        Value::List(items) => items.iter().any(|v| loosely_equal(v, needle)),
        Value::Map(map) => map.contains_key(&text(needle)),
        other => text(other).contains(&text(needle)),
    }))
}

fn join(args: &[Value]) -> Result<Value, String> {
    arity("join", args, 2)?;
    let sep = text(&args[0]);
    Ok(Value::String(args[1].to_string_list().join(&sep)))
}

fn split(args: &[Value]) -> Result<Value, String> {
    arity("split", args, 2)?;
    let sep = text(&args[0]);
    let s = text(&args[1]);
    if s.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::list(s.split(sep.as_str())))
}

/// `default FALLBACK VALUE`: VALUE unless it is empty.
fn default(args: &[Value]) -> Result<Value, String> {
    arity("default", args, 2)?;
    let value = &args[1];
    let empty = match value {
        Value::Bool(b) => !b,
        other => other.is_empty(),
    };
    Ok(if empty { args[0].clone() } else { value.clone() })
}

// ── strings ──────────────────────────────────────────────────────────────────

fn has_prefix(args: &[Value]) -> Result<Value, String> {
    arity("hasPrefix", args, 2)?;
    Ok(Value::Bool(text(&args[1]).starts_with(&text(&args[0]))))
}

fn has_suffix(args: &[Value]) -> Result<Value, String> {
    arity("hasSuffix", args, 2)?;
    Ok(Value::Bool(text(&args[1]).ends_with(&text(&args[0]))))
}

fn lower(args: &[Value]) -> Result<Value, String> {
    map_str("lower", args, str::to_lowercase)
}

fn upper(args: &[Value]) -> Result<Value, String> {
    map_str("upper", args, str::to_uppercase)
}

fn title(args: &[Value]) -> Result<Value, String> {
    map_str("title", args, |s| {
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if at_word_start && c.is_alphabetic() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = c.is_whitespace() || c == '-' || c == '_';
        }
        out
    })
}

fn trim(args: &[Value]) -> Result<Value, String> {
    map_str("trim", args, |s| s.trim().to_string())
}

/// `replace OLD NEW VALUE`
fn replace(args: &[Value]) -> Result<Value, String> {
    arity("replace", args, 3)?;
    let (old, new) = (text(&args[0]), text(&args[1]));
    Ok(Value::String(text(&args[2]).replace(&old, &new)))
}

fn quote(args: &[Value]) -> Result<Value, String> {
    map_str("quote", args, |s| {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    })
}

/// Emit a literal template action, for scaffolds that generate templates.
fn wraptmpl(args: &[Value]) -> Result<Value, String> {
    map_str("wraptmpl", args, |s| format!("{{{{ {s} }}}}"))
}

// ── identifier casing ────────────────────────────────────────────────────────

fn snakecase(args: &[Value]) -> Result<Value, String> {
    map_str("snakecase", args, to_snake_case)
}

fn kebabcase(args: &[Value]) -> Result<Value, String> {
    map_str("kebabcase", args, to_kebab_case)
}

fn camelcase(args: &[Value]) -> Result<Value, String> {
    map_str("camelcase", args, to_camel_case)
}

fn pascalcase(args: &[Value]) -> Result<Value, String> {
    map_str("pascalcase", args, to_pascal_case)
}

// ── inflection ───────────────────────────────────────────────────────────────

fn to_plural(args: &[Value]) -> Result<Value, String> {
    map_str("toPlural", args, |s| pluralizer::pluralize(s, 2, false))
}

fn to_singular(args: &[Value]) -> Result<Value, String> {
    map_str("toSingular", args, |s| pluralizer::pluralize(s, 1, false))
}

fn is_plural(args: &[Value]) -> Result<Value, String> {
    arity("isPlural", args, 1)?;
    let word = text(&args[0]);
    Ok(Value::Bool(pluralizer::pluralize(&word, 2, false) == word))
}

fn is_singular(args: &[Value]) -> Result<Value, String> {
    arity("isSingular", args, 1)?;
    let word = text(&args[0]);
    Ok(Value::Bool(pluralizer::pluralize(&word, 1, false) == word))
}

pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

/// | Input | Output |
/// |-------|--------|
/// | "my-app" | "MyApp" |
/// | "HTTPRequest" | "HttpRequest" |
pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

pub fn to_camel_case(s: &str) -> String {
    let mut words = split_words(s).into_iter();
    let Some(first) = words.next() else {
        return String::new();
    };
    words.fold(first, |mut acc, w| {
        acc.push_str(&capitalize(&w));
        acc
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split an identifier into lowercase words.
///
/// Boundaries are separators (`_`, `-`, `.`, whitespace), a lower→upper
/// transition (`myApp`), and the end of an acronym (`HTTPServer`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        current.push(c);
        if let Some(&next) = chars.peek() {
            let camel = (c.is_lowercase() || c.is_ascii_digit()) && next.is_uppercase();
            let acronym_end = c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(char::is_lowercase);
            if camel || acronym_end {
                words.push(current.to_lowercase());
                current.clear();
            }
        }
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}
