//! Command line tokenizer used by the message command trigger.
//!
//! ```text
//! echo "hello world" -v --count=3 -- anything after here
//! ```
//!
//! yields args `["hello world"]`, options `{v: true, count: 3}` and rest
//! `"anything after here"`.

use crate::command::OptionSpec;
use serde_json::{Map, Number, Value};

/// A tokenized command tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLine {
    /// Positional arguments.
    pub args: Vec<String>,
    /// Options keyed by their canonical name.
    pub options: Map<String, Value>,
    /// Text after a bare `--`.
    pub rest: String,
    /// Option names no declared option recognized.
    pub unknown: Vec<String>,
}

impl CommandLine {
    /// A line made of positional arguments only.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Split on whitespace, keeping double-quoted runs together.
///
/// An unquoted `--` token ends tokenizing. The text after it is returned
/// verbatim as the second element.
fn tokenize(input: &str) -> (Vec<String>, &str) {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;
    let mut literal = false;
    for (index, c) in input.char_indices() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
                literal = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    if !literal && current == "--" {
                        return (tokens, input[index..].trim_start());
                    }
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                    literal = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started && (literal || current != "--") {
        tokens.push(current);
    }
    (tokens, "")
}

fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

/// `-5`, `-2.5` and `-1e3`, but not `-inf` or `-nan`.
fn is_negative_number(token: &str) -> bool {
    let Some(number) = token.strip_prefix('-') else {
        return false;
    };
    number.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && number
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'-' | b'+'))
        && number.parse::<f64>().is_ok()
}

struct Builder<'a> {
    specs: &'a [OptionSpec],
    line: CommandLine,
}

impl Builder<'_> {
    fn spec(&self, key: &str) -> Option<&OptionSpec> {
        self.specs.iter().find(|spec| spec.matches(key))
    }

    fn set(&mut self, key: &str, value: Value) {
        let name = match self.spec(key) {
            Some(spec) => spec.name.clone(),
            None => {
                self.line.unknown.push(key.to_string());
                key.to_string()
            }
        };
        self.line.options.insert(name, value);
    }

    fn takes_value(&self, key: &str) -> bool {
        self.spec(key).is_some_and(|spec| spec.takes_value)
    }
}

/// Tokenize a command tail against the command's declared options.
pub fn parse(input: &str, specs: &[OptionSpec]) -> CommandLine {
    let (tokens, rest) = tokenize(input);
    let mut builder = Builder {
        specs,
        line: CommandLine {
            rest: rest.to_string(),
            ..CommandLine::default()
        },
    };

    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        if let Some(long) = token.strip_prefix("--").filter(|s| !s.is_empty()) {
            if let Some((key, value)) = long.split_once('=') {
                builder.set(key, parse_value(value));
            } else if let Some(key) = long.strip_prefix("no-") {
                builder.set(key, Value::Bool(false));
            } else if builder.takes_value(long) {
                let value = tokens
                    .next_if(|next| !next.starts_with('-'))
                    .map_or(Value::Bool(true), |next| parse_value(&next));
                builder.set(long, value);
            } else {
                builder.set(long, Value::Bool(true));
            }
        } else if token.starts_with('-') && token.len() > 1 && !is_negative_number(&token) {
            let flags: Vec<char> = token[1..].chars().collect();
            for (index, flag) in flags.iter().enumerate() {
                let key = flag.to_string();
                let last = index + 1 == flags.len();
                if last && builder.takes_value(&key) {
                    let value = tokens
                        .next_if(|next| !next.starts_with('-'))
                        .map_or(Value::Bool(true), |next| parse_value(&next));
                    builder.set(&key, value);
                } else {
                    builder.set(&key, Value::Bool(true));
                }
            }
        } else {
            builder.line.args.push(token);
        }
    }
    builder.line
}
