//! Minimal text template engine used for email bodies and webhook payloads.
//!
//! A template is literal text with `{{ ... }}` actions. An action is a field
//! path, optionally preceded by a function name:
//!
//! - `{{ .Package.name }}` prints the value (strings verbatim, numbers and
//!   booleans as JSON literals, null as nothing)
//! - `{{ list .Package.changes }}` prints a string list as `"a", "b"`
//! - `{{ json .Event }}` prints any value as JSON
//! - `{{ html .Repository.name }}` prints a value HTML-escaped; string lists
//!   print one escaped item per line
//!
//! User supplied webhook templates are parsed on every delivery, so parse and
//! execution errors are reported as values and never panic.

use serde_json::Value;
use thiserror::Error;

/// Template parse or execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed action at offset {0}")]
    UnclosedAction(usize),

    #[error("empty action at offset {0}")]
    EmptyAction(usize),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("malformed action '{0}'")]
    MalformedAction(String),

    #[error("malformed field path '{0}'")]
    MalformedPath(String),

    #[error("no value at '{0}'")]
    MissingValue(String),

    #[error("'{0}' is not a list of strings")]
    NotAStringList(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Print,
    List,
    Json,
    Html,
}

impl Function {
    fn parse(name: &str) -> Result<Self, TemplateError> {
        match name {
            "list" => Ok(Function::List),
            "json" => Ok(Function::Json),
            "html" => Ok(Function::Html),
            other => Err(TemplateError::UnknownFunction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Action {
        function: Function,
        /// Path as written, kept for error messages.
        raw_path: String,
        fields: Vec<String>,
    },
}

/// A parsed template, reusable across renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::UnclosedAction(offset + start))?;
            segments.push(Self::parse_action(&after_open[..end], offset + start)?);

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    fn parse_action(body: &str, offset: usize) -> Result<Segment, TemplateError> {
        let tokens: Vec<&str> = body.split_whitespace().collect();
        let (function, raw_path) = match tokens.as_slice() {
            [] => return Err(TemplateError::EmptyAction(offset)),
            [path] => (Function::Print, *path),
            [name, path] => (Function::parse(name)?, *path),
            _ => return Err(TemplateError::MalformedAction(body.trim().to_string())),
        };
        let fields = parse_path(raw_path)?;

        Ok(Segment::Action {
            function,
            raw_path: raw_path.to_string(),
            fields,
        })
    }

    /// Execute the template against `data`.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Action {
                    function,
                    raw_path,
                    fields,
                } => {
                    let value = lookup(data, fields)
                        .ok_or_else(|| TemplateError::MissingValue(raw_path.clone()))?;
                    match function {
                        Function::Print => out.push_str(&print(value)),
                        Function::Json => out.push_str(&value.to_string()),
                        Function::Html => out.push_str(&html(value)),
                        Function::List => out.push_str(&string_list(value, raw_path)?),
                    }
                }
            }
        }

        Ok(out)
    }
}

/// `.` is the whole data value; `.A.b` walks object keys.
fn parse_path(raw: &str) -> Result<Vec<String>, TemplateError> {
    let malformed = || TemplateError::MalformedPath(raw.to_string());

    let rest = raw.strip_prefix('.').ok_or_else(malformed)?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split('.')
        .map(|field| {
            let valid = !field.is_empty()
                && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if valid {
                Ok(field.to_string())
            } else {
                Err(malformed())
            }
        })
        .collect()
}

fn lookup<'a>(data: &'a Value, fields: &[String]) -> Option<&'a Value> {
    fields
        .iter()
        .try_fold(data, |value, field| value.as_object()?.get(field))
}

fn print(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn html(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| escape_html(&print(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => escape_html(&print(other)),
    }
}

fn string_list(value: &Value, raw_path: &str) -> Result<String, TemplateError> {
    let not_a_list = || TemplateError::NotAStringList(raw_path.to_string());

    let items = match value {
        Value::Array(items) => items,
        // A missing list renders as an empty one
        Value::Null => return Ok(String::new()),
        _ => return Err(not_a_list()),
    };

    let quoted = items
        .iter()
        .map(|item| match item {
            Value::String(_) => Ok(item.to_string()),
            _ => Err(not_a_list()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(quoted.join(", "))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
