//! `{name}` placeholder substitution in step commands.
//!
//! Only `{name}` where `name` is a valid variable name is a placeholder, so
//! shell syntax such as `${HOME}` or `awk '{print $1}'` passes through
//! untouched. `{{` and `}}` produce literal braces.
//!
//! Values are shell-quoted when substituted into a command; `{name:raw}`
//! inserts the value as-is. Secret values never appear in the command text:
//! the placeholder becomes a reference to an environment variable that the
//! runner exports (see [`secret_env_name`]).

use indexmap::IndexMap;

use crate::error::{PlanError, Result};

const RAW_SUFFIX: &str = ":raw";
const SECRET_ENV_PREFIX: &str = "RELEASETX_SECRET_";
const MASK: &str = "********";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Plain(String),
    Secret(String),
}

impl Value {
    fn as_str(&self) -> &str {
        match self {
            Self::Plain(v) | Self::Secret(v) => v,
        }
    }
}

/// Variables available to step templates, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: IndexMap<String, Value>,
}

impl Vars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidVariableName`] if `name` could never be
    /// referenced from a template.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.set(name.into(), Value::Plain(value.into()))
    }

    /// Set `name` to a value that must never be written into a command or a
    /// log line.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn insert_secret(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.set(name.into(), Value::Secret(value.into()))
    }

    fn set(&mut self, name: String, value: Value) -> Result<()> {
        if !is_variable_name(&name) {
            return Err(PlanError::InvalidVariableName { name });
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Copy every variable of `other` into `self`, `other` winning on conflict.
    pub fn extend(&mut self, other: &Vars) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(Value::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn is_secret(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Secret(_)))
    }

    /// Environment variables a runner must export for secret placeholders.
    pub fn secret_env(&self) -> impl Iterator<Item = (String, &str)> {
        self.values.iter().filter_map(|(name, value)| match value {
            Value::Secret(v) => Some((secret_env_name(name), v.as_str())),
            Value::Plain(_) => None,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Name of the environment variable carrying the secret `name`.
#[must_use]
pub fn secret_env_name(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    format!("{SECRET_ENV_PREFIX}{suffix}")
}

pub(crate) fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

enum Piece<'a> {
    Literal(&'a str),
    Placeholder {
        name: &'a str,
        raw: bool,
        text: &'a str,
    },
}

fn parse_placeholder(inner: &str) -> Option<(&str, bool)> {
    match inner.strip_suffix(RAW_SUFFIX) {
        Some(name) if is_variable_name(name) => Some((name, true)),
        _ if is_variable_name(inner) => Some((inner, false)),
        _ => None,
    }
}

fn pieces(template: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let bytes = template.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                pieces.push(Piece::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'{' if i == 0 || bytes[i - 1] != b'$' => {
                let rest = &template[i + 1..];
                let found = rest
                    .find('}')
                    .and_then(|end| parse_placeholder(&rest[..end]).map(|p| (end, p)));
                match found {
                    Some((end, (name, raw))) => {
                        pieces.push(Piece::Literal(&template[literal_start..i]));
                        pieces.push(Piece::Placeholder {
                            name,
                            raw,
                            text: &template[i..i + end + 2],
                        });
                        i += end + 2;
                        literal_start = i;
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    pieces.push(Piece::Literal(&template[literal_start..]));
    pieces
}

/// Names referenced by `template`, in order of appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    pieces(template)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Placeholder { name, .. } => Some(name),
            Piece::Literal(_) => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Text handed to the shell.
    Command,
    /// Text shown to the operator.
    Display,
}

/// Substitute every placeholder in the command `template`.
///
/// # Errors
///
/// Returns [`PlanError::UnknownVariable`] for a placeholder with no value and
/// [`PlanError::Unquotable`] for a value the shell cannot receive.
pub fn render(template: &str, vars: &Vars) -> Result<String> {
    expand(template, vars, Mode::Command, &[])
}

/// Substitute every placeholder in a message shown to the operator.
///
/// Values are inserted unquoted and secrets are masked.
///
/// # Errors
///
/// Returns [`PlanError::UnknownVariable`] for a placeholder with no value.
pub fn render_text(template: &str, vars: &Vars) -> Result<String> {
    expand(template, vars, Mode::Display, &[])
}

/// Substitute what is known so far; placeholders named in `pending` are kept
/// as written.
pub(crate) fn expand(
    template: &str,
    vars: &Vars,
    mode: Mode,
    pending: &[String],
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    for piece in pieces(template) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Placeholder { name, raw, text } => match vars.values.get(name) {
                Some(value) => out.push_str(&substitute(name, value, raw, mode)?),
                None if pending.iter().any(|p| p == name) => out.push_str(text),
                None => {
                    return Err(PlanError::UnknownVariable {
                        name: name.to_string(),
                        template: template.to_string(),
                    });
                }
            },
        }
    }
    Ok(out)
}

fn substitute(name: &str, value: &Value, raw: bool, mode: Mode) -> Result<String> {
    Ok(match (value, mode) {
        (Value::Secret(_), Mode::Display) => MASK.to_string(),
        (Value::Plain(v), Mode::Display) => v.clone(),
        (Value::Secret(_), Mode::Command) if raw => format!("${{{}}}", secret_env_name(name)),
        (Value::Secret(_), Mode::Command) => format!("\"${{{}}}\"", secret_env_name(name)),
        (Value::Plain(v), Mode::Command) if raw => v.clone(),
        (Value::Plain(v), Mode::Command) => shlex::try_quote(v)
            .map_err(|_| PlanError::Unquotable {
                name: name.to_string(),
            })?
            .into_owned(),
    })
}
