//! Variable resolution and command templating
//!
//! A task's required variables are its own plus the project's globals,
//! with task-local definitions taking precedence. Each one resolves to its
//! override (when non-empty) or its default.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::UndefinedVariable;
use crate::project::{Task, Variable};

/// Concrete values for a task run, in declaration order
pub type ResolvedVariables = IndexMap<String, String>;

/// Matches `{{`, `}}` or a `{name}` placeholder
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_\-]*)\}").expect("placeholder pattern is valid")
});

/// Resolve every variable a task requires.
///
/// Aborts at the first variable that has neither a non-empty override
/// nor a default; no partial result is returned.
pub fn resolve(
    task: &Task,
    overrides: &IndexMap<String, String>,
    globals: &IndexMap<String, Variable>,
) -> Result<ResolvedVariables, UndefinedVariable> {
    let mut required: IndexMap<&str, &Variable> = globals
        .iter()
        .map(|(name, variable)| (name.as_str(), variable))
        .collect();
    for (name, variable) in &task.variables {
        required.insert(name.as_str(), variable);
    }

    let mut values = ResolvedVariables::with_capacity(required.len());
    for (name, variable) in required {
        let value = overrides
            .get(name)
            .filter(|value| !value.is_empty())
            .or(variable.default.as_ref())
            .ok_or_else(|| UndefinedVariable {
                name: name.to_string(),
            })?;
        values.insert(name.to_string(), value.clone());
    }

    Ok(values)
}

/// Substitute `{name}` placeholders in a command template.
///
/// `{{` and `}}` render as literal braces. Any placeholder without a
/// resolved value fails, even if the task never declared it.
pub fn render(template: &str, values: &ResolvedVariables) -> Result<String, UndefinedVariable> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        rendered.push_str(&template[last..whole.start]);
        last = whole.end;

        match caps.get(1) {
            Some(name) => {
                let value = values.get(name.as_str()).ok_or_else(|| UndefinedVariable {
                    name: name.as_str().to_string(),
                })?;
                rendered.push_str(value);
            }
            None => rendered.push_str(&template[whole.start..whole.start + 1]),
        }
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

/// Parse a `NAME=VALUE` override. The value may itself contain `=`; a bare
/// `NAME` yields an empty value.
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (name, value) = input.split_once('=').unwrap_or((input, ""));
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", input));
    }
    Ok((name.to_string(), value.to_string()))
}
