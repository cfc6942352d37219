//! Reference and alias token resolution.
//!
//! Rewrites `$step[.field]` and `&alias/path` tokens inside a task's fields
//! in place, right before the task's operation is built. Step lookup is
//! injected as a closure so this module stays a leaf: the engine owns the
//! executed-tasks log and decides what a step number resolves to.

use super::error::{Error, Result};
use super::types::{Alias, Task};
use indexmap::IndexMap;
use serde_json::Value;

/// Fields never subject to resolution.
const STRUCTURAL_FIELDS: [&str; 3] = ["name", "step", "operation"];

/// A parsed `$step[.field]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepToken {
    pub step: i64,
    pub field: Option<String>,
}

/// Parse a `$N` or `$N.field` token. Returns None for anything else.
pub fn step_token(value: &str) -> Option<StepToken> {
    let rest = value.strip_prefix('$')?;
    let (number, field) = match rest.split_once('.') {
        Some((n, f)) => (n, Some(f.to_string())),
        None => (rest, None),
    };
    let step = number.parse().ok()?;
    Some(StepToken { step, field })
}

/// Resolve every `$step[.field]` token in a task's non-structural string
/// fields, replacing each with the looked-up value.
///
/// `lookup` maps a step number to the fields of that step as the engine
/// recorded them (captured fields already overlaid). A token without a
/// `.field` part resolves to the referenced task's field of the same name
/// as the one being rewritten.
pub fn resolve_references(
    task: &mut Task,
    mut lookup: impl FnMut(i64) -> Result<IndexMap<String, Value>>,
) -> Result<()> {
    let requester = task.name().to_string();
    let pending: Vec<(String, StepToken)> = task
        .fields()
        .iter()
        .filter(|(key, _)| !STRUCTURAL_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let token = value.as_str().and_then(step_token)?;
            Some((key.clone(), token))
        })
        .collect();
    for (key, token) in pending {
        let fields = lookup(token.step)?;
        let field = token.field.as_deref().unwrap_or(&key);
        let resolved = fields.get(field).cloned().ok_or_else(|| Error::Reference {
            task: requester.clone(),
        })?;
        task.set(&key, resolved);
    }
    Ok(())
}

/// Resolve every `&alias/path` token in a task's non-structural string
/// fields against the configured aliases. An unknown alias name falls back
/// to the home directory, keeping only the segments after the name.
pub fn resolve_aliases(task: &mut Task, aliases: &[Alias]) {
    let pending: Vec<(String, String)> = task
        .fields()
        .iter()
        .filter(|(key, _)| !STRUCTURAL_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let text = value.as_str()?;
            text.starts_with('&').then(|| (key.clone(), text.to_string()))
        })
        .collect();
    for (key, text) in pending {
        let resolved = resolve_alias_path(&text, aliases);
        task.set(&key, Value::String(resolved));
    }
}

/// Expand one `&name/rest` value into a concrete path.
pub fn resolve_alias_path(value: &str, aliases: &[Alias]) -> String {
    let token = value.trim_start_matches('&');
    let (name, rest) = match token.split_once('/') {
        Some((n, r)) => (n, r),
        None => (token, ""),
    };
    let base = aliases
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.path.clone())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        });
    if rest.is_empty() {
        base
    } else {
        format!("{}/{rest}", base.trim_end_matches('/'))
    }
}
