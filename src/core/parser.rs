//! Instruction set loading, validation and normalization.
//!
//! Validation is strict and total: every violation is checked before any
//! task runs, and each one names the offending key, its scope (the set
//! definition or a task by name), and the kind of violation. Parsing goes
//! through a raw JSON value first so a file missing top-level keys yields a
//! structured validation error instead of a deserializer message.

use super::error::{Error, Result};
use super::types::{InstructionSet, OpKind, INSTRUCTION_KEYS, TASK_FILE_SUFFIX, TASK_KEYS};
use serde_json::Value;
use std::path::Path;

/// Load an instruction set by logical name from the tasks directory.
pub fn load_instruction_set(tasks_dir: &Path, name: &str) -> Result<InstructionSet> {
    let path = tasks_dir.join(format!("{name}{TASK_FILE_SUFFIX}"));
    if !path.is_file() {
        return Err(Error::NotFound(name.to_string()));
    }
    let content = std::fs::read_to_string(&path)?;
    parse_instruction_set(&content)
}

/// Parse and shape-check an instruction set from JSON text. Optional-field
/// markers are resolved away here, so loaded sets never carry them.
pub fn parse_instruction_set(text: &str) -> Result<InstructionSet> {
    let raw: Value = serde_json::from_str(text)?;
    let object = raw
        .as_object()
        .ok_or_else(|| Error::Validation {
            key: "definition".to_string(),
            scope: "Definition".to_string(),
        })?;
    for key in INSTRUCTION_KEYS {
        if !object.contains_key(key) {
            return Err(Error::Validation {
                key: key.to_string(),
                scope: "Definition".to_string(),
            });
        }
    }
    let mut set: InstructionSet = serde_json::from_value(raw)?;
    validate_set(&set)?;
    normalize_optional_fields(&mut set);
    Ok(set)
}

/// Validate every task of an already-parsed set.
///
/// Required fields marked optional with a `!` prefix in the kind table pass
/// the check whether the task spells them with or without the marker.
pub fn validate_set(set: &InstructionSet) -> Result<()> {
    for task in &set.tasks {
        for key in TASK_KEYS {
            if !task.contains(key) {
                return Err(Error::Validation {
                    key: key.to_string(),
                    scope: format!("\"{}\" Task", task.name()),
                });
            }
        }
        let kind = OpKind::parse(task.operation()).ok_or_else(|| Error::UnknownOperation {
            operation: task.operation().to_string(),
            task: task.name().to_string(),
        })?;
        for required in kind.required_fields() {
            let optional = required.starts_with('!');
            let bare = required.trim_start_matches('!');
            if !task.contains(required) && !task.contains(bare) && !optional {
                return Err(Error::Validation {
                    key: (*required).to_string(),
                    scope: format!("\"{}\" Task", task.name()),
                });
            }
        }
    }
    Ok(())
}

/// Strip `!` optional-field markers in place: `!deflate` becomes `deflate`.
///
/// Field order is preserved so the set still round-trips in source order.
pub fn normalize_optional_fields(set: &mut InstructionSet) {
    for task in &mut set.tasks {
        let marked: Vec<String> = task
            .fields()
            .keys()
            .filter(|k| k.starts_with('!'))
            .cloned()
            .collect();
        for key in marked {
            if let Some(index) = task.0.get_index_of(&key) {
                let (_, value) = task.0.shift_remove_index(index).unwrap_or_default();
                let bare = key.trim_start_matches('!').to_string();
                task.0.shift_insert(index, bare, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_with_tasks(tasks: Value) -> String {
        json!({
            "name": "suite",
            "description": "test suite",
            "tasks": tasks
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_set() {
        let text = set_with_tasks(json!([
            {"name": "say", "step": 0, "operation": "echo", "value": "hi"}
        ]));
        let set = parse_instruction_set(&text).unwrap();
        assert_eq!(set.name, "suite");
        assert_eq!(set.tasks.len(), 1);
    }

    #[test]
    fn test_missing_description_is_definition_scoped() {
        let err = parse_instruction_set(r#"{"name": "x", "tasks": []}"#).unwrap_err();
        match err {
            Error::Validation { key, scope } => {
                assert_eq!(key, "description");
                assert_eq!(scope, "Definition");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_missing_task_key_names_the_task() {
        let text = set_with_tasks(json!([
            {"name": "orphan", "operation": "echo", "value": "hi"}
        ]));
        let err = parse_instruction_set(&text).unwrap_err();
        match err {
            Error::Validation { key, scope } => {
                assert_eq!(key, "step");
                assert_eq!(scope, "\"orphan\" Task");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let text = set_with_tasks(json!([
            {"name": "weird", "step": 0, "operation": "teleport"}
        ]));
        let err = parse_instruction_set(&text).unwrap_err();
        assert!(matches!(err, Error::UnknownOperation { .. }));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let text = set_with_tasks(json!([
            {"name": "half copy", "step": 0, "operation": "copy",
             "target": "*", "destination": "/tmp/out", "subfolders": false}
        ]));
        let err = parse_instruction_set(&text).unwrap_err();
        match err {
            Error::Validation { key, scope } => {
                assert_eq!(key, "origin");
                assert_eq!(scope, "\"half copy\" Task");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let text = set_with_tasks(json!([
            {"name": "pack", "step": 0, "operation": "zip",
             "target": "*", "rename": "backup", "destination": "/tmp/out"}
        ]));
        assert!(parse_instruction_set(&text).is_ok());
    }

    #[test]
    fn test_optional_field_with_marker_satisfies_requirement() {
        let text = set_with_tasks(json!([
            {"name": "pack", "step": 0, "operation": "zip",
             "target": "*", "rename": "backup", "!deflate": true,
             "!destination": "/tmp/out"}
        ]));
        assert!(parse_instruction_set(&text).is_ok());
    }

    #[test]
    fn test_normalize_strips_markers_in_place() {
        let mut set: InstructionSet = serde_json::from_value(json!({
            "name": "suite",
            "description": "test suite",
            "tasks": [
                {"name": "pack", "step": 0, "operation": "zip",
                 "target": "*", "rename": "backup", "!deflate": true}
            ]
        }))
        .unwrap();
        normalize_optional_fields(&mut set);
        let task = &set.tasks[0];
        assert!(!task.contains("!deflate"));
        assert_eq!(task.get_bool("deflate"), Some(true));
        let keys: Vec<_> = task.fields().keys().collect();
        assert_eq!(
            keys,
            vec!["name", "step", "operation", "target", "rename", "deflate"]
        );
    }

    #[test]
    fn test_parse_resolves_markers_on_load() {
        let text = set_with_tasks(json!([
            {"name": "pack", "step": 0, "operation": "zip",
             "target": "*", "rename": "backup", "!deflate": true}
        ]));
        let set = parse_instruction_set(&text).unwrap();
        assert!(!set.tasks[0].contains("!deflate"));
        assert_eq!(set.tasks[0].get_bool("deflate"), Some(true));
    }

    #[test]
    fn test_load_unknown_set_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_instruction_set(dir.path(), "ghost").unwrap_err();
        match err {
            Error::NotFound(name) => assert_eq!(name, "ghost"),
            other => panic!("expected not-found, got {other}"),
        }
    }

    #[test]
    fn test_load_by_name_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let text = set_with_tasks(json!([
            {"name": "say", "step": 0, "operation": "echo", "value": "hi"}
        ]));
        std::fs::write(dir.path().join(format!("nightly{TASK_FILE_SUFFIX}")), text).unwrap();
        let set = load_instruction_set(dir.path(), "nightly").unwrap();
        assert_eq!(set.name, "suite");
    }
}
