//! Schema types for instruction sets, tasks, settings, and run reports.
//!
//! A Task is deliberately kept as an order-preserving field map rather than a
//! closed struct: reference (`$step.field`) and alias (`&name/path`) tokens
//! rewrite arbitrary fields in place, and extensions may carry fields the
//! core never heard of. Kind-specific typing happens at operation build time
//! via [`OpKind`] and per-kind field lookups.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// File suffix for instruction set files on disk.
pub const TASK_FILE_SUFFIX: &str = ".faena.json";

/// Fields every instruction set must carry.
pub const INSTRUCTION_KEYS: [&str; 3] = ["name", "description", "tasks"];

/// Fields every task must carry.
pub const TASK_KEYS: [&str; 3] = ["name", "step", "operation"];

// ============================================================================
// Instruction set / Task
// ============================================================================

/// A named, ordered pipeline of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSet {
    /// Human-readable pipeline name
    pub name: String,

    /// What this pipeline is for
    pub description: String,

    /// Declarative steps, ordered by their `step` field at run time
    pub tasks: Vec<Task>,
}

/// One declarative step: a field map with `name`, `step` and `operation`
/// plus kind-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Task(pub IndexMap<String, Value>);

impl Task {
    /// Task name, empty if the field is missing (validation rejects that).
    pub fn name(&self) -> &str {
        self.get_str("name").unwrap_or("")
    }

    /// Execution order. Steps need not be contiguous or pre-sorted.
    pub fn step(&self) -> i64 {
        self.0.get("step").and_then(Value::as_i64).unwrap_or(0)
    }

    /// Operation kind tag as written in the source.
    pub fn operation(&self) -> &str {
        self.get_str("operation").unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// All fields, in source order.
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.0
    }
}

// ============================================================================
// Operation kinds
// ============================================================================

/// Recognized operation kinds. Anything else is an unknown-operation
/// validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Copy,
    Move,
    Delete,
    Zip,
    Command,
    Echo,
    Input,
    Request,
    Registry,
    Custom,
}

impl OpKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "copy" => Some(Self::Copy),
            "move" => Some(Self::Move),
            "delete" => Some(Self::Delete),
            "zip" => Some(Self::Zip),
            "command" => Some(Self::Command),
            "echo" => Some(Self::Echo),
            "input" => Some(Self::Input),
            "request" => Some(Self::Request),
            "registry" => Some(Self::Registry),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Required fields per kind. A `!` prefix marks the field optional:
    /// absence is tolerated, presence still participates in validation.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Copy => &["target", "origin", "destination", "subfolders"],
            Self::Move => &["target", "origin", "destination"],
            Self::Delete => &["target", "destination"],
            Self::Zip => &["target", "rename", "!deflate", "!destination"],
            Self::Command => &[],
            Self::Echo => &["value"],
            Self::Input => &["question"],
            Self::Request => &["endpoint", "method", "!body", "!headers"],
            Self::Registry => &["start_key", "key", "function", "!value", "!type", "!rename"],
            Self::Custom => &["extension_name"],
        }
    }

    /// Whether the engine must resolve and create the destination directory
    /// before this kind executes.
    pub fn needs_destination_check(self) -> bool {
        match self {
            Self::Copy | Self::Move | Self::Delete | Self::Zip => true,
            Self::Command
            | Self::Echo
            | Self::Input
            | Self::Request
            | Self::Registry
            | Self::Custom => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Zip => "zip",
            Self::Command => "command",
            Self::Echo => "echo",
            Self::Input => "input",
            Self::Request => "request",
            Self::Registry => "registry",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Persisted configuration record, consumed read-only by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Working root prefixed onto relative destination/origin fields
    pub current_location: String,

    /// Root of the faena state directory
    pub default_location: String,

    /// Registered extension descriptors
    #[serde(default)]
    pub extensions: Vec<ExtensionDescriptor>,

    /// Named path aliases for `&alias/...` tokens
    #[serde(default)]
    pub alias: Vec<Alias>,
}

/// One registered extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    /// Summon name, matched against a task's `extension_name`
    pub name: String,

    /// File the extension was installed from (informational)
    #[serde(default)]
    pub file: String,

    /// Install path (informational)
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub version: u32,
}

/// A named path usable as `&name/...` in task fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub path: String,
}

// ============================================================================
// Run reporting
// ============================================================================

/// Outcome of one task, keyed by task name in a [`RunReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub result: bool,
    pub message: String,
}

/// Per-task results in execution order.
pub type RunReport = IndexMap<String, TaskReport>;

/// Explicit engine toggles. These replace process-wide environment flags:
/// the caller decides, the engine only reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Skip the unsupported-OS confirmation prompt
    pub no_warning: bool,

    /// Skip the rollback phase entirely
    pub no_rollback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(value: serde_json::Value) -> Task {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_task_accessors() {
        let t = task(json!({
            "name": "backup",
            "step": 3,
            "operation": "copy",
            "subfolders": true
        }));
        assert_eq!(t.name(), "backup");
        assert_eq!(t.step(), 3);
        assert_eq!(t.operation(), "copy");
        assert_eq!(t.get_bool("subfolders"), Some(true));
        assert!(t.contains("subfolders"));
        assert!(!t.contains("origin"));
    }

    #[test]
    fn test_task_preserves_field_order() {
        let t = task(json!({
            "name": "n",
            "step": 0,
            "operation": "echo",
            "value": "hi"
        }));
        let keys: Vec<_> = t.fields().keys().collect();
        assert_eq!(keys, vec!["name", "step", "operation", "value"]);
    }

    #[test]
    fn test_opkind_parse_known() {
        for tag in [
            "copy", "move", "delete", "zip", "command", "input", "echo", "request", "registry",
            "custom",
        ] {
            let kind = OpKind::parse(tag).unwrap();
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn test_opkind_parse_unknown() {
        assert!(OpKind::parse("teleport").is_none());
        assert!(OpKind::parse("").is_none());
    }

    #[test]
    fn test_opkind_destination_check_map() {
        assert!(OpKind::Copy.needs_destination_check());
        assert!(OpKind::Move.needs_destination_check());
        assert!(OpKind::Delete.needs_destination_check());
        assert!(OpKind::Zip.needs_destination_check());
        assert!(!OpKind::Echo.needs_destination_check());
        assert!(!OpKind::Input.needs_destination_check());
        assert!(!OpKind::Request.needs_destination_check());
        assert!(!OpKind::Registry.needs_destination_check());
        assert!(!OpKind::Custom.needs_destination_check());
    }

    #[test]
    fn test_instruction_set_roundtrip() {
        let set = InstructionSet {
            name: "nightly".to_string(),
            description: "nightly backup".to_string(),
            tasks: vec![task(json!({
                "name": "say",
                "step": 0,
                "operation": "echo",
                "value": "hi"
            }))],
        };
        let text = serde_json::to_string_pretty(&set).unwrap();
        let back: InstructionSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back.name, "nightly");
        assert_eq!(back.tasks.len(), 1);
        assert_eq!(back.tasks[0].get_str("value"), Some("hi"));
    }

    #[test]
    fn test_settings_defaults() {
        let s: Settings = serde_json::from_str(
            r#"{"current_location": "/home/u", "default_location": "/home/u"}"#,
        )
        .unwrap();
        assert!(s.extensions.is_empty());
        assert!(s.alias.is_empty());
    }
}
