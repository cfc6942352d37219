//! Windows registry access through `reg.exe`. Fails fast with a platform
//! error anywhere else.
//!
//! The `key` field uses `>` as its path separator; for `get` and `set` the
//! last segment names the value inside the parent key. `set` writes the
//! data carried in `value` and captures the previous data so rollback can
//! restore it; `create` adds a subkey named by `value` and rollback
//! deletes it again.

use super::{require_str, Operation};
use crate::core::error::{Error, Result};
use crate::core::types::Task;
use std::process::Command;

/// Root key names accepted in `start_key`.
const ROOTS: [(&str, &str); 5] = [
    ("classes-root", "HKCR"),
    ("current-user", "HKCU"),
    ("current-config", "HKCC"),
    ("local-machine", "HKLM"),
    ("users", "HKU"),
];

/// Value type names accepted in `type`.
const VALUE_TYPES: [(&str, &str); 6] = [
    ("sz", "REG_SZ"),
    ("multisz", "REG_MULTI_SZ"),
    ("none", "REG_NONE"),
    ("binary", "REG_BINARY"),
    ("dword", "REG_DWORD"),
    ("qword", "REG_QWORD"),
];

enum Undo {
    RestoreValue {
        key_path: String,
        value_name: String,
        kind: String,
        data: String,
    },
    DeleteKey {
        key_path: String,
    },
}

pub struct RegistryOp {
    task: Task,
    undo: Option<Undo>,
    ok: bool,
}

impl RegistryOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            undo: None,
            ok: true,
        }
    }

    fn root(&self) -> Result<&'static str> {
        let start = require_str(&self.task, "start_key")?;
        ROOTS
            .iter()
            .find(|(name, _)| *name == start)
            .map(|(_, hive)| *hive)
            .ok_or_else(|| Error::Execution(format!("'{start}' is not a registry root")))
    }

    /// Full `reg.exe` key path: root hive plus every `>` segment of `key`.
    fn key_path(&self) -> Result<String> {
        let key = require_str(&self.task, "key")?.replace('>', "\\");
        Ok(format!("{}\\{key}", self.root()?))
    }

    /// Key path split for value access: parent key plus the last segment
    /// of `key` as the value name.
    fn value_path(&self) -> Result<(String, String)> {
        let key = require_str(&self.task, "key")?;
        let (parent, value_name) = key.rsplit_once('>').ok_or_else(|| {
            Error::Execution(format!("'{key}' does not name a value inside a key"))
        })?;
        let parent = parent.replace('>', "\\");
        Ok((format!("{}\\{parent}", self.root()?), value_name.to_string()))
    }

    fn value_type(&self) -> Result<String> {
        let kind = self.task.get_str("type").unwrap_or("sz");
        VALUE_TYPES
            .iter()
            .find(|(name, _)| *name == kind)
            .map(|(_, reg)| (*reg).to_string())
            .ok_or_else(|| Error::Execution(format!("'{kind}' is not a registry value type")))
    }

    fn query_value(key_path: &str, value_name: &str) -> Result<String> {
        let output = Command::new("reg.exe")
            .args(["query", key_path, "/v", value_name])
            .output()?;
        if !output.status.success() {
            return Err(Error::Execution(format!(
                "registry query of '{key_path}' failed"
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        // Last whitespace-separated column of the matching line is the data.
        text.lines()
            .find(|line| line.trim_start().starts_with(value_name))
            .and_then(|line| line.split_whitespace().last())
            .map(str::to_string)
            .ok_or_else(|| Error::Execution(format!("'{value_name}' was not found in '{key_path}'")))
    }

    fn set_value(key_path: &str, value_name: &str, kind: &str, data: &str) -> Result<()> {
        let output = Command::new("reg.exe")
            .args(["add", key_path, "/v", value_name, "/t", kind, "/d", data, "/f"])
            .output()?;
        if !output.status.success() {
            return Err(Error::Execution(format!(
                "registry write to '{key_path}' failed"
            )));
        }
        Ok(())
    }

    fn create_key(key_path: &str) -> Result<()> {
        let output = Command::new("reg.exe").args(["add", key_path, "/f"]).output()?;
        if !output.status.success() {
            return Err(Error::Execution(format!(
                "registry key '{key_path}' could not be created"
            )));
        }
        Ok(())
    }

    fn delete_key(key_path: &str) -> Result<()> {
        let output = Command::new("reg.exe")
            .args(["delete", key_path, "/f"])
            .output()?;
        if !output.status.success() {
            return Err(Error::Execution(format!(
                "registry key '{key_path}' could not be deleted"
            )));
        }
        Ok(())
    }
}

impl Operation for RegistryOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        if !cfg!(windows) {
            return Err(Error::Platform {
                operation: "registry".to_string(),
                os: std::env::consts::OS.to_string(),
            });
        }
        let function = require_str(&self.task, "function")?;
        match function.as_str() {
            "get" => {
                let (key_path, value_name) = self.value_path()?;
                let data = Self::query_value(&key_path, &value_name)?;
                tracing::info!(key = %key_path, value = %value_name, data = %data, "registry value");
                Ok(())
            }
            "set" => {
                let (key_path, value_name) = self.value_path()?;
                let kind = self.value_type()?;
                let data = require_str(&self.task, "value")?;
                if let Ok(previous) = Self::query_value(&key_path, &value_name) {
                    self.undo = Some(Undo::RestoreValue {
                        key_path: key_path.clone(),
                        value_name: value_name.clone(),
                        kind: kind.clone(),
                        data: previous,
                    });
                }
                Self::set_value(&key_path, &value_name, &kind, &data)
            }
            "create" => {
                let subkey = require_str(&self.task, "value")?;
                let key_path = format!("{}\\{subkey}", self.key_path()?);
                Self::create_key(&key_path)?;
                self.undo = Some(Undo::DeleteKey { key_path });
                Ok(())
            }
            other => Err(Error::Execution(format!(
                "'{other}' is not a registry function"
            ))),
        }
    }

    fn rollback(&mut self) {
        let result = match self.undo.take() {
            None => {
                tracing::warn!(task = %self.task.name(), "nothing recorded to restore");
                return;
            }
            Some(Undo::RestoreValue {
                key_path,
                value_name,
                kind,
                data,
            }) => Self::set_value(&key_path, &value_name, &kind, &data),
            Some(Undo::DeleteKey { key_path }) => Self::delete_key(&key_path),
        };
        if let Err(e) = result {
            tracing::warn!(task = %self.task.name(), error = %e, "rollback could not restore registry state");
        }
    }

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_task(start_key: &str, function: &str) -> Task {
        serde_json::from_value(json!({
            "name": "touch registry", "step": 0, "operation": "registry",
            "start_key": start_key, "key": "Software>Faena>Version",
            "function": function, "value": "2"
        }))
        .unwrap()
    }

    #[test]
    fn test_key_path_translation() {
        let op = RegistryOp::new(registry_task("current-user", "create"));
        assert_eq!(op.key_path().unwrap(), "HKCU\\Software\\Faena\\Version");
    }

    #[test]
    fn test_value_path_splits_last_segment() {
        let op = RegistryOp::new(registry_task("local-machine", "get"));
        let (key_path, value_name) = op.value_path().unwrap();
        assert_eq!(key_path, "HKLM\\Software\\Faena");
        assert_eq!(value_name, "Version");
    }

    #[test]
    fn test_unknown_root_rejected() {
        let op = RegistryOp::new(registry_task("global-machine", "get"));
        assert!(op.key_path().is_err());
    }

    #[test]
    fn test_value_type_mapping() {
        let mut task = registry_task("current-user", "set");
        task.set("type", json!("dword"));
        let op = RegistryOp::new(task);
        assert_eq!(op.value_type().unwrap(), "REG_DWORD");

        let op = RegistryOp::new(registry_task("current-user", "set"));
        assert_eq!(op.value_type().unwrap(), "REG_SZ");

        let mut task = registry_task("current-user", "set");
        task.set("type", json!("float"));
        assert!(RegistryOp::new(task).value_type().is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_platform_gate_off_windows() {
        let mut op = RegistryOp::new(registry_task("current-user", "get"));
        let err = op.execute().unwrap_err();
        assert!(matches!(err, Error::Platform { .. }));
    }
}
