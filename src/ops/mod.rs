//! Operation implementations, one module per kind.
//!
//! An operation wraps its already-resolved task, records the resources it
//! touched, and carries a fault flag: `true` means succeeded or never ran,
//! `false` means the engine's execution guard marked it failed. Rollback is
//! self-only: an operation undoes its own recorded effects and nothing else.

use crate::core::error::{Error, Result};
use crate::core::types::{OpKind, Task};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod archive;
pub mod command;
pub mod copy;
pub mod delete;
pub mod echo;
pub mod input;
pub mod registry;
pub mod relocate;
pub mod request;

/// Polymorphic unit of work.
pub trait Operation {
    /// The resolved task this operation was built from.
    fn task(&self) -> &Task;

    /// Perform the work. Any error fails this task only.
    fn execute(&mut self) -> Result<()>;

    /// Undo this operation's own recorded effects. Best effort; failures
    /// are logged by implementations, never raised.
    fn rollback(&mut self);

    /// Fault flag: `true` until the engine marks this operation failed.
    fn state(&self) -> bool;

    fn set_state(&mut self, ok: bool);

    /// Values computed during execute, overlaid over the task's fields when
    /// a later step references this one.
    fn captured(&self) -> IndexMap<String, Value> {
        IndexMap::new()
    }
}

/// Build the operation for a recognized non-custom kind.
pub fn build(kind: OpKind, task: Task) -> Result<Box<dyn Operation>> {
    Ok(match kind {
        OpKind::Copy => Box::new(copy::CopyOp::new(task)),
        OpKind::Move => Box::new(relocate::MoveOp::new(task)),
        OpKind::Delete => Box::new(delete::DeleteOp::new(task)),
        OpKind::Zip => Box::new(archive::ZipOp::new(task)),
        OpKind::Command => Box::new(command::CommandOp::new(task)),
        OpKind::Echo => Box::new(echo::EchoOp::new(task)),
        OpKind::Input => Box::new(input::InputOp::new(task)),
        OpKind::Request => Box::new(request::RequestOp::new(task)),
        OpKind::Registry => Box::new(registry::RegistryOp::new(task)),
        OpKind::Custom => {
            return Err(Error::Execution(
                "custom operations are built through the extension catalog".to_string(),
            ))
        }
    })
}

// ============================================================================
// Target selection
// ============================================================================

/// How a `target` field selects files in the origin scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelection {
    /// `*`: every file in scope.
    All,
    /// `*.ext` (or any other pattern containing `*`): files whose name ends
    /// with the extension after the pattern's last `.`.
    Extension(String),
    /// Anything else: exactly one file by name.
    Exact(String),
}

/// Interpret a `target` field value.
pub fn parse_target(target: &str) -> TargetSelection {
    if target == "*" {
        TargetSelection::All
    } else if target.contains('*') {
        let extension = target
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();
        TargetSelection::Extension(extension)
    } else {
        TargetSelection::Exact(target.to_string())
    }
}

/// Collect candidate files under `root`, walking subdirectories when asked.
pub fn collect_files(root: &Path, subfolders: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if subfolders {
                    dirs.push(path);
                }
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Keep the files the target selection matches.
pub fn select_files(files: Vec<PathBuf>, selection: &TargetSelection) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|path| match selection {
            TargetSelection::All => true,
            TargetSelection::Extension(ext) => path
                .extension()
                .is_some_and(|e| e.to_string_lossy() == ext.as_str()),
            TargetSelection::Exact(name) => file_name(path) == name.as_str(),
        })
        .collect()
}

/// Final path component as text.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Fetch a required string field, failing the task when it is missing.
pub fn require_str(task: &Task, key: &str) -> Result<String> {
    task.get_str(key)
        .map(str::to_string)
        .ok_or_else(|| Error::Execution(format!("'{key}' is missing or not a string")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_variants() {
        assert_eq!(parse_target("*"), TargetSelection::All);
        assert_eq!(
            parse_target("*.txt"),
            TargetSelection::Extension("txt".to_string())
        );
        assert_eq!(
            parse_target("notes.md"),
            TargetSelection::Exact("notes.md".to_string())
        );
    }

    #[test]
    fn test_collect_is_non_recursive_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

        let flat = collect_files(dir.path(), false).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(file_name(&flat[0]), "a.txt");

        let deep = collect_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_extension_selection() {
        let files = vec![
            PathBuf::from("/x/a.txt"),
            PathBuf::from("/x/b.log"),
            PathBuf::from("/x/c.txt"),
        ];
        let selected = select_files(files, &TargetSelection::Extension("txt".to_string()));
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_exact_selection() {
        let files = vec![PathBuf::from("/x/a.txt"), PathBuf::from("/x/b.txt")];
        let selected = select_files(files, &TargetSelection::Exact("b.txt".to_string()));
        assert_eq!(selected, vec![PathBuf::from("/x/b.txt")]);
    }
}
