//! File move with move-back rollback.

use super::{collect_files, file_name, parse_target, require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;
use std::path::{Path, PathBuf};

pub struct MoveOp {
    task: Task,
    // (new location, original location)
    moved: Vec<(PathBuf, PathBuf)>,
    ok: bool,
}

impl MoveOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            moved: Vec::new(),
            ok: true,
        }
    }
}

/// Rename, falling back to copy-and-remove across filesystems.
fn relocate(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

impl Operation for MoveOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let origin = PathBuf::from(require_str(&self.task, "origin")?);
        let destination = PathBuf::from(require_str(&self.task, "destination")?);
        let selection = parse_target(&require_str(&self.task, "target")?);

        let files = super::select_files(collect_files(&origin, false)?, &selection);
        for file in files {
            let dest = destination.join(file_name(&file));
            relocate(&file, &dest)?;
            self.moved.push((dest, file));
        }
        Ok(())
    }

    fn rollback(&mut self) {
        for (current, original) in self.moved.drain(..) {
            if let Err(e) = relocate(&current, &original) {
                tracing::warn!(file = %current.display(), error = %e, "rollback could not move file back");
            }
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

    #[test]
    fn test_move_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("in");
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(origin.join("a.txt"), "a").unwrap();

        let task: Task = serde_json::from_value(json!({
            "name": "relocate", "step": 0, "operation": "move",
            "target": "a.txt",
            "origin": origin.to_str().unwrap(),
            "destination": dest.to_str().unwrap()
        }))
        .unwrap();

        let mut op = MoveOp::new(task);
        op.execute().unwrap();
        assert!(!origin.join("a.txt").exists());
        assert!(dest.join("a.txt").exists());

        op.rollback();
        assert!(origin.join("a.txt").exists());
        assert!(!dest.join("a.txt").exists());
    }
}
