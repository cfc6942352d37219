//! File copy. Rollback copies each affected file back from the
//! destination to its origin.

use super::{collect_files, file_name, parse_target, require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;
use std::path::PathBuf;

pub struct CopyOp {
    task: Task,
    // (destination copy, origin file)
    copied: Vec<(PathBuf, PathBuf)>,
    ok: bool,
}

impl CopyOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            copied: Vec::new(),
            ok: true,
        }
    }
}

impl Operation for CopyOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let origin = PathBuf::from(require_str(&self.task, "origin")?);
        let destination = PathBuf::from(require_str(&self.task, "destination")?);
        let selection = parse_target(&require_str(&self.task, "target")?);
        let subfolders = self.task.get_bool("subfolders").unwrap_or(false);

        let files = super::select_files(collect_files(&origin, subfolders)?, &selection);
        for file in files {
            let dest = destination.join(file_name(&file));
            std::fs::copy(&file, &dest)?;
            self.copied.push((dest, file.clone()));
            tracing::debug!(file = %file.display(), "copied");
        }
        Ok(())
    }

    fn rollback(&mut self) {
        for (dest, origin) in self.copied.drain(..) {
            if let Err(e) = std::fs::copy(&dest, &origin) {
                tracing::warn!(file = %origin.display(), error = %e, "rollback could not restore file");
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
