//! File deletion. Irrecoverable: rollback only warns.

use super::{collect_files, parse_target, require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;
use std::path::PathBuf;

pub struct DeleteOp {
    task: Task,
    removed: Vec<PathBuf>,
    ok: bool,
}

impl DeleteOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            removed: Vec::new(),
            ok: true,
        }
    }

    /// Paths removed during execute.
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }
}

impl Operation for DeleteOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let destination = PathBuf::from(require_str(&self.task, "destination")?);
        let selection = parse_target(&require_str(&self.task, "target")?);

        let files = super::select_files(collect_files(&destination, false)?, &selection);
        for file in files {
            std::fs::remove_file(&file)?;
            tracing::debug!(file = %file.display(), "deleted");
            self.removed.push(file);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        tracing::warn!(task = %self.task.name(), "delete has no rollback support");
    }

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }
}
