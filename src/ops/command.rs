//! Reserved shell-command kind. Validation accepts it so existing sets keep
//! loading, but execution always fails.

use super::Operation;
use crate::core::error::{Error, Result};
use crate::core::types::Task;

pub struct CommandOp {
    task: Task,
    ok: bool,
}

impl CommandOp {
    pub fn new(task: Task) -> Self {
        Self { task, ok: true }
    }
}

impl Operation for CommandOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        Err(Error::Execution(
            "'command' operations are not implemented".to_string(),
        ))
    }

    fn rollback(&mut self) {}

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }
}
