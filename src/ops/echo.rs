//! Echo: log a value. The value is referenceable by later steps.

use super::{require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;

pub struct EchoOp {
    task: Task,
    ok: bool,
}

impl EchoOp {
    pub fn new(task: Task) -> Self {
        Self { task, ok: true }
    }
}

impl Operation for EchoOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let value = require_str(&self.task, "value")?;
        tracing::info!("{value}");
        Ok(())
    }

    fn rollback(&mut self) {
        tracing::warn!(task = %self.task.name(), "echo has no rollback support");
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
    fn test_echo_requires_string_value() {
        let task: Task = serde_json::from_value(json!({
            "name": "say", "step": 0, "operation": "echo", "value": 12
        }))
        .unwrap();
        assert!(EchoOp::new(task).execute().is_err());

        let task: Task = serde_json::from_value(json!({
            "name": "say", "step": 0, "operation": "echo", "value": "hello"
        }))
        .unwrap();
        assert!(EchoOp::new(task).execute().is_ok());
    }
}
