//! Interactive prompt. The answer is captured as `value`, so later steps
//! reference it the same way as an echo's output.

use super::{require_str, Operation};
use crate::core::error::Result;
use crate::core::types::Task;
use indexmap::IndexMap;
use serde_json::Value;
use std::io::Write;

pub struct InputOp {
    task: Task,
    answer: Option<String>,
    ok: bool,
}

impl InputOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            answer: None,
            ok: true,
        }
    }
}

impl Operation for InputOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let question = require_str(&self.task, "question")?;
        print!("{question} ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        self.answer = Some(line.trim_end_matches(['\r', '\n']).to_string());
        Ok(())
    }

    fn rollback(&mut self) {
        tracing::warn!(task = %self.task.name(), "input has no rollback support");
    }

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }

    fn captured(&self) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        if let Some(answer) = &self.answer {
            fields.insert("value".to_string(), Value::String(answer.clone()));
        }
        fields
    }
}
