//! HTTP request via a blocking client. Response body and status are
//! captured as `response` and `status` for later steps.

use super::{require_str, Operation};
use crate::core::error::{Error, Result};
use crate::core::types::Task;
use indexmap::IndexMap;
use serde_json::Value;

pub struct RequestOp {
    task: Task,
    response: Option<Value>,
    status: Option<u16>,
    ok: bool,
}

impl RequestOp {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            response: None,
            status: None,
            ok: true,
        }
    }
}

impl Operation for RequestOp {
    fn task(&self) -> &Task {
        &self.task
    }

    fn execute(&mut self) -> Result<()> {
        let endpoint = require_str(&self.task, "endpoint")?;
        let method = require_str(&self.task, "method")?.to_lowercase();

        let client = reqwest::blocking::Client::new();
        let mut builder = match method.as_str() {
            "get" => client.get(&endpoint),
            "post" => client.post(&endpoint),
            "put" => client.put(&endpoint),
            "delete" => client.delete(&endpoint),
            other => {
                return Err(Error::Execution(format!(
                    "'{other}' is not a supported request method"
                )))
            }
        };
        if let Some(headers) = self.task.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str().unwrap_or_default());
            }
        }
        if let Some(body) = self.task.get("body") {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        self.status = Some(response.status().as_u16());
        let text = response.text()?;
        self.response = Some(
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text)),
        );
        Ok(())
    }

    fn rollback(&mut self) {
        tracing::warn!(task = %self.task.name(), "request has no rollback support");
    }

    fn state(&self) -> bool {
        self.ok
    }

    fn set_state(&mut self, ok: bool) {
        self.ok = ok;
    }

    fn captured(&self) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        if let Some(response) = &self.response {
            fields.insert("response".to_string(), response.clone());
        }
        if let Some(status) = self.status {
            fields.insert("status".to_string(), Value::from(status));
        }
        fields
    }
}
