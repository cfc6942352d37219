//! Execution engine: orchestration loop for a run.
//!
//! Load → validate → normalize → rewrite relative locations → per task:
//! resolve → destination pre-check → build operation → execute → record.
//! A task failure never halts the run; after the full list has been
//! attempted, faulted operations are rolled back in reverse order.

use super::error::{Error, Result};
use super::parser;
use super::resolver;
use super::types::{
    EngineOptions, InstructionSet, OpKind, RunReport, Settings, Task, TaskReport,
};
use crate::extensions::{self, ExtensionCatalog, LoadedExtensions};
use crate::ops::{self, Operation};
use indexmap::IndexMap;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Operating systems the engine runs on without a confirmation prompt.
const SUPPORTED_OS: [&str; 2] = ["linux", "windows"];

/// Wall-clock durations of engine phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTimings {
    pub initialization: Duration,
    pub execution: Duration,
}

pub struct Engine {
    set: InstructionSet,
    settings: Settings,
    options: EngineOptions,
    extensions: LoadedExtensions,
    executed: Vec<Task>,
    stack: Vec<Box<dyn Operation>>,
    timings: RunTimings,
}

impl Engine {
    /// Build an engine around an already-parsed set. Validates, normalizes,
    /// loads extensions and rewrites relative locations before returning.
    pub fn new(
        mut set: InstructionSet,
        settings: Settings,
        catalog: &ExtensionCatalog,
        options: EngineOptions,
    ) -> Result<Self> {
        let start = Instant::now();
        parser::validate_set(&set)?;
        parser::normalize_optional_fields(&mut set);
        let extensions = extensions::load(catalog, &settings.extensions)?;
        rewrite_relative_locations(&mut set, &settings.current_location);
        let mut engine = Self {
            set,
            settings,
            options,
            extensions,
            executed: Vec::new(),
            stack: Vec::new(),
            timings: RunTimings::default(),
        };
        engine.timings.initialization = start.elapsed();
        Ok(engine)
    }

    /// Load an instruction set by logical name and build an engine for it.
    pub fn load(
        tasks_dir: &Path,
        name: &str,
        settings: Settings,
        catalog: &ExtensionCatalog,
        options: EngineOptions,
    ) -> Result<Self> {
        let set = parser::load_instruction_set(tasks_dir, name)?;
        Self::new(set, settings, catalog, options)
    }

    pub fn instruction_set(&self) -> &InstructionSet {
        &self.set
    }

    /// Tasks that completed execute, in completion order.
    pub fn executed_tasks(&self) -> &[Task] {
        &self.executed
    }

    pub fn timings(&self) -> RunTimings {
        self.timings
    }

    /// Warn about an unsupported host OS and ask for confirmation, unless
    /// suppressed. Returns false when the user declines.
    pub fn warn_user(&self) -> Result<bool> {
        if self.options.no_warning || SUPPORTED_OS.contains(&std::env::consts::OS) {
            return Ok(true);
        }
        tracing::warn!(os = %std::env::consts::OS, "this operating system is not supported");
        print!("Continue anyway? [y/N] ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim().eq_ignore_ascii_case("y"))
    }

    /// Run every task in step order, then the rollback phase. Returns the
    /// per-task report; individual failures are reported, not raised.
    pub fn run(&mut self) -> Result<RunReport> {
        let start = Instant::now();
        let mut order: Vec<usize> = (0..self.set.tasks.len()).collect();
        order.sort_by_key(|&i| self.set.tasks[i].step());

        let mut report = RunReport::new();
        for index in order {
            let task = self.set.tasks[index].clone();
            let name = task.name().to_string();
            tracing::info!(task = %name, step = task.step(), "executing");
            let depth = self.stack.len();
            match self.run_task(task) {
                Ok(()) => {
                    report.insert(
                        name.clone(),
                        TaskReport {
                            result: true,
                            message: format!("Task \"{name}\" - OK"),
                        },
                    );
                }
                Err(e) => {
                    tracing::error!(task = %name, error = %e, "task failed");
                    // Only the operation this task pushed may be flagged;
                    // failures before the push leave the stack alone.
                    if self.stack.len() > depth {
                        if let Some(op) = self.stack.last_mut() {
                            op.set_state(false);
                        }
                    }
                    report.insert(
                        name.clone(),
                        TaskReport {
                            result: false,
                            message: format!("Task \"{name}\" - ERROR: {e}"),
                        },
                    );
                }
            }
        }
        self.rollback_phase();
        self.timings.execution = start.elapsed();
        Ok(report)
    }

    /// Resolve, pre-check, build and execute one task. Success appends the
    /// resolved task to the executed log.
    fn run_task(&mut self, mut task: Task) -> Result<()> {
        let kind = OpKind::parse(task.operation()).ok_or_else(|| Error::UnknownOperation {
            operation: task.operation().to_string(),
            task: task.name().to_string(),
        })?;

        if kind.needs_destination_check() {
            self.check_destination_path(&mut task)?;
        }

        let stack_captures = self.stack_captures();
        let requester = task.name().to_string();
        resolver::resolve_references(&mut task, |step| {
            lookup_step(&self.executed, &stack_captures, step, &requester)
        })?;
        resolver::resolve_aliases(&mut task, &self.settings.alias);

        let mut op = if kind == OpKind::Custom {
            let extension_name = task
                .get_str("extension_name")
                .unwrap_or_default()
                .to_string();
            let extension = self.extensions.get(&extension_name).ok_or_else(|| {
                Error::Execution(format!(
                    "no executable found for the '{extension_name}' extension"
                ))
            })?;
            extension.create(task.clone())
        } else {
            ops::build(kind, task.clone())?
        };

        let result = op.execute();
        self.stack.push(op);
        result?;
        self.executed.push(task);
        Ok(())
    }

    fn stack_captures(&self) -> Vec<(i64, IndexMap<String, Value>)> {
        self.stack
            .iter()
            .map(|op| (op.task().step(), op.captured()))
            .collect()
    }

    /// Resolve `$` tokens in `destination`/`origin`, derive a missing
    /// `destination` from a `$` target reference, expand aliases, then
    /// create the destination directory if it does not exist. Single level
    /// only: a missing parent is a hard error for the task.
    fn check_destination_path(&self, task: &mut Task) -> Result<()> {
        let stack_captures = self.stack_captures();
        let requester = task.name().to_string();

        for key in ["destination", "origin"] {
            if let Some(token) = task.get_str(key).and_then(resolver::step_token) {
                let fields = lookup_step(&self.executed, &stack_captures, token.step, &requester)?;
                let field = token.field.as_deref().unwrap_or(key);
                let value = fields
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::Reference {
                        task: requester.clone(),
                    })?;
                task.set(key, value);
            }
        }
        if !task.contains("destination") {
            if let Some(token) = task.get_str("target").and_then(resolver::step_token) {
                let fields = lookup_step(&self.executed, &stack_captures, token.step, &requester)?;
                let value = fields
                    .get("destination")
                    .cloned()
                    .ok_or_else(|| Error::Reference {
                        task: requester.clone(),
                    })?;
                task.set("destination", value);
            }
        }

        let destination = ops::require_str(task, "destination")?;
        let destination = if destination.starts_with('&') {
            let resolved = resolver::resolve_alias_path(&destination, &self.settings.alias);
            task.set("destination", Value::String(resolved.clone()));
            resolved
        } else {
            destination
        };

        let path = Path::new(&destination);
        if !path.is_dir() {
            std::fs::create_dir(path)?;
            tracing::debug!(path = %destination, "created destination directory");
        }
        Ok(())
    }

    /// Walk the stack in reverse and roll back every faulted operation,
    /// unless rollback is suppressed.
    fn rollback_phase(&mut self) {
        let faulted = self.stack.iter().filter(|op| !op.state()).count();
        if faulted == 0 {
            return;
        }
        if self.options.no_rollback {
            tracing::warn!(faulted, "rollback suppressed by options");
            return;
        }
        tracing::warn!(faulted, "entering rollback phase");
        for op in self.stack.iter_mut().rev() {
            if !op.state() {
                tracing::info!(task = %op.task().name(), "rolling back");
                op.rollback();
                op.set_state(true);
            }
        }
    }

    /// Fields of a previously executed step, captured values overlaid, for
    /// a reference raised by `requesting` task.
    pub fn step_reference(
        &self,
        requesting: &str,
        step: i64,
    ) -> Result<IndexMap<String, Value>> {
        lookup_step(&self.executed, &self.stack_captures(), step, requesting)
    }
}

/// Find the executed task with the given step number and overlay the
/// captured fields of its stack operation, matched by step number.
fn lookup_step(
    executed: &[Task],
    stack_captures: &[(i64, IndexMap<String, Value>)],
    step: i64,
    requesting: &str,
) -> Result<IndexMap<String, Value>> {
    let task = executed
        .iter()
        .find(|t| t.step() == step)
        .ok_or_else(|| Error::Reference {
            task: requesting.to_string(),
        })?;
    let mut fields = task.fields().clone();
    if let Some((_, captured)) = stack_captures.iter().find(|(s, _)| *s == step) {
        for (key, value) in captured {
            fields.insert(key.clone(), value.clone());
        }
    }
    Ok(fields)
}

/// Prefix the working root onto relative `destination`/`origin` fields of
/// non-custom tasks. Absolute paths and `$`/`&` tokens are left alone.
pub fn rewrite_relative_locations(set: &mut InstructionSet, current_location: &str) {
    for task in &mut set.tasks {
        if task.operation() == "custom" {
            continue;
        }
        for key in ["destination", "origin"] {
            let Some(value) = task.get_str(key).map(str::to_string) else {
                continue;
            };
            if value.starts_with('/')
                || value.starts_with('$')
                || value.starts_with('&')
                || value.chars().nth(1) == Some(':')
            {
                continue;
            }
            let rewritten = format!("{}/{value}", current_location.trim_end_matches('/'));
            task.set(key, Value::String(rewritten));
        }
    }
}
