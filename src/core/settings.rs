//! Settings persistence and the on-disk state layout.
//!
//! State lives under `~/.faena`: a `config.json` settings record and a
//! `tasks/` directory of instruction set files. Bootstrap is idempotent.

use super::error::{Error, Result};
use super::types::{Alias, InstructionSet, Settings, TASK_FILE_SUFFIX};
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = ".faena";
const CONFIG_FILE_NAME: &str = "config.json";
const TASKS_DIR_NAME: &str = "tasks";

/// Root of the state directory for the current user.
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or_else(|| Error::Execution("could not determine the home directory".to_string()))
}

/// Where instruction set files live.
pub fn tasks_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join(TASKS_DIR_NAME))
}

/// Create the state directory, tasks directory and a default settings file
/// when any of them is missing. Safe to call every startup.
pub fn bootstrap() -> Result<Settings> {
    bootstrap_at(&config_dir()?)
}

/// Bootstrap rooted at an explicit directory.
pub fn bootstrap_at(dir: &Path) -> Result<Settings> {
    std::fs::create_dir_all(dir.join(TASKS_DIR_NAME))?;
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.is_file() {
        let settings = default_settings(dir);
        save_to(dir, &settings)?;
        tracing::info!(dir = %dir.display(), "initialized state directory");
        return Ok(settings);
    }
    load_from(dir)
}

fn default_settings(dir: &Path) -> Settings {
    let location = dir.to_string_lossy().into_owned();
    Settings {
        current_location: location.clone(),
        default_location: location,
        extensions: Vec::new(),
        alias: Vec::new(),
    }
}

/// Load settings from the default state directory.
pub fn load() -> Result<Settings> {
    load_from(&config_dir()?)
}

pub fn load_from(dir: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_to(dir: &Path, settings: &Settings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(dir.join(CONFIG_FILE_NAME), content)?;
    Ok(())
}

/// Logical names of every stored instruction set.
pub fn list_tasks(tasks_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(tasks_dir)? {
        let path = entry?.path();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(name) = file_name.strip_suffix(TASK_FILE_SUFFIX) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Write an instruction set under its logical name.
pub fn save_instruction_set(tasks_dir: &Path, name: &str, set: &InstructionSet) -> Result<()> {
    let path = tasks_dir.join(format!("{name}{TASK_FILE_SUFFIX}"));
    let content = serde_json::to_string_pretty(set)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a new empty instruction set file. Refuses to overwrite.
pub fn create_task(tasks_dir: &Path, name: &str, description: &str) -> Result<()> {
    let path = tasks_dir.join(format!("{name}{TASK_FILE_SUFFIX}"));
    if path.exists() {
        return Err(Error::Execution(format!(
            "'{name}' already exists in the tasks directory"
        )));
    }
    let set = InstructionSet {
        name: name.to_string(),
        description: description.to_string(),
        tasks: Vec::new(),
    };
    save_instruction_set(tasks_dir, name, &set)
}

/// Register a new alias, rejecting duplicates by name.
pub fn add_alias(settings: &mut Settings, name: &str, path: &str) -> Result<()> {
    if settings.alias.iter().any(|a| a.name == name) {
        return Err(Error::Execution(format!(
            "alias '{name}' is already registered"
        )));
    }
    settings.alias.push(Alias {
        name: name.to_string(),
        path: path.to_string(),
    });
    Ok(())
}
