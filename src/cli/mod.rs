//! CLI subcommands — run, list, validate, new, alias, extensions.

use crate::core::error::Result;
use crate::core::types::{EngineOptions, TASK_FILE_SUFFIX};
use crate::core::{executor, parser, settings};
use crate::extensions::ExtensionCatalog;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a stored instruction set
    Run {
        /// Logical name of the instruction set
        name: String,

        /// Skip the rollback phase after failures
        #[arg(long)]
        no_rollback: bool,

        /// Skip the unsupported-OS confirmation prompt
        #[arg(long)]
        no_warning: bool,
    },

    /// List stored instruction sets
    List,

    /// Validate an instruction set without running it
    Validate {
        /// Logical name of the instruction set
        name: String,
    },

    /// Create a new empty instruction set
    New {
        /// Logical name (also the file name, without the suffix)
        name: String,

        /// Description stored in the set
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Manage path aliases
    Alias {
        #[command(subcommand)]
        command: AliasCommands,
    },

    /// List configured extensions
    Extensions,
}

#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Register a new alias
    Add { name: String, path: String },

    /// Show registered aliases
    List,
}

/// Dispatch a CLI command against the default state directory.
pub fn dispatch(cmd: Commands) -> Result<()> {
    let dir = settings::config_dir()?;
    settings::bootstrap_at(&dir)?;
    match cmd {
        Commands::Run {
            name,
            no_rollback,
            no_warning,
        } => cmd_run(
            &dir,
            &name,
            EngineOptions {
                no_warning,
                no_rollback,
            },
            &ExtensionCatalog::new(),
        ),
        Commands::List => cmd_list(&dir),
        Commands::Validate { name } => cmd_validate(&dir, &name),
        Commands::New { name, description } => cmd_new(&dir, &name, &description),
        Commands::Alias { command } => match command {
            AliasCommands::Add { name, path } => cmd_alias_add(&dir, &name, &path),
            AliasCommands::List => cmd_alias_list(&dir),
        },
        Commands::Extensions => cmd_extensions(&dir),
    }
}

fn cmd_run(
    dir: &Path,
    name: &str,
    options: EngineOptions,
    catalog: &ExtensionCatalog,
) -> Result<()> {
    let config = settings::load_from(dir)?;
    let mut engine = executor::Engine::load(
        &dir.join("tasks"),
        name,
        config,
        catalog,
        options,
    )?;
    if !engine.warn_user()? {
        println!("Aborted.");
        return Ok(());
    }
    let report = engine.run()?;
    let failed = report.values().filter(|r| !r.result).count();
    for outcome in report.values() {
        println!("{}", outcome.message);
    }
    let timings = engine.timings();
    println!(
        "Finished in {:.2}s ({} task(s), {} failed).",
        timings.execution.as_secs_f64(),
        report.len(),
        failed
    );
    Ok(())
}

fn cmd_list(dir: &Path) -> Result<()> {
    let names = settings::list_tasks(&dir.join("tasks"))?;
    if names.is_empty() {
        println!("No instruction sets stored yet. Create one with `faena new`.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn cmd_validate(dir: &Path, name: &str) -> Result<()> {
    let set = parser::load_instruction_set(&dir.join("tasks"), name)?;
    println!("OK: {} ({} task(s))", set.name, set.tasks.len());
    Ok(())
}

fn cmd_new(dir: &Path, name: &str, description: &str) -> Result<()> {
    let tasks = dir.join("tasks");
    settings::create_task(&tasks, name, description)?;
    println!(
        "Created {}",
        tasks.join(format!("{name}{TASK_FILE_SUFFIX}")).display()
    );
    Ok(())
}

fn cmd_alias_add(dir: &Path, name: &str, path: &str) -> Result<()> {
    let mut config = settings::load_from(dir)?;
    settings::add_alias(&mut config, name, path)?;
    settings::save_to(dir, &config)?;
    println!("Alias '{name}' -> {path}");
    Ok(())
}

fn cmd_alias_list(dir: &Path) -> Result<()> {
    let config = settings::load_from(dir)?;
    if config.alias.is_empty() {
        println!("No aliases registered.");
        return Ok(());
    }
    for alias in &config.alias {
        println!("{} -> {}", alias.name, alias.path);
    }
    Ok(())
}

fn cmd_extensions(dir: &Path) -> Result<()> {
    let config = settings::load_from(dir)?;
    if config.extensions.is_empty() {
        println!("No extensions configured.");
        return Ok(());
    }
    for extension in &config.extensions {
        println!("{} (v{})", extension.name, extension.version);
    }
    Ok(())
}
