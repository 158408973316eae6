//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{plan, shell};
use crate::storage::{Config, PlanStore};

#[derive(Parser)]
#[command(name = "planline")]
#[command(author, version, about = "Dependency-aware task scheduling for project plans")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Plan file to operate on (defaults to the configured plan_file)
    #[arg(long, global = true, env = "PLANLINE_FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to the plan
    Add {
        /// Task id
        id: String,

        /// Duration in whole time units
        duration: u64,

        /// Prerequisite task id (repeatable)
        #[arg(long = "dep")]
        deps: Vec<String>,
    },

    /// Remove a task; references to it are cleaned up
    #[command(alias = "rm")]
    Remove {
        /// Task id
        id: String,
    },

    /// Change a task's duration
    Update {
        /// Task id
        id: String,

        /// New duration
        duration: u64,
    },

    /// List all tasks in the plan
    List,

    /// Print a dependency-respecting execution order
    Sequence {
        /// Also write the sequence to a file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the earliest start time of every task
    Times {
        /// Also write the times to a file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Validate the plan file parses and has no dependency cycles
    Check,

    /// Start the interactive planning shell
    Shell,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    let plan_path = cli.file.clone().unwrap_or_else(|| config.plan_file.clone());
    let store = PlanStore::new(&plan_path);
    output.verbose(&format!("Plan file: {}", plan_path.display()));

    match cli.command {
        Commands::Add { id, duration, deps } => {
            plan::add(&output, &store, &config, &id, duration, &deps)?
        }
        Commands::Remove { id } => plan::remove(&output, &store, &config, &id)?,
        Commands::Update { id, duration } => {
            plan::update(&output, &store, &config, &id, duration)?
        }
        Commands::List => plan::list(&output, &store)?,
        Commands::Sequence { output: artifact } => {
            plan::sequence(&output, &store, artifact.as_deref())?
        }
        Commands::Times { output: artifact } => {
            plan::times(&output, &store, artifact.as_deref())?
        }
        Commands::Check => plan::check(&output, &store)?,
        Commands::Shell => shell::run(&config, &plan_path)?,
    }

    Ok(())
}
