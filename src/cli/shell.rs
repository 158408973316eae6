//! Interactive planning shell
//!
//! A menu-driven loop over a single in-memory graph: load and save plan
//! files, edit tasks, and generate the scheduling artifacts. Errors are
//! reported and the session continues; only quitting leaves the loop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::plan::normalize_id;
use crate::domain::{earliest_times, topological_order, TaskGraph, TaskRecord};
use crate::storage::{Config, PlanStore};

const MENU: &[&str] = &[
    "Load plan from file",
    "Add a task",
    "Remove a task",
    "Update task duration",
    "Save plan to file",
    "Generate task sequence",
    "Generate earliest times",
    "Print tasks",
    "Quit",
];

pub fn run(config: &Config, default_path: &Path) -> Result<()> {
    let mut shell = Shell {
        config: config.clone(),
        graph: TaskGraph::new(),
        path: default_path.to_path_buf(),
        dirty: false,
    };

    loop {
        let choice = Select::new()
            .with_prompt("planline")
            .items(MENU)
            .default(0)
            .interact()?;

        let done = match shell.dispatch(choice) {
            Ok(done) => done,
            Err(e) => {
                eprintln!("{} {:#}", style("error:").red(), e);
                false
            }
        };
        if done {
            break;
        }
    }

    Ok(())
}

struct Shell {
    config: Config,
    graph: TaskGraph,
    path: PathBuf,
    dirty: bool,
}

impl Shell {
    /// Runs one menu action. Returns true when the session should end.
    fn dispatch(&mut self, choice: usize) -> Result<bool> {
        match choice {
            0 => self.load()?,
            1 => self.add()?,
            2 => self.remove()?,
            3 => self.update()?,
            4 => self.save()?,
            5 => self.sequence()?,
            6 => self.times()?,
            7 => self.print_tasks(),
            _ => return self.quit(),
        }
        Ok(false)
    }

    fn prompt_path(&self, prompt: &str) -> Result<PathBuf> {
        let path: String = Input::new()
            .with_prompt(prompt)
            .default(self.path.display().to_string())
            .interact_text()?;
        Ok(PathBuf::from(path.trim()))
    }

    fn prompt_id(&self, prompt: &str) -> Result<String> {
        let id: String = Input::new().with_prompt(prompt).interact_text()?;
        Ok(normalize_id(&self.config, &id))
    }

    fn load(&mut self) -> Result<()> {
        let path = self.prompt_path("Plan file to load")?;
        let records = PlanStore::new(&path).read_records()?;
        let count = records.len();
        self.graph.load(records)?;
        self.path = path;
        self.dirty = false;
        println!("Loaded {} tasks from {}", count, self.path.display());
        Ok(())
    }

    fn add(&mut self) -> Result<()> {
        let id = self.prompt_id("Task id")?;
        let duration: u64 = Input::new().with_prompt("Duration").interact_text()?;
        let deps_input: String = Input::new()
            .with_prompt("Dependencies (comma-separated, empty for none)")
            .allow_empty(true)
            .interact_text()?;

        let deps: Vec<String> = deps_input
            .split(',')
            .map(|d| normalize_id(&self.config, d))
            .filter(|d| !d.is_empty())
            .collect();

        let dropped = self.graph.insert(id.clone(), duration, deps)?;
        for dep in dropped {
            eprintln!(
                "{} unknown dependency '{}' dropped",
                style("warning:").yellow(),
                dep
            );
        }
        self.dirty = true;
        println!("Added task {}", id);
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let id = self.prompt_id("Task id to remove")?;
        self.graph.remove(&id)?;
        self.dirty = true;
        println!("Removed task {}", id);
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let id = self.prompt_id("Task id to update")?;
        let duration: u64 = Input::new().with_prompt("New duration").interact_text()?;
        self.graph.update_duration(&id, duration)?;
        self.dirty = true;
        println!("Updated duration of {} to {}", id, duration);
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let path = self.prompt_path("Plan file to save")?;
        let records: Vec<TaskRecord> = self.graph.snapshot().map(|t| t.to_record()).collect();
        PlanStore::new(&path).write_records(&records)?;
        self.path = path;
        self.dirty = false;
        println!("Saved {} tasks to {}", records.len(), self.path.display());
        Ok(())
    }

    fn sequence(&mut self) -> Result<()> {
        let order = topological_order(&self.graph)?;
        let line = order.join(", ");
        println!("{}", line);
        self.offer_artifact(&format!("{}\n", line), "sequence.txt")
    }

    fn times(&mut self) -> Result<()> {
        let times = earliest_times(&mut self.graph)?;
        let rendered: String = times
            .iter()
            .map(|(id, start)| format!("{}, {}\n", id, start))
            .collect();
        print!("{}", rendered);
        self.offer_artifact(&rendered, "earliest_times.txt")
    }

    fn offer_artifact(&self, contents: &str, default_name: &str) -> Result<()> {
        let write = Confirm::new()
            .with_prompt("Write to file?")
            .default(false)
            .interact()?;
        if write {
            let path: String = Input::new()
                .with_prompt("Output file")
                .default(default_name.to_string())
                .interact_text()?;
            PlanStore::write_artifact(Path::new(path.trim()), contents)?;
            println!("Wrote {}", path.trim());
        }
        Ok(())
    }

    fn print_tasks(&self) {
        if self.graph.is_empty() {
            println!("No tasks");
            return;
        }
        for task in self.graph.snapshot() {
            let deps: Vec<&str> = task.depends_on.iter().collect();
            if deps.is_empty() {
                println!("{}, {}", task.id, task.duration);
            } else {
                println!("{}, {}, {}", task.id, task.duration, deps.join(", "));
            }
        }
    }

    fn quit(&self) -> Result<bool> {
        if self.dirty {
            let discard = Confirm::new()
                .with_prompt("Discard unsaved changes?")
                .default(false)
                .interact()?;
            return Ok(discard);
        }
        Ok(true)
    }
}
