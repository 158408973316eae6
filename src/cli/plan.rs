//! Plan CLI commands
//!
//! Every one-shot command follows the same shape: read the plan file,
//! rebuild the graph, apply one operation, and (for mutations) write the
//! plan back. Id case-folding happens here, at the boundary; the core
//! never touches id casing.

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::domain::{earliest_times, topological_order, TaskGraph, TaskRecord};
use crate::storage::{Config, PlanStore};

/// Applies the configured id normalization
pub fn normalize_id(config: &Config, id: &str) -> String {
    let id = id.trim();
    if config.uppercase_ids {
        id.to_uppercase()
    } else {
        id.to_string()
    }
}

/// Reads the plan file and rebuilds the graph from it
fn load_graph(store: &PlanStore) -> Result<TaskGraph> {
    let records = store.read_records()?;
    let mut graph = TaskGraph::new();
    graph.load(records)?;
    Ok(graph)
}

/// Writes the graph's snapshot back to the plan file
fn save_graph(store: &PlanStore, graph: &TaskGraph) -> Result<()> {
    let records: Vec<TaskRecord> = graph.snapshot().map(|t| t.to_record()).collect();
    store.write_records(&records)
}

pub fn add(
    output: &Output,
    store: &PlanStore,
    config: &Config,
    id: &str,
    duration: u64,
    deps: &[String],
) -> Result<()> {
    let mut graph = load_graph(store)?;

    let id = normalize_id(config, id);
    let deps: Vec<String> = deps.iter().map(|d| normalize_id(config, d)).collect();

    output.verbose_ctx("add", &format!("Inserting '{}' ({} deps)", id, deps.len()));
    let dropped = graph.insert(id.clone(), duration, deps)?;

    for dep in &dropped {
        output.warn(&format!("unknown dependency '{}' dropped", dep));
    }

    save_graph(store, &graph)?;

    if output.is_json() {
        let task = graph.get(&id).expect("just inserted");
        output.data(&serde_json::json!({
            "id": task.id,
            "duration": task.duration,
            "depends_on": task.depends_on.iter().collect::<Vec<_>>(),
            "dropped_deps": dropped,
        }));
    } else {
        output.success(&format!("Added task {}", id));
    }

    Ok(())
}

pub fn remove(output: &Output, store: &PlanStore, config: &Config, id: &str) -> Result<()> {
    let mut graph = load_graph(store)?;

    let id = normalize_id(config, id);
    graph.remove(&id)?;
    save_graph(store, &graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "removed": id }));
    } else {
        output.success(&format!("Removed task {}", id));
    }

    Ok(())
}

pub fn update(
    output: &Output,
    store: &PlanStore,
    config: &Config,
    id: &str,
    duration: u64,
) -> Result<()> {
    let mut graph = load_graph(store)?;

    let id = normalize_id(config, id);
    graph.update_duration(&id, duration)?;
    save_graph(store, &graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "id": id, "duration": duration }));
    } else {
        output.success(&format!("Updated duration of {} to {}", id, duration));
    }

    Ok(())
}

pub fn list(output: &Output, store: &PlanStore) -> Result<()> {
    let graph = load_graph(store)?;

    if output.is_json() {
        let records: Vec<TaskRecord> = graph.snapshot().map(|t| t.to_record()).collect();
        output.data(&records);
    } else if graph.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<12} {:>8}  DEPENDS ON", "ID", "DURATION");
        println!("{}", "-".repeat(50));
        for task in graph.snapshot() {
            let deps: Vec<&str> = task.depends_on.iter().collect();
            println!("{:<12} {:>8}  {}", task.id, task.duration, deps.join(", "));
        }
    }

    Ok(())
}

pub fn sequence(output: &Output, store: &PlanStore, artifact: Option<&Path>) -> Result<()> {
    let graph = load_graph(store)?;
    let order = topological_order(&graph)?;

    let line = order.join(", ");
    if let Some(path) = artifact {
        PlanStore::write_artifact(path, &format!("{}\n", line))?;
        output.verbose_ctx("sequence", &format!("Wrote {}", path.display()));
    }

    if output.is_json() {
        output.data(&serde_json::json!({ "sequence": order }));
    } else {
        println!("{}", line);
    }

    Ok(())
}

pub fn times(output: &Output, store: &PlanStore, artifact: Option<&Path>) -> Result<()> {
    let mut graph = load_graph(store)?;
    let times = earliest_times(&mut graph)?;

    let rendered: String = times
        .iter()
        .map(|(id, start)| format!("{}, {}\n", id, start))
        .collect();

    if let Some(path) = artifact {
        PlanStore::write_artifact(path, &rendered)?;
        output.verbose_ctx("times", &format!("Wrote {}", path.display()));
    }

    if output.is_json() {
        let items: Vec<_> = times
            .iter()
            .map(|(id, start)| serde_json::json!({ "id": id, "start": start }))
            .collect();
        output.data(&items);
    } else {
        print!("{}", rendered);
    }

    Ok(())
}

pub fn check(output: &Output, store: &PlanStore) -> Result<()> {
    let graph = load_graph(store)?;
    topological_order(&graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "tasks": graph.len(), "acyclic": true }));
    } else {
        output.success(&format!("Plan OK: {} tasks, no cycles", graph.len()));
    }

    Ok(())
}
