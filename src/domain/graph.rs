//! Dependency graph for tasks
//!
//! Owns every task record, keyed by id and iterated in insertion order.
//! Mutations keep the graph consistent: removals cascade through the
//! dependency sets of the remaining tasks, and cached earliest-finish
//! times are invalidated whenever they could have gone stale.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use super::task::{Task, TaskRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("task '{0}' already exists")]
    DuplicateId(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("malformed record {record}: {reason}")]
    MalformedRecord { record: usize, reason: String },

    #[error("dependency cycle detected at task '{0}'")]
    CycleDetected(String),
}

/// The task store: id -> task, with stable insertion order.
///
/// Iteration order (and therefore snapshot order and topological-sort
/// tie-breaking) is the order tasks were inserted or bulk-loaded.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: HashMap<String, Task>,
    order: Vec<String>,
}

impl TaskGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Replaces the entire graph with the supplied records.
    ///
    /// Every record is validated before any existing task is touched, so a
    /// failed load leaves the graph exactly as it was. Dependencies are
    /// stored verbatim, including references to ids that never appear in
    /// the batch (dangling references are ignored by the algorithms).
    pub fn load(&mut self, records: impl IntoIterator<Item = TaskRecord>) -> Result<(), GraphError> {
        let records: Vec<TaskRecord> = records.into_iter().collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if record.id.is_empty() {
                return Err(GraphError::MalformedRecord {
                    record: idx + 1,
                    reason: "empty task id".to_string(),
                });
            }
            if !seen.insert(&record.id) {
                return Err(GraphError::DuplicateId(record.id.clone()));
            }
        }

        self.tasks.clear();
        self.order.clear();

        for record in records {
            let mut task = Task::new(record.id.clone(), record.duration);
            for dep in record.depends_on {
                task.depends_on.add(dep);
            }
            self.order.push(record.id.clone());
            self.tasks.insert(record.id, task);
        }

        Ok(())
    }

    /// Inserts a single task.
    ///
    /// Unlike [`load`](Self::load), dependency ids not currently present in
    /// the graph are dropped rather than stored; the dropped ids are
    /// returned so the caller can warn about them. The asymmetry with bulk
    /// load is intentional and load-bearing for callers.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        duration: u64,
        depends_on: impl IntoIterator<Item = String>,
    ) -> Result<Vec<String>, GraphError> {
        let id = id.into();
        if self.tasks.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }

        let mut task = Task::new(id.clone(), duration);
        let mut dropped = Vec::new();
        for dep in depends_on {
            if self.tasks.contains_key(&dep) {
                task.depends_on.add(dep);
            } else {
                dropped.push(dep);
            }
        }

        self.order.push(id.clone());
        self.tasks.insert(id, task);
        self.invalidate_all();

        Ok(dropped)
    }

    /// Removes a task and strips its id from every remaining dependency set.
    ///
    /// Tasks left without dependencies get their earliest-finish cache
    /// eagerly re-primed to their own duration, so graph roots are always
    /// ready for display immediately after a removal.
    pub fn remove(&mut self, id: &str) -> Result<Task, GraphError> {
        let removed = self
            .tasks
            .remove(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        self.order.retain(|o| o != id);

        for task in self.tasks.values_mut() {
            task.depends_on.remove(id);
        }

        self.invalidate_all();
        for task in self.tasks.values_mut() {
            if task.depends_on.is_empty() {
                task.earliest_finish = Some(task.duration);
            }
        }

        Ok(removed)
    }

    /// Overwrites a task's duration.
    ///
    /// Invalidates the cached earliest-finish of the task itself and of
    /// every task transitively dependent on it.
    pub fn update_duration(&mut self, id: &str, duration: u64) -> Result<(), GraphError> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        task.duration = duration;
        self.invalidate_dependents(id);
        Ok(())
    }

    /// Lazy, insertion-ordered view of all tasks
    pub fn snapshot(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Task ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Looks up a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Returns true if the graph contains the id
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Returns the number of tasks
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the graph has no tasks
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Clears every cached earliest-finish time
    fn invalidate_all(&mut self) {
        for task in self.tasks.values_mut() {
            task.earliest_finish = None;
        }
    }

    /// Clears the cache of `id` and of every transitive dependent of `id`.
    ///
    /// Dependents are discovered by breadth-first search over reverse
    /// edges; the graph stores forward edges only, so each wave scans the
    /// dependency sets of all tasks.
    fn invalidate_dependents(&mut self, id: &str) {
        let mut stale: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        stale.insert(id.to_string());
        queue.push_back(id.to_string());

        while let Some(current) = queue.pop_front() {
            for task in self.tasks.values() {
                if task.depends_on.contains(&current) && stale.insert(task.id.clone()) {
                    queue.push_back(task.id.clone());
                }
            }
        }

        for id in stale {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.earliest_finish = None;
            }
        }
    }
}
