//! Scheduling algorithms over the task graph
//!
//! Two derived artifacts: a dependency-respecting execution order
//! (topological sort) and the earliest start/finish time of every task
//! (longest-path forward pass, memoized in the tasks' caches).
//!
//! Both traversals are iterative with an explicit work stack, so recursion
//! depth never bounds the longest dependency chain, and both detect cycles
//! through in-progress marking instead of looping forever. Tasks are
//! addressed through stable integer indices into a dense snapshot of the
//! graph; dependency ids absent from the graph are skipped.

use std::collections::HashMap;

use super::graph::{GraphError, TaskGraph};
use super::task::Task;

/// Visitation state for the depth-first walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Open,
    Done,
}

/// Returns all task ids ordered so that every dependency precedes its
/// dependents.
///
/// Tasks are taken up in insertion order and each task's dependencies are
/// visited in their stored order, so ties among independent tasks resolve
/// deterministically to insertion order.
pub fn topological_order(graph: &TaskGraph) -> Result<Vec<String>, GraphError> {
    let tasks: Vec<&Task> = graph.snapshot().collect();
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    let mut marks = vec![Mark::New; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());

    for start in 0..tasks.len() {
        if marks[start] != Mark::New {
            continue;
        }
        marks[start] = Mark::Open;

        // (task index, next dependency to look at)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let (t, i) = *frame;
            match tasks[t].depends_on.get(i) {
                Some(dep) => {
                    frame.1 += 1;
                    let Some(&d) = index.get(dep) else {
                        continue; // dangling reference, treated as absent
                    };
                    match marks[d] {
                        Mark::Done => {}
                        Mark::Open => {
                            return Err(GraphError::CycleDetected(tasks[d].id.clone()));
                        }
                        Mark::New => {
                            marks[d] = Mark::Open;
                            stack.push((d, 0));
                        }
                    }
                }
                None => {
                    marks[t] = Mark::Done;
                    order.push(tasks[t].id.clone());
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

/// Computes the earliest start time of every task, sorted by id.
///
/// For each task, `earliest_finish = duration + max(earliest_finish of
/// each existing dependency, default 0)`; the reported value is the
/// earliest *start*, `earliest_finish - duration`. Results are memoized in
/// the tasks' caches: already-computed tasks short-circuit, so a full pass
/// is O(V+E).
pub fn earliest_times(graph: &mut TaskGraph) -> Result<Vec<(String, u64)>, GraphError> {
    let finishes = compute_finishes(graph)?;

    let ids: Vec<String> = graph.ids().map(str::to_owned).collect();
    let mut times = Vec::with_capacity(ids.len());
    for (id, finish) in ids.into_iter().zip(finishes) {
        if let Some(task) = graph.get_mut(&id) {
            task.earliest_finish = Some(finish);
            times.push((id, finish - task.duration));
        }
    }

    times.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(times)
}

/// Forward pass over the dependency DAG.
///
/// Returns the earliest-finish time for every task, aligned with the
/// graph's insertion order. Seeds from the tasks' existing caches and only
/// walks what is still uncomputed.
fn compute_finishes(graph: &TaskGraph) -> Result<Vec<u64>, GraphError> {
    let tasks: Vec<&Task> = graph.snapshot().collect();
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    let mut memo: Vec<Option<u64>> = tasks.iter().map(|t| t.earliest_finish()).collect();
    let mut open = vec![false; tasks.len()];

    for start in 0..tasks.len() {
        if memo[start].is_some() {
            continue;
        }
        open[start] = true;

        // (task index, next dependency to look at, max dependency finish so far)
        let mut stack: Vec<(usize, usize, u64)> = vec![(start, 0, 0)];

        while let Some(frame) = stack.last_mut() {
            let (t, i, latest) = *frame;
            match tasks[t].depends_on.get(i) {
                Some(dep) => {
                    frame.1 += 1;
                    let Some(&d) = index.get(dep) else {
                        continue; // absent dependency contributes 0
                    };
                    if let Some(finish) = memo[d] {
                        frame.2 = latest.max(finish);
                    } else if open[d] {
                        return Err(GraphError::CycleDetected(tasks[d].id.clone()));
                    } else {
                        open[d] = true;
                        stack.push((d, 0, 0));
                    }
                }
                None => {
                    let finish = latest.saturating_add(tasks[t].duration);
                    memo[t] = Some(finish);
                    open[t] = false;
                    stack.pop();
                    if let Some(parent) = stack.last_mut() {
                        parent.2 = parent.2.max(finish);
                    }
                }
            }
        }
    }

    Ok(memo
        .into_iter()
        .map(|finish| finish.expect("forward pass covers every task"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskRecord;

    fn record(id: &str, duration: u64, deps: &[&str]) -> TaskRecord {
        TaskRecord::new(id, duration, deps.iter().map(|d| d.to_string()).collect())
    }

    fn example_graph() -> TaskGraph {
        // A(2), B(3, [A]), C(1, [A, B])
        let mut graph = TaskGraph::new();
        graph
            .load(vec![
                record("A", 2, &[]),
                record("B", 3, &["A"]),
                record("C", 1, &["A", "B"]),
            ])
            .unwrap();
        graph
    }

    #[test]
    fn empty_graph_yields_empty_artifacts() {
        let mut graph = TaskGraph::new();
        assert!(topological_order(&graph).unwrap().is_empty());
        assert!(earliest_times(&mut graph).unwrap().is_empty());
    }

    #[test]
    fn order_respects_dependencies() {
        let graph = example_graph();
        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn independent_tasks_keep_insertion_order() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![
                record("Z", 1, &[]),
                record("M", 1, &[]),
                record("A", 1, &[]),
            ])
            .unwrap();

        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["Z", "M", "A"]);
    }

    #[test]
    fn order_skips_dangling_references() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![record("A", 1, &["GHOST"]), record("B", 1, &["A"])])
            .unwrap();

        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn order_detects_cycles() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![record("A", 1, &["B"]), record("B", 1, &["A"])])
            .unwrap();

        assert!(matches!(
            topological_order(&graph),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn order_handles_deep_chains_without_overflow() {
        let records: Vec<TaskRecord> = (0..50_000)
            .map(|i| {
                let deps = if i == 0 {
                    vec![]
                } else {
                    vec![format!("T{}", i - 1)]
                };
                TaskRecord::new(format!("T{}", i), 1, deps)
            })
            .collect();

        let mut graph = TaskGraph::new();
        graph.load(records).unwrap();

        let order = topological_order(&graph).unwrap();
        assert_eq!(order.len(), 50_000);
        assert_eq!(order[0], "T0");
        assert_eq!(order[49_999], "T49999");
    }

    #[test]
    fn earliest_times_match_worked_example() {
        let mut graph = example_graph();
        let times = earliest_times(&mut graph).unwrap();

        assert_eq!(
            times,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 2),
                ("C".to_string(), 5),
            ]
        );

        // Finishes are cached on the tasks themselves
        assert_eq!(graph.get("A").unwrap().earliest_finish(), Some(2));
        assert_eq!(graph.get("B").unwrap().earliest_finish(), Some(5));
        assert_eq!(graph.get("C").unwrap().earliest_finish(), Some(6));
    }

    #[test]
    fn earliest_times_sorted_by_id() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![
                record("Z", 4, &[]),
                record("A", 2, &["Z"]),
                record("M", 3, &[]),
            ])
            .unwrap();

        let times = earliest_times(&mut graph).unwrap();
        let ids: Vec<&str> = times.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "M", "Z"]);
    }

    #[test]
    fn absent_dependencies_contribute_zero() {
        let mut graph = TaskGraph::new();
        graph.load(vec![record("X", 5, &["GHOST"])]).unwrap();

        let times = earliest_times(&mut graph).unwrap();
        assert_eq!(times, vec![("X".to_string(), 0)]);
        assert_eq!(graph.get("X").unwrap().earliest_finish(), Some(5));
    }

    #[test]
    fn cached_values_short_circuit_recomputation() {
        let mut graph = example_graph();

        // Pre-seed A's cache with a sentinel; the pass must trust it
        graph.get_mut("A").unwrap().earliest_finish = Some(100);

        let times = earliest_times(&mut graph).unwrap();
        let b_start = times.iter().find(|(id, _)| id == "B").unwrap().1;
        assert_eq!(b_start, 100);
    }

    #[test]
    fn earliest_times_detect_cycles() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![
                record("A", 1, &["C"]),
                record("B", 1, &["A"]),
                record("C", 1, &["B"]),
            ])
            .unwrap();

        assert!(matches!(
            earliest_times(&mut graph),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn removal_reprimes_sole_dependent_to_zero_start() {
        let mut graph = example_graph();
        let _ = earliest_times(&mut graph).unwrap();

        graph.remove("A").unwrap();
        graph.remove("B").unwrap();

        // C lost both prerequisites and became a root
        let times = earliest_times(&mut graph).unwrap();
        assert_eq!(times, vec![("C".to_string(), 0)]);
    }

    #[test]
    fn diamond_takes_longest_path() {
        let mut graph = TaskGraph::new();
        graph
            .load(vec![
                record("A", 1, &[]),
                record("B", 10, &["A"]),
                record("C", 2, &["A"]),
                record("D", 1, &["B", "C"]),
            ])
            .unwrap();

        let times = earliest_times(&mut graph).unwrap();
        let d_start = times.iter().find(|(id, _)| id == "D").unwrap().1;
        assert_eq!(d_start, 11); // through B, not C
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random acyclic graphs: each task may only depend on
        /// earlier-generated tasks, so cycles are impossible.
        fn arb_dag() -> impl Strategy<Value = Vec<TaskRecord>> {
            prop::collection::vec(
                (0u64..100, prop::collection::vec(any::<prop::sample::Index>(), 0..4)),
                1..25,
            )
            .prop_map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .map(|(i, (duration, picks))| {
                        let deps: Vec<String> = if i == 0 {
                            vec![]
                        } else {
                            picks.iter().map(|p| format!("T{}", p.index(i))).collect()
                        };
                        TaskRecord::new(format!("T{}", i), *duration, deps)
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn dependencies_precede_dependents(records in arb_dag()) {
                let mut graph = TaskGraph::new();
                graph.load(records).unwrap();

                let order = topological_order(&graph).unwrap();
                let position: HashMap<&str, usize> = order
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.as_str(), i))
                    .collect();

                for task in graph.snapshot() {
                    for dep in task.depends_on.iter() {
                        prop_assert!(position[dep] < position[task.id.as_str()]);
                    }
                }
            }

            #[test]
            fn start_plus_duration_is_finish(records in arb_dag()) {
                let mut graph = TaskGraph::new();
                graph.load(records).unwrap();

                let times = earliest_times(&mut graph).unwrap();
                for (id, start) in &times {
                    let task = graph.get(id).unwrap();
                    prop_assert_eq!(start + task.duration, task.earliest_finish().unwrap());
                }
            }

            #[test]
            fn finish_never_precedes_dependency_finish(records in arb_dag()) {
                let mut graph = TaskGraph::new();
                graph.load(records).unwrap();

                earliest_times(&mut graph).unwrap();
                for task in graph.snapshot() {
                    for dep in task.depends_on.iter() {
                        let dep_finish = graph.get(dep).unwrap().earliest_finish().unwrap();
                        prop_assert!(task.earliest_finish().unwrap() >= dep_finish);
                    }
                }
            }
        }
    }
}
