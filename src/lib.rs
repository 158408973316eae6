//! planline - Dependency-aware task scheduling for project plans
//!
//! Tracks named tasks with durations and prerequisites, and derives two
//! scheduling artifacts from the dependency graph: a valid execution
//! order and the earliest start time of every task (critical-path
//! forward pass).

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{GraphError, Task, TaskGraph, TaskRecord};
