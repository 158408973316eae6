//! Line-oriented plan file storage
//!
//! Plans are stored as one record per line, comma-separated:
//!
//! ```text
//! id, duration, dep1, dep2, ...
//! ```
//!
//! The first field is the task id, the second its integer duration, and
//! any remaining fields are dependency ids. There is no escaping; ids must
//! not contain commas. Blank lines are skipped and empty dependency fields
//! are ignored. Uses file locking for concurrent access safety.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{GraphError, TaskRecord};

/// Store for a plan file in the line format
pub struct PlanStore {
    path: PathBuf,
}

impl PlanStore {
    /// Creates a store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the plan file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records from the plan file.
    ///
    /// A missing file reads as an empty plan. Any unparseable line fails
    /// the whole read with a [`GraphError::MalformedRecord`] carrying the
    /// 1-based line number.
    pub fn read_records(&self) -> Result<Vec<TaskRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open plan file: {}", self.path.display()))?;

        // Shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on plan file")?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            records.push(parse_line(&line, line_num + 1)?);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Writes all records to the plan file (full rewrite).
    ///
    /// Writes to a temp file first, then renames over the target, holding
    /// an exclusive lock while writing.
    pub fn write_records<'a>(
        &self,
        records: impl IntoIterator<Item = &'a TaskRecord>,
    ) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let temp_path = self.path.with_extension("txt.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on plan file")?;

            let mut writer = BufWriter::new(&file);
            for record in records {
                writeln!(writer, "{}", render_record(record)).context("Failed to write record")?;
            }

            writer.flush().context("Failed to flush plan file")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Writes an already-rendered artifact (sequence or times listing)
    pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))
    }
}

/// Parses one plan line into a record
fn parse_line(line: &str, line_num: usize) -> Result<TaskRecord, GraphError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() < 2 {
        return Err(GraphError::MalformedRecord {
            record: line_num,
            reason: "expected at least an id and a duration".to_string(),
        });
    }

    let id = fields[0];
    if id.is_empty() {
        return Err(GraphError::MalformedRecord {
            record: line_num,
            reason: "empty task id".to_string(),
        });
    }

    let duration: u64 = fields[1].parse().map_err(|_| GraphError::MalformedRecord {
        record: line_num,
        reason: format!("invalid duration '{}'", fields[1]),
    })?;

    let depends_on = fields[2..]
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
        .collect();

    Ok(TaskRecord::new(id, duration, depends_on))
}

/// Renders a record back into the line format
fn render_record(record: &TaskRecord) -> String {
    let mut line = format!("{}, {}", record.id, record.duration);
    for dep in &record.depends_on {
        line.push_str(", ");
        line.push_str(dep);
    }
    line
}
