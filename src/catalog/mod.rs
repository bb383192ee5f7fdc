//! Task catalog loading.
//!
//! A catalog is a JSON-lines file, one task per non-empty line:
//!
//! ```text
//! {"task_id": "parity", "prompt": "Compute the parity of a byte", "k": 3, "harness": "proofs/parity.saw"}
//! {"task_id": "xor", "task": "XOR two bytes", "test_list": ["xorBytes 0x0f 0xf0 == 0xff"]}
//! ```
//!
//! Loading is all-or-nothing. A single malformed line, a duplicated id or a
//! task declaring both verification paths fails the whole load.

mod task;

pub use task::{Task, TaskType, VerificationPlan, DEFAULT_MAX_NEW_TOKENS};

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::CatalogError;
use task::RawTask;

/// Loads every task from a JSON-lines file, preserving file order.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let tasks = parse_tasks(&content)?;
    info!("Loaded {} tasks from {}", tasks.len(), path.display());
    Ok(tasks)
}

/// Parses JSON-lines catalog text. Line numbers in errors are 1-based.
pub fn parse_tasks(content: &str) -> Result<Vec<Task>, CatalogError> {
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawTask =
            serde_json::from_str(line).map_err(|e| CatalogError::MalformedTask {
                line: line_no,
                message: e.to_string(),
            })?;

        let task = raw
            .into_task(tasks.len())
            .map_err(|message| CatalogError::MalformedTask {
                line: line_no,
                message,
            })?;

        if task.harness.is_some() && !task.test_list.is_empty() {
            return Err(CatalogError::ConflictingVerification {
                task_id: task.task_id,
            });
        }

        if !seen.insert(task.task_id.clone()) {
            return Err(CatalogError::DuplicateTaskId {
                task_id: task.task_id,
                line: line_no,
            });
        }

        debug!(task_id = %task.task_id, task_type = %task.task_type, "Parsed task");
        tasks.push(task);
    }

    Ok(tasks)
}
