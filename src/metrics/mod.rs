//! Run-level metrics.
//!
//! Two kinds of rate are reported and they must not be confused:
//!
//! - **Attempt-level** rates (`compile_rate`, `verify_rate`) divide successes
//!   by every attempt drawn.
//! - **Task-level** pass@k (`pass_at_k_compile`, `pass_at_k_verify`) is the
//!   fraction of tasks where at least one of the attempts succeeded.
//!
//! A task with k attempts and one compiling attempt adds k to the first
//! denominator but only 1 to the second numerator.

mod pass_at_k;

pub use pass_at_k::{estimate_pass_at_k, mean_pass_at_k};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::runner::AttemptRecord;

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub task_count: usize,
    pub total_attempts: usize,
    pub compile_successes: usize,
    pub verify_successes: usize,
    pub compile_rate: f64,
    pub verify_rate: f64,
    pub pass_at_k_compile: f64,
    pub pass_at_k_verify: f64,
    /// Unbiased pass@1 averaged over tasks that drew attempts.
    pub pass_at_1_compile: f64,
    pub pass_at_1_verify: f64,
}

#[derive(Default)]
struct TaskTally {
    attempts: usize,
    compiled: usize,
    verified: usize,
}

/// Folds attempt records into [`RunMetrics`].
///
/// `task_count` is the number of tasks in the catalog; tasks that produced no
/// attempts still count toward the pass@k denominators. Records are grouped by
/// `task_id` and the result does not depend on their order.
pub fn aggregate(attempts: &[AttemptRecord], task_count: usize) -> RunMetrics {
    let mut tallies: BTreeMap<&str, TaskTally> = BTreeMap::new();
    for record in attempts {
        let tally = tallies.entry(record.task_id.as_str()).or_default();
        tally.attempts += 1;
        tally.compiled += usize::from(record.compiled);
        tally.verified += usize::from(record.verified);
    }

    let total_attempts = attempts.len();
    let compile_successes = attempts.iter().filter(|r| r.compiled).count();
    let verify_successes = attempts.iter().filter(|r| r.verified).count();

    let task_count = task_count.max(tallies.len());
    let tasks_compiled = tallies.values().filter(|t| t.compiled > 0).count();
    let tasks_verified = tallies.values().filter(|t| t.verified > 0).count();

    let compile_pairs: Vec<(usize, usize)> =
        tallies.values().map(|t| (t.attempts, t.compiled)).collect();
    let verify_pairs: Vec<(usize, usize)> =
        tallies.values().map(|t| (t.attempts, t.verified)).collect();

    RunMetrics {
        task_count,
        total_attempts,
        compile_successes,
        verify_successes,
        compile_rate: ratio(compile_successes, total_attempts),
        verify_rate: ratio(verify_successes, total_attempts),
        pass_at_k_compile: ratio(tasks_compiled, task_count),
        pass_at_k_verify: ratio(tasks_verified, task_count),
        pass_at_1_compile: mean_pass_at_k(&compile_pairs, 1),
        pass_at_1_verify: mean_pass_at_k(&verify_pairs, 1),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
