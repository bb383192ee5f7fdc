//! Evaluation runner.
//!
//! # Architecture
//!
//! ```text
//! Task → prompt → model → extract code → compile check → behavior check → AttemptRecord
//!                  └──────────────── k times per task ────────────────┘
//! ```
//!
//! The runner:
//! 1. Renders the task prompt and draws `k` generations
//! 2. Extracts the Cryptol snippet and prepends any setup code
//! 3. Type-checks it with `cryptol` under a timeout
//! 4. Verifies it with the task's SAW harness or its assertion statements
//! 5. Streams every attempt to the run directory and aggregates metrics
//!
//! # Example
//!
//! ```ignore
//! use cryptol_eval::runner::{EvalConfig, EvalRunner, RunWriter};
//!
//! let config = EvalConfig::new("./tasks.jsonl").with_default_k(3);
//! let runner = EvalRunner::from_config(&config, Box::new(OfflineProvider::new()))?;
//! let mut writer = RunWriter::create(&config.output_dir, "20250101_000000")?;
//! let report = runner.run(&tasks, &mut session, &mut writer).await?;
//!
//! println!("pass@k verify: {:.3}", report.metrics.pass_at_k_verify);
//! ```

pub mod config;
pub mod executor;
pub mod output;
pub mod result;
pub mod verifier;

pub use config::{EvalConfig, DEFAULT_K, DEFAULT_MODEL};
pub use executor::{EvalRunner, RunReport, RunnerError};
pub use output::{timestamp_tag, MetricsReport, RunWriter};
pub use result::{AssertionResult, AttemptRecord, TaskSummary, VerificationReport};
pub use verifier::{normalize_statement, BehaviorVerifier};
