//! cryptol-eval: pass@k evaluation harness for model-generated Cryptol.
//!
//! The pipeline loads a JSON-lines task catalog, draws k generations per task
//! from a chat model, extracts the Cryptol snippet from each reply,
//! type-checks it with `cryptol`, verifies it with a SAW harness or with
//! assertion statements evaluated in a Cryptol remote API session, and rolls
//! the per-attempt verdicts up into attempt-level rates and task-level pass@k.

pub mod catalog;
pub mod checker;
pub mod cli;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod prompts;
pub mod runner;
pub mod session;
pub mod utils;

pub use error::{CatalogError, ConfigError, LlmError, OutputError, SessionError};
