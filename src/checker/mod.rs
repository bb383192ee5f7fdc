//! External checkers.
//!
//! Both external tools the harness depends on, the Cryptol type-checker and
//! the SAW proof tool, are driven the same way: hand them a file, wait a
//! bounded time, and read a verdict off the exit status (plus, for Cryptol, a
//! success marker in stdout). [`ExternalChecker`] is that capability and
//! [`CheckOutcome`] its result, so the runner can take any backend without
//! caring which tool sits behind it.
//!
//! Checkers never return errors. A missing binary, a launch failure or a
//! timeout is a failing outcome whose transcript says what happened, so one
//! broken attempt cannot stop the rest of the corpus from being scored.

pub mod compile;
pub mod process;
pub mod scratch;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use compile::CompileChecker;
pub use process::{
    ProcessChecker, DEFAULT_COMPILE_TIMEOUT, DEFAULT_HARNESS_TIMEOUT, TYPE_CHECKED_MARKER,
};
pub use scratch::ScratchFile;

/// Verdict and raw output of one external check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub succeeded: bool,
    pub transcript: String,
}

impl CheckOutcome {
    pub fn pass(transcript: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            transcript: transcript.into(),
        }
    }

    pub fn fail(transcript: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            transcript: transcript.into(),
        }
    }
}

/// A tool that accepts or rejects a file.
#[async_trait]
pub trait ExternalChecker: Send + Sync {
    /// Short name for logs ("cryptol", "saw").
    fn name(&self) -> &str;

    /// Checks the file at `path`. Never fails; problems become a failing outcome.
    async fn check(&self, path: &Path) -> CheckOutcome;
}
