//! Behavior verification for generated snippets.
//!
//! Two paths exist, chosen per task by its [`VerificationPlan`]:
//!
//! - **Harness**: run the proof tool on the task's harness file; the verdict is
//!   the tool's exit status.
//! - **Assertions**: load the generated source into a live session and
//!   evaluate each test statement in order.
//!
//! The live session keeps definitions between loads, so the assertion path
//! always resets it before returning, whatever happened in between.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::result::{AssertionResult, VerificationReport};
use crate::catalog::VerificationPlan;
use crate::checker::{ExternalChecker, ScratchFile};
use crate::session::LiveSession;

/// Runs harness or assertion verification for one attempt.
pub struct BehaviorVerifier {
    harness_checker: Box<dyn ExternalChecker>,
    scratch_dir: PathBuf,
    extension: String,
    keep_scratch: bool,
    session_source_dir: Option<PathBuf>,
}

impl BehaviorVerifier {
    pub fn new(harness_checker: Box<dyn ExternalChecker>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            harness_checker,
            scratch_dir: scratch_dir.into(),
            extension: "cry".to_string(),
            keep_scratch: false,
            session_source_dir: None,
        }
    }

    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    /// Directory under which the session server sees the scratch files.
    pub fn with_session_source_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.session_source_dir = dir;
        self
    }

    /// Verifies `source` according to `plan`.
    ///
    /// Returns `None` when the plan is empty; the attempt then stays unverified
    /// and neither the proof tool nor the session is touched.
    pub async fn verify(
        &self,
        plan: &VerificationPlan,
        source: &str,
        session: &mut dyn LiveSession,
    ) -> Option<VerificationReport> {
        match plan {
            VerificationPlan::None => None,
            VerificationPlan::Harness(path) => Some(self.run_harness(path).await),
            VerificationPlan::Assertions(statements) => {
                Some(self.run_assertions(source, statements, session).await)
            }
        }
    }

    /// Runs the proof tool on a harness file.
    pub async fn run_harness(&self, harness: &Path) -> VerificationReport {
        if !harness.is_file() {
            warn!(harness = %harness.display(), "Harness file not found");
            return VerificationReport::Harness {
                succeeded: false,
                transcript: format!("harness file not found: {}", harness.display()),
            };
        }

        debug!(
            checker = self.harness_checker.name(),
            harness = %harness.display(),
            "Running proof harness"
        );
        let outcome = self.harness_checker.check(harness).await;
        VerificationReport::Harness {
            succeeded: outcome.succeeded,
            transcript: outcome.transcript,
        }
    }

    /// Evaluates `statements` against `source` in the live session, then
    /// resets the session.
    ///
    /// A reset failure is logged and otherwise ignored: the verdict has
    /// already been decided and the next `connect` starts from a clean state.
    pub async fn run_assertions(
        &self,
        source: &str,
        statements: &[String],
        session: &mut dyn LiveSession,
    ) -> VerificationReport {
        let report = self.assert_in_session(source, statements, session).await;

        if let Err(e) = session.reset().await {
            warn!(error = %e, "Session reset failed");
        }

        report
    }

    async fn assert_in_session(
        &self,
        source: &str,
        statements: &[String],
        session: &mut dyn LiveSession,
    ) -> VerificationReport {
        if let Err(e) = session.connect().await {
            return VerificationReport::load_failed(format!("failed to open session: {}", e));
        }

        let scratch = match ScratchFile::create(
            &self.scratch_dir,
            &self.extension,
            source,
            self.keep_scratch,
        ) {
            Ok(scratch) => scratch,
            Err(e) => {
                return VerificationReport::load_failed(format!(
                    "failed to write scratch file: {}",
                    e
                ))
            }
        };

        let load_path = self.session_path(&scratch);
        if let Err(e) = session.load_source(&load_path).await {
            info!(error = %e, "Generated source failed to load into session");
            return VerificationReport::load_failed(e.to_string());
        }

        let mut results = Vec::with_capacity(statements.len());
        for (idx, raw) in statements.iter().enumerate() {
            let index = idx + 1;
            let statement = normalize_statement(raw);
            if statement.is_empty() {
                results.push(AssertionResult::fail(index, raw.as_str(), "empty statement"));
                continue;
            }

            let result = match session.execute(statement).await {
                Ok(true) => AssertionResult::pass(index, statement),
                Ok(false) => {
                    AssertionResult::fail(index, statement, "assertion evaluated to False")
                }
                Err(e) => AssertionResult::fail(index, statement, e.to_string()),
            };
            debug!(index, passed = result.passed, "Assertion evaluated");
            results.push(result);
        }

        VerificationReport::from_assertions(results)
    }

    fn session_path(&self, scratch: &ScratchFile) -> PathBuf {
        match self.session_source_dir {
            Some(ref dir) => dir.join(scratch.file_name()),
            None => scratch.path().to_path_buf(),
        }
    }
}

/// Trims a statement and drops a leading `assert` keyword.
pub fn normalize_statement(statement: &str) -> &str {
    let trimmed = statement.trim();
    match trimmed.strip_prefix("assert") {
        Some(rest) if rest.starts_with(|c: char| c.is_whitespace() || c == '(') => rest.trim(),
        _ => trimmed,
    }
}
