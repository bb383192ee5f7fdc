//! Per-attempt records and verification transcripts.

use serde::{Deserialize, Serialize};

/// Everything recorded about one (task, attempt) pair.
///
/// One of these is written per line to `raw_generations.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub task_id: String,
    /// Draw index in `[0, k)`.
    pub attempt_index: u32,
    pub model: String,
    /// Rendered prompt sent to the model.
    pub prompt: String,
    /// Raw model output.
    pub generated_text: String,
    /// Code extracted from the model output, before setup code is prepended.
    pub generated_code: String,
    pub compiled: bool,
    /// False whenever the task has no verification path.
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationReport>,
}

impl AttemptRecord {
    /// Creates a record for an attempt whose model call succeeded.
    pub fn generated(
        task_id: impl Into<String>,
        attempt_index: u32,
        model: impl Into<String>,
        prompt: impl Into<String>,
        generated_text: impl Into<String>,
        generated_code: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            attempt_index,
            model: model.into(),
            prompt: prompt.into(),
            generated_text: generated_text.into(),
            generated_code: generated_code.into(),
            compiled: false,
            verified: false,
            generation_error: None,
            compile_transcript: None,
            verification: None,
        }
    }

    /// Creates a record for an attempt whose model call failed.
    ///
    /// The attempt still counts toward the denominators; it can never compile
    /// or verify.
    pub fn generation_failed(
        task_id: impl Into<String>,
        attempt_index: u32,
        model: impl Into<String>,
        prompt: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut record = Self::generated(task_id, attempt_index, model, prompt, "", "");
        record.generation_error = Some(error.into());
        record
    }

    pub fn with_compile(mut self, compiled: bool, transcript: impl Into<String>) -> Self {
        self.compiled = compiled;
        self.compile_transcript = Some(transcript.into());
        self
    }

    pub fn with_verification(mut self, report: VerificationReport) -> Self {
        self.verified = report.succeeded();
        self.verification = Some(report);
        self
    }
}

/// Outcome of one assertion statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// 1-based position in the task's test list.
    pub index: usize,
    pub statement: String,
    pub passed: bool,
    pub message: String,
}

impl AssertionResult {
    pub fn pass(index: usize, statement: impl Into<String>) -> Self {
        Self {
            index,
            statement: statement.into(),
            passed: true,
            message: "ok".to_string(),
        }
    }

    pub fn fail(index: usize, statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            statement: statement.into(),
            passed: false,
            message: message.into(),
        }
    }

    /// Transcript line, e.g. `[FAIL] test 2: assertion evaluated to False`.
    pub fn line(&self) -> String {
        let tag = if self.passed { "PASS" } else { "FAIL" };
        format!("[{}] test {}: {}", tag, self.index, self.message)
    }
}

/// What the behavior verifier observed for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerificationReport {
    /// Proof-harness run.
    Harness { succeeded: bool, transcript: String },
    /// Assertion statements evaluated in a live session.
    Assertions {
        succeeded: bool,
        /// Set when the session could not be opened or the source failed to load;
        /// no statements run in that case.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_error: Option<String>,
        results: Vec<AssertionResult>,
    },
}

impl VerificationReport {
    pub fn succeeded(&self) -> bool {
        match self {
            VerificationReport::Harness { succeeded, .. } => *succeeded,
            VerificationReport::Assertions { succeeded, .. } => *succeeded,
        }
    }

    /// Builds an assertion report; it succeeds only if every statement passed.
    pub fn from_assertions(results: Vec<AssertionResult>) -> Self {
        let succeeded = results.iter().all(|r| r.passed);
        VerificationReport::Assertions {
            succeeded,
            load_error: None,
            results,
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        VerificationReport::Assertions {
            succeeded: false,
            load_error: Some(message.into()),
            results: Vec::new(),
        }
    }

    /// Human-readable transcript lines for `transcript.log`.
    pub fn transcript_lines(&self) -> Vec<String> {
        match self {
            VerificationReport::Harness {
                succeeded,
                transcript,
            } => {
                let tag = if *succeeded { "PASS" } else { "FAIL" };
                vec![format!("[{}] harness", tag), transcript.clone()]
            }
            VerificationReport::Assertions {
                load_error,
                results,
                ..
            } => {
                let mut lines = Vec::with_capacity(results.len() + 1);
                if let Some(error) = load_error {
                    lines.push(format!("[FAIL] load: {}", error));
                }
                lines.extend(results.iter().map(AssertionResult::line));
                lines
            }
        }
    }
}

/// Per-task rollup produced by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub attempts: u32,
    pub compiled_any: bool,
    pub verified_any: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failed_record() {
        let record = AttemptRecord::generation_failed("t1", 2, "m", "prompt", "HTTP 500");
        assert_eq!(record.attempt_index, 2);
        assert!(!record.compiled);
        assert!(!record.verified);
        assert_eq!(record.generation_error.as_deref(), Some("HTTP 500"));
        assert!(record.generated_code.is_empty());
    }

    #[test]
    fn test_with_verification_sets_verified() {
        let record = AttemptRecord::generated("t1", 0, "m", "p", "raw", "code")
            .with_compile(true, "Type checked.")
            .with_verification(VerificationReport::Harness {
                succeeded: true,
                transcript: "Proof succeeded".to_string(),
            });
        assert!(record.compiled);
        assert!(record.verified);
    }

    #[test]
    fn test_assertion_report_requires_all_pass() {
        let report = VerificationReport::from_assertions(vec![
            AssertionResult::pass(1, "f 1 == 2"),
            AssertionResult::fail(2, "f 2 == 3", "Undefined name g"),
        ]);
        assert!(!report.succeeded());
        assert_eq!(
            report.transcript_lines(),
            vec![
                "[PASS] test 1: ok".to_string(),
                "[FAIL] test 2: Undefined name g".to_string(),
            ]
        );

        let empty = VerificationReport::from_assertions(Vec::new());
        assert!(empty.succeeded());
    }

    #[test]
    fn test_record_serialization_skips_empty_extras() {
        let record = AttemptRecord::generated("t1", 0, "m", "p", "raw", "code");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["task_id"], "t1");
        assert_eq!(json["generated_code"], "code");
        assert!(json.get("generation_error").is_none());
        assert!(json.get("verification").is_none());

        let report = VerificationReport::load_failed("parse error");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "assertions");
        assert_eq!(json["load_error"], "parse error");
    }
}
