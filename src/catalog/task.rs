//! Typed task records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Generation budget used when a record does not set `max_new_tokens`.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;

/// Which prompt template a task is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Ask the model for a function implementing the task.
    #[default]
    Function,
    /// Ask the model for a property that tests the described function.
    Property,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Function => write!(f, "function"),
            TaskType::Property => write!(f, "property"),
        }
    }
}

/// How an attempt's behavior is checked once it has been generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationPlan {
    /// Nothing beyond the compile check; `verified` stays false.
    None,
    /// Run the proof tool against this harness file.
    Harness(PathBuf),
    /// Evaluate these statements, in order, in a live session.
    Assertions(Vec<String>),
}

impl VerificationPlan {
    pub fn is_none(&self) -> bool {
        matches!(self, VerificationPlan::None)
    }
}

/// One evaluation unit from the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub task_id: String,
    pub prompt: String,
    /// Attempts to draw; the run default applies when absent.
    pub k: Option<u32>,
    pub max_new_tokens: u32,
    pub harness: Option<String>,
    pub test_list: Vec<String>,
    pub test_setup_code: Option<String>,
    pub task_type: TaskType,
}

impl Task {
    /// Creates a function task with no verification path.
    pub fn new(task_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            prompt: prompt.into(),
            k: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            harness: None,
            test_list: Vec::new(),
            test_setup_code: None,
            task_type: TaskType::Function,
        }
    }

    pub fn with_k(mut self, k: u32) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_harness(mut self, harness: impl Into<String>) -> Self {
        self.harness = Some(harness.into());
        self
    }

    pub fn with_tests(mut self, tests: Vec<String>) -> Self {
        self.test_list = tests;
        self
    }

    pub fn with_setup_code(mut self, code: impl Into<String>) -> Self {
        self.test_setup_code = Some(code.into());
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Number of attempts to draw for this task.
    pub fn attempts(&self, default_k: u32) -> u32 {
        self.k.unwrap_or(default_k)
    }

    /// Setup code, if the task carries any non-blank snippet.
    pub fn setup_code(&self) -> Option<&str> {
        self.test_setup_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
    }

    /// Prepends the setup code to a generated snippet.
    pub fn with_setup(&self, generated: &str) -> String {
        match self.setup_code() {
            Some(setup) => format!("{}\n\n{}", setup, generated),
            None => generated.to_string(),
        }
    }

    /// The verification path this task selects.
    ///
    /// The catalog rejects tasks carrying both a harness and a test list, so
    /// at most one of the two is set here.
    pub fn verification_plan(&self) -> VerificationPlan {
        if let Some(harness) = self.harness.as_deref() {
            return VerificationPlan::Harness(PathBuf::from(harness));
        }
        if !self.test_list.is_empty() {
            return VerificationPlan::Assertions(self.test_list.clone());
        }
        VerificationPlan::None
    }
}

/// Wire shape of one catalog line.
#[derive(Debug, Deserialize)]
pub(super) struct RawTask {
    #[serde(default)]
    pub task_id: Option<serde_json::Value>,
    #[serde(alias = "task")]
    pub prompt: String,
    #[serde(default)]
    pub k: Option<u32>,
    #[serde(default)]
    pub max_new_tokens: Option<u32>,
    #[serde(default)]
    pub harness: Option<String>,
    #[serde(default)]
    pub test_list: Option<Vec<String>>,
    #[serde(default)]
    pub test_setup_code: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: Option<TaskType>,
}

impl RawTask {
    /// Normalizes a raw record; `row` names tasks that carry no id.
    pub(super) fn into_task(self, row: usize) -> Result<Task, String> {
        let task_id = match self.task_id {
            None | Some(serde_json::Value::Null) => format!("row{}", row),
            Some(serde_json::Value::String(id)) if id.trim().is_empty() => {
                return Err("task_id is empty".to_string())
            }
            Some(serde_json::Value::String(id)) => id,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("task_id must be a string, got {}", other)),
        };

        if self.k == Some(0) {
            return Err(format!("task '{}' has k = 0; k must be at least 1", task_id));
        }

        Ok(Task {
            task_id,
            prompt: self.prompt,
            k: self.k,
            max_new_tokens: self.max_new_tokens.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
            harness: self.harness.filter(|h| !h.trim().is_empty()),
            test_list: self.test_list.unwrap_or_default(),
            test_setup_code: self.test_setup_code,
            task_type: self.task_type.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_uses_default_when_unset() {
        let task = Task::new("t1", "xor two bytes");
        assert_eq!(task.attempts(5), 5);
        assert_eq!(task.with_k(2).attempts(5), 2);
    }

    #[test]
    fn test_with_setup_prepends_code() {
        let task = Task::new("t1", "p").with_setup_code("type Byte = [8]");
        assert_eq!(task.with_setup("f x = x"), "type Byte = [8]\n\nf x = x");

        let blank = Task::new("t2", "p").with_setup_code("   ");
        assert_eq!(blank.with_setup("f x = x"), "f x = x");
    }

    #[test]
    fn test_verification_plan_selection() {
        assert!(Task::new("a", "p").verification_plan().is_none());
        assert_eq!(
            Task::new("b", "p").with_harness("proofs/b.saw").verification_plan(),
            VerificationPlan::Harness(PathBuf::from("proofs/b.saw"))
        );
        assert_eq!(
            Task::new("c", "p")
                .with_tests(vec!["f 1 == 2".to_string()])
                .verification_plan(),
            VerificationPlan::Assertions(vec!["f 1 == 2".to_string()])
        );
    }

    #[test]
    fn test_task_type_display() {
        assert_eq!(TaskType::Function.to_string(), "function");
        assert_eq!(TaskType::Property.to_string(), "property");
    }
}
