//! Configuration for evaluation runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checker::TYPE_CHECKED_MARKER;
use crate::error::ConfigError;
use crate::llm::DEFAULT_API_BASE;
use crate::session::DEFAULT_SERVER_URL;
use crate::utils::DEFAULT_LANGUAGE;

/// Model evaluated when none is configured.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-Coder-30B-A3B-Instruct";

/// Attempts per task when neither the task nor the run sets `k`.
pub const DEFAULT_K: u32 = 5;

/// Configuration for one evaluation run.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Model identifier sent to the provider.
    pub model: String,
    /// JSON-lines task catalog.
    pub tasks_path: PathBuf,
    /// Attempts per task when the task does not set its own `k`.
    pub default_k: u32,
    /// Root directory for run artifacts; each run gets a timestamped subdirectory.
    pub output_dir: PathBuf,
    /// Where generated snippets are written before checking.
    pub scratch_dir: PathBuf,
    /// Keep scratch files after checking instead of deleting them.
    pub keep_scratch: bool,
    /// Record generations without compiling or verifying them.
    pub generate_only: bool,
    /// Fence language tag used when extracting code from model output.
    pub language: String,
    /// Cryptol executable used for the compile check.
    pub cryptol_program: String,
    /// SAW executable used for harness verification.
    pub saw_program: String,
    pub compile_timeout_secs: u64,
    pub harness_timeout_secs: u64,
    /// Stdout marker the compile check must see.
    pub success_marker: String,
    /// Cryptol remote API endpoint for assertion runs.
    pub session_url: String,
    /// Scratch directory as seen by the session server, when it runs elsewhere
    /// (for example in a container with the scratch dir mounted).
    pub session_source_dir: Option<PathBuf>,
    pub session_timeout_secs: u64,
    /// OpenAI-compatible endpoint for generation.
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub temperature: f64,
}

impl EvalConfig {
    /// Creates a configuration for the given catalog with defaults elsewhere.
    pub fn new(tasks_path: impl Into<PathBuf>) -> Self {
        Self {
            tasks_path: tasks_path.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_default_k(mut self, k: u32) -> Self {
        self.default_k = k;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    pub fn with_generate_only(mut self, generate_only: bool) -> Self {
        self.generate_only = generate_only;
        self
    }

    pub fn with_cryptol_program(mut self, program: impl Into<String>) -> Self {
        self.cryptol_program = program.into();
        self
    }

    pub fn with_saw_program(mut self, program: impl Into<String>) -> Self {
        self.saw_program = program.into();
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_harness_timeout(mut self, timeout: Duration) -> Self {
        self.harness_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_session_url(mut self, url: impl Into<String>) -> Self {
        self.session_url = url.into();
        self
    }

    pub fn with_session_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_source_dir = Some(dir.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn harness_timeout(&self) -> Duration {
        Duration::from_secs(self.harness_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the configuration for values that would make the run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("model must not be empty".to_string()));
        }
        if self.default_k == 0 {
            return Err(ConfigError::ValidationFailed("default_k must be at least 1".to_string()));
        }
        if self.compile_timeout_secs == 0 || self.harness_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "checker timeouts must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("language must not be empty".to_string()));
        }
        if self.success_marker.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "success_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            tasks_path: PathBuf::from("./tasks.jsonl"),
            default_k: DEFAULT_K,
            output_dir: PathBuf::from("./outputs"),
            scratch_dir: std::env::temp_dir().join("cryptol-eval"),
            keep_scratch: false,
            generate_only: false,
            language: DEFAULT_LANGUAGE.to_string(),
            cryptol_program: "cryptol".to_string(),
            saw_program: "saw".to_string(),
            compile_timeout_secs: 60,
            harness_timeout_secs: 300,
            success_marker: TYPE_CHECKED_MARKER.to_string(),
            session_url: DEFAULT_SERVER_URL.to_string(),
            session_source_dir: None,
            session_timeout_secs: 120,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 300,
            temperature: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_eval_config_defaults() {
        let config = EvalConfig::new("./suite.jsonl");
        assert_eq!(config.tasks_path, PathBuf::from("./suite.jsonl"));
        assert_eq!(config.default_k, 5);
        assert_eq!(config.compile_timeout(), Duration::from_secs(60));
        assert_eq!(config.harness_timeout(), Duration::from_secs(300));
        assert_eq!(config.success_marker, "Type checked.");
        assert_eq!(config.language, "cryptol");
        assert!(!config.keep_scratch);
        assert!(!config.generate_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eval_config_builder() {
        let config = EvalConfig::new("./suite.jsonl")
            .with_model("local/model")
            .with_default_k(3)
            .with_compile_timeout(Duration::from_secs(10))
            .with_keep_scratch(true)
            .with_temperature(0.0);

        assert_eq!(config.model, "local/model");
        assert_eq!(config.default_k, 3);
        assert_eq!(config.compile_timeout_secs, 10);
        assert!(config.keep_scratch);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EvalConfig::default().with_default_k(0).validate().is_err());
        assert!(EvalConfig::default().with_model("  ").validate().is_err());
        assert!(EvalConfig::default().with_temperature(3.5).validate().is_err());
        assert!(EvalConfig::default()
            .with_harness_timeout(Duration::from_millis(10))
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_yaml_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("eval.yaml");
        fs::write(&path, "model: my/model\ndefault_k: 2\nkeep_scratch: true\n").unwrap();

        let config = EvalConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.model, "my/model");
        assert_eq!(config.default_k, 2);
        assert!(config.keep_scratch);
        assert_eq!(config.cryptol_program, "cryptol");

        fs::write(&path, "generate_only: true\n").unwrap();
        let config = EvalConfig::from_yaml_file(&path).unwrap();
        assert!(config.generate_only);
        assert!(!config.with_generate_only(false).generate_only);

        fs::write(&path, "default_k: [not, a, number]\n").unwrap();
        assert!(matches!(
            EvalConfig::from_yaml_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
