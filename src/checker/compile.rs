//! Compile checking of generated snippets.

use std::path::{Path, PathBuf};

use tracing::warn;

use super::{CheckOutcome, ExternalChecker, ScratchFile};

/// Type-checks source text by writing it to a fresh scratch file and handing
/// that file to an [`ExternalChecker`].
pub struct CompileChecker {
    checker: Box<dyn ExternalChecker>,
    scratch_dir: PathBuf,
    extension: String,
    keep_scratch: bool,
}

impl CompileChecker {
    pub fn new(checker: Box<dyn ExternalChecker>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            checker,
            scratch_dir: scratch_dir.into(),
            extension: "cry".to_string(),
            keep_scratch: false,
        }
    }

    /// Leaves scratch files on disk after checking, for debugging.
    pub fn with_keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Checks `source`. Failing to write the scratch file is a failing outcome.
    pub async fn check_source(&self, source: &str) -> CheckOutcome {
        let scratch = match ScratchFile::create(
            &self.scratch_dir,
            &self.extension,
            source,
            self.keep_scratch,
        ) {
            Ok(scratch) => scratch,
            Err(e) => {
                warn!(
                    "Failed to write scratch file under {}: {}",
                    self.scratch_dir.display(),
                    e
                );
                return CheckOutcome::fail(format!("failed to write scratch file: {}", e));
            }
        };

        self.checker.check(scratch.path()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Accepts files whose contents mention "ok", remembering every path.
    #[derive(Default)]
    struct RecordingChecker {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ExternalChecker for RecordingChecker {
        fn name(&self) -> &str {
            "recording"
        }

        async fn check(&self, path: &Path) -> CheckOutcome {
            self.seen.lock().unwrap().push(path.to_path_buf());
            let content = fs::read_to_string(path).unwrap_or_default();
            if content.starts_with("ok") {
                CheckOutcome::pass(content)
            } else {
                CheckOutcome::fail(content)
            }
        }
    }

    #[tokio::test]
    async fn test_each_check_uses_a_distinct_file() {
        let temp = TempDir::new().unwrap();
        let checker = CompileChecker::new(Box::new(RecordingChecker::default()), temp.path())
            .with_keep_scratch(true);

        assert!(checker.check_source("ok = True").await.succeeded);
        assert!(!checker.check_source("broken").await.succeeded);

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_scratch_removed_by_default() {
        let temp = TempDir::new().unwrap();
        let checker = CompileChecker::new(Box::new(RecordingChecker::default()), temp.path());

        let outcome = checker.check_source("ok = True").await;
        assert_eq!(outcome.transcript, "ok = True");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unwritable_scratch_dir_fails_softly() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let checker =
            CompileChecker::new(Box::new(RecordingChecker::default()), blocker.join("sub"));
        let outcome = checker.check_source("ok = True").await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.contains("failed to write scratch file"));
    }
}
