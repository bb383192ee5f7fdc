//! Subprocess-backed checkers with a hard timeout.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CheckOutcome, ExternalChecker};
use crate::utils::truncate;

/// Marker the Cryptol REPL prints after a module loads cleanly.
pub const TYPE_CHECKED_MARKER: &str = "Type checked.";

/// Default bound for one type-check.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound for one proof-harness run.
pub const DEFAULT_HARNESS_TIMEOUT: Duration = Duration::from_secs(300);

/// Placeholder replaced by the checked file's path in args and stdin.
const PATH_PLACEHOLDER: &str = "{path}";

const MAX_STREAM_CHARS: usize = 8_000;

/// Runs an external program against a file.
///
/// Success requires a zero exit status and, when a marker is configured, the
/// marker somewhere in stdout: some checkers exit zero even when loading
/// failed part way through.
#[derive(Debug, Clone)]
pub struct ProcessChecker {
    name: String,
    program: String,
    args: Vec<String>,
    stdin_template: Option<String>,
    success_marker: Option<String>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ProcessChecker {
    /// Creates a checker running `program` with `{path}` as its only argument.
    pub fn new(name: impl Into<String>, program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: vec![PATH_PLACEHOLDER.to_string()],
            stdin_template: None,
            success_marker: None,
            timeout,
            working_dir: None,
        }
    }

    /// Cryptol type-checker: feeds `:l <path>` to the REPL on stdin and
    /// requires [`TYPE_CHECKED_MARKER`] in its output.
    pub fn cryptol(program: impl Into<String>, timeout: Duration) -> Self {
        Self::new("cryptol", program, timeout)
            .with_args(Vec::new())
            .with_stdin(":l {path}\n")
            .with_success_marker(TYPE_CHECKED_MARKER)
    }

    /// SAW proof harness runner: `saw <path>`, judged on exit status alone.
    pub fn saw(program: impl Into<String>, timeout: Duration) -> Self {
        Self::new("saw", program, timeout)
    }

    /// Replaces the argument list; `{path}` in any argument is substituted.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Text written to stdin before it is closed; `{path}` is substituted.
    pub fn with_stdin(mut self, template: impl Into<String>) -> Self {
        self.stdin_template = Some(template.into());
        self
    }

    pub fn with_success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_marker = Some(marker.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn success_marker(&self) -> Option<&str> {
        self.success_marker.as_deref()
    }

    fn render_args(&self, path: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, path))
            .collect()
    }

    async fn run(&self, path: &Path) -> Result<CheckOutcome, String> {
        let path_str = path.display().to_string();
        let args = self.render_args(&path_str);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.stdin(if self.stdin_template.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(checker = %self.name, "Running {} {}", self.program, args.join(" "));
        let start = Instant::now();

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to launch {}: {}", self.program, e))?;

        let stdin_input = self
            .stdin_template
            .as_ref()
            .map(|template| template.replace(PATH_PLACEHOLDER, &path_str));
        let stdin = child.stdin.take();
        let program = self.program.as_str();

        // The stdin write sits inside the timed future so a child that never
        // reads cannot stall the check. Dropping the future on timeout drops
        // the child, and kill_on_drop takes it down with it.
        let finished = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, stdin_input) {
                match stdin.write_all(input.as_bytes()).await {
                    Ok(()) => {
                        stdin.shutdown().await.ok();
                    }
                    // The child exited without draining stdin; its exit
                    // status and output still decide the verdict.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!("{} closed stdin before reading it", program);
                    }
                    Err(e) => return Err(format!("failed to write to {} stdin: {}", program, e)),
                }
            }
            child
                .wait_with_output()
                .await
                .map_err(|e| format!("{} failed while running: {}", program, e))
        };

        let output = match tokio::time::timeout(self.timeout, finished).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(format!(
                    "{} timed out after {}s and was killed",
                    self.program,
                    self.timeout.as_secs_f64()
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);
        let marker_seen = self
            .success_marker
            .as_deref()
            .map_or(true, |marker| stdout.contains(marker));
        let succeeded = output.status.success() && marker_seen;

        debug!(
            checker = %self.name,
            exit_code,
            marker_seen,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Checker finished"
        );

        let mut transcript = format!("exit code: {}\n", exit_code);
        if output.status.success() && !marker_seen {
            if let Some(ref marker) = self.success_marker {
                transcript.push_str(&format!("success marker '{}' not found in stdout\n", marker));
            }
        }
        transcript.push_str(&format!(
            "--- stdout ---\n{}\n--- stderr ---\n{}",
            truncate(&stdout, MAX_STREAM_CHARS),
            truncate(&stderr, MAX_STREAM_CHARS)
        ));

        Ok(CheckOutcome {
            succeeded,
            transcript,
        })
    }
}

#[async_trait]
impl ExternalChecker for ProcessChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, path: &Path) -> CheckOutcome {
        match self.run(path).await {
            Ok(outcome) => outcome,
            Err(message) => {
                warn!(checker = %self.name, path = %path.display(), "{}", message);
                CheckOutcome::fail(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sh(script: &str, timeout: Duration) -> ProcessChecker {
        ProcessChecker::new("sh", "sh", timeout).with_args(vec![
            "-c".to_string(),
            script.to_string(),
            "checker".to_string(),
            "{path}".to_string(),
        ])
    }

    #[test]
    fn test_presets() {
        let cryptol = ProcessChecker::cryptol("cryptol", DEFAULT_COMPILE_TIMEOUT);
        assert_eq!(cryptol.name(), "cryptol");
        assert_eq!(cryptol.success_marker(), Some(TYPE_CHECKED_MARKER));
        assert!(cryptol.render_args("/tmp/x.cry").is_empty());

        let saw = ProcessChecker::saw("saw", DEFAULT_HARNESS_TIMEOUT);
        assert_eq!(saw.success_marker(), None);
        assert_eq!(saw.render_args("/tmp/h.saw"), vec!["/tmp/h.saw".to_string()]);
        assert_eq!(saw.timeout(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_zero_exit_without_marker_passes_when_no_marker_required() {
        let checker = sh("exit 0", Duration::from_secs(10));
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(outcome.succeeded);
        assert!(outcome.transcript.starts_with("exit code: 0"));
    }

    #[tokio::test]
    async fn test_marker_required_in_stdout() {
        let with_marker = sh(
            "echo 'Loading module Main'; echo 'Type checked.'",
            Duration::from_secs(10),
        )
        .with_success_marker(TYPE_CHECKED_MARKER);
        assert!(with_marker.check(Path::new("/dev/null")).await.succeeded);

        let without_marker = sh("echo 'Parse error'", Duration::from_secs(10))
            .with_success_marker(TYPE_CHECKED_MARKER);
        let outcome = without_marker.check(Path::new("/dev/null")).await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.contains("not found in stdout"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_even_with_marker() {
        let checker = sh("echo 'Type checked.'; exit 1", Duration::from_secs(10))
            .with_success_marker(TYPE_CHECKED_MARKER);
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.starts_with("exit code: 1"));
    }

    #[tokio::test]
    async fn test_path_substitution_in_args_and_stdin() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gen.cry");
        fs::write(&file, "f x = x").unwrap();

        let checker = sh("cat \"$1\"", Duration::from_secs(10));
        let outcome = checker.check(&file).await;
        assert!(outcome.succeeded);
        assert!(outcome.transcript.contains("f x = x"));

        let stdin_checker = ProcessChecker::new("cat", "cat", Duration::from_secs(10))
            .with_args(Vec::new())
            .with_stdin(":l {path}\n");
        let outcome = stdin_checker.check(&file).await;
        assert!(outcome.transcript.contains(&format!(":l {}", file.display())));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let checker = sh("sleep 5", Duration::from_millis(200));
        let start = Instant::now();
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_failure() {
        let checker = ProcessChecker::new(
            "ghost",
            "/nonexistent/cryptol-eval-checker",
            Duration::from_secs(5),
        );
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.contains("failed to launch"));
    }

    #[tokio::test]
    async fn test_child_ignoring_stdin_is_judged_by_output() {
        // Far more input than a pipe buffers, so the write is still pending
        // when the child exits without reading.
        let checker = ProcessChecker::cryptol("sh", Duration::from_secs(10))
            .with_args(vec!["-c".to_string(), "echo 'Type checked.'".to_string()])
            .with_stdin("x".repeat(1 << 20));
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(outcome.succeeded, "{}", outcome.transcript);
    }

    #[tokio::test]
    async fn test_stdin_write_is_bounded_by_timeout() {
        let checker = ProcessChecker::new("sleeper", "sh", Duration::from_millis(300))
            .with_args(vec!["-c".to_string(), "sleep 5".to_string()])
            .with_stdin("x".repeat(1 << 20));
        let start = Instant::now();
        let outcome = checker.check(Path::new("/dev/null")).await;
        assert!(!outcome.succeeded);
        assert!(outcome.transcript.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
