//! End-to-end pipeline tests.
//!
//! The model, the type-checker, the proof tool and the live session are all
//! replaced by local stand-ins: a scripted provider, `sh` scripts, and an
//! in-memory session that keeps definitions until it is reset.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use cryptol_eval::catalog::parse_tasks;
use cryptol_eval::checker::{CompileChecker, ProcessChecker};
use cryptol_eval::error::{LlmError, SessionError};
use cryptol_eval::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message};
use cryptol_eval::runner::{AttemptRecord, BehaviorVerifier, EvalRunner, RunWriter};
use cryptol_eval::session::LiveSession;

/// Replies in order; the test supplies one reply per attempt.
struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::RequestFailed("no scripted reply left".to_string()))?;
        Ok(GenerationResponse {
            id: "test".to_string(),
            model: "scripted".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(text),
                finish_reason: "stop".to_string(),
            }],
            usage: Default::default(),
        })
    }
}

/// A toy session: loading a file defines every name that appears before
/// ` = ` on a line, and a statement holds when every word in it is defined
/// or is a literal. Definitions persist across loads until `reset`.
#[derive(Default)]
struct MemorySession {
    defined: HashSet<String>,
    connected: bool,
    resets: usize,
}

#[async_trait]
impl LiveSession for MemorySession {
    async fn connect(&mut self) -> Result<(), SessionError> {
        self.connected = true;
        Ok(())
    }

    async fn load_source(&mut self, path: &Path) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }
        let source = fs::read_to_string(path)?;
        for line in source.lines() {
            if let Some((lhs, _)) = line.split_once(" = ") {
                if let Some(name) = lhs.split_whitespace().next() {
                    self.defined.insert(name.to_string());
                }
            }
        }
        Ok(())
    }

    async fn execute(&mut self, statement: &str) -> Result<bool, SessionError> {
        for word in statement.split_whitespace() {
            let is_literal = word.chars().all(|c| c.is_ascii_digit()) || word == "==";
            if !is_literal && !self.defined.contains(word) {
                return Err(SessionError::Rpc {
                    code: 20210,
                    message: format!("Value not in scope: {}", word),
                });
            }
        }
        Ok(true)
    }

    async fn reset(&mut self) -> Result<(), SessionError> {
        self.defined.clear();
        self.connected = false;
        self.resets += 1;
        Ok(())
    }
}

/// `cryptol` stand-in: reads `:l <path>` from stdin and type-checks any file
/// without the word "broken".
fn fake_cryptol(dir: &Path) -> ProcessChecker {
    let script = r#"read cmd; file="${cmd#:l }"; if grep -q broken "$file"; then echo "Parse error"; exit 1; fi; echo "Loading module Main"; echo "Type checked.""#;
    ProcessChecker::cryptol("sh", Duration::from_secs(10))
        .with_args(vec!["-c".to_string(), script.to_string()])
        .with_working_dir(dir)
}

/// `saw` stand-in: succeeds when the harness file says "ok".
fn fake_saw() -> ProcessChecker {
    ProcessChecker::saw("sh", Duration::from_secs(10)).with_args(vec![
        "-c".to_string(),
        r#"grep -q ok "$1""#.to_string(),
        "saw".to_string(),
        "{path}".to_string(),
    ])
}

fn build_runner(dir: &Path, replies: &[&str], k: u32) -> EvalRunner {
    let scratch = dir.join("scratch");
    let compile = CompileChecker::new(Box::new(fake_cryptol(dir)), &scratch);
    let verifier = BehaviorVerifier::new(Box::new(fake_saw()), &scratch);
    EvalRunner::new(
        Box::new(ScriptedProvider::new(replies)),
        compile,
        verifier,
        "scripted",
    )
    .with_default_k(k)
}

fn read_generations(dir: &Path) -> Vec<AttemptRecord> {
    fs::read_to_string(dir.join("raw_generations.jsonl"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_all_compile_failures() {
    let temp = TempDir::new().unwrap();
    let tasks = parse_tasks(
        "{\"task_id\": \"a\", \"prompt\": \"p\"}\n{\"task_id\": \"b\", \"prompt\": \"q\"}\n",
    )
    .unwrap();
    let replies = ["broken"; 6];
    let runner = build_runner(temp.path(), &replies, 3);
    let mut session = MemorySession::default();
    let mut writer = RunWriter::create(&temp.path().join("out"), "run").unwrap();

    let report = runner.run(&tasks, &mut session, &mut writer).await.unwrap();

    assert_eq!(report.metrics.total_attempts, 6);
    assert_eq!(report.metrics.compile_successes, 0);
    assert_eq!(report.metrics.verify_successes, 0);
    assert_eq!(report.metrics.pass_at_k_compile, 0.0);
    assert_eq!(read_generations(writer.run_dir()).len(), 6);
}

#[tokio::test]
async fn test_harness_task_first_attempt_passes() {
    let temp = TempDir::new().unwrap();
    let harness = temp.path().join("parity.saw");
    fs::write(&harness, "ok").unwrap();

    let line = serde_json::json!({
        "task_id": "parity",
        "prompt": "byte parity",
        "k": 2,
        "harness": harness.display().to_string(),
    });
    let tasks = parse_tasks(&line.to_string()).unwrap();

    // The harness is independent of the snippet, so both attempts verify;
    // only the first compiles.
    let runner = build_runner(
        temp.path(),
        &["```cryptol\nparity xs = foldl (^) False xs\n```", "broken"],
        5,
    );
    let mut session = MemorySession::default();
    let mut writer = RunWriter::create(&temp.path().join("out"), "run").unwrap();

    let report = runner.run(&tasks, &mut session, &mut writer).await.unwrap();
    let metrics = &report.metrics;

    assert_eq!(metrics.total_attempts, 2);
    assert_eq!(metrics.compile_successes, 1);
    assert_eq!(metrics.compile_rate, 0.5);
    assert_eq!(metrics.pass_at_k_compile, 1.0);
    assert_eq!(metrics.pass_at_k_verify, 1.0);
    assert_eq!(session.resets, 0);

    let records = read_generations(writer.run_dir());
    assert_eq!(records[0].generated_code, "parity xs = foldl (^) False xs");
    assert!(records[0].compiled);
    assert!(!records[1].compiled);
}

#[tokio::test]
async fn test_session_is_isolated_between_tasks() {
    let temp = TempDir::new().unwrap();
    // Task "first" defines helper; task "second" relies on it without
    // defining it, which must fail once the session has been reset.
    let catalog = r#"{"task_id": "first", "prompt": "define helper", "k": 1, "test_list": ["helper == 1"]}
{"task_id": "second", "prompt": "use helper", "k": 1, "test_list": ["main == 2", "assert helper == 1"]}"#;
    let tasks = parse_tasks(catalog).unwrap();

    let runner = build_runner(temp.path(), &["helper = 1", "main = 2"], 1);
    let mut session = MemorySession::default();
    let mut writer = RunWriter::create(&temp.path().join("out"), "run").unwrap();

    let report = runner.run(&tasks, &mut session, &mut writer).await.unwrap();

    assert!(report.tasks[0].verified_any);
    assert!(!report.tasks[1].verified_any);
    assert_eq!(session.resets, 2);
    assert!(session.defined.is_empty());

    let transcript = fs::read_to_string(writer.run_dir().join("transcript.log")).unwrap();
    assert!(transcript.contains("[PASS] test 1: ok"));
    assert!(transcript
        .contains("[FAIL] test 2: Session server error (20210): Value not in scope: helper"));
    assert!(transcript.contains("[RESULT] Task first: ALL PASS"));
    assert!(transcript.contains("[RESULT] Task second: HAS FAILURES"));
}

#[tokio::test]
async fn test_setup_code_reaches_session() {
    let temp = TempDir::new().unwrap();
    let catalog = r#"{"task_id": "s", "prompt": "p", "k": 1, "test_setup_code": "width = 8", "test_list": ["width == 8", "f == 8"]}"#;
    let tasks = parse_tasks(catalog).unwrap();

    let runner = build_runner(temp.path(), &["```\nf = width\n```"], 1);
    let mut session = MemorySession::default();
    let mut writer = RunWriter::create(&temp.path().join("out"), "run").unwrap();

    let report = runner.run(&tasks, &mut session, &mut writer).await.unwrap();
    assert_eq!(report.metrics.verify_successes, 1);
    assert_eq!(report.metrics.pass_at_k_verify, 1.0);

    let records = read_generations(writer.run_dir());
    assert_eq!(records[0].generated_code, "f = width");
}
