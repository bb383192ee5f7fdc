//! Error types for cryptol-eval operations.
//!
//! Only catalog and configuration errors abort a run. Everything that can go
//! wrong while scoring a single attempt (model calls, checker subprocesses,
//! the live session) is caught by the runner and turned into a failing
//! verdict, so those error types surface in logs and transcripts rather than
//! as process exit codes.

use thiserror::Error;

/// Errors that can occur while loading the task catalog.
///
/// Any of these aborts the whole run: pass@k denominators must never be
/// computed over a partially loaded catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed task record on line {line}: {message}")]
    MalformedTask { line: usize, message: String },

    #[error("Task id '{task_id}' appears more than once (line {line})")]
    DuplicateTaskId { task_id: String, line: usize },

    #[error("Task '{task_id}' declares both a harness and a test_list; pick one verification path")]
    ConflictingVerification { task_id: String },

    #[error("Failed to read task catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: HF_TOKEN environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,
}

/// Errors raised by a live verification session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is not connected")]
    NotConnected,

    #[error("Failed to reach session server: {0}")]
    Transport(String),

    #[error("Session server error ({code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected session response: {0}")]
    Protocol(String),

    #[error("Failed to load '{path}': {message}")]
    Load { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while building the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while writing run artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
