//! Live verification sessions.
//!
//! A session is a stateful external service that loads a source file and then
//! evaluates statements against it. It keeps definitions across loads, so a
//! session must be reset between unrelated uses or one task's definitions
//! leak into the next task's assertions.
//!
//! The session is passed around as an explicit `&mut dyn LiveSession`. The
//! exclusive borrow means only one task can hold it at a time, and the
//! verifier resets it before giving the borrow back.

pub mod cryptol_rpc;

use std::path::Path;

use async_trait::async_trait;

use crate::error::SessionError;

pub use cryptol_rpc::{CryptolRpcSession, DEFAULT_SERVER_URL};

/// A stateful evaluation service.
#[async_trait]
pub trait LiveSession: Send {
    /// Opens (or reopens) the session with a clean state.
    async fn connect(&mut self) -> Result<(), SessionError>;

    /// Loads a source file, replacing whatever module was loaded before.
    async fn load_source(&mut self, path: &Path) -> Result<(), SessionError>;

    /// Evaluates a boolean statement against the loaded source.
    ///
    /// `Ok(false)` means the statement evaluated and did not hold; an error
    /// means it could not be evaluated at all.
    async fn execute(&mut self, statement: &str) -> Result<bool, SessionError>;

    /// Discards all session state.
    async fn reset(&mut self) -> Result<(), SessionError>;
}
