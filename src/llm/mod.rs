//! Model collaborator.
//!
//! The harness only needs "messages in, text out". [`LlmProvider`] is that
//! seam: [`LiteLlmClient`] talks to an OpenAI-compatible endpoint and
//! [`OfflineProvider`] returns a canned snippet for dry runs.
//!
//! ```ignore
//! use cryptol_eval::llm::{complete, GenerationRequest, LiteLlmClient, Message};
//!
//! let client = LiteLlmClient::from_env("Qwen/Qwen3-Coder-30B-A3B-Instruct", timeout)?;
//! let request = GenerationRequest::new("", vec![Message::user("Write xor in Cryptol")])
//!     .with_max_tokens(1024)
//!     .with_temperature(0.2);
//! let text = complete(&client, request).await?;
//! ```

pub mod litellm;
pub mod offline;

pub use litellm::{
    complete, Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message,
    Usage, API_BASE_ENV, API_KEY_ENV, DEFAULT_API_BASE,
};
pub use offline::{OfflineProvider, OFFLINE_MODEL};
