//! Offline model stand-in.
//!
//! Produces the same small parity snippet for every prompt. Useful for
//! exercising the checker toolchain end to end without network access or
//! credentials.

use async_trait::async_trait;

use super::litellm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
use crate::error::LlmError;

/// Model id reported for offline generations.
pub const OFFLINE_MODEL: &str = "offline";

/// Returns a fixed Cryptol snippet tagged with the start of the prompt.
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider;

impl OfflineProvider {
    pub fn new() -> Self {
        Self
    }

    fn snippet_for(prompt: &str) -> String {
        let head: String = prompt.chars().take(40).collect();
        format!(
            "-- Generated for prompt: {}...\nparity : [8] -> Bit\nparity xs = foldl (^) False xs",
            head.replace('\n', " ")
        )
    }
}

#[async_trait]
impl LlmProvider for OfflineProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(GenerationResponse {
            id: format!("offline-{}", uuid::Uuid::new_v4()),
            model: OFFLINE_MODEL.to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(Self::snippet_for(prompt)),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        })
    }
}
