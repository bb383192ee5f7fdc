//! LLM prompts for Cryptol generation.
//!
//! Every request pairs a fixed system prompt, which asks for one fenced
//! `cryptol` block, with a user prompt rendered from the task's template:
//!
//! - `function` tasks ask for an implementation of the described behavior
//! - `property` tasks ask for a property that tests the described function
//!
//! Setup code attached to a task is appended to the user prompt so the model
//! can reference the definitions it will be compiled against.

pub mod generation;

pub use generation::{GenerationPrompt, SYSTEM_PROMPT};
