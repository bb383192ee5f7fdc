//! Shared utility functions for cryptol-eval.
//!
//! This module provides helpers for turning free-form model output into
//! something the external checkers can consume.

pub mod code_extraction;

pub use code_extraction::{extract_code_block, truncate, CodeExtractor, DEFAULT_LANGUAGE};
