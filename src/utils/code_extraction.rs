//! Source extraction from model responses.
//!
//! Models are asked for exactly one fenced block, but they do not always
//! comply. Extraction takes the first fenced block, whose opening fence may be
//! tagged with the target language (matched case-insensitively), and falls
//! back to the whole response when there is no fence at all. The fallback
//! never stalls the pipeline: prose fed to the checker simply fails to
//! compile.
//!
//! # Example
//!
//! ```
//! use cryptol_eval::utils::extract_code_block;
//!
//! let response = "Here you go:\n```cryptol\nparity xs = foldl (^) False xs\n```\nEnjoy!";
//! assert_eq!(extract_code_block(response), "parity xs = foldl (^) False xs");
//!
//! assert_eq!(extract_code_block("  f x = x  "), "f x = x");
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Fence tag the harness prompts for.
pub const DEFAULT_LANGUAGE: &str = "cryptol";

static DEFAULT_EXTRACTOR: LazyLock<CodeExtractor> = LazyLock::new(|| {
    CodeExtractor::new(DEFAULT_LANGUAGE).expect("escaped fence pattern always compiles")
});

/// Extracts the first fenced block for a configured language tag.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    language: String,
    fence: Regex,
}

impl CodeExtractor {
    /// Builds an extractor for fences optionally tagged with `language`.
    pub fn new(language: &str) -> Result<Self, regex::Error> {
        let pattern = format!(r"(?is)```(?:{})?\s*(.*?)```", regex::escape(language));
        Ok(Self {
            language: language.to_string(),
            fence: Regex::new(&pattern)?,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the interior of the first fenced block, or the whole text,
    /// trimmed either way.
    pub fn extract(&self, text: &str) -> String {
        self.fence
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(text)
            .trim()
            .to_string()
    }
}

impl Default for CodeExtractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}

/// Extracts a Cryptol snippet using the default extractor.
pub fn extract_code_block(text: &str) -> String {
    DEFAULT_EXTRACTOR.extract(text)
}

/// Truncates a string on a char boundary for logs and transcripts.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}
