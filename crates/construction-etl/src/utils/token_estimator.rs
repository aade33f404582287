//! Token estimation for LLM input budgeting
//!
//! Fixed heuristic of four characters per token. This is a size proxy for
//! chunk planning, not a tokenizer.

pub const CHARS_PER_TOKEN: usize = 4;

/// Count characters as Unicode scalar values
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Estimate tokens from text: floor(chars / 4)
pub fn estimate_tokens(text: &str) -> usize {
    char_count(text) / CHARS_PER_TOKEN
}
