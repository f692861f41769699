//! Local token estimation.
//!
//! Neither backend shape reliably reports usage, so tokens are approximated
//! as one token per four characters. This is an estimate, not metering: it
//! drifts from real tokenizer counts, most noticeably for code and non-Latin
//! text. Callers enforcing billing limits must treat it as advisory.

/// Multiplier applied to the description estimate for the pre-run estimate.
pub const ESTIMATE_MULTIPLIER: u64 = 10;

/// `ceil(chars / 4)`, counting Unicode scalar values.
pub fn estimate_tokens(text: &str) -> u64 {
    chars_to_tokens(text.chars().count() as u64)
}

/// Estimate over the concatenation of `parts` without allocating it.
pub fn estimate_combined(parts: &[&str]) -> u64 {
    chars_to_tokens(parts.iter().map(|p| p.chars().count() as u64).sum())
}

/// Advisory estimate for a whole run, derived from the project description.
pub fn estimate_run_tokens(description: &str, multiplier: u64) -> u64 {
    estimate_tokens(description).saturating_mul(multiplier)
}

fn chars_to_tokens(chars: u64) -> u64 {
    chars.div_ceil(4)
}
