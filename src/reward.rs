use serde::{Deserialize, Serialize};

use crate::scratchpad::strip_regions;
use crate::tokenizer::{ControlTokens, TokenId};

/// Scoring state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The episode has not terminated; no reward yet.
    Pending,
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn reward(self) -> f32 {
        match self {
            Outcome::Pending => 0.0,
            Outcome::Correct => 1.0,
            Outcome::Incorrect => -1.0,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Outcome::Pending => 0,
            Outcome::Correct => 1,
            Outcome::Incorrect => -1,
        }
    }
}

/// An episode ends on `[EOS]` or once the sequence fills the context window.
pub fn is_done(tokens: &[TokenId], eos: TokenId, max_token_length: usize) -> bool {
    tokens.last() == Some(&eos) || tokens.len() >= max_token_length
}

/// Compares the decoded text, minus scratchpad regions, with the expected
/// answer. Only meaningful once the episode is done.
pub fn score(decoded: &str, expected: &str, control: &ControlTokens) -> Outcome {
    let visible = strip_regions(
        decoded,
        &control.scratchpad_start.text,
        &control.scratchpad_end.text,
    );
    if visible == expected {
        Outcome::Correct
    } else {
        Outcome::Incorrect
    }
}
