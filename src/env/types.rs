use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interpreter::ExecutionResult;
use crate::reward::Outcome;
use crate::tokenizer::TokenId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub action: TokenId,
    pub reward: f32,
    pub done: bool,
    /// Set when this action triggered the scratchpad interpreter.
    pub execution: Option<ExecutionResult>,
}

/// Record of one played episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: Uuid,
    pub episode_index: u64,
    pub operands: (i64, i64),
    pub steps: Vec<Transition>,
    /// Decoded final sequence, control tokens included.
    pub final_text: String,
    pub total_reward: f32,
    pub outcome: Outcome,
}
