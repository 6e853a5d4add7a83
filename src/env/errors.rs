use thiserror::Error;

use crate::config::ConfigError;
use crate::tokenizer::{TokenId, TokenizerError};

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("action {action} is outside the vocabulary (size {vocab_size})")]
    InvalidAction { action: TokenId, vocab_size: usize },

    #[error("operands ({a}, {b}) must lie in 0..{max_val}")]
    OperandOutOfRange { a: i64, b: i64, max_val: i64 },

    #[error("episode {episode_index} has finished; call reset() first")]
    EpisodeFinished { episode_index: u64 },
}
