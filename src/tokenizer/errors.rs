use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("failed to load tokenizer {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    #[error("failed to parse tokenizer definition: {0}")]
    Parse(String),

    #[error("failed to serialize tokenizer: {0}")]
    Serialize(String),

    #[error("token id {id} is assigned to both {first:?} and {second:?}")]
    DuplicateId {
        id: u32,
        first: String,
        second: String,
    },

    #[error("vocabulary is empty")]
    EmptyVocabulary,

    /// A required control token is absent. Fatal at environment construction.
    #[error("control token {0:?} not found in vocabulary")]
    MissingControlToken(String),
}
