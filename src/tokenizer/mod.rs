// src/tokenizer/mod.rs
mod control;
mod errors;
mod vocab;

use std::collections::HashMap;

pub use control::{ControlToken, ControlTokenNames, ControlTokens};
pub use errors::TokenizerError;
pub use vocab::VocabTokenizer;

pub type TokenId = u32;

/// Converts between text and token ids.
///
/// Implementations are read-only after loading, so one instance can be shared
/// by any number of environments through an `Arc`.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<TokenId>;

    /// Renders `ids` back to text. Control tokens (`[BOS]`, `[SP]`, `>>>`, ...)
    /// are only emitted when `keep_control_tokens` is set.
    fn decode(&self, ids: &[TokenId], keep_control_tokens: bool) -> String;

    fn vocabulary(&self) -> &HashMap<String, TokenId>;

    /// Exclusive upper bound on token ids.
    fn vocab_size(&self) -> usize;

    /// Whether `id` names a token. Vocabularies with gaps in their id range
    /// should override this.
    fn is_valid_id(&self, id: TokenId) -> bool {
        (id as usize) < self.vocab_size()
    }

    fn token_id(&self, token: &str) -> Option<TokenId> {
        self.vocabulary().get(token).copied()
    }
}
