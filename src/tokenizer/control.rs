use serde::{Deserialize, Serialize};

use super::{TokenId, Tokenizer, TokenizerError};

/// Vocabulary strings of the control tokens the environment relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTokenNames {
    pub bos: String,
    pub eos: String,
    pub scratchpad_start: String,
    pub scratchpad_end: String,
    pub line_break: String,
    pub execute: String,
}

impl Default for ControlTokenNames {
    fn default() -> Self {
        Self {
            bos: "[BOS]".to_string(),
            eos: "[EOS]".to_string(),
            scratchpad_start: "[SP]".to_string(),
            scratchpad_end: "[ESP]".to_string(),
            line_break: "[NL]".to_string(),
            execute: ">>>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlToken {
    pub id: TokenId,
    pub text: String,
}

/// Control token ids resolved once against a tokenizer's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTokens {
    pub bos: ControlToken,
    pub eos: ControlToken,
    pub scratchpad_start: ControlToken,
    pub scratchpad_end: ControlToken,
    pub line_break: ControlToken,
    pub execute: ControlToken,
}

impl ControlTokens {
    pub fn resolve<T>(tokenizer: &T, names: &ControlTokenNames) -> Result<Self, TokenizerError>
    where
        T: Tokenizer + ?Sized,
    {
        let lookup = |name: &str| {
            // An empty marker would match everywhere in decoded text.
            tokenizer
                .token_id(name)
                .filter(|_| !name.is_empty())
                .map(|id| ControlToken {
                    id,
                    text: name.to_string(),
                })
                .ok_or_else(|| TokenizerError::MissingControlToken(name.to_string()))
        };

        Ok(Self {
            bos: lookup(&names.bos)?,
            eos: lookup(&names.eos)?,
            scratchpad_start: lookup(&names.scratchpad_start)?,
            scratchpad_end: lookup(&names.scratchpad_end)?,
            line_break: lookup(&names.line_break)?,
            execute: lookup(&names.execute)?,
        })
    }
}
