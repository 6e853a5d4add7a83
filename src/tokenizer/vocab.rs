use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::{Value, json};
use tracing::warn;

use super::{TokenId, Tokenizer, TokenizerError};

const UNKNOWN_TOKEN: &str = "[UNK]";
const EXECUTE_MARKER: &str = ">>>";

/// Control tokens of the builtin vocabulary, in id order starting at 0.
const ARITHMETIC_CONTROL: [&str; 8] = [
    "[PAD]", "[UNK]", "[BOS]", "[EOS]", "[SP]", "[ESP]", "[NL]", EXECUTE_MARKER,
];

/// Single-character tokens of the builtin vocabulary. No `[`, `]` or `>`, so a
/// control token can never be spelled out of ordinary characters.
const ARITHMETIC_PUNCTUATION: &str = " +-*/%=().,?!:;'\"_#&|^~@{}$\\<";

/// A HuggingFace `tokenizers` tokenizer with its vocabulary cached for
/// id lookups.
#[derive(Debug, Clone)]
pub struct VocabTokenizer {
    inner: tokenizers::Tokenizer,
    vocab: HashMap<String, TokenId>,
    tokens: HashMap<TokenId, String>,
    special: HashSet<TokenId>,
    vocab_size: usize,
}

impl VocabTokenizer {
    /// Loads a `tokenizer.json` (BPE, ByteLevel, WordLevel, ...).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let path = path.as_ref();
        let inner =
            tokenizers::Tokenizer::from_file(path).map_err(|err| TokenizerError::Load {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        Self::wrap(inner)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TokenizerError> {
        let inner: tokenizers::Tokenizer = json
            .parse()
            .map_err(|err: tokenizers::Error| TokenizerError::Parse(err.to_string()))?;
        Self::wrap(inner)
    }

    /// Builds a character-level WordLevel tokenizer from a token -> id map.
    ///
    /// Bracketed tokens such as `[EOS]` and the execute marker `>>>` become
    /// special added tokens, matched before the rest of the text is split into
    /// single characters. Every other entry is expected to be one character;
    /// characters outside the map encode as `[UNK]`.
    pub fn from_vocab(vocab: HashMap<String, TokenId>) -> Result<Self, TokenizerError> {
        if vocab.is_empty() {
            return Err(TokenizerError::EmptyVocabulary);
        }
        check_unique_ids(&vocab)?;

        let mut control: Vec<(&str, TokenId)> = vocab
            .iter()
            .filter(|(token, _)| is_control_text(token))
            .map(|(token, &id)| (token.as_str(), id))
            .collect();
        control.sort_by_key(|&(_, id)| id);
        let added_tokens: Vec<Value> = control
            .into_iter()
            .map(|(content, id)| {
                json!({
                    "id": id,
                    "content": content,
                    "single_word": false,
                    "lstrip": false,
                    "rstrip": false,
                    "normalized": false,
                    "special": true,
                })
            })
            .collect();

        let definition = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": {
                "type": "Split",
                "pattern": { "Regex": "." },
                "behavior": "Isolated",
                "invert": false,
            },
            "post_processor": null,
            "decoder": { "type": "Fuse" },
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNKNOWN_TOKEN,
            },
        });
        Self::from_json_str(&definition.to_string())
    }

    /// Character-level vocabulary covering the arithmetic dialogue: control
    /// tokens, digits, ASCII letters and punctuation.
    pub fn arithmetic() -> Result<Self, TokenizerError> {
        let characters = ('0'..='9')
            .chain('a'..='z')
            .chain('A'..='Z')
            .chain(ARITHMETIC_PUNCTUATION.chars())
            .map(String::from);
        let vocab: HashMap<String, TokenId> = ARITHMETIC_CONTROL
            .iter()
            .map(|token| token.to_string())
            .chain(characters)
            .enumerate()
            .map(|(id, token)| (token, id as TokenId))
            .collect();

        Self::from_vocab(vocab)
    }

    /// Serializes the tokenizer as `tokenizer.json`.
    pub fn to_json(&self) -> Result<String, TokenizerError> {
        self.inner
            .to_string(false)
            .map_err(|err| TokenizerError::Serialize(err.to_string()))
    }

    fn wrap(inner: tokenizers::Tokenizer) -> Result<Self, TokenizerError> {
        let vocab: HashMap<String, TokenId> = inner.get_vocab(true).into_iter().collect();
        if vocab.is_empty() {
            return Err(TokenizerError::EmptyVocabulary);
        }

        let tokens = vocab
            .iter()
            .map(|(token, &id)| (id, token.clone()))
            .collect();
        let mut special: HashSet<TokenId> = inner
            .get_added_tokens_decoder()
            .iter()
            .filter(|(_, added)| added.special)
            .map(|(id, _)| *id)
            .collect();
        special.extend(
            vocab
                .iter()
                .filter(|(token, _)| is_control_text(token))
                .map(|(_, &id)| id),
        );
        let vocab_size = vocab.values().max().map_or(0, |&id| id as usize + 1);

        Ok(Self {
            inner,
            vocab,
            tokens,
            special,
            vocab_size,
        })
    }

    pub fn is_control(&self, id: TokenId) -> bool {
        self.special.contains(&id)
    }
}

fn check_unique_ids(vocab: &HashMap<String, TokenId>) -> Result<(), TokenizerError> {
    let mut seen: HashMap<TokenId, &str> = HashMap::with_capacity(vocab.len());
    for (token, &id) in vocab {
        if let Some(first) = seen.insert(id, token) {
            // Report the pair in a stable order.
            let (first, second) = if first < token.as_str() {
                (first, token.as_str())
            } else {
                (token.as_str(), first)
            };
            return Err(TokenizerError::DuplicateId {
                id,
                first: first.to_string(),
                second: second.to_string(),
            });
        }
    }
    Ok(())
}

fn is_control_text(token: &str) -> bool {
    token == EXECUTE_MARKER || (token.len() > 2 && token.starts_with('[') && token.ends_with(']'))
}

impl Tokenizer for VocabTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_ids().to_vec(),
            Err(err) => {
                warn!(error = %err, text, "encoding failed");
                Vec::new()
            }
        }
    }

    fn decode(&self, ids: &[TokenId], keep_control_tokens: bool) -> String {
        match self.inner.decode(ids, !keep_control_tokens) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, ?ids, "decoding failed");
                String::new()
            }
        }
    }

    fn vocabulary(&self) -> &HashMap<String, TokenId> {
        &self.vocab
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn is_valid_id(&self, id: TokenId) -> bool {
        self.tokens.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A GPT-2 style ByteLevel BPE definition over single bytes, with spaces
    /// stored as `Ġ`.
    fn byte_level_json() -> String {
        let mut vocab: Vec<String> = ARITHMETIC_CONTROL.iter().map(|t| t.to_string()).collect();
        vocab.extend(
            ('0'..='9')
                .chain('a'..='z')
                .chain('A'..='Z')
                .chain("+-*/%=().,?!:'_Ġ".chars())
                .map(String::from),
        );
        let vocab: serde_json::Map<String, Value> = vocab
            .into_iter()
            .enumerate()
            .map(|(id, token)| (token, json!(id)))
            .collect();
        let added: Vec<Value> = ARITHMETIC_CONTROL
            .iter()
            .enumerate()
            .map(|(id, content)| {
                json!({
                    "id": id, "content": content, "single_word": false, "lstrip": false,
                    "rstrip": false, "normalized": false, "special": true,
                })
            })
            .collect();

        json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added,
            "normalizer": null,
            "pre_tokenizer": {
                "type": "ByteLevel", "add_prefix_space": false, "trim_offsets": true, "use_regex": true,
            },
            "post_processor": null,
            "decoder": {
                "type": "ByteLevel", "add_prefix_space": true, "trim_offsets": true, "use_regex": true,
            },
            "model": {
                "type": "BPE",
                "dropout": null,
                "unk_token": null,
                "continuing_subword_prefix": null,
                "end_of_word_suffix": null,
                "fuse_unk": false,
                "byte_fallback": false,
                "vocab": vocab,
                "merges": [],
            },
        })
        .to_string()
    }

    #[test]
    fn test_arithmetic_encodes_prompt() {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();

        let ids = tokenizer.encode("[BOS]What is 2+3?");

        // [BOS] W h a t ' ' i s ' ' 2 + 3 ?
        assert_eq!(ids.len(), 13);
        assert_eq!(ids[0], tokenizer.token_id("[BOS]").unwrap());
        assert_eq!(tokenizer.decode(&ids, true), "[BOS]What is 2+3?");
        assert_eq!(tokenizer.decode(&ids, false), "What is 2+3?");
    }

    #[test]
    fn test_control_markers_are_single_tokens() {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();

        let ids = tokenizer.encode("[SP]6+7>>>13[NL][ESP]");

        assert_eq!(ids.len(), 9);
        assert_eq!(ids[4], tokenizer.token_id(">>>").unwrap());
        assert!(tokenizer.is_control(ids[0]));
        assert!(!tokenizer.is_control(ids[1]));
    }

    #[test]
    fn test_unknown_characters_become_unk() {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();

        let ids = tokenizer.encode("1>2");

        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], tokenizer.token_id("[UNK]").unwrap());
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();
        // Every id the environment can append, in an arbitrary order.
        let ids: Vec<TokenId> = (0..tokenizer.vocab_size() as TokenId).rev().collect();

        let text = tokenizer.decode(&ids, true);

        assert_eq!(tokenizer.encode(&text), ids);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let vocab = HashMap::from([("a".to_string(), 3), ("b".to_string(), 3)]);

        let err = VocabTokenizer::from_vocab(vocab).unwrap_err();

        assert!(matches!(err, TokenizerError::DuplicateId { id: 3, .. }));
    }

    #[test]
    fn test_ids_in_gaps_are_not_valid() {
        let vocab = HashMap::from([
            ("[UNK]".to_string(), 0),
            ("a".to_string(), 1),
            ("b".to_string(), 5),
        ]);

        let tokenizer = VocabTokenizer::from_vocab(vocab).unwrap();

        assert_eq!(tokenizer.vocab_size(), 6);
        assert!(tokenizer.is_valid_id(5));
        assert!(!tokenizer.is_valid_id(3));
        assert!(!tokenizer.is_valid_id(6));
    }

    #[test]
    fn test_byte_level_file_decodes_spaces() {
        let path = std::env::temp_dir().join(format!("addgym-{}-bpe.json", std::process::id()));
        std::fs::write(&path, byte_level_json()).expect("temp dir is writable");

        let tokenizer = VocabTokenizer::from_file(&path).expect("tokenizer.json loads");
        let _ = std::fs::remove_file(&path);

        let ids = tokenizer.encode("[BOS]What is 2+3?5[EOS]");
        assert_eq!(ids[0], tokenizer.token_id("[BOS]").unwrap());
        assert!(ids.contains(&tokenizer.token_id("Ġ").unwrap()));
        assert_eq!(tokenizer.decode(&ids, true), "[BOS]What is 2+3?5[EOS]");
        assert_eq!(tokenizer.decode(&ids, false), "What is 2+3?5");
    }

    #[test]
    fn test_serialized_definition_reloads() {
        let tokenizer = VocabTokenizer::arithmetic().unwrap();

        let reloaded = VocabTokenizer::from_json_str(&tokenizer.to_json().unwrap()).unwrap();

        let ids = tokenizer.encode("[SP]x = 3[NL]x+4>>>");
        assert_eq!(reloaded.encode("[SP]x = 3[NL]x+4>>>"), ids);
        assert_eq!(reloaded.vocab_size(), tokenizer.vocab_size());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = VocabTokenizer::from_file("/definitely/not/here.json").unwrap_err();

        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
