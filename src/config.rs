use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interpreter::ExecLimits;
use crate::tokenizer::{ControlTokenNames, TokenId};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Environment settings. Every field has a default, so a JSON config only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Vocabulary file; the builtin arithmetic vocabulary when unset.
    pub tokenizer_path: Option<PathBuf>,
    /// Operands are drawn from `0..max_val`.
    pub max_val: i64,
    pub max_token_length: usize,
    /// Right-pad observations to `max_token_length`.
    pub padding: bool,
    pub pad_value: TokenId,
    pub seed: Option<u64>,
    pub control_tokens: ControlTokenNames,
    pub exec: ExecLimits,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            tokenizer_path: None,
            max_val: 10,
            max_token_length: 35,
            padding: true,
            pad_value: 0,
            seed: None,
            control_tokens: ControlTokenNames::default(),
            exec: ExecLimits::default(),
        }
    }
}

impl EnvConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_val < 1 {
            return Err(ConfigError::Invalid(format!(
                "max_val must be at least 1, got {}",
                self.max_val
            )));
        }
        // Both operands are below max_val, so their sum must fit in an i64.
        if self.max_val > i64::MAX / 2 {
            return Err(ConfigError::Invalid(format!(
                "max_val {} is too large",
                self.max_val
            )));
        }
        if self.max_token_length == 0 {
            return Err(ConfigError::Invalid(
                "max_token_length must be positive".to_string(),
            ));
        }
        self.exec.validate().map_err(ConfigError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_environment() {
        let config = EnvConfig::default();

        assert_eq!(config.max_val, 10);
        assert_eq!(config.max_token_length, 35);
        assert!(config.padding);
        assert_eq!(config.control_tokens.execute, ">>>");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EnvConfig::from_json_str(
            r#"{"max_val": 100, "padding": false, "exec": {"max_depth": 8}}"#,
        )
        .unwrap();

        assert_eq!(config.max_val, 100);
        assert!(!config.padding);
        assert_eq!(config.max_token_length, 35);
        assert_eq!(config.exec.max_depth, 8);
        assert_eq!(config.exec.max_code_bytes, ExecLimits::default().max_code_bytes);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"max_val": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"max_token_length": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"max_val": "ten"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_exec_limits_are_bounded() {
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"exec": {"max_depth": 100000}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"exec": {"max_code_bytes": 1000000}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EnvConfig::from_json_str(r#"{"exec": {"timeout_ms": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(EnvConfig::from_json_str(r#"{"exec": {"max_depth": 200}}"#).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("addgym-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"seed": 7, "control_tokens": {"execute": "[EXEC]"}}"#).unwrap();

        let config = EnvConfig::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.control_tokens.execute, "[EXEC]");
        assert_eq!(config.control_tokens.bos, "[BOS]");
    }
}
