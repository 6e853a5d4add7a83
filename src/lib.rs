pub mod config;
pub mod env;
pub mod interpreter;
pub mod mask;
pub mod reward;
pub mod scratchpad;
pub mod tokenizer;

#[cfg(feature = "python")]
mod python;

pub use config::{ConfigError, EnvConfig};
pub use env::{AddEnv, Env, EnvError};
pub use interpreter::{ExecutionResult, Interpreter, execute};
pub use mask::GoldMask;
pub use reward::Outcome;
pub use tokenizer::{TokenId, Tokenizer, VocabTokenizer};
