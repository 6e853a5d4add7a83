// src/env/add_env.rs
//
// The arithmetic dialogue environment. The agent answers `What is a+b?` one
// token at a time and may open a scratchpad to have intermediate results
// computed inline before giving its final answer.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::EnvConfig;
use crate::env::episode::Episode;
use crate::env::errors::EnvError;
use crate::env::traits::Env;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::mask::{self, GoldMask};
use crate::reward::{self, Outcome};
use crate::scratchpad;
use crate::tokenizer::{ControlTokens, TokenId, Tokenizer, VocabTokenizer};

pub type StepInfo = Map<String, Value>;

pub struct AddEnv<T: Tokenizer> {
    tokenizer: Arc<T>,
    config: EnvConfig,
    control: ControlTokens,
    interpreter: Interpreter,
    rng: ChaCha8Rng,
    episode: Episode,
    tokens: Vec<TokenId>,
    last_execution: Option<ExecutionResult>,
    finished: bool,
}

impl AddEnv<VocabTokenizer> {
    /// Loads the vocabulary named by `config.tokenizer_path`, or uses the
    /// builtin arithmetic vocabulary.
    pub fn from_config(config: EnvConfig) -> Result<Self, EnvError> {
        let tokenizer = match &config.tokenizer_path {
            Some(path) => VocabTokenizer::from_file(path)?,
            None => VocabTokenizer::arithmetic()?,
        };
        Self::new(Arc::new(tokenizer), config)
    }
}

impl<T: Tokenizer> AddEnv<T> {
    /// Resolves the control tokens and starts the first episode.
    pub fn new(tokenizer: Arc<T>, config: EnvConfig) -> Result<Self, EnvError> {
        config.validate()?;
        let control = ControlTokens::resolve(tokenizer.as_ref(), &config.control_tokens)?;
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let episode = Episode::draw(&mut rng, config.max_val, 1, &control);
        let tokens = tokenizer.encode(&episode.prompt);

        Ok(Self {
            interpreter: Interpreter::new(config.exec),
            tokenizer,
            config,
            control,
            rng,
            episode,
            tokens,
            last_execution: None,
            finished: false,
        })
    }

    /// Starts a new episode with fixed operands instead of random ones.
    pub fn reset_with_operands(&mut self, a: i64, b: i64) -> Result<Vec<TokenId>, EnvError> {
        let max_val = self.config.max_val;
        if !(0..max_val).contains(&a) || !(0..max_val).contains(&b) {
            return Err(EnvError::OperandOutOfRange { a, b, max_val });
        }
        let episode = Episode::new(a, b, self.episode.episode_index + 1, &self.control);
        Ok(self.begin(episode))
    }

    fn begin(&mut self, episode: Episode) -> Vec<TokenId> {
        info!(
            episode_id = %episode.id,
            episode_index = episode.episode_index,
            a = episode.operand_a,
            b = episode.operand_b,
            "starting episode"
        );
        self.tokens = self.tokenizer.encode(&episode.prompt);
        self.episode = episode;
        self.last_execution = None;
        self.finished = false;
        self.observation()
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn control_tokens(&self) -> &ControlTokens {
        &self.control
    }

    pub fn tokenizer(&self) -> &Arc<T> {
        &self.tokenizer
    }

    /// The full, untruncated token sequence of the current episode.
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }

    /// The current sequence decoded with control tokens kept.
    pub fn text(&self) -> String {
        self.tokenizer.decode(&self.tokens, true)
    }

    /// Interpreter result appended by the most recent step, if any.
    pub fn last_execution(&self) -> Option<&ExecutionResult> {
        self.last_execution.as_ref()
    }

    pub fn is_done(&self) -> bool {
        reward::is_done(
            &self.tokens,
            self.control.eos.id,
            self.config.max_token_length,
        )
    }

    pub fn outcome(&self) -> Outcome {
        if !self.is_done() {
            return Outcome::Pending;
        }
        reward::score(&self.text(), &self.episode.expected_answer, &self.control)
    }

    /// The sequence truncated to `max_token_length`, right-padded with
    /// `pad_value` when padding is enabled.
    pub fn observation(&self) -> Vec<TokenId> {
        let max = self.config.max_token_length;
        let mut obs: Vec<TokenId> = self.tokens.iter().copied().take(max).collect();
        if self.config.padding {
            obs.resize(max, self.config.pad_value);
        }
        obs
    }

    /// The worked reference trajectory for this episode with its training
    /// masks. Positions the current sequence already covers are not
    /// trainable.
    pub fn gold_trajectory(&self) -> GoldMask {
        let (a, b) = self.episode.operands();
        let gold = self.tokenizer.encode(&mask::gold_text(a, b, &self.control));
        mask::build(gold, self.tokens.len(), &self.control)
    }

    /// Runs the open scratchpad if the agent just asked for it and appends
    /// the result followed by a line break.
    fn run_scratchpad(&mut self) -> Option<ExecutionResult> {
        if !scratchpad::should_execute(&self.tokens, &self.control) {
            return None;
        }

        let code = scratchpad::extract_code(&self.text(), &self.control);
        let result = self.interpreter.execute(&code);
        if result.is_error {
            warn!(
                episode_id = %self.episode.id,
                code = %code,
                error = %result.text,
                "scratchpad execution failed"
            );
        }

        let output = format!("{}{}", result.text, self.control.line_break.text);
        self.tokens.extend(self.tokenizer.encode(&output));
        Some(result)
    }
}

impl<T: Tokenizer> Env for AddEnv<T> {
    type Obs = Vec<TokenId>;
    type Act = TokenId;
    type Info = StepInfo;

    fn reset(&mut self) -> Result<Self::Obs, EnvError> {
        let episode = Episode::draw(
            &mut self.rng,
            self.config.max_val,
            self.episode.episode_index + 1,
            &self.control,
        );
        Ok(self.begin(episode))
    }

    fn step(&mut self, action: TokenId) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError> {
        if self.finished {
            return Err(EnvError::EpisodeFinished {
                episode_index: self.episode.episode_index,
            });
        }
        if !self.tokenizer.is_valid_id(action) {
            return Err(EnvError::InvalidAction {
                action,
                vocab_size: self.tokenizer.vocab_size(),
            });
        }

        self.episode.action_count += 1;
        self.tokens.push(action);
        self.last_execution = self.run_scratchpad();

        let done = self.is_done();
        let outcome = self.outcome();
        self.finished = done;

        debug!(
            episode_id = %self.episode.id,
            action,
            action_count = self.episode.action_count,
            len = self.tokens.len(),
            executed = self.last_execution.is_some(),
            done,
            reward = outcome.reward(),
            "step"
        );

        Ok((self.observation(), outcome.reward(), done, StepInfo::new()))
    }

    fn render(&self) -> Result<(), EnvError> {
        println!("{}", self.text());
        Ok(())
    }

    fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(config: EnvConfig) -> AddEnv<VocabTokenizer> {
        AddEnv::from_config(config).expect("builtin vocabulary")
    }

    fn play(env: &mut AddEnv<VocabTokenizer>, text: &str) -> (Vec<TokenId>, f32, bool) {
        let ids = env.tokenizer().encode(text);
        let mut last = (Vec::new(), 0.0, false);
        for id in ids {
            let (obs, reward, done, _) = env.step(id).unwrap();
            last = (obs, reward, done);
        }
        last
    }

    #[test]
    fn test_constructor_starts_first_episode() {
        let env = env(EnvConfig::default());

        assert_eq!(env.episode().episode_index, 1);
        assert_eq!(env.text(), env.episode().prompt);
        assert!(env.last_execution().is_none());
    }

    #[test]
    fn test_scratchpad_output_is_appended() {
        let mut env = env(EnvConfig::default());
        env.reset_with_operands(6, 7).unwrap();

        let (_, reward, done) = play(&mut env, "[SP]6+7>>>");

        assert_eq!(env.text(), "[BOS]What is 6+7?[SP]6+7>>>13[NL]");
        assert_eq!(env.last_execution(), Some(&ExecutionResult::ok("13")));
        assert_eq!(env.episode().action_count, 5);
        assert!(!done);
        assert_eq!(reward, 0.0);
    }

    #[test]
    fn test_execution_error_is_fed_back() {
        let mut env = env(EnvConfig {
            max_token_length: 200,
            ..EnvConfig::default()
        });
        env.reset_with_operands(1, 1).unwrap();

        play(&mut env, "[SP]q+1>>>");

        let text = env.text();
        assert!(text.starts_with("[BOS]What is 1+1?[SP]q+1>>>ERROR: "));
        assert!(text.contains("name 'q' is not defined"));
        assert!(text.ends_with("[NL]"));
        assert!(env.last_execution().is_some_and(|r| r.is_error));
        assert!(!env.is_done());
    }

    #[test]
    fn test_gold_trajectory_marks_prefix() {
        let mut env = env(EnvConfig::default());
        env.reset_with_operands(2, 3).unwrap();
        play(&mut env, "[SP]");

        let gold = env.gold_trajectory();

        let consumed = env.tokens().len();
        assert!(gold.trainable_mask[..consumed].iter().all(|t| !t));
        assert!(gold.trainable_mask[consumed]);
    }

    #[test]
    fn test_ids_missing_from_vocabulary_are_rejected() {
        let vocab = [("[PAD]", 0), ("[UNK]", 1), ("[BOS]", 2), ("[EOS]", 3), ("[SP]", 4)]
            .into_iter()
            .chain([("[ESP]", 5), ("[NL]", 6), (">>>", 7), ("1", 8), ("2", 20)])
            .map(|(token, id)| (token.to_string(), id))
            .collect();
        let tokenizer = VocabTokenizer::from_vocab(vocab).unwrap();
        let mut env = AddEnv::new(Arc::new(tokenizer), EnvConfig::default()).unwrap();
        let before = env.tokens().to_vec();

        let err = env.step(12).unwrap_err();

        assert!(matches!(err, EnvError::InvalidAction { action: 12, vocab_size: 21 }));
        assert_eq!(env.tokens(), before.as_slice());
        assert_eq!(env.episode().action_count, 0);
        assert!(env.step(20).is_ok());
    }

    #[test]
    fn test_operands_out_of_range() {
        let mut env = env(EnvConfig::default());

        assert!(matches!(
            env.reset_with_operands(10, 0),
            Err(EnvError::OperandOutOfRange { .. })
        ));
    }
}
