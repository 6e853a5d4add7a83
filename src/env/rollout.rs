use std::collections::VecDeque;

use tracing::info;

use crate::env::add_env::AddEnv;
use crate::env::errors::EnvError;
use crate::env::traits::{Agent, Env};
use crate::env::types::{Trajectory, Transition};
use crate::tokenizer::{TokenId, Tokenizer};

/// Replays a fixed list of actions, then emits `fallback` (normally `[EOS]`)
/// forever.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    actions: VecDeque<TokenId>,
    fallback: TokenId,
}

impl ScriptedAgent {
    pub fn new(actions: impl IntoIterator<Item = TokenId>, fallback: TokenId) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            fallback,
        }
    }

    /// Scripts the tokens spelling `text`, falling back to the environment's
    /// end-of-sequence token.
    pub fn from_text<T: Tokenizer>(env: &AddEnv<T>, text: &str) -> Self {
        Self::new(env.tokenizer().encode(text), env.control_tokens().eos.id)
    }

    pub fn remaining(&self) -> usize {
        self.actions.len()
    }
}

impl<T: Tokenizer> Agent<AddEnv<T>> for ScriptedAgent {
    fn act(&mut self, _obs: &Vec<TokenId>) -> TokenId {
        self.actions.pop_front().unwrap_or(self.fallback)
    }
}

/// Resets `env` and plays one episode with `agent`.
pub fn run_episode<T, A>(env: &mut AddEnv<T>, agent: &mut A) -> Result<Trajectory, EnvError>
where
    T: Tokenizer,
    A: Agent<AddEnv<T>>,
{
    let obs = env.reset()?;
    play(env, agent, obs)
}

/// Plays the current episode of `env` to completion without resetting it.
pub fn continue_episode<T, A>(env: &mut AddEnv<T>, agent: &mut A) -> Result<Trajectory, EnvError>
where
    T: Tokenizer,
    A: Agent<AddEnv<T>>,
{
    let obs = env.observation();
    play(env, agent, obs)
}

fn play<T, A>(
    env: &mut AddEnv<T>,
    agent: &mut A,
    mut obs: Vec<TokenId>,
) -> Result<Trajectory, EnvError>
where
    T: Tokenizer,
    A: Agent<AddEnv<T>>,
{
    let mut steps = Vec::new();
    let mut total_reward = 0.0;

    // Every step appends at least one token, so this ends within
    // max_token_length iterations.
    loop {
        let action = agent.act(&obs);
        let (next_obs, reward, done, _) = env.step(action)?;
        total_reward += reward;
        steps.push(Transition {
            action,
            reward,
            done,
            execution: env.last_execution().cloned(),
        });

        if done {
            break;
        }
        obs = next_obs;
    }

    let episode = env.episode();
    let trajectory = Trajectory {
        id: episode.id,
        episode_index: episode.episode_index,
        operands: episode.operands(),
        steps,
        final_text: env.text(),
        total_reward,
        outcome: env.outcome(),
    };
    info!(
        episode_id = %trajectory.id,
        steps = trajectory.steps.len(),
        reward = trajectory.total_reward,
        "episode finished"
    );
    Ok(trajectory)
}
