// src/env/mod.rs
mod add_env;
mod episode;
mod errors;
mod rollout;
mod traits;
mod types;

pub use add_env::{AddEnv, StepInfo};
pub use episode::Episode;
pub use errors::EnvError;
pub use rollout::{ScriptedAgent, continue_episode, run_episode};
pub use traits::{Agent, Env};
pub use types::{Trajectory, Transition};
