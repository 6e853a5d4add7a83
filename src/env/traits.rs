use crate::env::errors::EnvError;

/// Gym-style environment surface.
pub trait Env: Send {
    type Obs: Send + Clone + 'static;
    type Act: Send + Clone + 'static;
    type Info: Send + Clone + 'static;

    fn reset(&mut self) -> Result<Self::Obs, EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError>;

    /// Writes a human-readable view of the current state to stdout.
    fn render(&self) -> Result<(), EnvError>;

    /// Reseeds the random source used by subsequent resets.
    fn seed(&mut self, seed: u64);

    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }
}

/// A policy choosing the next action from the latest observation.
pub trait Agent<E: Env> {
    fn act(&mut self, obs: &E::Obs) -> E::Act;
}
