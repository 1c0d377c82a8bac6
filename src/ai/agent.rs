use crate::ai::approximator::QApproximator;
use crate::ai::policy::select_action;
use crate::error::TrainingError;
use crate::game::{Action, GameState};

/// Anything that can pick a move for the player to move.
pub trait Agent {
    /// Select an action given the current game state. Must be legal.
    fn select_action(&mut self, state: &GameState) -> Result<Action, TrainingError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

/// Plays the masked argmax of an approximator, with no exploration.
pub struct GreedyAgent<'a, A: QApproximator> {
    approximator: &'a A,
}

impl<'a, A: QApproximator> GreedyAgent<'a, A> {
    pub fn new(approximator: &'a A) -> Self {
        GreedyAgent { approximator }
    }
}

impl<A: QApproximator> Agent for GreedyAgent<'_, A> {
    fn select_action(&mut self, state: &GameState) -> Result<Action, TrainingError> {
        // Epsilon 0 never consults the rng.
        select_action(self.approximator, state, 0.0, &mut rand::rng())
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}
