use rand::Rng;

use crate::ai::approximator::{ActionValues, QApproximator};
use crate::ai::state_encoding::encode_observation;
use crate::error::{ApproximatorError, TrainingError};
use crate::game::{Action, GameState, ACTION_SPACE};

/// Multiplicative per-episode epsilon decay, clamped at `floor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub floor: f32,
    pub decay: f32,
}

impl EpsilonSchedule {
    /// `max(floor, start * decay^episodes)`, computed in closed form.
    pub fn value(&self, episodes: usize) -> f32 {
        let exponent = episodes.min(i32::MAX as usize) as i32;
        (self.start * self.decay.powi(exponent)).max(self.floor)
    }
}

/// Replace the value of every illegal action with `-inf`.
pub fn mask_illegal(values: &ActionValues, legal: &[Action]) -> ActionValues {
    let mut masked = [f32::NEG_INFINITY; ACTION_SPACE];
    for action in legal {
        masked[action.index()] = values[action.index()];
    }
    masked
}

/// Highest-valued legal action; ties go to the lowest index.
pub fn greedy_action(values: &ActionValues, legal: &[Action]) -> Option<Action> {
    let masked = mask_illegal(values, legal);
    let mut best: Option<Action> = None;
    let mut best_q = f32::NEG_INFINITY;
    for &action in legal {
        let q = masked[action.index()];
        if best.is_none() || q > best_q {
            best = Some(action);
            best_q = q;
        }
    }
    best
}

/// Largest value among legal actions, or `None` when there are none.
pub fn max_legal_value(values: &ActionValues, legal: &[Action]) -> Option<f32> {
    legal
        .iter()
        .map(|a| values[a.index()])
        .fold(None, |best, q| match best {
            Some(b) if b >= q => Some(b),
            _ => Some(q),
        })
}

/// Epsilon-greedy choice over the legal actions of `state`.
pub fn select_action<A: QApproximator, R: Rng>(
    approximator: &A,
    state: &GameState,
    epsilon: f32,
    rng: &mut R,
) -> Result<Action, TrainingError> {
    let legal = state.legal_actions();
    if legal.is_empty() {
        return Err(TrainingError::NoLegalActions);
    }

    if epsilon > 0.0 && rng.random_range(0.0..1.0) < epsilon {
        let idx = rng.random_range(0..legal.len());
        return Ok(legal[idx]);
    }

    let values = approximator.predict(&[encode_observation(state)])?;
    let values = values.first().ok_or(ApproximatorError::EmptyBatch)?;
    greedy_action(values, &legal).ok_or(TrainingError::NoLegalActions)
}
