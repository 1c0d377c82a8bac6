use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::{Action, GameState, ACTION_SPACE};

/// Length of the observation vector: one entry per cell plus the previous move.
pub const OBSERVATION_SIZE: usize = ACTION_SPACE + 1;

/// Fixed-length input to an approximator.
///
/// Entries `0..81` follow the flat action index: `+1.0` for the player to move,
/// `-1.0` for the opponent, `0.0` for an empty cell. Entry 81 is the previous
/// move as `(index + 1) / 81`, or `0.0` at the start of a game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation([f32; OBSERVATION_SIZE]);

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn values(&self) -> &[f32; OBSERVATION_SIZE] {
        &self.0
    }
}

/// Encode a game state from the perspective of the player to move.
pub fn encode_observation(state: &GameState) -> Observation {
    let mut data = [0.0f32; OBSERVATION_SIZE];
    let current_cell = state.current_player().to_cell();
    let opponent_cell = state.current_player().other().to_cell();

    for action in Action::all() {
        let cell = state.cell(action);
        if cell == current_cell {
            data[action.index()] = 1.0;
        } else if cell == opponent_cell {
            data[action.index()] = -1.0;
        }
    }

    data[ACTION_SPACE] = match state.last_action() {
        Some(action) => (action.index() + 1) as f32 / ACTION_SPACE as f32,
        None => 0.0,
    };

    Observation(data)
}

/// Stack observations into a `[batch, 82]` tensor.
pub fn encode_observations_batch<B: Backend>(
    observations: &[Observation],
    device: &B::Device,
) -> Tensor<B, 2> {
    let batch_size = observations.len();
    let mut flat = Vec::with_capacity(batch_size * OBSERVATION_SIZE);
    for observation in observations {
        flat.extend_from_slice(observation.as_slice());
    }
    Tensor::<B, 1>::from_data(TensorData::from(flat.as_slice()), device)
        .reshape([batch_size as i32, OBSERVATION_SIZE as i32])
}
