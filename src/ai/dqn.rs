//! Deep Q-learning pieces: hyperparameters, the online/target learner and
//! the Bellman target.

use tracing::debug;

use crate::ai::approximator::{check_len, ActionValues, QApproximator, QTarget};
use crate::ai::policy::{max_legal_value, EpsilonSchedule};
use crate::ai::state_encoding::{encode_observation, Observation};
use crate::error::TrainingError;
use crate::game::Action;
use crate::training::replay_buffer::{ReplayBuffer, Transition};

/// Whether both players share one learner or train their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfPlayMode {
    Shared,
    Separate,
}

impl SelfPlayMode {
    pub fn learner_count(self) -> usize {
        match self {
            SelfPlayMode::Shared => 1,
            SelfPlayMode::Separate => 2,
        }
    }
}

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    /// Multiplicative decay applied once per episode.
    pub epsilon_decay: f32,
    /// Episodes between target network syncs.
    pub target_sync_interval: usize,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub min_replay_size: usize,
    /// Environment steps between gradient updates.
    pub train_every: usize,
    pub self_play: SelfPlayMode,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_floor: 0.05,
            epsilon_decay: 0.999,
            target_sync_interval: 100,
            batch_size: 64,
            replay_capacity: 50_000,
            min_replay_size: 1000,
            train_every: 1,
            self_play: SelfPlayMode::Shared,
        }
    }
}

impl DqnConfig {
    pub fn epsilon_schedule(&self) -> EpsilonSchedule {
        EpsilonSchedule {
            start: self.epsilon_start,
            floor: self.epsilon_floor,
            decay: self.epsilon_decay,
        }
    }

    /// Replay size at which updates start.
    pub fn update_threshold(&self) -> usize {
        self.min_replay_size.max(self.batch_size)
    }
}

/// `r` for terminal transitions, otherwise `r + gamma * max_{a' legal} Q'(s', a')`.
pub fn bellman_target(
    reward: f32,
    done: bool,
    next_values: &ActionValues,
    legal_next: &[Action],
    gamma: f32,
) -> f32 {
    if done {
        return reward;
    }
    match max_legal_value(next_values, legal_next) {
        Some(max_q) => reward + gamma * max_q,
        None => reward,
    }
}

/// Online approximator, its lagged target copy and the replay memory that
/// feeds them.
pub struct Learner<A: QApproximator> {
    online: A,
    target: A,
    buffer: ReplayBuffer,
}

impl<A: QApproximator> Learner<A> {
    /// The target starts as a copy of `online`.
    pub fn new(online: A, mut target: A, buffer: ReplayBuffer) -> Self {
        online.clone_parameters_into(&mut target);
        Learner {
            online,
            target,
            buffer,
        }
    }

    pub fn remember(&mut self, transition: Transition) {
        self.buffer.push(transition);
    }

    /// One Bellman update on a uniformly sampled batch.
    ///
    /// Returns `Ok(None)` when the buffer cannot supply `batch_size` transitions.
    pub fn train_step(&mut self, batch_size: usize, gamma: f32) -> Result<Option<f32>, TrainingError> {
        let batch = match self.buffer.sample(batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                debug!(%e, "skipping update");
                return Ok(None);
            }
        };

        let next_observations: Vec<Observation> = batch
            .iter()
            .map(|t| encode_observation(&t.next_state))
            .collect();
        let next_values = self.target.predict(&next_observations)?;
        check_len("target predictions", batch.len(), next_values.len())?;

        let targets: Vec<QTarget> = batch
            .iter()
            .zip(&next_values)
            .map(|(t, values)| QTarget {
                observation: encode_observation(&t.state),
                action: t.action,
                target: bellman_target(
                    t.reward,
                    t.done,
                    values,
                    &t.next_state.legal_actions(),
                    gamma,
                ),
            })
            .collect();

        let loss = self.online.update(&targets)?;
        Ok(Some(loss))
    }

    /// Copy online parameters into the target approximator.
    pub fn sync_target(&mut self) {
        self.online.clone_parameters_into(&mut self.target);
    }

    pub fn online(&self) -> &A {
        &self.online
    }

    pub fn online_mut(&mut self) -> &mut A {
        &mut self.online
    }

    pub fn target(&self) -> &A {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut A {
        &mut self.target
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }
}
