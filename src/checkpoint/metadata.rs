use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ai::DqnConfig;
use crate::env::RewardConfig;

/// Metrics snapshot at checkpoint time. Rates come from the evaluation
/// against the random agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub win_rate: f32,
    pub draw_rate: f32,
    pub loss_rate: f32,
    pub average_game_length: f32,
    pub current_loss: f32,
    pub training_steps: usize,
    pub epsilon: f32,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub approximator: String,
    pub learners: usize,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: DqnConfig,
    #[serde(default)]
    pub rewards: RewardConfig,
}

impl CheckpointMetadata {
    /// Metadata stamped with the current time.
    pub fn new(
        episode: usize,
        approximator: &str,
        learners: usize,
        metrics: CheckpointMetrics,
        hyperparameters: DqnConfig,
        rewards: RewardConfig,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CheckpointMetadata {
            episode,
            timestamp,
            approximator: approximator.to_string(),
            learners,
            metrics,
            hyperparameters,
            rewards,
        }
    }
}
