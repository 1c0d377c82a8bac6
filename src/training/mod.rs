//! Training infrastructure: self-play trainer, replay buffer, per-player
//! transition stitching and metrics collection.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use episode::{evaluate, evaluate_sides, EvalResult, TransitionBuilder};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::{ReplayBuffer, Transition};
pub use trainer::{Trainer, TrainerConfig, TrainingState};
