//! On-disk checkpoints: approximator weights, training progress and
//! metadata, with a `latest` symlink and pruning.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointMetadata, CheckpointMetrics};
