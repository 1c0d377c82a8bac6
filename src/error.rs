use std::path::PathBuf;

use crate::game::{Action, IllegalMoveError};

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint holds {found} learner(s), expected {expected}")]
    LearnerCount { expected: usize, found: usize },

    #[error("approximator error: {0}")]
    Approximator(#[from] ApproximatorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised when a batch is requested before the replay buffer holds enough
/// transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("replay buffer holds {available} transitions, {requested} requested")]
pub struct InsufficientDataError {
    pub requested: usize,
    pub available: usize,
}

/// Errors raised by action-value approximators.
#[derive(Debug, thiserror::Error)]
pub enum ApproximatorError {
    #[error("{context}: expected length {expected}, got {actual}")]
    Shape {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("empty batch")]
    EmptyBatch,

    #[error("tensor data error: {0}")]
    Tensor(String),

    #[error("failed to save parameters: {0}")]
    Save(String),

    #[error("failed to load parameters: {0}")]
    Load(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("illegal action {action} selected: {source}\n{board}")]
    IllegalMove {
        action: Action,
        board: String,
        source: IllegalMoveError,
    },

    #[error("no legal actions available in a non-terminal position")]
    NoLegalActions,

    #[error("approximator error: {0}")]
    Approximator(#[from] ApproximatorError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("no checkpoint manager attached")]
    NoCheckpointManager,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoLatestSymlink(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no 'latest' symlink found in checkpoints");
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = InsufficientDataError {
            requested: 64,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "replay buffer holds 10 transitions, 64 requested"
        );
    }

    #[test]
    fn test_shape_error_display() {
        let err = ApproximatorError::Shape {
            context: "observation",
            expected: 82,
            actual: 81,
        };
        assert_eq!(err.to_string(), "observation: expected length 82, got 81");
    }

    #[test]
    fn test_training_error_display() {
        let err = TrainingError::IllegalMove {
            action: Action::new(0, 0).unwrap(),
            board: "<board>".to_string(),
            source: IllegalMoveError::GameOver,
        };
        assert_eq!(
            err.to_string(),
            "illegal action (0, 0) selected: game is already over\n<board>"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("dqn.learning_rate must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: dqn.learning_rate must be > 0"
        );
    }
}
