use std::path::Path;

use tracing::warn;

use crate::ai::{DqnConfig, NetworkConfig};
use crate::checkpoint::CheckpointManagerConfig;
use crate::env::RewardConfig;
use crate::error::ConfigError;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reward: RewardConfig,
    pub dqn: DqnConfig,
    pub network: NetworkConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(message.into()))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reward;
        if ![r.win, r.loss, r.draw, r.step].iter().all(|v| v.is_finite()) {
            return invalid("reward values must be finite");
        }
        if r.win <= r.loss {
            return invalid("reward.win must be > reward.loss");
        }

        let d = &self.dqn;
        if d.learning_rate <= 0.0 {
            return invalid("dqn.learning_rate must be > 0");
        }
        if !(0.0..=1.0).contains(&d.gamma) {
            return invalid("dqn.gamma must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&d.epsilon_start) {
            return invalid("dqn.epsilon_start must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&d.epsilon_floor) {
            return invalid("dqn.epsilon_floor must be in [0, 1]");
        }
        if d.epsilon_floor > d.epsilon_start {
            return invalid("dqn.epsilon_floor must be <= dqn.epsilon_start");
        }
        if d.epsilon_decay <= 0.0 || d.epsilon_decay > 1.0 {
            return invalid("dqn.epsilon_decay must be in (0, 1]");
        }
        if d.batch_size == 0 {
            return invalid("dqn.batch_size must be > 0");
        }
        if d.replay_capacity < d.batch_size {
            return invalid("dqn.replay_capacity must be >= dqn.batch_size");
        }
        if d.min_replay_size > d.replay_capacity {
            return invalid("dqn.min_replay_size must be <= dqn.replay_capacity");
        }
        if d.target_sync_interval == 0 {
            return invalid("dqn.target_sync_interval must be > 0");
        }
        if d.train_every == 0 {
            return invalid("dqn.train_every must be > 0");
        }

        self.network
            .check_shape()
            .map_err(|e| ConfigError::Validation(format!("network: {e}")))?;
        if self.network.hidden_size == 0 {
            return invalid("network.hidden_size must be > 0");
        }

        if self.training.num_episodes == 0 {
            return invalid("training.num_episodes must be > 0");
        }
        if self.checkpoint.keep_last_n == 0 {
            return invalid("checkpoint.keep_last_n must be >= 1");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ApproximatorKind, SelfPlayMode};
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[dqn]
learning_rate = 0.005
self_play = "separate"

[reward]
draw = 0.0

[network]
kind = "linear"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.dqn.learning_rate - 0.005).abs() < 1e-9);
        assert_eq!(config.dqn.self_play, SelfPlayMode::Separate);
        assert_eq!(config.network.kind, ApproximatorKind::Linear);
        assert_eq!(config.reward.draw, 0.0);
        // Other fields should be defaults
        assert_eq!(config.reward.win, 1.0);
        assert!((config.dqn.gamma - 0.95).abs() < 1e-6);
        assert_eq!(config.training.num_episodes, 10_000);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_episodes() {
        let mut config = AppConfig::default();
        config.training.num_episodes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.dqn.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.dqn.gamma = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_epsilon_floor_above_start() {
        let mut config = AppConfig::default();
        config.dqn.epsilon_start = 0.1;
        config.dqn.epsilon_floor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_decay() {
        let mut config = AppConfig::default();
        config.dqn.epsilon_decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_replay_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.dqn.replay_capacity = 10;
        config.dqn.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_min_replay_above_capacity() {
        let mut config = AppConfig::default();
        config.dqn.replay_capacity = 500;
        config.dqn.min_replay_size = 600;
        config.dqn.batch_size = 8;
        match config.validate() {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("min_replay_size")),
            other => panic!("expected validation error, got {other:?}"),
        }

        // The update threshold can then never be reached.
        assert!(config.dqn.update_threshold() > config.dqn.replay_capacity);
    }

    #[test]
    fn test_min_replay_below_batch_is_allowed() {
        let mut config = AppConfig::default();
        config.dqn.min_replay_size = 10;
        config.dqn.batch_size = 64;
        config.validate().unwrap();
        assert_eq!(config.dqn.update_threshold(), 64);
    }

    #[test]
    fn test_validation_rejects_wrong_network_shape() {
        let mut config = AppConfig::default();
        config.network.output_size = 9;
        match config.validate() {
            Err(ConfigError::Validation(msg)) => assert!(msg.starts_with("network:")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_inverted_rewards() {
        let mut config = AppConfig::default();
        config.reward.win = -1.0;
        config.reward.loss = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.training.num_episodes, 10_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[training]
num_episodes = 500
seed = 42
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.training.num_episodes, 500);
        assert_eq!(config.training.seed, Some(42));
        // Others are defaults
        assert!((config.dqn.learning_rate - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[dqn]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config, AppConfig::default());
    }
}
