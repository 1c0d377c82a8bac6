use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ai::{Learner, QApproximator};
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;
use crate::training::TrainingState;

const METADATA_FILE: &str = "metadata.json";
const TRAINING_STATE_FILE: &str = "training_state.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// A loaded checkpoint. Weights stay on disk under `path` until
/// [`CheckpointManager::restore_learners`] reads them.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state: TrainingState,
}

fn learner_dir(checkpoint: &Path, index: usize) -> PathBuf {
    checkpoint.join(format!("learner_{index}"))
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(CheckpointManager { config })
    }

    pub fn config(&self) -> &CheckpointManagerConfig {
        &self.config
    }

    /// Write `checkpoint_NNNNNNN/` with every learner's online and target
    /// weights, the training state and metadata, then repoint `latest` and
    /// prune.
    pub fn save<A: QApproximator>(
        &self,
        learners: &[Learner<A>],
        state: &TrainingState,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{dir_name}.tmp"));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        for (i, learner) in learners.iter().enumerate() {
            let dir = learner_dir(&tmp_dir, i);
            learner.online().save(&dir.join("online"))?;
            learner.target().save(&dir.join("target"))?;
        }

        fs::write(
            tmp_dir.join(TRAINING_STATE_FILE),
            serde_json::to_string_pretty(state)?,
        )?;
        fs::write(
            tmp_dir.join(METADATA_FILE),
            serde_json::to_string_pretty(metadata)?,
        )?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints()?;

        Ok(final_dir)
    }

    /// Read metadata and training state of the checkpoint at `dir`.
    pub fn load(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        let metadata: CheckpointMetadata = read_json(&dir.join(METADATA_FILE))?;
        let training_state: TrainingState = read_json(&dir.join(TRAINING_STATE_FILE))?;
        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
            training_state,
        })
    }

    /// Load the checkpoint the `latest` symlink points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join("latest");
        if !latest_link.exists() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load(&target)
    }

    /// Load saved weights into `learners`, which must match the saved count.
    pub fn restore_learners<A: QApproximator>(
        data: &CheckpointData,
        learners: &mut [Learner<A>],
    ) -> Result<(), CheckpointError> {
        if data.metadata.learners != learners.len() {
            return Err(CheckpointError::LearnerCount {
                expected: learners.len(),
                found: data.metadata.learners,
            });
        }
        for (i, learner) in learners.iter_mut().enumerate() {
            let dir = learner_dir(&data.path, i);
            learner.online_mut().load(&dir.join("online"))?;
            learner.target_mut().load(&dir.join("target"))?;
        }
        Ok(())
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(
        &self,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results: Vec<(PathBuf, CheckpointMetadata)> = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA_FILE);
            if meta_path.exists() {
                let metadata: CheckpointMetadata = read_json(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by win_rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        keep.extend(by_win_rate.iter().take(self.config.keep_best_n).map(|(i, _)| *i));

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!(path = %path.display(), "pruning checkpoint");
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Point the `latest` symlink at the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join("latest");
        if link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DqnConfig, LinearApproximator, NetworkConfig};
    use crate::checkpoint::CheckpointMetrics;
    use crate::env::RewardConfig;
    use crate::training::replay_buffer::ReplayBuffer;

    fn test_metrics(win_rate: f32) -> CheckpointMetrics {
        CheckpointMetrics {
            win_rate,
            draw_rate: 0.10,
            loss_rate: 0.9 - win_rate,
            average_game_length: 45.0,
            current_loss: 0.05,
            training_steps: 1000,
            epsilon: 0.3,
        }
    }

    fn metadata(episode: usize, win_rate: f32, learners: usize) -> CheckpointMetadata {
        CheckpointMetadata::new(
            episode,
            "linear",
            learners,
            test_metrics(win_rate),
            DqnConfig::default(),
            RewardConfig::default(),
        )
    }

    fn learners(count: usize, seed: u64) -> Vec<Learner<LinearApproximator>> {
        let config = NetworkConfig::default();
        (0..count)
            .map(|i| {
                let s = seed + 10 * i as u64;
                Learner::new(
                    LinearApproximator::new(&config, 0.01, Some(s)).unwrap(),
                    LinearApproximator::new(&config, 0.01, Some(s + 1)).unwrap(),
                    ReplayBuffer::new(10),
                )
            })
            .collect()
    }

    fn manager(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
        .unwrap()
    }

    fn state(episode: usize) -> TrainingState {
        TrainingState {
            epsilon: 0.3,
            episode,
            steps: episode * 40,
            updates: episode * 39,
            target_syncs: episode / 100,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let saved = learners(2, 1);

        let path = manager
            .save(&saved, &state(1000), &metadata(1000, 0.6, 2))
            .unwrap();
        assert!(path.join(METADATA_FILE).exists());
        assert!(path.join(TRAINING_STATE_FILE).exists());
        assert!(path.join("learner_0/online/linear.json").exists());
        assert!(path.join("learner_1/target/linear.json").exists());

        let data = manager.load(&path).unwrap();
        assert_eq!(data.metadata.episode, 1000);
        assert_eq!(data.metadata.approximator, "linear");
        assert_eq!(data.training_state, state(1000));

        let mut restored = learners(2, 50);
        CheckpointManager::restore_learners(&data, &mut restored).unwrap();
        for (a, b) in saved.iter().zip(&restored) {
            assert_eq!(a.online().parameters(), b.online().parameters());
            assert_eq!(a.target().parameters(), b.target().parameters());
        }
    }

    #[test]
    fn test_restore_rejects_learner_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let path = manager
            .save(&learners(1, 1), &state(10), &metadata(10, 0.5, 1))
            .unwrap();
        let data = manager.load(&path).unwrap();

        let mut two = learners(2, 1);
        let err = CheckpointManager::restore_learners(&data, &mut two).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::LearnerCount {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_latest_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);
        let l = learners(1, 3);

        manager.save(&l, &state(1000), &metadata(1000, 0.5, 1)).unwrap();
        manager.save(&l, &state(2000), &metadata(2000, 0.5, 1)).unwrap();

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.metadata.episode, 2000);
        assert_eq!(latest.training_state.episode, 2000);
    }

    #[test]
    fn test_list_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10, 10);
        let l = learners(1, 4);

        for ep in [3000, 1000, 2000] {
            manager.save(&l, &state(ep), &metadata(ep, 0.5, 1)).unwrap();
        }

        let episodes: Vec<usize> = manager
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|(_, m)| m.episode)
            .collect();
        assert_eq!(episodes, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 2, 1);
        let l = learners(1, 5);

        let win_rates = [0.5, 0.9, 0.3, 0.6, 0.7];
        for (i, &wr) in win_rates.iter().enumerate() {
            let ep = (i + 1) * 1000;
            manager.save(&l, &state(ep), &metadata(ep, wr, 1)).unwrap();
        }

        // Last 2 (4000, 5000) plus best 1 (2000).
        let episodes: Vec<usize> = manager
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|(_, m)| m.episode)
            .collect();
        assert_eq!(episodes, vec![2000, 4000, 5000]);
    }

    #[test]
    fn test_load_latest_no_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 5, 3);

        let err = manager.load_latest().unwrap_err();
        assert!(
            matches!(err, CheckpointError::NoLatestSymlink(_)),
            "expected NoLatestSymlink, got: {err}"
        );
    }

    #[test]
    fn test_metadata_without_rewards_uses_defaults() {
        let mut value = serde_json::to_value(metadata(100, 0.4, 1)).unwrap();
        value.as_object_mut().unwrap().remove("rewards");
        let meta: CheckpointMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(meta.rewards, RewardConfig::default());
        assert_eq!(meta.hyperparameters, DqnConfig::default());
    }
}
