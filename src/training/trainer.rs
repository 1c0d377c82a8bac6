use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::ai::policy::select_action;
use crate::ai::{DqnConfig, GreedyAgent, Learner, QApproximator, SelfPlayMode};
use crate::checkpoint::{CheckpointManager, CheckpointMetadata, CheckpointMetrics};
use crate::env::{Environment, RewardConfig};
use crate::error::{ApproximatorError, TrainingError};
use crate::game::{GameOutcome, Player};
use crate::training::episode::{
    checked_step, episode_seed, evaluate_sides, EvalResult, TransitionBuilder,
};
use crate::training::metrics::{EpisodeResult, TrainingMetrics};
use crate::training::replay_buffer::ReplayBuffer;

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub log_interval: usize,
    pub eval_interval: usize,
    pub eval_games: usize,
    /// Episodes between checkpoints; 0 disables checkpointing.
    pub checkpoint_interval: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 10_000,
            log_interval: 100,
            eval_interval: 500,
            eval_games: 100,
            checkpoint_interval: 1000,
            seed: None,
        }
    }
}

/// Mutable training progress, owned by the caller and threaded through
/// every episode so a run can be snapshotted and resumed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainingState {
    pub epsilon: f32,
    pub episode: usize,
    pub steps: usize,
    pub updates: usize,
    pub target_syncs: usize,
}

impl TrainingState {
    pub fn new(epsilon: f32) -> Self {
        TrainingState {
            epsilon,
            episode: 0,
            steps: 0,
            updates: 0,
            target_syncs: 0,
        }
    }
}

/// Self-play DQN trainer over any [`QApproximator`].
pub struct Trainer<A: QApproximator> {
    learners: Vec<Learner<A>>,
    env: Environment,
    dqn: DqnConfig,
    config: TrainerConfig,
    metrics: TrainingMetrics,
    rng: StdRng,
    checkpoints: Option<CheckpointManager>,
}

impl<A: QApproximator> Trainer<A> {
    /// Build the learners with `make_approximator`, called once per online
    /// and once per target approximator with a distinct stream index.
    pub fn new<F>(
        dqn: DqnConfig,
        rewards: RewardConfig,
        config: TrainerConfig,
        mut make_approximator: F,
    ) -> Result<Self, TrainingError>
    where
        F: FnMut(usize) -> Result<A, ApproximatorError>,
    {
        let count = dqn.self_play.learner_count();
        let mut learners = Vec::with_capacity(count);
        for i in 0..count {
            let online = make_approximator(2 * i)?;
            let target = make_approximator(2 * i + 1)?;
            let buffer = match config.seed {
                Some(seed) => ReplayBuffer::with_seed(dqn.replay_capacity, episode_seed(seed, i)),
                None => ReplayBuffer::new(dqn.replay_capacity),
            };
            learners.push(Learner::new(online, target, buffer));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Trainer {
            learners,
            env: Environment::new(rewards),
            dqn,
            config,
            metrics: TrainingMetrics::new(),
            rng,
            checkpoints: None,
        })
    }

    /// Save checkpoints through `manager` during [`Trainer::train`].
    pub fn with_checkpoints(mut self, manager: CheckpointManager) -> Self {
        self.checkpoints = Some(manager);
        self
    }

    /// Fresh progress with the schedule's starting epsilon.
    pub fn initial_state(&self) -> TrainingState {
        TrainingState::new(self.dqn.epsilon_schedule().value(0))
    }

    fn learner_index(&self, player: Player) -> usize {
        match self.dqn.self_play {
            SelfPlayMode::Shared => 0,
            SelfPlayMode::Separate => player.index(),
        }
    }

    /// The learner that plays `player`.
    pub fn learner(&self, player: Player) -> &Learner<A> {
        &self.learners[self.learner_index(player)]
    }

    pub fn learners(&self) -> &[Learner<A>] {
        &self.learners
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn dqn_config(&self) -> &DqnConfig {
        &self.dqn
    }

    /// Play one self-play episode, storing transitions and training as it goes.
    pub fn run_episode(&mut self, state: &mut TrainingState) -> Result<EpisodeResult, TrainingError> {
        self.env.reset();
        let mut builder = TransitionBuilder::new(self.env.rewards().clone());
        let threshold = self.dqn.update_threshold();
        let train_every = self.dqn.train_every.max(1);
        let mut updates = 0;

        loop {
            let before = *self.env.state();
            let idx = self.learner_index(before.current_player());
            let action = select_action(
                self.learners[idx].online(),
                &before,
                state.epsilon,
                &mut self.rng,
            )?;

            let step = match checked_step(&mut self.env, action) {
                Ok(step) => step,
                Err(e) => {
                    if let TrainingError::IllegalMove { action, board, source } = &e {
                        error!(%action, %source, episode = state.episode, "illegal move selected\n{board}");
                    }
                    return Err(e);
                }
            };
            state.steps += 1;

            for transition in builder.record(before, action, &step) {
                let li = self.learner_index(transition.player);
                self.learners[li].remember(transition);
            }

            if state.steps % train_every == 0 {
                for learner in &mut self.learners {
                    if learner.buffer().len() < threshold {
                        continue;
                    }
                    if let Some(loss) = learner.train_step(self.dqn.batch_size, self.dqn.gamma)? {
                        self.metrics.record_update(loss);
                        state.updates += 1;
                        updates += 1;
                    }
                }
            }

            if let Some(outcome) = step.info.outcome {
                self.finish_episode(state);
                let result = EpisodeResult {
                    winner: match outcome {
                        GameOutcome::Winner(p) => Some(p),
                        GameOutcome::Draw => None,
                    },
                    game_length: step.info.move_count,
                    updates,
                };
                self.metrics.record_episode(result);
                return Ok(result);
            }
        }
    }

    fn finish_episode(&mut self, state: &mut TrainingState) {
        state.episode += 1;
        state.epsilon = self.dqn.epsilon_schedule().value(state.episode);

        let interval = self.dqn.target_sync_interval;
        if interval > 0 && state.episode % interval == 0 {
            for learner in &mut self.learners {
                learner.sync_target();
            }
            state.target_syncs += 1;
            debug!(episode = state.episode, syncs = state.target_syncs, "target synced");
        }
    }

    /// Run `num_episodes` episodes with periodic logging, evaluation and
    /// checkpoints. Returns the final evaluation against the random agent.
    pub fn train(
        &mut self,
        state: &mut TrainingState,
        num_episodes: usize,
    ) -> Result<EvalResult, TrainingError> {
        let start_episode = state.episode + 1;
        let end_episode = state.episode + num_episodes;
        info!(
            num_episodes,
            start_episode,
            end_episode,
            approximator = self.learners[0].online().name(),
            self_play = ?self.dqn.self_play,
            "starting DQN training"
        );

        for _ in 0..num_episodes {
            self.run_episode(state)?;
            let episode = state.episode;

            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                let window = self.config.log_interval;
                info!(
                    episode,
                    epsilon = format_args!("{:.3}", state.epsilon),
                    loss = format_args!("{:.4}", self.metrics.average_loss(window)),
                    x_win = format_args!("{:.1}%", self.metrics.win_rate(Player::X, window) * 100.0),
                    o_win = format_args!("{:.1}%", self.metrics.win_rate(Player::O, window) * 100.0),
                    draw = format_args!("{:.1}%", self.metrics.draw_rate(window) * 100.0),
                    avg_len = format_args!("{:.1}", self.metrics.average_game_length(window)),
                    "training progress"
                );
            }

            let eval = if self.config.eval_interval > 0 && episode % self.config.eval_interval == 0 {
                let eval = self.evaluate(self.config.eval_games)?;
                self.metrics.record_evaluation(&eval);
                info!(
                    episode,
                    games = eval.games(),
                    win_rate = format_args!("{:.1}%", eval.win_rate() * 100.0),
                    draw_rate = format_args!("{:.1}%", eval.draw_rate() * 100.0),
                    "eval vs random"
                );
                Some(eval)
            } else {
                None
            };

            // Reuse this episode's evaluation when the intervals coincide.
            if self.checkpoints.is_some()
                && self.config.checkpoint_interval > 0
                && episode % self.config.checkpoint_interval == 0
            {
                let eval = match eval {
                    Some(eval) => eval,
                    None => {
                        let result = self.evaluate(self.config.eval_games)?;
                        self.metrics.record_evaluation(&result);
                        result
                    }
                };
                match self.save_checkpoint(state, &eval) {
                    Ok(path) => info!(path = %path.display(), "checkpoint saved"),
                    Err(e) => warn!(error = %e, "checkpoint failed"),
                }
            }
        }

        let final_eval = self.evaluate(self.config.eval_games)?;
        self.metrics.record_evaluation(&final_eval);
        info!(
            total_episodes = state.episode,
            updates = state.updates,
            target_syncs = state.target_syncs,
            win_rate = format_args!("{:.1}%", final_eval.win_rate() * 100.0),
            "training complete"
        );
        Ok(final_eval)
    }

    /// Greedy play against a random opponent, alternating sides. Each side
    /// is played by the learner that trains for it.
    pub fn evaluate(&self, games: usize) -> Result<EvalResult, TrainingError> {
        let mut x_agent = GreedyAgent::new(self.learner(Player::X).online());
        let mut o_agent = GreedyAgent::new(self.learner(Player::O).online());
        evaluate_sides(&mut x_agent, &mut o_agent, games, self.config.seed)
    }

    fn checkpoint_metrics(&self, state: &TrainingState, eval: &EvalResult) -> CheckpointMetrics {
        let window = self.config.log_interval.max(1);
        CheckpointMetrics {
            win_rate: eval.win_rate(),
            draw_rate: eval.draw_rate(),
            loss_rate: eval.loss_rate(),
            average_game_length: self.metrics.average_game_length(window),
            current_loss: self.metrics.average_loss(window),
            training_steps: state.updates,
            epsilon: state.epsilon,
        }
    }

    /// Write weights, progress and metadata through the attached manager.
    pub fn save_checkpoint(
        &self,
        state: &TrainingState,
        eval: &EvalResult,
    ) -> Result<PathBuf, TrainingError> {
        let Some(manager) = &self.checkpoints else {
            return Err(TrainingError::NoCheckpointManager);
        };
        let metadata = CheckpointMetadata::new(
            state.episode,
            self.learners[0].online().name(),
            self.learners.len(),
            self.checkpoint_metrics(state, eval),
            self.dqn.clone(),
            self.env.rewards().clone(),
        );
        Ok(manager.save(&self.learners, state, &metadata)?)
    }

    /// Restore learners from the latest checkpoint and return its progress.
    pub fn resume(&mut self) -> Result<TrainingState, TrainingError> {
        let Some(manager) = &self.checkpoints else {
            return Err(TrainingError::NoCheckpointManager);
        };
        let data = manager.load_latest()?;
        CheckpointManager::restore_learners(&data, &mut self.learners)?;
        info!(
            path = %data.path.display(),
            episode = data.training_state.episode,
            "resumed from checkpoint"
        );
        Ok(data.training_state)
    }
}
