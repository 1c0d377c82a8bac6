#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::wgpu::WgpuDevice;
use clap::{Parser, ValueEnum};
use tracing::info;

use ml_ultimate_ttt::ai::{
    ApproximatorKind, BurnApproximator, DefaultBackend, LinearApproximator, QApproximator,
};
use ml_ultimate_ttt::checkpoint::CheckpointManager;
use ml_ultimate_ttt::config::AppConfig;
use ml_ultimate_ttt::error::{CheckpointError, TrainingError};
use ml_ultimate_ttt::training::Trainer;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ApproximatorArg {
    Linear,
    Mlp,
}

impl From<ApproximatorArg> for ApproximatorKind {
    fn from(arg: ApproximatorArg) -> Self {
        match arg {
            ApproximatorArg::Linear => ApproximatorKind::Linear,
            ApproximatorArg::Mlp => ApproximatorKind::Mlp,
        }
    }
}

/// Train an Ultimate Tic-Tac-Toe agent via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train an Ultimate Tic-Tac-Toe DQN agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the action-value approximator
    #[arg(long, value_enum)]
    approximator: Option<ApproximatorArg>,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_default_config {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    init_tracing(&cli.log_level);

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        config.dqn.learning_rate = lr;
    }
    if let Some(seed) = cli.seed {
        config.training.seed = Some(seed);
    }
    if let Some(kind) = cli.approximator {
        config.network.kind = kind.into();
    }
    config.validate().context("validating configuration")?;

    let network = config.network.clone();
    let lr = config.dqn.learning_rate;
    let seed = config.training.seed;

    match network.kind {
        ApproximatorKind::Linear => {
            let trainer = Trainer::new(
                config.dqn.clone(),
                config.reward.clone(),
                config.training.clone(),
                |stream| LinearApproximator::new(&network, lr, seed.map(|s| s + stream as u64)),
            )
            .context("building linear trainer")?;
            run(trainer, &config, cli.resume)
        }
        ApproximatorKind::Mlp => {
            let device = WgpuDevice::default();
            let trainer = Trainer::new(
                config.dqn.clone(),
                config.reward.clone(),
                config.training.clone(),
                |_| BurnApproximator::<DefaultBackend>::new(&network, lr, device.clone()),
            )
            .context("building MLP trainer")?;
            run(trainer, &config, cli.resume)
        }
    }
}

fn run<A: QApproximator>(trainer: Trainer<A>, config: &AppConfig, resume: bool) -> Result<()> {
    let manager = CheckpointManager::new(config.checkpoint.clone())
        .context("creating checkpoint directory")?;
    let mut trainer = trainer.with_checkpoints(manager);

    let mut state = if resume {
        match trainer.resume() {
            Ok(state) => state,
            Err(TrainingError::Checkpoint(CheckpointError::NoLatestSymlink(dir))) => {
                info!(dir = %dir.display(), "no checkpoint found, starting fresh");
                trainer.initial_state()
            }
            Err(e) => return Err(e).context("resuming from checkpoint"),
        }
    } else {
        trainer.initial_state()
    };

    let eval = trainer
        .train(&mut state, config.training.num_episodes)
        .context("training failed")?;

    if config.training.checkpoint_interval > 0 {
        let path = trainer
            .save_checkpoint(&state, &eval)
            .context("saving final checkpoint")?;
        info!(path = %path.display(), "final checkpoint saved");
    }
    Ok(())
}
