//! # ML Ultimate Tic-Tac-Toe
//!
//! Ultimate Tic-Tac-Toe rules engine with a self-play deep Q-learning
//! trainer. Action values come from either a plain linear estimator or a
//! Burn MLP behind the same approximator trait.
//!
//! ## Modules
//!
//! - [`game`]: Core game logic (sub-boards, actions, players, composite state)
//! - [`env`]: Reset/step environment with configurable rewards
//! - [`ai`]: Observation encoding, approximators, epsilon-greedy policy, DQN learner, agents
//! - [`training`]: Self-play trainer, replay buffer, transition stitching, metrics
//! - [`checkpoint`]: Model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod game;
pub mod training;
