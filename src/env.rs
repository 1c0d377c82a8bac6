//! Turn-taking environment over [`GameState`]: the reset/step contract the
//! trainer and evaluation harnesses drive.

use crate::ai::state_encoding::{encode_observation, Observation};
use crate::game::{Action, GameOutcome, GameState, IllegalMoveError, LegalActions, Player};

/// Reward shaping, always from the perspective of the player who moved.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
    /// Reward for a move that does not end the game.
    pub step: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            win: 1.0,
            loss: -1.0,
            draw: -0.1,
            step: 0.0,
        }
    }
}

impl RewardConfig {
    /// Final reward for `player` given the outcome.
    pub fn terminal_reward(&self, outcome: GameOutcome, player: Player) -> f32 {
        match outcome {
            GameOutcome::Winner(winner) if winner == player => self.win,
            GameOutcome::Winner(_) => self.loss,
            GameOutcome::Draw => self.draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed but not yet reset.
    Reset,
    ToMove(Player),
    Terminal,
}

/// Side information returned by [`Environment::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub mover: Player,
    pub outcome: Option<GameOutcome>,
    /// Set when the move decided its sub-board.
    pub sub_board_decided: Option<usize>,
    pub move_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub next_state: GameState,
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

pub struct Environment {
    state: GameState,
    phase: Phase,
    rewards: RewardConfig,
}

impl Environment {
    pub fn new(rewards: RewardConfig) -> Self {
        Environment {
            state: GameState::initial(),
            phase: Phase::Reset,
            rewards,
        }
    }

    /// Start a new episode: empty board, any sub-board, X to move.
    pub fn reset(&mut self) -> Observation {
        self.state = GameState::initial();
        self.phase = Phase::ToMove(self.state.current_player());
        encode_observation(&self.state)
    }

    /// Play `action` for the player to move.
    ///
    /// Fails without changing anything if no episode is running or the action
    /// is not in [`Environment::legal_actions`].
    pub fn step(&mut self, action: Action) -> Result<StepResult, IllegalMoveError> {
        let mover = match self.phase {
            Phase::ToMove(player) => player,
            Phase::Reset => return Err(IllegalMoveError::NoEpisode),
            Phase::Terminal => return Err(IllegalMoveError::GameOver),
        };

        let was_open = self.state.sub_board(action.sub_board()).is_open();
        let next = self.state.apply(action)?;
        let decided = was_open && !next.sub_board(action.sub_board()).is_open();

        let outcome = next.winner();
        let reward = match outcome {
            Some(outcome) => self.rewards.terminal_reward(outcome, mover),
            None => self.rewards.step,
        };
        self.state = next;
        self.phase = if outcome.is_some() {
            Phase::Terminal
        } else {
            Phase::ToMove(next.current_player())
        };

        Ok(StepResult {
            next_state: next,
            observation: encode_observation(&next),
            reward,
            done: outcome.is_some(),
            info: StepInfo {
                mover,
                outcome,
                sub_board_decided: decided.then_some(action.sub_board()),
                move_count: next.move_count(),
            },
        })
    }

    /// Step by flat action index, for harnesses that speak the 0-80 encoding.
    pub fn step_index(&mut self, index: usize) -> Result<StepResult, IllegalMoveError> {
        let action = Action::from_index(index).ok_or(IllegalMoveError::OutOfRange(index))?;
        self.step(action)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Legal actions for the player to move; empty unless an episode is running.
    pub fn legal_actions(&self) -> LegalActions {
        match self.phase {
            Phase::ToMove(_) => self.state.legal_actions(),
            Phase::Reset | Phase::Terminal => LegalActions::new(),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}
