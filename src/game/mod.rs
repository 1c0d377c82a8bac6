//! Core Ultimate Tic-Tac-Toe logic: sub-boards, actions, players, and the
//! composite game state with immutable transitions.

mod action;
mod board;
mod player;
mod state;

pub use action::{Action, ACTION_SPACE};
pub use board::{BoardStatus, Cell, SubBoard, GRID_CELLS};
pub use player::Player;
pub use state::{ActiveSubBoard, GameOutcome, GameState, IllegalMoveError, LegalActions};
