use std::fmt;

use super::action::Action;
use super::board::{evaluate_grid, BoardStatus, Cell, SubBoard, GRID_CELLS};
use super::player::Player;

/// Legal moves in ascending flat-index order.
pub type LegalActions = Vec<Action>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

/// Where the player to move is allowed to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveSubBoard {
    /// Free choice among the sub-boards still in progress.
    Any,
    /// Must play in this sub-board.
    Forced(usize),
}

impl fmt::Display for ActiveSubBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveSubBoard::Any => f.write_str("any"),
            ActiveSubBoard::Forced(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMoveError {
    #[error("game is already over")]
    GameOver,

    #[error("no episode in progress; reset first")]
    NoEpisode,

    #[error("must play in sub-board {expected}, got {got}")]
    WrongSubBoard { expected: usize, got: usize },

    #[error("sub-board {0} is already decided")]
    SubBoardClosed(usize),

    #[error("cell {0} is already occupied")]
    CellOccupied(Action),

    #[error("action index {0} is outside 0..81")]
    OutOfRange(usize),
}

/// The composite board: nine sub-boards plus routing and turn state.
///
/// A plain `Copy` value. [`GameState::apply`] returns a new state and leaves
/// the receiver untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    sub_boards: [SubBoard; GRID_CELLS],
    active: ActiveSubBoard,
    current_player: Player,
    status: BoardStatus,
    last_action: Option<Action>,
    move_count: usize,
}

impl GameState {
    /// Create initial game state
    pub fn initial() -> Self {
        GameState {
            sub_boards: [SubBoard::new(); GRID_CELLS],
            active: ActiveSubBoard::Any,
            current_player: Player::X,
            status: BoardStatus::InProgress,
            last_action: None,
            move_count: 0,
        }
    }

    /// Build a position from raw cells (`cells[sub_board][cell]`).
    ///
    /// Sub-board and global statuses are derived. A forced sub-board that is
    /// already decided is relaxed to [`ActiveSubBoard::Any`].
    pub fn from_cells(
        cells: [[Cell; GRID_CELLS]; GRID_CELLS],
        to_move: Player,
        active: ActiveSubBoard,
    ) -> Self {
        let sub_boards = cells.map(SubBoard::from_cells);
        let move_count = cells
            .iter()
            .flatten()
            .filter(|&&c| c != Cell::Empty)
            .count();
        let mut state = GameState {
            sub_boards,
            active,
            current_player: to_move,
            status: BoardStatus::InProgress,
            last_action: None,
            move_count,
        };
        state.refresh_status();
        if let ActiveSubBoard::Forced(i) = active {
            if i >= GRID_CELLS || !state.sub_boards[i].is_open() {
                state.active = ActiveSubBoard::Any;
            }
        }
        state
    }

    /// Get current player
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn active_sub_board(&self) -> ActiveSubBoard {
        self.active
    }

    pub fn sub_board(&self, index: usize) -> &SubBoard {
        &self.sub_boards[index]
    }

    pub fn cell(&self, action: Action) -> Cell {
        self.sub_boards[action.sub_board()].get(action.cell())
    }

    pub fn global_status(&self) -> BoardStatus {
        self.status
    }

    pub fn last_action(&self) -> Option<Action> {
        self.last_action
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Check if game is over
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Get game outcome if game is over
    pub fn winner(&self) -> Option<GameOutcome> {
        match self.status {
            BoardStatus::InProgress => None,
            BoardStatus::Won(player) => Some(GameOutcome::Winner(player)),
            BoardStatus::Drawn => Some(GameOutcome::Draw),
        }
    }

    /// Every legal action, in ascending flat-index order. Empty iff terminal.
    pub fn legal_actions(&self) -> LegalActions {
        if self.is_terminal() {
            return LegalActions::new();
        }

        let sub_boards: Vec<usize> = match self.active {
            ActiveSubBoard::Forced(i) => vec![i],
            ActiveSubBoard::Any => (0..GRID_CELLS).collect(),
        };

        sub_boards
            .into_iter()
            .filter(|&s| self.sub_boards[s].is_open())
            .flat_map(|s| {
                let board = &self.sub_boards[s];
                (0..GRID_CELLS)
                    .filter(move |&c| board.get(c) == Cell::Empty)
                    .filter_map(move |c| Action::new(s, c))
            })
            .collect()
    }

    /// Check an action against the legality rules without applying it.
    pub fn check(&self, action: Action) -> Result<(), IllegalMoveError> {
        if self.is_terminal() {
            return Err(IllegalMoveError::GameOver);
        }
        if let ActiveSubBoard::Forced(expected) = self.active {
            if action.sub_board() != expected {
                return Err(IllegalMoveError::WrongSubBoard {
                    expected,
                    got: action.sub_board(),
                });
            }
        }
        let board = &self.sub_boards[action.sub_board()];
        if !board.is_open() {
            return Err(IllegalMoveError::SubBoardClosed(action.sub_board()));
        }
        if board.get(action.cell()) != Cell::Empty {
            return Err(IllegalMoveError::CellOccupied(action));
        }
        Ok(())
    }

    pub fn is_legal(&self, action: Action) -> bool {
        self.check(action).is_ok()
    }

    /// Apply a move and return new state (immutable)
    pub fn apply(&self, action: Action) -> Result<GameState, IllegalMoveError> {
        let mut next = *self;
        next.apply_mut(action)?;
        Ok(next)
    }

    /// Apply a move in place. On error the state is unchanged.
    pub fn apply_mut(&mut self, action: Action) -> Result<(), IllegalMoveError> {
        self.check(action)?;

        let mark = self.current_player.to_cell();
        if !self.sub_boards[action.sub_board()].set(action.cell(), mark) {
            return Err(IllegalMoveError::CellOccupied(action));
        }
        self.refresh_status();

        // The cell just played names the next sub-board, unless it is decided.
        self.active = if self.sub_boards[action.cell()].is_open() {
            ActiveSubBoard::Forced(action.cell())
        } else {
            ActiveSubBoard::Any
        };
        self.current_player = self.current_player.other();
        self.last_action = Some(action);
        self.move_count += 1;

        Ok(())
    }

    /// The same position with every X and O mark exchanged.
    pub fn swapped(&self) -> GameState {
        let mut state = GameState {
            sub_boards: self.sub_boards.map(|b| b.swapped()),
            current_player: self.current_player.other(),
            ..*self
        };
        state.refresh_status();
        state
    }

    fn refresh_status(&mut self) {
        let statuses = self.sub_boards.map(|b| b.status());
        let owners = statuses.map(BoardStatus::winner);
        let filled = statuses.map(BoardStatus::is_terminal);
        self.status = evaluate_grid(&owners, &filled);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for band in 0..3 {
            if band > 0 {
                writeln!(f, "------+-------+------")?;
            }
            for row in 0..3 {
                let line: Vec<String> = (0..3)
                    .map(|col| {
                        let symbols = self.sub_boards[band * 3 + col].row_symbols(row);
                        format!("{} {} {}", symbols[0], symbols[1], symbols[2])
                    })
                    .collect();
                writeln!(f, "{}", line.join(" | "))?;
            }
        }
        let status = match self.status {
            BoardStatus::InProgress => "in progress".to_string(),
            BoardStatus::Won(p) => format!("won by {p}"),
            BoardStatus::Drawn => "drawn".to_string(),
        };
        write!(
            f,
            "to move: {} | active: {} | status: {}",
            self.current_player, self.active, status
        )
    }
}
