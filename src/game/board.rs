use super::player::Player;

/// Cells in one 3x3 grid.
pub const GRID_CELLS: usize = 9;

/// The eight winning lines of a 3x3 grid (rows, columns, diagonals).
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

impl Cell {
    /// The player whose mark occupies this cell, if any.
    pub fn owner(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Player::X),
            Cell::O => Some(Player::O),
        }
    }

    /// Exchange X and O marks.
    pub fn swapped(self) -> Cell {
        match self {
            Cell::Empty => Cell::Empty,
            Cell::X => Cell::O,
            Cell::O => Cell::X,
        }
    }

    fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::X => 'X',
            Cell::O => 'O',
        }
    }
}

/// Status of a 3x3 grid, shared by sub-boards and the global board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardStatus {
    InProgress,
    Won(Player),
    Drawn,
}

impl BoardStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BoardStatus::InProgress)
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            BoardStatus::Won(player) => Some(player),
            _ => None,
        }
    }
}

/// Evaluate a 3x3 grid of owners.
///
/// A line wins when all three slots have the same owner. Without a winner
/// the grid is drawn once every slot is `filled`, and in progress otherwise.
/// Sub-boards pass "cell occupied" as `filled`; the global board passes
/// "sub-board decided", so a drawn sub-board fills a slot without owning it.
pub(crate) fn evaluate_grid(
    owners: &[Option<Player>; GRID_CELLS],
    filled: &[bool; GRID_CELLS],
) -> BoardStatus {
    for [a, b, c] in LINES {
        if let Some(player) = owners[a] {
            if owners[b] == Some(player) && owners[c] == Some(player) {
                return BoardStatus::Won(player);
            }
        }
    }

    if filled.iter().all(|&f| f) {
        BoardStatus::Drawn
    } else {
        BoardStatus::InProgress
    }
}

/// One 3x3 sub-board. The status is recomputed on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubBoard {
    cells: [Cell; GRID_CELLS],
    status: BoardStatus,
}

impl SubBoard {
    /// Create a new empty sub-board
    pub fn new() -> Self {
        SubBoard {
            cells: [Cell::Empty; GRID_CELLS],
            status: BoardStatus::InProgress,
        }
    }

    /// Build a sub-board from raw cells, deriving its status.
    pub fn from_cells(cells: [Cell; GRID_CELLS]) -> Self {
        let mut board = SubBoard {
            cells,
            status: BoardStatus::InProgress,
        };
        board.refresh_status();
        board
    }

    /// Get the cell at a row-major index (0-8)
    pub fn get(&self, cell: usize) -> Cell {
        self.cells[cell]
    }

    pub fn cells(&self) -> &[Cell; GRID_CELLS] {
        &self.cells
    }

    pub fn status(&self) -> BoardStatus {
        self.status
    }

    /// Whether moves may still be played here.
    pub fn is_open(&self) -> bool {
        self.status == BoardStatus::InProgress
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&c| c != Cell::Empty)
    }

    /// Write a cell and recompute the status. Legality is checked by the
    /// caller; this only refuses to overwrite a mark.
    pub(crate) fn set(&mut self, cell: usize, value: Cell) -> bool {
        if self.cells[cell] != Cell::Empty {
            return false;
        }
        self.cells[cell] = value;
        self.refresh_status();
        true
    }

    /// Exchange X and O marks.
    pub fn swapped(&self) -> SubBoard {
        SubBoard::from_cells(self.cells.map(Cell::swapped))
    }

    pub(crate) fn row_symbols(&self, row: usize) -> [char; 3] {
        [
            self.cells[row * 3].symbol(),
            self.cells[row * 3 + 1].symbol(),
            self.cells[row * 3 + 2].symbol(),
        ]
    }

    fn refresh_status(&mut self) {
        let owners = self.cells.map(Cell::owner);
        let filled = self.cells.map(|c| c != Cell::Empty);
        self.status = evaluate_grid(&owners, &filled);
    }
}

impl Default for SubBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: Cell = Cell::Empty;
    const X: Cell = Cell::X;
    const O: Cell = Cell::O;

    #[test]
    fn test_new_sub_board_is_empty() {
        let board = SubBoard::new();
        for cell in 0..GRID_CELLS {
            assert_eq!(board.get(cell), Cell::Empty);
        }
        assert_eq!(board.status(), BoardStatus::InProgress);
        assert!(board.is_open());
    }

    #[test]
    fn test_row_win() {
        let mut board = SubBoard::new();
        assert!(board.set(0, X));
        assert!(board.set(1, X));
        assert_eq!(board.status(), BoardStatus::InProgress);
        assert!(board.set(2, X));
        assert_eq!(board.status(), BoardStatus::Won(Player::X));
        assert!(!board.is_open());
    }

    #[test]
    fn test_column_and_diagonal_wins() {
        let column = SubBoard::from_cells([O, X, E, O, X, E, O, E, E]);
        assert_eq!(column.status(), BoardStatus::Won(Player::O));

        let anti = SubBoard::from_cells([E, E, X, E, X, O, X, O, E]);
        assert_eq!(anti.status(), BoardStatus::Won(Player::X));
    }

    #[test]
    fn test_full_without_line_is_drawn() {
        let board = SubBoard::from_cells([X, O, X, X, O, O, O, X, X]);
        assert_eq!(board.status(), BoardStatus::Drawn);
        assert!(board.is_full());
    }

    #[test]
    fn test_set_refuses_occupied_cell() {
        let mut board = SubBoard::new();
        assert!(board.set(4, X));
        assert!(!board.set(4, O));
        assert_eq!(board.get(4), X);
    }

    #[test]
    fn test_evaluate_grid_drawn_slots_count_for_nobody() {
        // Slot 1 is drawn: filled but unowned, so the top row is not a win.
        let owners = [
            Some(Player::X),
            None,
            Some(Player::X),
            None,
            None,
            None,
            None,
            None,
            None,
        ];
        let mut filled = [false; GRID_CELLS];
        filled[0] = true;
        filled[1] = true;
        filled[2] = true;
        assert_eq!(evaluate_grid(&owners, &filled), BoardStatus::InProgress);

        let all_filled = [true; GRID_CELLS];
        assert_eq!(evaluate_grid(&owners, &all_filled), BoardStatus::Drawn);
    }

    #[test]
    fn test_swapped_swaps_winner() {
        let board = SubBoard::from_cells([X, X, X, O, O, E, E, E, E]);
        assert_eq!(board.swapped().status(), BoardStatus::Won(Player::O));
    }
}
