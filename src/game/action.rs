use super::board::GRID_CELLS;

/// Size of the flattened action space.
pub const ACTION_SPACE: usize = GRID_CELLS * GRID_CELLS;

/// A move: which sub-board, and which cell inside it (both row-major, 0-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    sub_board: usize,
    cell: usize,
}

impl Action {
    /// Returns `None` when either coordinate is outside 0-8.
    pub fn new(sub_board: usize, cell: usize) -> Option<Action> {
        if sub_board < GRID_CELLS && cell < GRID_CELLS {
            Some(Action { sub_board, cell })
        } else {
            None
        }
    }

    /// Inverse of [`Action::index`]. Returns `None` for indices >= 81.
    pub fn from_index(index: usize) -> Option<Action> {
        if index < ACTION_SPACE {
            Some(Action {
                sub_board: index / GRID_CELLS,
                cell: index % GRID_CELLS,
            })
        } else {
            None
        }
    }

    /// Flat index 0-80 used by the approximator's output layer.
    pub fn index(self) -> usize {
        self.sub_board * GRID_CELLS + self.cell
    }

    pub fn sub_board(self) -> usize {
        self.sub_board
    }

    pub fn cell(self) -> usize {
        self.cell
    }

    /// Every action in flat-index order.
    pub fn all() -> impl Iterator<Item = Action> {
        (0..ACTION_SPACE).filter_map(Action::from_index)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.sub_board, self.cell)
    }
}
