//! Board representation for N×N connection games

pub mod board;


// Re-exports
pub use board::BoardState;

/// Default board side length
pub const DEFAULT_SIZE: usize = 9;
/// Default run length needed to win
pub const DEFAULT_WIN_LEN: usize = 5;

/// Cell contents, also used to name the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stone {
    Empty,
    Black,
    White,
}

impl Stone {
    /// Get opponent color
    #[inline]
    pub fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => Stone::Empty,
        }
    }

    /// ASCII marker used by `BoardState`'s text format.
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Stone::Black => 'X',
            Stone::White => 'O',
            Stone::Empty => '.',
        }
    }

    pub fn from_symbol(c: char) -> Option<Stone> {
        match c {
            'X' | 'x' => Some(Stone::Black),
            'O' | 'o' => Some(Stone::White),
            '.' | '_' | ' ' => Some(Stone::Empty),
            _ => None,
        }
    }
}

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Winner(Stone),
    Draw,
}

/// Position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn to_index(self, size: usize) -> usize {
        self.row * size + self.col
    }

    #[inline]
    pub fn from_index(idx: usize, size: usize) -> Self {
        Self {
            row: idx / size,
            col: idx % size,
        }
    }

    /// Step `k` cells along `(dr, dc)`, or `None` when that leaves the board.
    #[inline]
    pub fn offset(self, dr: isize, dc: isize, k: isize, size: usize) -> Option<Pos> {
        let r = self.row as isize + dr * k;
        let c = self.col as isize + dc * k;
        if Self::is_valid(r, c, size) {
            Some(Pos::new(r as usize, c as usize))
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(row: isize, col: isize, size: usize) -> bool {
        row >= 0 && row < size as isize && col >= 0 && col < size as isize
    }
}
