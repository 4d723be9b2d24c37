//! Board state with incremental win detection

use std::fmt;
use std::sync::Arc;

use super::{Outcome, Pos, Stone};
use crate::error::{GomokuError, Result};
use crate::rules::{has_run_at, WinLines};

/// Game board: an N×N grid of cells plus whose turn it is.
///
/// Cells are stored in row-major order. The winning-line table is shared
/// between all boards of the same `(size, win_len)`, so cloning copies only
/// the cell buffer and a few scalars.
#[derive(Debug)]
pub struct BoardState {
    size: usize,
    win_len: usize,
    cells: Vec<Stone>,
    current_player: Stone,
    last_move: Option<usize>,
    empty_count: usize,
    /// Owner of a complete line present in the layout the board was built from.
    layout_winner: Option<Stone>,
    lines: Arc<WinLines>,
}

impl BoardState {
    /// Create an empty board.
    ///
    /// Fails with `InvalidConfiguration` when `size` is zero, `win_len` is
    /// zero or larger than `size`, or `first_player` is `Empty`.
    pub fn new(size: usize, win_len: usize, first_player: Stone) -> Result<Self> {
        Self::from_cells(size, win_len, vec![Stone::Empty; size * size], first_player)
    }

    /// Create a board from an existing cell layout. `last_move` starts unset.
    ///
    /// A line of `win_len` stones already in the layout is remembered and
    /// reported by [`check_winner`](Self::check_winner).
    pub fn from_cells(
        size: usize,
        win_len: usize,
        cells: Vec<Stone>,
        current_player: Stone,
    ) -> Result<Self> {
        if size == 0 {
            return Err(GomokuError::config("board size must be at least 1"));
        }
        if win_len == 0 || win_len > size {
            return Err(GomokuError::config(format!(
                "win length {win_len} must be between 1 and the board size {size}"
            )));
        }
        if cells.len() != size * size {
            return Err(GomokuError::config(format!(
                "expected {} cells for a {size}x{size} board, got {}",
                size * size,
                cells.len()
            )));
        }
        if current_player == Stone::Empty {
            return Err(GomokuError::config("current player must be Black or White"));
        }
        let empty_count = cells.iter().filter(|&&c| c == Stone::Empty).count();
        let lines = WinLines::shared(size, win_len);
        let layout_winner = completed_line(&lines, &cells);
        Ok(Self {
            size,
            win_len,
            cells,
            current_player,
            last_move: None,
            empty_count,
            layout_winner,
            lines,
        })
    }

    /// Parse a square board from text rows (`X` Black, `O` White, `.` empty).
    ///
    /// ```
    /// use gomoku_mcts::{BoardState, Stone};
    ///
    /// let board = BoardState::from_rows(&["X..", ".O.", "..."], Stone::Black, 3).unwrap();
    /// assert_eq!(board.get(0), Stone::Black);
    /// assert_eq!(board.get(4), Stone::White);
    /// ```
    pub fn from_rows(rows: &[&str], current_player: Stone, win_len: usize) -> Result<Self> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            let parsed: Vec<Stone> = row
                .chars()
                .map(|c| {
                    Stone::from_symbol(c).ok_or_else(|| {
                        GomokuError::config(format!("unexpected character {c:?} in row {r}"))
                    })
                })
                .collect::<Result<_>>()?;
            if parsed.len() != size {
                return Err(GomokuError::config(format!(
                    "row {r} has {} cells, expected {size}",
                    parsed.len()
                )));
            }
            cells.extend(parsed);
        }
        Self::from_cells(size, win_len, cells, current_player)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn win_len(&self) -> usize {
        self.win_len
    }

    /// Total number of cells (`size * size`)
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cells(&self) -> &[Stone] {
        &self.cells
    }

    /// Get stone at index. Panics if `index >= size * size`.
    #[inline]
    pub fn get(&self, index: usize) -> Stone {
        self.cells[index]
    }

    #[inline]
    pub fn current_player(&self) -> Stone {
        self.current_player
    }

    /// Hand the turn to the other player.
    #[inline]
    pub fn switch_player(&mut self) {
        self.current_player = self.current_player.opponent();
    }

    #[inline]
    pub fn last_move(&self) -> Option<usize> {
        self.last_move
    }

    #[inline]
    pub fn empty_count(&self) -> usize {
        self.empty_count
    }

    /// Total stones on board
    #[inline]
    pub fn stone_count(&self) -> usize {
        self.cells.len() - self.empty_count
    }

    /// Check if board is empty
    #[inline]
    pub fn is_board_empty(&self) -> bool {
        self.empty_count == self.cells.len()
    }

    /// Index of the center cell (upper-left of the middle four on even sizes).
    #[inline]
    pub fn center(&self) -> usize {
        Pos::new(self.size / 2, self.size / 2).to_index(self.size)
    }

    #[inline]
    pub fn lines(&self) -> &WinLines {
        &self.lines
    }

    /// Empty cells in row-major order.
    pub fn legal_moves(&self) -> Vec<usize> {
        let mut moves = Vec::with_capacity(self.empty_count);
        self.legal_moves_into(&mut moves);
        moves
    }

    /// Like [`legal_moves`](Self::legal_moves) but reuses the caller's buffer.
    pub fn legal_moves_into(&self, out: &mut Vec<usize>) {
        out.clear();
        out.extend(
            self.cells
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Stone::Empty)
                .map(|(i, _)| i),
        );
    }

    /// Place `player` at `index` and record it as the last move.
    ///
    /// Does not change whose turn it is; see [`play`](Self::play).
    pub fn make_move(&mut self, index: usize, player: Stone) -> Result<()> {
        if index >= self.cells.len() {
            return Err(GomokuError::InvalidMove {
                index,
                reason: "index is off the board",
            });
        }
        if player == Stone::Empty {
            return Err(GomokuError::InvalidMove {
                index,
                reason: "cannot place an empty stone",
            });
        }
        if self.cells[index] != Stone::Empty {
            return Err(GomokuError::InvalidMove {
                index,
                reason: "cell is already occupied",
            });
        }
        self.cells[index] = player;
        self.last_move = Some(index);
        self.empty_count -= 1;
        Ok(())
    }

    /// Place a stone for the current player, then pass the turn.
    pub fn play(&mut self, index: usize) -> Result<()> {
        self.make_move(index, self.current_player)?;
        self.switch_player();
        Ok(())
    }

    /// Decide whether the game is over.
    ///
    /// A run present in the starting layout is reported first. After that
    /// only the last placed stone can have completed a run, so the win check
    /// looks through that cell alone. With `fast_check == false` a position
    /// where neither side can ever complete a line is also reported as a draw;
    /// that pass is O(lines) and is skipped inside rollouts.
    pub fn check_winner(&self, fast_check: bool) -> Option<Outcome> {
        if let Some(stone) = self.layout_winner {
            return Some(Outcome::Winner(stone));
        }
        if let Some(idx) = self.last_move {
            let stone = self.cells[idx];
            if has_run_at(self, idx, stone) {
                return Some(Outcome::Winner(stone));
            }
        }
        if self.empty_count == 0 {
            return Some(Outcome::Draw);
        }
        if !fast_check && self.is_unwinnable(Stone::Black) && self.is_unwinnable(Stone::White) {
            return Some(Outcome::Draw);
        }
        None
    }

    /// True if every winning line already holds a stone of `player`'s opponent.
    pub fn is_unwinnable(&self, player: Stone) -> bool {
        let opponent = player.opponent();
        self.lines
            .iter()
            .all(|line| line.iter().any(|&i| self.cells[i] == opponent))
    }

    /// Indices of the up to eight cells surrounding `index`.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let size = self.size;
        let origin = Pos::from_index(index, size);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&(dr, dc)| origin.offset(dr, dc, 1, size))
            .map(move |p| p.to_index(size))
    }

    /// True if any surrounding cell is occupied.
    #[inline]
    pub fn has_neighbor(&self, index: usize) -> bool {
        self.neighbors(index).any(|n| self.cells[n] != Stone::Empty)
    }
}

/// First line whose cells all hold the same stone.
fn completed_line(lines: &WinLines, cells: &[Stone]) -> Option<Stone> {
    lines.iter().find_map(|line| {
        let (&first, rest) = line.split_first()?;
        let stone = cells[first];
        (stone != Stone::Empty && rest.iter().all(|&i| cells[i] == stone)).then_some(stone)
    })
}

const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Clone for BoardState {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            win_len: self.win_len,
            cells: self.cells.clone(),
            current_player: self.current_player,
            last_move: self.last_move,
            empty_count: self.empty_count,
            layout_winner: self.layout_winner,
            lines: Arc::clone(&self.lines),
        }
    }

    /// Reuses this board's cell buffer.
    fn clone_from(&mut self, source: &Self) {
        self.size = source.size;
        self.win_len = source.win_len;
        self.cells.clone_from(&source.cells);
        self.current_player = source.current_player;
        self.last_move = source.last_move;
        self.empty_count = source.empty_count;
        self.layout_winner = source.layout_winner;
        if !Arc::ptr_eq(&self.lines, &source.lines) {
            self.lines = Arc::clone(&source.lines);
        }
    }
}

impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.win_len == other.win_len
            && self.current_player == other.current_player
            && self.last_move == other.last_move
            && self.cells == other.cells
    }
}

impl Eq for BoardState {}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            for cell in row {
                write!(f, "{}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
