//! Win condition checking
//!
//! A game is won by a straight run of at least `win_len` stones. Only the
//! most recent placement can complete a run, so checks look through a single
//! cell instead of scanning the whole board.

use crate::board::{BoardState, Pos, Stone};

/// Direction vectors for line checking (4 directions)
pub const DIRECTIONS: [(isize, isize); 4] = [
    (0, 1),  // Horizontal
    (1, 0),  // Vertical
    (1, 1),  // Diagonal SE
    (1, -1), // Diagonal SW
];

/// Count contiguous `stone` cells stepping from `index` along `(dr, dc)`,
/// not counting `index` itself, stopping after `limit` steps.
#[inline]
pub fn count_direction(
    board: &BoardState,
    index: usize,
    stone: Stone,
    dr: isize,
    dc: isize,
    limit: usize,
) -> usize {
    let size = board.size();
    let origin = Pos::from_index(index, size);
    let mut count = 0;
    for k in 1..=limit as isize {
        match origin.offset(dr, dc, k, size) {
            Some(p) if board.get(p.to_index(size)) == stone => count += 1,
            _ => break,
        }
    }
    count
}

/// Length of the `stone` run through `index` along one direction, treating
/// `index` itself as holding `stone`. Capped at `2 * win_len - 1`.
#[inline]
pub fn run_length(board: &BoardState, index: usize, stone: Stone, dr: isize, dc: isize) -> usize {
    let limit = board.win_len().saturating_sub(1);
    1 + count_direction(board, index, stone, dr, dc, limit)
        + count_direction(board, index, stone, -dr, -dc, limit)
}

/// Fast run check at a specific cell.
///
/// Treats `index` as holding `stone` whatever it currently contains, so the
/// same call answers both "did this placement win" and "would placing here
/// win". O(win_len), no allocation.
#[inline]
pub fn has_run_at(board: &BoardState, index: usize, stone: Stone) -> bool {
    if stone == Stone::Empty {
        return false;
    }
    let win_len = board.win_len();
    DIRECTIONS
        .iter()
        .any(|&(dr, dc)| run_length(board, index, stone, dr, dc) >= win_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: &[&str]) -> BoardState {
        BoardState::from_rows(rows, Stone::Black, 5).unwrap()
    }

    #[test]
    fn test_has_run_horizontal() {
        let b = board(&[
            ".........",
            ".........",
            ".........",
            ".........",
            "XXXX.....",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        assert!(has_run_at(&b, 4 * 9 + 4, Stone::Black));
        assert!(!has_run_at(&b, 4 * 9 + 4, Stone::White));
        assert!(!has_run_at(&b, 3 * 9 + 4, Stone::Black));
    }

    #[test]
    fn test_has_run_gap_fill() {
        // Filling the middle of XX.XX completes five
        let b = board(&[
            ".........",
            ".........",
            "XX.XX....",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        assert!(has_run_at(&b, 2 * 9 + 2, Stone::Black));
    }

    #[test]
    fn test_has_run_diagonals() {
        let b = board(&[
            "X.......O",
            ".X.....O.",
            "..X...O..",
            "...X.O...",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        assert!(has_run_at(&b, 4 * 9 + 4, Stone::Black));
        assert!(has_run_at(&b, 4 * 9 + 4, Stone::White));
    }

    #[test]
    fn test_run_does_not_wrap_rows() {
        // Three at the end of row 0 and two at the start of row 1 are not a line
        let b = board(&[
            "......XXX",
            "X........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        assert!(!has_run_at(&b, 9 + 1, Stone::Black));
        assert_eq!(run_length(&b, 9 + 1, Stone::Black, 0, 1), 2);
    }

    #[test]
    fn test_count_direction_stops_at_opponent() {
        let b = board(&[
            ".XXOX....",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]);
        assert_eq!(count_direction(&b, 0, Stone::Black, 0, 1, 4), 2);
        assert_eq!(count_direction(&b, 0, Stone::Black, 0, -1, 4), 0);
    }
}
