//! Winning line enumeration
//!
//! Every straight segment of `win_len` cells (horizontal, vertical and both
//! diagonals) for a given board configuration. The set never changes once
//! built, so one copy per `(size, win_len)` is shared by every board.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use super::win::DIRECTIONS;
use crate::board::Pos;

/// All index sequences of length `win_len` lying on one line.
#[derive(Debug, PartialEq, Eq)]
pub struct WinLines {
    size: usize,
    win_len: usize,
    /// Flattened: line `i` is `cells[i * win_len..(i + 1) * win_len]`
    cells: Vec<usize>,
}

static CACHE: OnceLock<Mutex<HashMap<(usize, usize), Arc<WinLines>>>> = OnceLock::new();

impl WinLines {
    /// Enumerate the lines for a configuration. Prefer [`WinLines::shared`].
    pub fn compute(size: usize, win_len: usize) -> Self {
        let mut cells = Vec::new();
        if win_len > 0 && win_len <= size {
            for idx in 0..size * size {
                let start = Pos::from_index(idx, size);
                for &(dr, dc) in &DIRECTIONS {
                    if start.offset(dr, dc, win_len as isize - 1, size).is_none() {
                        continue;
                    }
                    for k in 0..win_len as isize {
                        // Both ends are on the board, so every step in between is too
                        if let Some(p) = start.offset(dr, dc, k, size) {
                            cells.push(p.to_index(size));
                        }
                    }
                }
            }
        }
        Self {
            size,
            win_len,
            cells,
        }
    }

    /// Shared copy for a configuration, computed on first request.
    pub fn shared(size: usize, win_len: usize) -> Arc<WinLines> {
        let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            guard
                .entry((size, win_len))
                .or_insert_with(|| Arc::new(WinLines::compute(size, win_len))),
        )
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn win_len(&self) -> usize {
        self.win_len
    }

    /// Number of lines
    #[inline]
    pub fn len(&self) -> usize {
        if self.win_len == 0 {
            0
        } else {
            self.cells.len() / self.win_len
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.cells.chunks_exact(self.win_len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_standard() {
        // 9x9, five in a row: 5 starts per row/col, 5x5 starts per diagonal
        let lines = WinLines::compute(9, 5);
        assert_eq!(lines.len(), 9 * 5 + 9 * 5 + 25 + 25);
    }

    #[test]
    fn test_line_count_tictactoe() {
        let lines = WinLines::compute(3, 3);
        assert_eq!(lines.len(), 8);
        let all: Vec<&[usize]> = lines.iter().collect();
        assert!(all.contains(&[0usize, 1, 2].as_slice()));
        assert!(all.contains(&[0usize, 4, 8].as_slice()));
        assert!(all.contains(&[2usize, 4, 6].as_slice()));
    }

    #[test]
    fn test_lines_are_straight_and_in_bounds() {
        let lines = WinLines::compute(7, 4);
        for line in lines.iter() {
            assert_eq!(line.len(), 4);
            assert!(line.iter().all(|&i| i < 49));
            let step = line[1] as isize - line[0] as isize;
            for pair in line.windows(2) {
                assert_eq!(pair[1] as isize - pair[0] as isize, step);
            }
        }
    }

    #[test]
    fn test_shared_returns_same_instance() {
        let a = WinLines::shared(9, 5);
        let b = WinLines::shared(9, 5);
        assert!(Arc::ptr_eq(&a, &b));
        let c = WinLines::shared(9, 4);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_single_cell_lines() {
        let lines = WinLines::compute(2, 1);
        // One line per cell per direction
        assert_eq!(lines.len(), 16);
    }
}
