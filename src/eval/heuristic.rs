//! Tactical move scoring
//!
//! Scores a candidate move from one player's point of view by combining:
//! - Immediate win / forced block detection
//! - Blocking cells of threats the opponent already has on the board
//! - Open three / open four creation, for both sides
//! - A small bonus for stones around the cell (local development)
//!
//! Higher is better for the player being scored. A winning move always
//! scores exactly the `win` weight.

use std::collections::BTreeSet;

use crate::board::{BoardState, Pos, Stone};
use crate::error::{GomokuError, Result};
use crate::rules::{has_run_at, DIRECTIONS};

use super::patterns::{matches_through, LinePatterns, PatternCell, PatternWeights};

/// Default multiple of `block_open_three` awarded for occupying a blocking
/// cell of an existing opponent threat.
pub const DEFAULT_THREAT_BLOCK_MULTIPLIER: i32 = 5;

/// Pattern-based move evaluator with a validated weight table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEvaluator {
    weights: PatternWeights,
    threat_block_multiplier: i32,
}

impl Default for PatternEvaluator {
    fn default() -> Self {
        Self {
            weights: PatternWeights::default(),
            threat_block_multiplier: DEFAULT_THREAT_BLOCK_MULTIPLIER,
        }
    }
}

impl PatternEvaluator {
    /// Create an evaluator.
    ///
    /// Besides the table's own checks, `block_win` must be larger than
    /// anything a non-winning, non-blocking move can score, and `win` must be
    /// larger than the best a block can score. Every score then fits in `i32`
    /// and a winning cell always ranks first.
    pub fn new(weights: PatternWeights, threat_block_multiplier: i32) -> Result<Self> {
        weights.validate()?;
        if threat_block_multiplier < 0 {
            return Err(GomokuError::config(format!(
                "threat block multiplier must be non-negative, got {threat_block_multiplier}"
            )));
        }
        let ceiling = weights.max_positional_score(threat_block_multiplier);
        if i64::from(weights.block_win) <= ceiling {
            return Err(GomokuError::config(format!(
                "block_win ({}) must exceed the largest positional score ({ceiling})",
                weights.block_win
            )));
        }
        let best_block = i64::from(weights.block_win) + ceiling;
        if best_block > i64::from(i32::MAX) {
            return Err(GomokuError::config(format!(
                "block_win plus the largest positional score ({best_block}) overflows a move score"
            )));
        }
        if i64::from(weights.win) <= best_block {
            return Err(GomokuError::config(format!(
                "win ({}) must exceed block_win plus the largest positional score ({best_block})",
                weights.win
            )));
        }
        Ok(Self {
            weights,
            threat_block_multiplier,
        })
    }

    #[inline]
    pub fn weights(&self) -> &PatternWeights {
        &self.weights
    }

    #[inline]
    pub fn threat_block_multiplier(&self) -> i32 {
        self.threat_block_multiplier
    }

    /// Score placing `mv` for `player` on `state`.
    ///
    /// Runs a full-board threat scan; when scoring many moves on the same
    /// position use [`ranked_moves`](Self::ranked_moves) instead.
    pub fn score_move(&self, state: &BoardState, mv: usize, player: Stone) -> i32 {
        let threats = scan_for_existing_threats(state, player.opponent());
        let patterns = LinePatterns::for_win_len(state.win_len());
        self.score_with(state, mv, player, &threats, &patterns)
    }

    fn score_with(
        &self,
        state: &BoardState,
        mv: usize,
        player: Stone,
        threats: &BTreeSet<usize>,
        patterns: &LinePatterns,
    ) -> i32 {
        let w = &self.weights;
        if has_run_at(state, mv, player) {
            return w.win;
        }

        let opponent = player.opponent();
        let cells = state.cells();
        let size = state.size();
        let mut score = 0;

        // Mandatory block
        if has_run_at(state, mv, opponent) {
            score += w.block_win;
        }

        // Boosted above pattern terms so existing threats get answered first
        if threats.contains(&mv) {
            score += self.threat_block_multiplier * w.block_open_three;
        }

        if let Some(four) = &patterns.open_four {
            score += count_patterns(cells, mv, player, size, four, w.open_four);
            score += count_patterns(cells, mv, opponent, size, four, w.block_open_four);
        }
        if let Some(three) = &patterns.open_three {
            score += count_patterns(cells, mv, player, size, three, w.open_three);
            score += count_patterns(cells, mv, opponent, size, three, w.block_open_three);
        }

        for n in state.neighbors(mv) {
            match cells[n] {
                s if s == player => score += w.dev_own,
                s if s == opponent => score += w.dev_opp,
                _ => {}
            }
        }

        score
    }

    /// Score every legal move for the side to move, best first.
    ///
    /// Ties keep row-major order, so the ranking is deterministic.
    pub fn ranked_moves(&self, state: &BoardState) -> Vec<(i32, usize)> {
        let player = state.current_player();
        let threats = scan_for_existing_threats(state, player.opponent());
        let patterns = LinePatterns::for_win_len(state.win_len());

        let mut ranked: Vec<(i32, usize)> = state
            .legal_moves()
            .into_iter()
            .map(|mv| (self.score_with(state, mv, player, &threats, &patterns), mv))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked
    }
}

/// Count directions in which placing `player` at `mv` forms `pattern`.
///
/// For each of the four lines through `mv` a window of `2 * (len - 2) + 1`
/// cells centered on `mv` is built (nine cells for `_OOOO_`), with
/// off-board cells as [`PatternCell::Edge`]. `weight` is added once per
/// direction whose window holds `pattern` at an offset covering `mv`.
pub fn count_patterns(
    board: &[Stone],
    mv: usize,
    player: Stone,
    size: usize,
    pattern: &[PatternCell],
    weight: i32,
) -> i32 {
    let half = pattern.len().saturating_sub(2).max(1) as isize;
    let origin = Pos::from_index(mv, size);
    let opponent = player.opponent();
    let mut window = Vec::with_capacity(2 * half as usize + 1);
    let mut total = 0;

    for &(dr, dc) in &DIRECTIONS {
        window.clear();
        for k in -half..=half {
            let cell = match origin.offset(dr, dc, k, size) {
                None => PatternCell::Edge,
                Some(_) if k == 0 => PatternCell::Own,
                Some(p) => match board[p.to_index(size)] {
                    s if s == player => PatternCell::Own,
                    s if s == opponent => PatternCell::Opp,
                    _ => PatternCell::Empty,
                },
            };
            window.push(cell);
        }
        if matches_through(&window, pattern, half as usize) {
            total += weight;
        }
    }
    total
}

/// Find every empty cell that answers an existing `opponent` threat.
///
/// A threat is a straight run of two or more `opponent` stones with at least
/// one empty end (both ends are blocking cells), or a broken three
/// (`OO_O` / `O_OO`), whose gap and empty flanks are blocking cells.
pub fn scan_for_existing_threats(board: &BoardState, opponent: Stone) -> BTreeSet<usize> {
    let mut blocks = BTreeSet::new();
    if opponent == Stone::Empty {
        return blocks;
    }
    let size = board.size();
    let at = |p: Option<Pos>| p.map(|p| (p.to_index(size), board.get(p.to_index(size))));
    let empty_at = |p: Option<Pos>| match at(p) {
        Some((i, Stone::Empty)) => Some(i),
        _ => None,
    };

    for idx in (0..board.cell_count()).filter(|&i| board.get(i) == opponent) {
        let origin = Pos::from_index(idx, size);
        for &(dr, dc) in &DIRECTIONS {
            let before = origin.offset(dr, dc, -1, size);
            if matches!(at(before), Some((_, s)) if s == opponent) {
                continue; // Not the start of this run
            }

            let mut len = 1;
            while matches!(at(origin.offset(dr, dc, len, size)), Some((_, s)) if s == opponent) {
                len += 1;
            }
            if len >= 2 {
                let ends = [empty_at(before), empty_at(origin.offset(dr, dc, len, size))];
                blocks.extend(ends.into_iter().flatten());
            }

            // Broken three starting at this stone: O O _ O or O _ O O
            let shape: Vec<Option<Stone>> = (0..4)
                .map(|k| at(origin.offset(dr, dc, k, size)).map(|(_, s)| s))
                .collect();
            let gap = match shape.as_slice() {
                [Some(a), Some(b), Some(Stone::Empty), Some(c)]
                    if *a == opponent && *b == opponent && *c == opponent =>
                {
                    Some(2)
                }
                [Some(a), Some(Stone::Empty), Some(b), Some(c)]
                    if *a == opponent && *b == opponent && *c == opponent =>
                {
                    Some(1)
                }
                _ => None,
            };
            if let Some(gap) = gap {
                let cells = [
                    empty_at(origin.offset(dr, dc, gap, size)),
                    empty_at(before),
                    empty_at(origin.offset(dr, dc, 4, size)),
                ];
                blocks.extend(cells.into_iter().flatten());
            }
        }
    }
    blocks
}
