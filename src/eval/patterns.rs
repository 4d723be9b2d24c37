//! Pattern weights and line patterns for move scoring
//!
//! Weights form a named table so they can be tuned or loaded from a file.
//! The table is validated once when built; the evaluator never sees a
//! partial or inconsistent set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GomokuError, Result};

/// Names accepted in a weight table, all required.
pub const WEIGHT_KEYS: [&str; 8] = [
    "win",
    "block_win",
    "open_four",
    "block_open_four",
    "open_three",
    "block_open_three",
    "dev_own",
    "dev_opp",
];

/// Integer weights used by [`PatternEvaluator`](super::PatternEvaluator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternWeights {
    /// Move completes a run - immediate win
    pub win: i32,
    /// Move occupies the cell where the opponent would complete a run
    pub block_win: i32,
    /// Move creates an open four (`_OOOO_`)
    pub open_four: i32,
    /// Move takes a cell that would give the opponent an open four
    pub block_open_four: i32,
    /// Move creates an open three (`_OOO_`)
    pub open_three: i32,
    /// Move takes a cell that would give the opponent an open three.
    /// Also the unit for blocking existing threats.
    pub block_open_three: i32,
    /// Per neighbouring own stone
    pub dev_own: i32,
    /// Per neighbouring opponent stone
    pub dev_opp: i32,
}

impl Default for PatternWeights {
    fn default() -> Self {
        Self {
            win: 10_000_000,
            block_win: 1_000_000,
            open_four: 50_000,
            block_open_four: 40_000,
            open_three: 5_000,
            block_open_three: 4_000,
            dev_own: 10,
            dev_opp: 5,
        }
    }
}

impl PatternWeights {
    /// Build from `(name, weight)` pairs.
    ///
    /// Every key in [`WEIGHT_KEYS`] must appear exactly once and nothing else
    /// may appear.
    ///
    /// ```
    /// use gomoku_mcts::PatternWeights;
    ///
    /// let mut table = PatternWeights::default().to_table();
    /// table.insert("dev_own", 20);
    /// let weights = PatternWeights::from_table(table).unwrap();
    /// assert_eq!(weights.dev_own, 20);
    /// ```
    pub fn from_table<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, i32)>,
        K: AsRef<str>,
    {
        let mut values: [Option<i32>; 8] = [None; 8];
        for (key, value) in entries {
            let key = key.as_ref();
            let slot = WEIGHT_KEYS
                .iter()
                .position(|&k| k == key)
                .ok_or_else(|| GomokuError::config(format!("unknown weight key {key:?}")))?;
            if values[slot].replace(value).is_some() {
                return Err(GomokuError::config(format!("duplicate weight key {key:?}")));
            }
        }
        let mut get = |i: usize| {
            values[i].take().ok_or_else(|| {
                GomokuError::config(format!("missing weight key {:?}", WEIGHT_KEYS[i]))
            })
        };
        let weights = Self {
            win: get(0)?,
            block_win: get(1)?,
            open_four: get(2)?,
            block_open_four: get(3)?,
            open_three: get(4)?,
            block_open_three: get(5)?,
            dev_own: get(6)?,
            dev_opp: get(7)?,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Parse a JSON object mapping weight names to integers.
    pub fn from_json(text: &str) -> Result<Self> {
        let table: BTreeMap<String, i32> = serde_json::from_str(text)?;
        Self::from_table(table)
    }

    pub fn to_table(&self) -> BTreeMap<&'static str, i32> {
        WEIGHT_KEYS.iter().copied().zip(self.values()).collect()
    }

    fn values(&self) -> [i32; 8] {
        [
            self.win,
            self.block_win,
            self.open_four,
            self.block_open_four,
            self.open_three,
            self.block_open_three,
            self.dev_own,
            self.dev_opp,
        ]
    }

    /// Check the ordering the engine relies on: all weights non-negative and
    /// a win worth strictly more than a forced block.
    pub fn validate(&self) -> Result<()> {
        if let Some((key, value)) = WEIGHT_KEYS
            .iter()
            .zip(self.values())
            .find(|(_, v)| *v < 0)
        {
            return Err(GomokuError::config(format!(
                "weight {key:?} must be non-negative, got {value}"
            )));
        }
        if self.win <= self.block_win {
            return Err(GomokuError::config(format!(
                "win ({}) must exceed block_win ({})",
                self.win, self.block_win
            )));
        }
        Ok(())
    }

    /// Largest score a move can collect without winning or blocking a win:
    /// every pattern term in all four directions, the threat-block bonus and
    /// eight neighbours.
    pub fn max_positional_score(&self, threat_block_multiplier: i32) -> i64 {
        let per_direction = i64::from(self.open_four)
            + i64::from(self.block_open_four)
            + i64::from(self.open_three)
            + i64::from(self.block_open_three);
        4 * per_direction
            + i64::from(threat_block_multiplier) * i64::from(self.block_open_three)
            + 8 * i64::from(self.dev_own.max(self.dev_opp))
    }
}

/// One cell of a line window, seen from the player being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCell {
    Own,
    Opp,
    Empty,
    /// Off the board
    Edge,
}

/// Open-run patterns for a given win length.
///
/// For five in a row these are `_OOOO_` and `_OOO_`. A pattern is absent
/// when the win length is too short for it to hold an own stone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePatterns {
    pub open_four: Option<Vec<PatternCell>>,
    pub open_three: Option<Vec<PatternCell>>,
}

impl LinePatterns {
    pub fn for_win_len(win_len: usize) -> Self {
        Self {
            open_four: open_run(win_len.saturating_sub(1)),
            open_three: open_run(win_len.saturating_sub(2)),
        }
    }
}

fn open_run(own: usize) -> Option<Vec<PatternCell>> {
    if own == 0 {
        return None;
    }
    let mut pattern = Vec::with_capacity(own + 2);
    pattern.push(PatternCell::Empty);
    pattern.extend(std::iter::repeat(PatternCell::Own).take(own));
    pattern.push(PatternCell::Empty);
    Some(pattern)
}

/// True if `pattern` occurs in `window` at an offset that covers `center`.
pub fn matches_through(window: &[PatternCell], pattern: &[PatternCell], center: usize) -> bool {
    if pattern.is_empty() || pattern.len() > window.len() {
        return false;
    }
    window
        .windows(pattern.len())
        .enumerate()
        .any(|(start, w)| start <= center && center < start + pattern.len() && w == pattern)
}
