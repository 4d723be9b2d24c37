//! Evaluation module for candidate moves
//!
//! This module provides pattern recognition and scoring for single moves.
//! The evaluation considers:
//! - Immediate wins and forced blocks
//! - Open threes and fours, created or denied
//! - Existing opponent threats on the board
//! - Local development (adjacent stones)

pub mod heuristic;
pub mod patterns;

pub use heuristic::{
    count_patterns, scan_for_existing_threats, PatternEvaluator, DEFAULT_THREAT_BLOCK_MULTIPLIER,
};
pub use patterns::{LinePatterns, PatternCell, PatternWeights, WEIGHT_KEYS};
