//! Error types for the move engine

use thiserror::Error;

use crate::board::Stone;

/// Errors raised by board construction, configuration and search.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GomokuError {
    #[error("invalid move at index {index}: {reason}")]
    InvalidMove { index: usize, reason: &'static str },

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("game is already won by {winner:?}")]
    GameOver { winner: Stone },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error(
        "invalid budget: time limit {time_limit_ms}ms with {min_iterations} minimum iterations never runs a simulation"
    )]
    InvalidBudget { time_limit_ms: u64, min_iterations: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search aborted: {message}")]
    SearchAborted { message: String },
}

impl GomokuError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        GomokuError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GomokuError>;
