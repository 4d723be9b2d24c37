//! Monte Carlo Tree Search move engine for N×N connection games
//!
//! Two players alternately place stones on an N×N board; the first to line up
//! `win_len` stones horizontally, vertically or diagonally wins, and a full
//! board without such a line is a draw. Nine by nine with five in a row is
//! the default.
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//! - [`board`]: Board state, stones and coordinates
//! - [`rules`]: Winning lines and run detection
//! - [`eval`]: Pattern weights and tactical move scoring
//! - [`search`]: MCTS tree, search loop, instrumentation, worker thread
//! - [`engine`]: Main engine integrating all components
//!
//! # Quick Start
//!
//! ```
//! use gomoku_mcts::{BoardState, HeuristicMethod, MctsConfig, MctsEngine, Stone};
//!
//! let engine = MctsEngine::new(MctsConfig::default().with_seed(1)).unwrap();
//! let mut board = BoardState::new(9, 5, Stone::Black).unwrap();
//!
//! // Empty board: center, no search
//! let (mv, _) = engine.find_best_move(&board, 0, 50, HeuristicMethod::Pattern).unwrap();
//! assert_eq!(mv, 40);
//! board.play(mv).unwrap();
//!
//! // White replies after 100 simulated games
//! let (reply, stats) = engine.find_best_move(&board, 0, 100, HeuristicMethod::Pattern).unwrap();
//! assert!(stats.total_visits >= 100);
//! board.play(reply).unwrap();
//! ```
//!
//! # Search Priority
//!
//! 1. Opening: center of an empty board
//! 2. Immediate win, then forced block of an opponent win
//! 3. MCTS within the time / iteration budget
//! 4. Final choice among the most visited root children

pub mod board;
pub mod engine;
pub mod error;
pub mod eval;
pub mod rules;
pub mod search;

// Re-export commonly used types for convenience
pub use board::{BoardState, Outcome, Pos, Stone, DEFAULT_SIZE, DEFAULT_WIN_LEN};
pub use engine::{Decision, MctsEngine, SearchOutcome};
pub use error::{GomokuError, Result};
pub use eval::{PatternEvaluator, PatternWeights};
pub use rules::WinLines;
pub use search::{
    spawn_search, CancelToken, ChannelObserver, ChildStats, EventLog, HeuristicMethod, MctsConfig,
    NullObserver, RootStatistics, SearchBudget, SearchEvent, SearchHandle, SearchObserver,
};
