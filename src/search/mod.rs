//! Search module for the move engine
//!
//! Contains:
//! - Search configuration and budgets
//! - Arena-allocated search tree and its nodes
//! - The MCTS loop (selection, expansion, rollout, backpropagation)
//! - Instrumentation events and observers
//! - Running a search on a worker thread with cancellation

pub mod config;
pub mod events;
pub mod mcts;
pub mod node;
pub mod tree;
pub mod worker;

pub use config::{HeuristicMethod, MctsConfig, SearchBudget};
pub use events::{ChannelObserver, EventLog, ImmediateReason, NullObserver, SearchEvent, SearchObserver};
pub use mcts::{tactical_move, LoopReport, MctsSearch};
pub use node::{NodeId, SearchNode};
pub use tree::{ChildStats, RootStatistics, SearchTree};
pub use worker::{spawn_search, CancelToken, SearchHandle};
