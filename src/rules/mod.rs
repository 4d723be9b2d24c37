//! Game rules for straight-run connection games
//!
//! This module implements:
//! - Winning line enumeration shared across boards of one configuration
//! - Incremental win detection through the last placed stone

pub mod lines;
pub mod win;

// Re-exports for convenient access
pub use lines::WinLines;
pub use win::{count_direction, has_run_at, run_length, DIRECTIONS};
