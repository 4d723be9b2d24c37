//! Search instrumentation
//!
//! Observers receive a [`SearchEvent`] at each phase boundary of a search.
//! Events are delivered synchronously on the search thread, so an observer
//! must return quickly; [`ChannelObserver`] hands events to another thread
//! through a bounded queue and drops them when the consumer falls behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::Outcome;

/// Why a move was returned without searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmediateReason {
    Win,
    Block,
}

/// One instrumentation record. Serializes as a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    SearchStart {
        time_limit_ms: u64,
        min_iterations: u32,
    },
    ImmediateMove {
        #[serde(rename = "move")]
        mv: usize,
        reason: ImmediateReason,
        score: i32,
    },
    IterationStart {
        iteration: u32,
    },
    /// Moves from the root down to the selected node
    Selection {
        path: Vec<usize>,
    },
    /// Candidate `(move, score)` pairs expansion picked from
    Expansion {
        candidates: Vec<(usize, i32)>,
    },
    Simulation {
        moves: Vec<usize>,
        winner: Outcome,
    },
    Backpropagation {
        path: Vec<usize>,
        winner: Outcome,
    },
    SearchComplete {
        total_iterations: u32,
        elapsed_ms: u64,
    },
}

/// Receiver of search events.
///
/// Events are only built when `is_enabled` returns true, so a disabled
/// observer costs nothing per iteration.
pub trait SearchObserver {
    fn is_enabled(&self) -> bool {
        true
    }

    fn on_event(&mut self, event: &SearchEvent);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SearchObserver for NullObserver {
    fn is_enabled(&self) -> bool {
        false
    }

    fn on_event(&mut self, _event: &SearchEvent) {}
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<SearchEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&SearchEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl SearchObserver for EventLog {
    fn on_event(&mut self, event: &SearchEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards events through a bounded channel without ever blocking.
///
/// Events that do not fit are dropped and counted. Once the receiver hangs
/// up the observer disables itself.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: SyncSender<SearchEvent>,
    dropped: Arc<AtomicU64>,
    disconnected: bool,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its queue.
    pub fn bounded(capacity: usize) -> (Self, Receiver<SearchEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let observer = Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
            disconnected: false,
        };
        (observer, receiver)
    }

    /// Events dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared drop counter, readable after the observer has moved to a
    /// worker thread.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl SearchObserver for ChannelObserver {
    fn is_enabled(&self) -> bool {
        !self.disconnected
    }

    fn on_event(&mut self, event: &SearchEvent) {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.disconnected = true;
            }
        }
    }
}
