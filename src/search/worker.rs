//! Running a search off the caller's thread
//!
//! The search owns its tree on a worker thread and hands back exactly one
//! message, the finished [`SearchOutcome`]. The caller can poll for it,
//! block on it, or ask the worker to stop early through a [`CancelToken`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::warn;

use crate::board::BoardState;
use crate::engine::{MctsEngine, SearchOutcome};
use crate::error::{GomokuError, Result};

use super::config::{HeuristicMethod, SearchBudget};
use super::events::{NullObserver, SearchObserver};

/// Cooperative stop signal, checked once per iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Handle to a search running on a worker thread.
#[derive(Debug)]
pub struct SearchHandle {
    receiver: Receiver<Result<SearchOutcome>>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
    delivered: bool,
}

impl SearchHandle {
    /// Ask the worker to stop. It still reports the best move found so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Poll for the result without blocking.
    ///
    /// Returns `None` while the search is running and after the result has
    /// already been taken. A worker that died without reporting yields
    /// `SearchAborted`.
    pub fn try_result(&mut self) -> Option<Result<SearchOutcome>> {
        if self.delivered {
            return None;
        }
        let message = match self.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(aborted()),
        };
        self.delivered = true;
        self.join();
        Some(message)
    }

    /// Block until the search finishes.
    pub fn wait(mut self) -> Result<SearchOutcome> {
        if self.delivered {
            return Err(GomokuError::SearchAborted {
                message: "result already taken".to_string(),
            });
        }
        let message = self.receiver.recv().unwrap_or_else(|_| Err(aborted()));
        self.delivered = true;
        self.join();
        message
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("search worker panicked");
            }
        }
    }
}

fn aborted() -> GomokuError {
    GomokuError::SearchAborted {
        message: "search worker exited without a result".to_string(),
    }
}

/// Start a search on a new thread.
///
/// `observer`, if given, receives every event on the worker thread.
pub fn spawn_search(
    engine: MctsEngine,
    state: BoardState,
    budget: SearchBudget,
    heuristic: HeuristicMethod,
    observer: Option<Box<dyn SearchObserver + Send>>,
) -> Result<SearchHandle> {
    let (tx, receiver) = channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("mcts-search".to_string())
        .spawn(move || {
            let result = match observer {
                Some(mut observer) => {
                    engine.search_with(&state, &budget, heuristic, &mut *observer, Some(&worker_cancel))
                }
                None => engine.search_with(&state, &budget, heuristic, &mut NullObserver, Some(&worker_cancel)),
            };
            // The caller may have dropped the handle
            let _ = tx.send(result);
        })
        .map_err(|e| GomokuError::SearchAborted {
            message: format!("failed to spawn search thread: {e}"),
        })?;

    Ok(SearchHandle {
        receiver,
        cancel,
        thread: Some(thread),
        delivered: false,
    })
}
