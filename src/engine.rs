//! Main move engine
//!
//! The engine answers "which cell should the side to move play?" in a fixed
//! order of phases:
//!
//! 1. **Opening**: on an empty board play the center, no search
//! 2. **Immediate move**: if the best-ranked move wins, or blocks a win,
//!    play it without searching
//! 3. **Search**: Monte Carlo Tree Search within the given budget
//! 4. **Final choice**: heuristic re-rank of the most visited root children
//!    (`Pattern`) or the most visited child (`Random`)
//!
//! # Example
//!
//! ```
//! use gomoku_mcts::{BoardState, MctsConfig, MctsEngine, SearchBudget, Stone};
//!
//! let engine = MctsEngine::new(MctsConfig::default().with_seed(7)).unwrap();
//! let mut board = BoardState::new(9, 5, Stone::Black).unwrap();
//! board.play(40).unwrap();
//!
//! let outcome = engine.search(&board, &SearchBudget::iterations(200).unwrap()).unwrap();
//! println!("White plays {} after {} iterations", outcome.mv, outcome.iterations);
//! assert_eq!(outcome.stats.total_visits, 200);
//! ```

use std::time::Instant;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::board::{BoardState, Outcome};
use crate::error::{GomokuError, Result};
use crate::eval::PatternEvaluator;
use crate::search::{
    CancelToken, HeuristicMethod, ImmediateReason, MctsConfig, MctsSearch, NullObserver,
    RootStatistics, SearchBudget, SearchEvent, SearchObserver, SearchTree,
};

/// Which phase of the engine picked the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Center of an empty board
    Opening,
    /// Move completes a winning run
    ImmediateWin,
    /// Move stops the opponent completing a run
    ImmediateBlock,
    /// Chosen from the search tree
    Search,
    /// The tree grew no children; uniform random legal move
    Fallback,
}

/// Result of one engine call with search statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Chosen cell index
    #[serde(rename = "move")]
    pub mv: usize,
    pub decision: Decision,
    /// Heuristic score behind the choice, when one was used
    pub score: Option<i32>,
    pub heuristic: HeuristicMethod,
    /// Completed search iterations
    pub iterations: u32,
    pub elapsed_ms: u64,
    /// Nodes in the search tree, root included (0 when no tree was built)
    pub tree_size: usize,
    /// Whether the search stopped on a cancel request
    pub cancelled: bool,
    pub stats: RootStatistics,
}

impl SearchOutcome {
    /// Create a result for a move decided without a tree
    #[inline]
    fn without_search(
        mv: usize,
        decision: Decision,
        score: Option<i32>,
        heuristic: HeuristicMethod,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            mv,
            decision,
            score,
            heuristic,
            iterations: 0,
            elapsed_ms,
            tree_size: 0,
            cancelled: false,
            stats: RootStatistics::default(),
        }
    }
}

/// Monte Carlo Tree Search engine.
///
/// Holds a validated configuration and evaluator; every call builds a fresh
/// tree and discards it on return, so one engine can serve any number of
/// independent positions.
#[derive(Debug, Clone, Default)]
pub struct MctsEngine {
    config: MctsConfig,
    evaluator: PatternEvaluator,
}

impl MctsEngine {
    /// Create an engine, validating the configuration and weight table.
    pub fn new(config: MctsConfig) -> Result<Self> {
        let evaluator = config.build_evaluator()?;
        Ok(Self { config, evaluator })
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    #[inline]
    pub fn evaluator(&self) -> &PatternEvaluator {
        &self.evaluator
    }

    /// Pick a move for the side to move and return it with the root
    /// statistics.
    ///
    /// The search runs while `time_limit_ms` has not elapsed or fewer than
    /// `min_iterations` iterations are done.
    pub fn find_best_move(
        &self,
        state: &BoardState,
        time_limit_ms: u64,
        min_iterations: u32,
        heuristic: HeuristicMethod,
    ) -> Result<(usize, RootStatistics)> {
        let budget = SearchBudget::new(time_limit_ms, min_iterations)?;
        let outcome = self.search_with(state, &budget, heuristic, &mut NullObserver, None)?;
        Ok((outcome.mv, outcome.stats))
    }

    /// Search with the configured heuristic and no instrumentation.
    pub fn search(&self, state: &BoardState, budget: &SearchBudget) -> Result<SearchOutcome> {
        self.search_with(state, budget, self.config.heuristic, &mut NullObserver, None)
    }

    /// Full entry point: explicit heuristic, observer and cancellation.
    ///
    /// A position that already holds a winning line fails with `GameOver`,
    /// a full board without one with `NoLegalMoves`.
    pub fn search_with(
        &self,
        state: &BoardState,
        budget: &SearchBudget,
        heuristic: HeuristicMethod,
        observer: &mut dyn SearchObserver,
        cancel: Option<&CancelToken>,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();
        if let Some(Outcome::Winner(winner)) = state.check_winner(true) {
            return Err(GomokuError::GameOver { winner });
        }
        if state.empty_count() == 0 {
            return Err(GomokuError::NoLegalMoves);
        }
        if observer.is_enabled() {
            observer.on_event(&SearchEvent::SearchStart {
                time_limit_ms: budget.time_limit_ms(),
                min_iterations: budget.min_iterations(),
            });
        }

        // 0. Opening
        if state.is_board_empty() {
            let center = state.center();
            debug!("opening move at center {}", center);
            let outcome = SearchOutcome::without_search(
                center,
                Decision::Opening,
                None,
                heuristic,
                elapsed_ms(start),
            );
            return Ok(finish(outcome, observer));
        }

        // 1. Win now, or block a win
        let ranked = self.evaluator.ranked_moves(state);
        if let Some(&(score, mv)) = ranked.first() {
            let weights = self.evaluator.weights();
            if score >= weights.block_win {
                let (decision, reason) = if score >= weights.win {
                    (Decision::ImmediateWin, ImmediateReason::Win)
                } else {
                    (Decision::ImmediateBlock, ImmediateReason::Block)
                };
                debug!("immediate {:?} at {} (score {})", reason, mv, score);
                if observer.is_enabled() {
                    observer.on_event(&SearchEvent::ImmediateMove { mv, reason, score });
                }
                let outcome =
                    SearchOutcome::without_search(mv, decision, Some(score), heuristic, elapsed_ms(start));
                return Ok(finish(outcome, observer));
            }
        }

        // 2. Tree search
        debug!(
            "searching {} legal moves with {} heuristic, budget {:?}",
            ranked.len(),
            heuristic,
            budget
        );
        let mut rng = self.rng();
        let mut search = MctsSearch::new(state, &self.config, &self.evaluator, heuristic);
        let report = search.run(budget, &mut rng, observer, cancel)?;
        let tree = search.into_tree();
        let stats = tree.root_statistics();

        // 3. Final choice
        let (mv, decision, score) = match self.final_choice(&tree, state, heuristic) {
            Some((mv, score)) => (mv, Decision::Search, score),
            None => {
                let legal = state.legal_moves();
                let mv = *legal.choose(&mut rng).ok_or(GomokuError::NoLegalMoves)?;
                warn!(
                    "search grew no children after {} iterations{}, playing random move {}",
                    report.iterations,
                    if report.cancelled { " (cancelled)" } else { "" },
                    mv
                );
                (mv, Decision::Fallback, None)
            }
        };

        let outcome = SearchOutcome {
            mv,
            decision,
            score,
            heuristic,
            iterations: report.iterations,
            elapsed_ms: elapsed_ms(start),
            tree_size: tree.len(),
            cancelled: report.cancelled,
            stats,
        };
        debug!(
            "chose {} after {} iterations in {}ms ({} nodes)",
            outcome.mv, outcome.iterations, outcome.elapsed_ms, outcome.tree_size
        );
        Ok(finish(outcome, observer))
    }

    /// Pick among the root children, or None if there are none.
    ///
    /// `Pattern` re-scores the `top_n_final` most visited children with the
    /// evaluator and keeps the best, earlier children winning ties.
    /// `Random` takes the most visited child.
    fn final_choice(
        &self,
        tree: &SearchTree,
        state: &BoardState,
        heuristic: HeuristicMethod,
    ) -> Option<(usize, Option<i32>)> {
        let ordered = tree.ordered_children(tree.root());
        let candidates = ordered.iter().filter_map(|&id| tree.get(id).mv);
        match heuristic {
            HeuristicMethod::Random => candidates.map(|mv| (mv, None)).next(),
            HeuristicMethod::Pattern => {
                let player = state.current_player();
                let mut best: Option<(usize, i32)> = None;
                for mv in candidates.take(self.config.top_n_final) {
                    let score = self.evaluator.score_move(state, mv, player);
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((mv, score));
                    }
                }
                best.map(|(mv, score)| (mv, Some(score)))
            }
        }
    }

    /// Fresh generator per call: seeded when configured, else from entropy.
    fn rng(&self) -> ChaCha20Rng {
        match self.config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn finish(outcome: SearchOutcome, observer: &mut dyn SearchObserver) -> SearchOutcome {
    if observer.is_enabled() {
        observer.on_event(&SearchEvent::SearchComplete {
            total_iterations: outcome.iterations,
            elapsed_ms: outcome.elapsed_ms,
        });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Stone;
    use crate::eval::PatternWeights;
    use crate::search::EventLog;
    use assert_matches::assert_matches;

    fn seeded(seed: u64) -> MctsEngine {
        MctsEngine::new(MctsConfig::default().with_seed(seed)).unwrap()
    }

    fn board(rows: &[&str], to_move: Stone) -> BoardState {
        BoardState::from_rows(rows, to_move, 5).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = MctsEngine::default();
        assert_eq!(engine.config().top_n_final, 10);
        assert!(MctsEngine::new(MctsConfig::default().with_exploration(-1.0)).is_err());
    }

    #[test]
    fn test_engine_empty_board() {
        let engine = seeded(1);
        let board = BoardState::new(9, 5, Stone::Black).unwrap();
        let outcome = engine.search(&board, &SearchBudget::iterations(50).unwrap()).unwrap();
        assert_eq!(outcome.mv, 40);
        assert_eq!(outcome.decision, Decision::Opening);
        assert_eq!(outcome.iterations, 0);

        let even = BoardState::new(4, 3, Stone::White).unwrap();
        assert_eq!(engine.search(&even, &SearchBudget::iterations(5).unwrap()).unwrap().mv, 10);
    }

    #[test]
    fn test_engine_finds_immediate_win() {
        let engine = seeded(2);
        let b = board(
            &[
                ".........",
                ".........",
                ".........",
                ".........",
                "OXXXX....",
                ".........",
                "..OOO....",
                ".........",
                ".........",
            ],
            Stone::Black,
        );
        let mut log = EventLog::new();
        let budget = SearchBudget::iterations(100).unwrap();
        let outcome = engine
            .search_with(&b, &budget, HeuristicMethod::Pattern, &mut log, None)
            .unwrap();
        assert_eq!(outcome.mv, 41);
        assert_eq!(outcome.decision, Decision::ImmediateWin);
        assert_eq!(outcome.score, Some(engine.evaluator().weights().win));
        assert_eq!(outcome.iterations, 0);
        assert_eq!(
            log.count(|e| matches!(e, SearchEvent::ImmediateMove { reason: ImmediateReason::Win, .. })),
            1
        );
        assert_eq!(log.count(|e| matches!(e, SearchEvent::IterationStart { .. })), 0);
    }

    #[test]
    fn test_engine_blocks_opponent_win() {
        let engine = seeded(3);
        let b = board(
            &[
                ".........",
                ".........",
                "..XXXX...",
                ".........",
                "....O....",
                "...O.....",
                ".........",
                ".........",
                ".........",
            ],
            Stone::White,
        );
        let outcome = engine.search(&b, &SearchBudget::iterations(100).unwrap()).unwrap();
        assert_eq!(outcome.decision, Decision::ImmediateBlock);
        assert!(outcome.mv == 19 || outcome.mv == 24, "blocked at {}", outcome.mv);
    }

    #[test]
    fn test_engine_no_legal_moves() {
        let engine = seeded(4);
        let full = BoardState::from_rows(&["XOX", "XOO", "OXX"], Stone::Black, 3).unwrap();
        assert_matches!(
            engine.find_best_move(&full, 100, 10, HeuristicMethod::Pattern),
            Err(GomokuError::NoLegalMoves)
        );
    }

    #[test]
    fn test_engine_rejects_decided_position() {
        let engine = seeded(4);
        let budget = SearchBudget::iterations(10).unwrap();
        for rows in [["XXX", "OO.", "..."], ["XXX", "OOX", "XOO"]] {
            let decided = BoardState::from_rows(&rows, Stone::White, 3).unwrap();
            assert_matches!(
                engine.search(&decided, &budget),
                Err(GomokuError::GameOver { winner: Stone::Black })
            );
        }

        let mut b = BoardState::from_rows(&["XX.", "OO.", "..."], Stone::Black, 3).unwrap();
        b.play(2).unwrap();
        let mut log = EventLog::new();
        assert_matches!(
            engine.search_with(&b, &budget, HeuristicMethod::Random, &mut log, None),
            Err(GomokuError::GameOver { winner: Stone::Black })
        );
        assert!(log.events.is_empty());
    }

    #[test]
    fn test_engine_rejects_weights_where_block_beats_win() {
        let weights = PatternWeights {
            win: 1_100_000,
            open_four: 150_000,
            ..PatternWeights::default()
        };
        assert_matches!(
            MctsEngine::new(MctsConfig::default().with_weights(weights)),
            Err(GomokuError::InvalidConfiguration { .. })
        );

        let weights = PatternWeights {
            win: i32::MAX,
            block_win: 2_000_000_000,
            open_four: 200_000_000,
            ..PatternWeights::default()
        };
        assert_matches!(
            MctsEngine::new(MctsConfig::default().with_weights(weights)),
            Err(GomokuError::InvalidConfiguration { .. })
        );
    }

    #[test]
    fn test_engine_invalid_budget() {
        let engine = seeded(5);
        let b = BoardState::new(9, 5, Stone::Black).unwrap();
        assert_matches!(
            engine.find_best_move(&b, 0, 0, HeuristicMethod::Pattern),
            Err(GomokuError::InvalidBudget { time_limit_ms: 0, min_iterations: 0 })
        );
    }

    #[test]
    fn test_engine_search_statistics() {
        let engine = seeded(6);
        let mut b = BoardState::new(9, 5, Stone::Black).unwrap();
        b.play(40).unwrap();
        b.play(41).unwrap();

        for heuristic in [HeuristicMethod::Pattern, HeuristicMethod::Random] {
            let budget = SearchBudget::iterations(120).unwrap();
            let outcome = engine
                .search_with(&b, &budget, heuristic, &mut NullObserver, None)
                .unwrap();
            assert_eq!(outcome.decision, Decision::Search);
            assert_eq!(outcome.iterations, 120);
            assert_eq!(outcome.stats.total_visits, 120);
            let child_visits: u32 = outcome.stats.children.iter().map(|c| c.visits).sum();
            assert_eq!(child_visits, 120);
            assert_eq!(b.get(outcome.mv), Stone::Empty);
            assert!(outcome.tree_size > outcome.stats.children.len());
        }
    }

    #[test]
    fn test_random_heuristic_picks_most_visited() {
        let engine = seeded(8);
        let mut b = BoardState::new(5, 4, Stone::Black).unwrap();
        b.play(12).unwrap();
        let budget = SearchBudget::iterations(300).unwrap();
        let outcome = engine
            .search_with(&b, &budget, HeuristicMethod::Random, &mut NullObserver, None)
            .unwrap();
        assert_eq!(outcome.mv, outcome.stats.children[0].mv);
        let max = outcome.stats.children.iter().map(|c| c.visits).max();
        assert_eq!(Some(outcome.stats.children[0].visits), max);
    }

    #[test]
    fn test_engine_deterministic_with_seed() {
        let mut b = BoardState::new(9, 5, Stone::Black).unwrap();
        b.play(40).unwrap();
        b.play(32).unwrap();
        let budget = SearchBudget::iterations(150).unwrap();

        let first = seeded(42).search(&b, &budget).unwrap();
        let second = seeded(42).search(&b, &budget).unwrap();
        assert_eq!(first.mv, second.mv);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_cancelled_search_falls_back() {
        let engine = seeded(10);
        let mut b = BoardState::new(9, 5, Stone::Black).unwrap();
        b.play(40).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let budget = SearchBudget::new(10_000, 0).unwrap();
        let outcome = engine
            .search_with(&b, &budget, HeuristicMethod::Pattern, &mut NullObserver, Some(&cancel))
            .unwrap();
        assert_eq!(outcome.decision, Decision::Fallback);
        assert!(outcome.cancelled);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(b.get(outcome.mv), Stone::Empty);
    }

    #[test]
    fn test_event_stream_order() {
        let engine = seeded(11);
        let mut b = BoardState::new(7, 4, Stone::Black).unwrap();
        b.play(24).unwrap();
        let mut log = EventLog::new();
        let budget = SearchBudget::iterations(3).unwrap();
        engine
            .search_with(&b, &budget, HeuristicMethod::Pattern, &mut log, None)
            .unwrap();

        assert_matches!(log.events.first(), Some(SearchEvent::SearchStart { min_iterations: 3, .. }));
        assert_matches!(
            log.events.last(),
            Some(SearchEvent::SearchComplete { total_iterations: 3, .. })
        );
        assert_eq!(log.count(|e| matches!(e, SearchEvent::IterationStart { .. })), 3);
        assert_eq!(log.count(|e| matches!(e, SearchEvent::Backpropagation { .. })), 3);
        let winners_valid = log.events.iter().all(|e| match e {
            SearchEvent::Simulation { winner, .. } => matches!(
                winner,
                Outcome::Draw | Outcome::Winner(Stone::Black) | Outcome::Winner(Stone::White)
            ),
            _ => true,
        });
        assert!(winners_valid);
    }

    #[test]
    fn test_outcome_serializes() {
        let engine = seeded(12);
        let b = BoardState::new(9, 5, Stone::Black).unwrap();
        let outcome = engine.search(&b, &SearchBudget::iterations(1).unwrap()).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["move"], 40);
        assert_eq!(json["decision"], "opening");
        assert_eq!(json["heuristic"], "pattern");
    }
}
