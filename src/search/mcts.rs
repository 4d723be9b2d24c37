//! MCTS search loop.
//!
//! Each iteration runs the four classic phases:
//! 1. Selection: follow UCB1 from the root to a node with untried moves
//! 2. Expansion: add one child, biased toward well-ranked moves
//! 3. Simulation: play the child's position out to a result
//! 4. Backpropagation: update visits and rewards back to the root

use std::time::Instant;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::board::{BoardState, Outcome, Stone};
use crate::error::Result;
use crate::eval::PatternEvaluator;
use crate::rules::has_run_at;

use super::config::{HeuristicMethod, MctsConfig, SearchBudget};
use super::events::{SearchEvent, SearchObserver};
use super::node::NodeId;
use super::tree::SearchTree;
use super::worker::CancelToken;

/// How a search loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub iterations: u32,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

/// Single-threaded search over one tree.
pub struct MctsSearch<'a> {
    tree: SearchTree,
    config: &'a MctsConfig,
    evaluator: &'a PatternEvaluator,
    heuristic: HeuristicMethod,
    /// Rollout board, reused across iterations
    scratch: BoardState,
    candidates: Vec<usize>,
}

impl<'a> MctsSearch<'a> {
    pub fn new(
        state: &BoardState,
        config: &'a MctsConfig,
        evaluator: &'a PatternEvaluator,
        heuristic: HeuristicMethod,
    ) -> Self {
        Self {
            tree: SearchTree::new(state.clone()),
            config,
            evaluator,
            heuristic,
            scratch: state.clone(),
            candidates: Vec::with_capacity(state.cell_count()),
        }
    }

    #[inline]
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn into_tree(self) -> SearchTree {
        self.tree
    }

    /// Iterate until `budget` is spent or `cancel` fires.
    pub fn run(
        &mut self,
        budget: &SearchBudget,
        rng: &mut ChaCha20Rng,
        observer: &mut dyn SearchObserver,
        cancel: Option<&CancelToken>,
    ) -> Result<LoopReport> {
        let start = Instant::now();
        let mut iterations = 0u32;
        let mut cancelled = false;

        while budget.allows(iterations, start.elapsed().as_millis()) {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                cancelled = true;
                break;
            }
            if observer.is_enabled() {
                observer.on_event(&SearchEvent::IterationStart { iteration: iterations });
            }
            self.iterate(rng, observer)?;
            iterations += 1;
        }

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            "search loop finished: {} iterations in {}ms, {} nodes{}",
            iterations,
            elapsed_ms,
            self.tree.len(),
            if cancelled { " (cancelled)" } else { "" }
        );
        Ok(LoopReport {
            iterations,
            elapsed_ms,
            cancelled,
        })
    }

    /// Run one select / expand / simulate / backpropagate cycle.
    pub fn iterate(&mut self, rng: &mut ChaCha20Rng, observer: &mut dyn SearchObserver) -> Result<()> {
        let selected = self.select();
        if observer.is_enabled() {
            observer.on_event(&SearchEvent::Selection {
                path: self.move_path(selected),
            });
        }

        let leaf = if self.tree.get(selected).is_fully_expanded() {
            selected
        } else {
            self.expand(selected, rng, observer)?
        };

        let mut played = Vec::new();
        let outcome = self.simulate(leaf, rng, observer.is_enabled().then_some(&mut played))?;
        if observer.is_enabled() {
            observer.on_event(&SearchEvent::Simulation {
                moves: played,
                winner: outcome,
            });
        }

        self.tree.backpropagate(leaf, outcome);
        if observer.is_enabled() {
            observer.on_event(&SearchEvent::Backpropagation {
                path: self.move_path(leaf),
                winner: outcome,
            });
        }
        trace!("iteration: leaf {} depth {} -> {:?}", leaf.0, self.tree.path_to(leaf).len() - 1, outcome);
        Ok(())
    }

    /// Descend by UCB1 while the current node is fully expanded and has
    /// children. Stops at a node with untried moves, or a terminal one.
    fn select(&self) -> NodeId {
        let mut current = self.tree.root();
        loop {
            let node = self.tree.get(current);
            if !node.is_fully_expanded() || node.children.is_empty() {
                return current;
            }
            match self.tree.select_child(current, self.config.exploration) {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// Add one untried move of `id` as a child and return the child.
    fn expand(
        &mut self,
        id: NodeId,
        rng: &mut ChaCha20Rng,
        observer: &mut dyn SearchObserver,
    ) -> Result<NodeId> {
        if self.heuristic == HeuristicMethod::Pattern && !self.tree.get(id).ranked {
            let ranked = self.evaluator.ranked_moves(&self.tree.get(id).state);
            let node = self.tree.get_mut(id);
            node.untried = ranked;
            node.ranked = true;
        }

        let node = self.tree.get_mut(id);
        let window = match self.heuristic {
            HeuristicMethod::Pattern => self.config.expansion_width.min(node.untried.len()),
            HeuristicMethod::Random => node.untried.len(),
        };
        if observer.is_enabled() {
            let candidates = node.untried[..window].iter().map(|&(s, m)| (m, s)).collect();
            observer.on_event(&SearchEvent::Expansion { candidates });
        }

        let pick = rng.gen_range(0..window);
        let (prior, mv) = match self.heuristic {
            // Keep the ranked order for the moves left behind
            HeuristicMethod::Pattern => node.untried.remove(pick),
            HeuristicMethod::Random => node.untried.swap_remove(pick),
        };

        let mut state = node.state.clone();
        state.play(mv)?;
        Ok(self.tree.add_child(id, mv, state, prior))
    }

    /// Play the position at `id` out to a result.
    fn simulate(
        &mut self,
        id: NodeId,
        rng: &mut ChaCha20Rng,
        mut played: Option<&mut Vec<usize>>,
    ) -> Result<Outcome> {
        let node = self.tree.get(id);
        if let Some(outcome) = node.outcome {
            return Ok(outcome);
        }

        self.scratch.clone_from(&node.state);
        loop {
            let Some(mv) = self.playout_move(rng) else {
                return Ok(Outcome::Draw);
            };
            self.scratch.play(mv)?;
            if let Some(moves) = played.as_deref_mut() {
                moves.push(mv);
            }
            if let Some(outcome) = self.scratch.check_winner(true) {
                return Ok(outcome);
            }
        }
    }

    /// Choose the next rollout move on the scratch board, or None when the
    /// board is full.
    fn playout_move(&mut self, rng: &mut ChaCha20Rng) -> Option<usize> {
        match self.heuristic {
            HeuristicMethod::Random => {
                self.scratch.legal_moves_into(&mut self.candidates);
                self.candidates.choose(rng).copied()
            }
            HeuristicMethod::Pattern => tactical_move(&self.scratch, &mut self.candidates, rng),
        }
    }

    /// Moves from the root down to `id`.
    fn move_path(&self, id: NodeId) -> Vec<usize> {
        self.tree
            .path_to(id)
            .into_iter()
            .filter_map(|n| self.tree.get(n).mv)
            .collect()
    }
}

/// Rollout policy: win now, else block the opponent's win, else a random
/// cell next to an existing stone, else any random cell.
pub fn tactical_move(board: &BoardState, buf: &mut Vec<usize>, rng: &mut ChaCha20Rng) -> Option<usize> {
    let player = board.current_player();
    let opponent = player.opponent();

    buf.clear();
    buf.extend((0..board.cell_count()).filter(|&i| board.get(i) == Stone::Empty && board.has_neighbor(i)));

    if let Some(&mv) = buf.iter().find(|&&i| has_run_at(board, i, player)) {
        return Some(mv);
    }
    if let Some(&mv) = buf.iter().find(|&&i| has_run_at(board, i, opponent)) {
        return Some(mv);
    }
    if let Some(&mv) = buf.choose(rng) {
        return Some(mv);
    }

    board.legal_moves_into(buf);
    buf.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::events::{EventLog, NullObserver};
    use rand::SeedableRng;

    fn evaluator(config: &MctsConfig) -> PatternEvaluator {
        config.build_evaluator().unwrap()
    }

    #[test]
    fn test_tactical_move_prefers_win_then_block() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut buf = Vec::new();

        // Black to move can complete the top row
        let board = BoardState::from_rows(&["XX.", "OO.", "..."], Stone::Black, 3).unwrap();
        assert_eq!(tactical_move(&board, &mut buf, &mut rng), Some(2));

        // White to move wins at 5 rather than blocking at 2
        let board = BoardState::from_rows(&["XX.", "OO.", "..."], Stone::White, 3).unwrap();
        assert_eq!(tactical_move(&board, &mut buf, &mut rng), Some(5));

        // White cannot win, must block
        let board = BoardState::from_rows(&["XX.", "O..", "..O"], Stone::White, 3).unwrap();
        assert_eq!(tactical_move(&board, &mut buf, &mut rng), Some(2));
    }

    #[test]
    fn test_tactical_move_stays_adjacent() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut buf = Vec::new();
        let mut board = BoardState::new(9, 5, Stone::Black).unwrap();
        board.play(40).unwrap();
        for _ in 0..20 {
            let mv = tactical_move(&board, &mut buf, &mut rng).unwrap();
            assert!(board.has_neighbor(mv));
            assert_eq!(board.get(mv), Stone::Empty);
        }

        let empty = BoardState::new(3, 3, Stone::Black).unwrap();
        assert!(tactical_move(&empty, &mut buf, &mut rng).is_some());
    }

    #[test]
    fn test_root_visits_match_iterations() {
        let config = MctsConfig::default();
        let eval = evaluator(&config);
        let mut board = BoardState::new(7, 4, Stone::Black).unwrap();
        board.play(24).unwrap();

        for heuristic in [HeuristicMethod::Pattern, HeuristicMethod::Random] {
            let mut search = MctsSearch::new(&board, &config, &eval, heuristic);
            let mut rng = ChaCha20Rng::seed_from_u64(3);
            let budget = SearchBudget::iterations(60).unwrap();
            let report = search.run(&budget, &mut rng, &mut NullObserver, None).unwrap();
            assert_eq!(report.iterations, 60);
            assert!(!report.cancelled);

            let tree = search.tree();
            assert_eq!(tree.get(tree.root()).visits, 60);
            for i in 0..tree.len() as u32 {
                let node = tree.get(NodeId(i));
                for &child in &node.children {
                    assert!(node.visits >= tree.get(child).visits);
                }
            }
        }
    }

    #[test]
    fn test_every_root_child_sampled_before_revisit() {
        let config = MctsConfig::default();
        let eval = evaluator(&config);
        let board = BoardState::from_rows(&["X..", "...", "..."], Stone::White, 3).unwrap();
        let mut search = MctsSearch::new(&board, &config, &eval, HeuristicMethod::Random);
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let budget = SearchBudget::iterations(8).unwrap();
        search.run(&budget, &mut rng, &mut NullObserver, None).unwrap();

        let tree = search.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 8);
        assert!(root.children.iter().all(|&c| tree.get(c).visits == 1));
    }

    #[test]
    fn test_pattern_expansion_ranks_lazily() {
        let config = MctsConfig::default();
        let eval = evaluator(&config);
        let board = BoardState::from_rows(
            &[".....", ".XX..", ".OO..", ".....", "....."],
            Stone::Black,
            4,
        )
        .unwrap();
        let mut search = MctsSearch::new(&board, &config, &eval, HeuristicMethod::Pattern);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut log = EventLog::new();
        search.iterate(&mut rng, &mut log).unwrap();

        let tree = search.tree();
        let root = tree.get(tree.root());
        assert!(root.ranked);
        assert_eq!(root.children.len(), 1);
        // The chosen child came from the top of the ranking
        let child = tree.get(root.children[0]);
        let ranked = eval.ranked_moves(&board);
        let top: Vec<usize> = ranked.iter().take(5).map(|&(_, m)| m).collect();
        assert!(top.contains(&child.mv.unwrap()));
        assert_eq!(root.untried.len(), ranked.len() - 1);

        let kinds: Vec<&str> = log
            .events
            .iter()
            .map(|e| match e {
                SearchEvent::Selection { .. } => "selection",
                SearchEvent::Expansion { .. } => "expansion",
                SearchEvent::Simulation { .. } => "simulation",
                SearchEvent::Backpropagation { .. } => "backpropagation",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["selection", "expansion", "simulation", "backpropagation"]);
    }

    #[test]
    fn test_cancel_before_first_iteration() {
        let config = MctsConfig::default();
        let eval = evaluator(&config);
        let board = BoardState::from_rows(&["X..", "...", "..."], Stone::White, 3).unwrap();
        let mut search = MctsSearch::new(&board, &config, &eval, HeuristicMethod::Pattern);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let cancel = CancelToken::new();
        cancel.cancel();
        let budget = SearchBudget::iterations(100).unwrap();
        let report = search.run(&budget, &mut rng, &mut NullObserver, Some(&cancel)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.iterations, 0);
        assert_eq!(search.tree().len(), 1);
    }
}
