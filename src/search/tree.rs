//! Search tree with arena allocation.
//!
//! Nodes live in a contiguous Vec and refer to each other by `NodeId`, so
//! parent back-links never form ownership cycles. A tree is built fresh for
//! every search and dropped when the search returns.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::board::{BoardState, Outcome, Stone};

use super::node::{NodeId, SearchNode};

/// Statistics of one root child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChildStats {
    #[serde(rename = "move")]
    pub mv: usize,
    pub visits: u32,
    pub reward: f64,
    pub prior: i32,
}

impl ChildStats {
    /// Win rate in percent from the point of view of the player to move at
    /// the root.
    pub fn win_rate(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward / f64::from(self.visits) * 100.0
        }
    }
}

/// Summary of the finished root, children ordered best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootStatistics {
    pub total_visits: u32,
    pub children: Vec<ChildStats>,
}

impl RootStatistics {
    /// The first `n` children (most visited first).
    pub fn top(&self, n: usize) -> &[ChildStats] {
        &self.children[..n.min(self.children.len())]
    }

    pub fn child(&self, mv: usize) -> Option<&ChildStats> {
        self.children.iter().find(|c| c.mv == mv)
    }
}

/// Search tree with arena-based node storage.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    root: NodeId,
}

impl SearchTree {
    /// Create a tree whose root holds `state`.
    pub fn new(state: BoardState) -> Self {
        Self {
            nodes: vec![SearchNode::new_root(state)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true after construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child of `parent` reached by `mv`. `state` must already
    /// contain the move.
    pub fn add_child(&mut self, parent: NodeId, mv: usize, state: BoardState, prior: i32) -> NodeId {
        let mover = self.get(parent).state.current_player();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new_child(parent, mv, mover, state, prior));
        self.get_mut(parent).children.push(id);
        id
    }

    /// Pick the child of `id` with the highest UCB1 score.
    ///
    /// The first child wins ties, so an unvisited child is taken before any
    /// visited sibling and unvisited children go in creation order.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &node.children {
            let score = self.get(child).ucb1(node.visits, exploration);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((child, score));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Walk from `leaf` to the root, counting a visit on every node and
    /// crediting each non-root node's mover with 1 for a win or 0.5 for a
    /// draw.
    pub fn backpropagate(&mut self, leaf: NodeId, outcome: Outcome) {
        let mut current = leaf;
        while current.is_some() {
            let node = self.get_mut(current);
            node.visits += 1;
            if node.parent.is_some() {
                node.reward += reward_for(node.mover, outcome);
            }
            current = node.parent;
        }
    }

    /// Node ids from the root down to `id`, root first.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = id;
        while current.is_some() {
            path.push(current);
            current = self.get(current).parent;
        }
        path.reverse();
        path
    }

    /// Children of `id` ordered by visits desc, then prior desc, then move.
    pub fn ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.get(id).children.clone();
        children.sort_by(|&a, &b| self.compare_children(a, b));
        children
    }

    fn compare_children(&self, a: NodeId, b: NodeId) -> Ordering {
        let (a, b) = (self.get(a), self.get(b));
        b.visits
            .cmp(&a.visits)
            .then(b.prior.cmp(&a.prior))
            .then(a.mv.cmp(&b.mv))
    }

    /// Most visited root child as `(move, visits)`.
    pub fn best_action(&self) -> Option<(usize, u32)> {
        self.ordered_children(self.root).first().and_then(|&id| {
            let node = self.get(id);
            node.mv.map(|mv| (mv, node.visits))
        })
    }

    pub fn root_statistics(&self) -> RootStatistics {
        let children = self
            .ordered_children(self.root)
            .into_iter()
            .filter_map(|id| {
                let node = self.get(id);
                node.mv.map(|mv| ChildStats {
                    mv,
                    visits: node.visits,
                    reward: node.reward,
                    prior: node.prior,
                })
            })
            .collect();
        RootStatistics {
            total_visits: self.get(self.root).visits,
            children,
        }
    }
}

/// Reward credited to `mover` for a finished playout.
pub fn reward_for(mover: Stone, outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Winner(w) if w == mover => 1.0,
        Outcome::Winner(_) => 0.0,
        Outcome::Draw => 0.5,
    }
}
