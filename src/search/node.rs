//! MCTS tree node representation.
//!
//! Each node owns the position reached by playing `mv` from its parent and
//! the statistics UCB1 selection needs. Rewards are kept from the point of
//! view of `mover`, the player who made the move into the node.

use crate::board::{BoardState, Outcome, Stone};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Move that led here from the parent (None for root)
    pub mv: Option<usize>,

    /// Player who made `mv`
    pub mover: Stone,

    /// Position at this node
    pub state: BoardState,

    /// Expanded children, in creation order
    pub children: Vec<NodeId>,

    pub visits: u32,

    /// Sum of rewards credited to `mover`: 1 per win, 0.5 per draw
    pub reward: f64,

    /// Moves not yet expanded as `(score, move)`. Scores are zero until the
    /// node is ranked.
    pub untried: Vec<(i32, usize)>,

    /// Whether `untried` holds heuristic ranks
    pub ranked: bool,

    /// Heuristic score this node's move had in the parent's ranking
    pub prior: i32,

    /// Game result at this position, if the game is over
    pub outcome: Option<Outcome>,
}

impl SearchNode {
    /// Create the root node for `state`.
    ///
    /// The root is never terminal: a move is requested from it, so every
    /// legal move starts out untried.
    pub fn new_root(state: BoardState) -> Self {
        Self::build(NodeId::NONE, None, state.current_player().opponent(), state, 0, None)
    }

    /// Create a child reached by `mv`. `state` must already contain the move.
    pub fn new_child(parent: NodeId, mv: usize, mover: Stone, state: BoardState, prior: i32) -> Self {
        let outcome = state.check_winner(true);
        Self::build(parent, Some(mv), mover, state, prior, outcome)
    }

    fn build(
        parent: NodeId,
        mv: Option<usize>,
        mover: Stone,
        state: BoardState,
        prior: i32,
        outcome: Option<Outcome>,
    ) -> Self {
        // A finished game has nothing left to expand
        let untried = if outcome.is_some() {
            Vec::new()
        } else {
            state.legal_moves().into_iter().map(|m| (0, m)).collect()
        };
        Self {
            parent,
            mv,
            mover,
            state,
            children: Vec::new(),
            visits: 0,
            reward: 0.0,
            untried,
            ranked: false,
            prior,
            outcome,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }

    /// Mean reward, 0 when unvisited.
    pub fn win_rate(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward / f64::from(self.visits)
        }
    }

    /// UCB1 score given the parent's visit count.
    ///
    /// Unvisited nodes score infinity so they are always tried first.
    pub fn ucb1(&self, parent_visits: u32, exploration: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let n = f64::from(self.visits);
        let ln_parent = f64::from(parent_visits.max(1)).ln();
        self.reward / n + exploration * (ln_parent / n).sqrt()
    }
}
