//! Search configuration parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GomokuError, Result};
use crate::eval::{PatternEvaluator, PatternWeights, DEFAULT_THREAT_BLOCK_MULTIPLIER};

/// How the engine biases expansion, playouts and the final choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicMethod {
    /// Ranked expansion, win/block/adjacent playouts, heuristic re-rank of
    /// the most visited root children.
    #[default]
    Pattern,
    /// Uniform expansion, uniform playouts, most visited child.
    Random,
}

impl FromStr for HeuristicMethod {
    type Err = GomokuError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" => Ok(HeuristicMethod::Pattern),
            "random" => Ok(HeuristicMethod::Random),
            other => Err(GomokuError::config(format!(
                "unknown heuristic method {other:?} (expected \"pattern\" or \"random\")"
            ))),
        }
    }
}

impl fmt::Display for HeuristicMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeuristicMethod::Pattern => write!(f, "pattern"),
            HeuristicMethod::Random => write!(f, "random"),
        }
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Exploration constant `C` in UCB1. Higher values explore more.
    pub exploration: f64,

    /// How many of the most visited root children the final selection
    /// re-scores.
    pub top_n_final: usize,

    /// How many of the best-ranked untried moves expansion picks from.
    pub expansion_width: usize,

    /// Multiple of `block_open_three` given to cells that answer an existing
    /// opponent threat.
    pub threat_block_multiplier: i32,

    /// Default heuristic for searches that do not name one.
    pub heuristic: HeuristicMethod,

    /// Seed for the search RNG. `None` draws from OS entropy on every search.
    pub seed: Option<u64>,

    /// Move scoring weights.
    pub weights: PatternWeights,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration: 1.41,
            top_n_final: 10,
            expansion_width: 5,
            threat_block_multiplier: DEFAULT_THREAT_BLOCK_MULTIPLIER,
            heuristic: HeuristicMethod::Pattern,
            seed: None,
            weights: PatternWeights::default(),
        }
    }
}

impl MctsConfig {
    /// Reject values that would make the search meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.exploration.is_finite() || self.exploration <= 0.0 {
            return Err(GomokuError::config(format!(
                "exploration constant must be positive and finite, got {}",
                self.exploration
            )));
        }
        if self.top_n_final == 0 {
            return Err(GomokuError::config("top_n_final must be at least 1"));
        }
        if self.expansion_width == 0 {
            return Err(GomokuError::config("expansion_width must be at least 1"));
        }
        Ok(())
    }

    /// Validate and build the evaluator this configuration describes.
    pub fn build_evaluator(&self) -> Result<PatternEvaluator> {
        self.validate()?;
        PatternEvaluator::new(self.weights, self.threat_block_multiplier)
    }

    /// Builder pattern: set the exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set the heuristic method.
    pub fn with_heuristic(mut self, heuristic: HeuristicMethod) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Builder pattern: fix the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder pattern: set the weight table.
    pub fn with_weights(mut self, weights: PatternWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Builder pattern: set how many top children the final choice considers.
    pub fn with_top_n_final(mut self, n: usize) -> Self {
        self.top_n_final = n;
        self
    }

    /// Builder pattern: set the expansion width.
    pub fn with_expansion_width(mut self, width: usize) -> Self {
        self.expansion_width = width;
        self
    }
}

/// How long a search may run.
///
/// The loop continues while the time limit has not elapsed **or** fewer than
/// `min_iterations` iterations have completed, and never beyond
/// `max_iterations` when that is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBudget {
    time_limit_ms: u64,
    min_iterations: u32,
    max_iterations: Option<u32>,
}

impl SearchBudget {
    /// Fails with `InvalidBudget` when both limits are zero, since such a
    /// search would never simulate anything.
    pub fn new(time_limit_ms: u64, min_iterations: u32) -> Result<Self> {
        if time_limit_ms == 0 && min_iterations == 0 {
            return Err(GomokuError::InvalidBudget {
                time_limit_ms,
                min_iterations,
            });
        }
        Ok(Self {
            time_limit_ms,
            min_iterations,
            max_iterations: None,
        })
    }

    /// Exactly `n` iterations, independent of wall-clock time.
    pub fn iterations(n: u32) -> Result<Self> {
        Ok(Self::new(0, n)?.with_max_iterations(n))
    }

    /// Builder pattern: stop after `n` iterations even if time remains.
    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    #[inline]
    pub fn time_limit_ms(&self) -> u64 {
        self.time_limit_ms
    }

    #[inline]
    pub fn min_iterations(&self) -> u32 {
        self.min_iterations
    }

    #[inline]
    pub fn max_iterations(&self) -> Option<u32> {
        self.max_iterations
    }

    /// Whether another iteration may start.
    #[inline]
    pub fn allows(&self, iterations: u32, elapsed_ms: u128) -> bool {
        if self.max_iterations.is_some_and(|max| iterations >= max) {
            return false;
        }
        elapsed_ms < u128::from(self.time_limit_ms) || iterations < self.min_iterations
    }
}
