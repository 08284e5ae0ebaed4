//! [Monte Carlo Tree Search] with the UCB1 selection rule (UCT) and the
//! parallelization strategies the suite benchmarks against each other. The
//! serial loop in [`serial`] is the reference implementation; [`root`],
//! [`parallel_tree`] and [`leaf`] spread the same iteration budget over
//! worker threads in three different ways, and [`persistent`] trades memory
//! for disk by carrying the tree across process invocations.
//!
//! [Monte Carlo Tree Search]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::thread;

use anyhow::bail;

pub mod leaf;
pub mod parallel_tree;
pub mod persistent;
pub mod root;
pub mod serial;
pub mod tree;

/// Iteration budget used when the caller does not provide one.
pub const DEFAULT_ITERATIONS: u64 = 100;

/// Worker thread count to use when the caller does not provide one.
#[must_use]
pub fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Knobs shared by all strategies.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
    /// Search iterations per move. Parallel strategies split this budget
    /// evenly over their workers.
    pub iterations: u64,
    /// Worker thread count for the parallel strategies.
    pub parallelism: usize,
    /// UCB1 exploration constant used while descending the tree.
    pub exploration: f64,
}

impl SearchOptions {
    /// Options with the given iteration budget and default everything else.
    #[must_use]
    pub fn with_iterations(iterations: u64) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.parallelism.max(1)
    }

    /// Iterations each worker runs. Integer division: the budget is an upper
    /// bound, the remainder is dropped rather than redistributed.
    pub(crate) fn per_worker(&self) -> u64 {
        self.iterations / self.workers() as u64
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            parallelism: available_parallelism(),
            exploration: 1.0,
        }
    }
}

/// The five benchmarked strategies, in the order the test runner executes
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Serial UCT with a fresh tree for every move.
    Plain,
    /// Independent trees searched in parallel, root statistics merged.
    RootParallel,
    /// One shared tree searched by several threads under per-node locks.
    TreeParallel,
    /// Serial tree walk with parallel rollouts from the expanded leaf.
    LeafParallel,
    /// Serial UCT over a tree that is snapshotted to disk between runs.
    Persistent,
}

impl Strategy {
    /// Benchmark execution order. Fixed for log readability, not
    /// correctness.
    pub const ALL: [Self; 5] = [
        Self::Plain,
        Self::RootParallel,
        Self::TreeParallel,
        Self::LeafParallel,
        Self::Persistent,
    ];

    /// The identifier used on the command line and in log file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::RootParallel => "root-parallel",
            Self::TreeParallel => "tree-parallel",
            Self::LeafParallel => "leaf-parallel",
            Self::Persistent => "persistent",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        for strategy in Self::ALL {
            if strategy.name() == name {
                return Ok(strategy);
            }
        }
        bail!(
            "unknown strategy '{name}', expected one of: {}",
            Self::ALL.map(Self::name).join(", ")
        )
    }
}
