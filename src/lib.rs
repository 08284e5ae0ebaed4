//! Benchmark suite for UCT ([Monte Carlo Tree Search]) parallelization
//! strategies: a serial reference search, three ways of spreading the same
//! iteration budget over threads, a tree snapshotted to disk between runs,
//! and the harness that sweeps iteration budgets over them and distills the
//! resulting logs into a results table.
//!
//! [Monte Carlo Tree Search]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search

pub mod bench;
pub mod game;
pub mod search;
pub mod selfplay;
pub mod stats;

use shadow_rs::shadow;

shadow!(build);

/// Returns the full version that identifies how the binary was built.
fn version() -> String {
    format!(
        "{} (commit {}, branch {})",
        build::PKG_VERSION,
        build::SHORT_COMMIT,
        build::BRANCH
    )
}

/// Prints version and build information on startup, so every benchmark log
/// can be traced back to the binary that produced it.
pub fn print_build_info() {
    println!("uctbench {}", version());
    println!("Release build: {}", !shadow_rs::is_debug());
    if !shadow_rs::git_clean() {
        println!("Warning: built with uncommitted changes");
    }
    println!();
}
