//! Leaf parallelization: the tree walk stays serial, but every iteration
//! plays `parallelism` independent rollouts from the expanded state at once
//! and backpropagates their mean. The tree stays single-threaded, so no
//! locking is needed; the variance of the leaf estimate drops instead.

use std::io::Write;
use std::thread;

use anyhow::{bail, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::game::GameState;
use crate::search::serial::{self, Walk};
use crate::search::tree::SearchTree;
use crate::search::SearchOptions;

/// Runs `options.iterations` iterations with parallel rollouts and returns
/// the best move. The tree is expected to be reused across moves, so the pool
/// is always pruned to the chosen subtree before returning.
pub fn search<S>(
    tree: &mut SearchTree<S>,
    root_state: &S,
    options: &SearchOptions,
    rng: &mut impl Rng,
    out: &mut impl Write,
) -> Result<S::Move>
where
    S: GameState + Send + Sync,
{
    let initial_nodes = tree.len();
    let root = tree.node_for(root_state);
    let mut max_depth = 0;

    for _ in 0..options.iterations {
        let Walk { path, state } = serial::descend(tree, root, options.exploration, rng);
        max_depth = max_depth.max(path.len() - 1);

        let terminals = parallel_rollouts(&state, options.workers());

        #[allow(clippy::cast_precision_loss)]
        for &id in path.iter().rev() {
            let viewpoint = tree.get(id).player_just_moved();
            let mean = terminals
                .iter()
                .map(|terminal| terminal.result(viewpoint))
                .sum::<f64>()
                / terminals.len() as f64;
            tree.update(id, mean);
        }
    }

    let Some((best, best_node)) = tree.select_child(root, 0.0) else {
        bail!("no legal moves to search from:\n{root_state}");
    };

    writeln!(out, "Max search depth: {max_depth}")?;
    writeln!(out, "Nodes generated: {}", tree.len() - initial_nodes)?;
    writeln!(out)?;
    serial::write_children(tree, root, out)?;
    writeln!(out)?;

    let remaining = tree.retain_subtree(best_node);
    writeln!(out, "Nodes remaining: {remaining}")?;
    writeln!(out)?;

    Ok(best)
}

/// Plays `count` independent random rollouts from `state` on worker threads
/// and returns the terminal states, which are later scored per viewpoint.
fn parallel_rollouts<S>(state: &S, count: usize) -> Vec<S>
where
    S: GameState + Send + Sync,
{
    thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|_| {
                let mut rollout_state = state.clone();
                scope.spawn(move || {
                    let mut rng = SmallRng::from_entropy();
                    serial::rollout(&mut rollout_state, &mut rng);
                    rollout_state
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use std::io;

    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::game::NimState;

    #[test]
    fn rollout_batches_score_terminal_states() {
        let terminals = parallel_rollouts(&NimState::new(4), 3);
        assert_eq!(terminals.len(), 3);
        for terminal in &terminals {
            assert!(terminal.moves().is_empty());
        }
    }

    #[test]
    fn finds_the_immediate_win() {
        let mut tree = SearchTree::new();
        let mut rng = SmallRng::seed_from_u64(11);
        let options = SearchOptions {
            iterations: 150,
            parallelism: 2,
            exploration: 1.0,
        };
        let best = search(
            &mut tree,
            &NimState::new(3),
            &options,
            &mut rng,
            &mut io::sink(),
        )
        .unwrap();
        assert_eq!(best, 3);
        // The pool was pruned to the chosen (terminal) child.
        assert_eq!(tree.len(), 1);
    }
}
