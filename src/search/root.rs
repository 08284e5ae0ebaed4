//! Root parallelization: every worker searches its own private tree from the
//! same root and the per-move statistics are merged afterwards. Workers never
//! share memory, so this is the embarrassingly parallel strategy; the price
//! is that no worker benefits from what the others learned.

use std::collections::HashMap;
use std::io::{self, Write};
use std::thread;

use anyhow::{anyhow, Result};
use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::game::GameState;
use crate::search::tree::SearchTree;
use crate::search::{serial, SearchOptions};

/// Mean value per root move, as reported by one worker.
type MoveValues<M> = HashMap<M, f64>;

/// Searches `root_state` with `options.parallelism` independent workers, each
/// spending `iterations / parallelism` of the budget, and returns the move
/// with the highest summed mean value.
pub fn search<S>(root_state: &S, options: &SearchOptions, out: &mut impl Write) -> Result<S::Move>
where
    S: GameState + Sync,
    S::Move: Send,
{
    let workers = options.workers();
    let worker_options = SearchOptions {
        iterations: options.per_worker(),
        parallelism: 1,
        ..*options
    };

    let results: Vec<(MoveValues<S::Move>, usize)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut tree = SearchTree::new();
                    let mut rng = SmallRng::from_entropy();
                    // The worker's own best-move pick is irrelevant, only the
                    // accumulated root statistics are. A worker that finds no
                    // moves reports an empty map and the merge notices.
                    let _ = serial::search(
                        &mut tree,
                        root_state,
                        &worker_options,
                        &mut rng,
                        &mut io::sink(),
                        false,
                    );
                    let root = tree.node_for(root_state);
                    let values: MoveValues<S::Move> = tree
                        .get(root)
                        .children()
                        .iter()
                        .map(|(&next_move, &child)| (next_move, tree.get(child).value()))
                        .collect();
                    (values, tree.len())
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
    });

    let mut merged: MoveValues<S::Move> = HashMap::new();
    let mut generated = 0;
    for (values, nodes) in results {
        generated += nodes;
        for (next_move, value) in values {
            *merged.entry(next_move).or_insert(0.0) += value;
        }
    }

    writeln!(out, "Nodes generated: {generated}")?;
    writeln!(out)?;
    #[allow(clippy::cast_precision_loss)]
    for (next_move, value) in merged
        .iter()
        .sorted_by_key(|(next_move, _)| next_move.to_string())
    {
        writeln!(out, "{next_move}: {:.3}", value / workers as f64)?;
    }
    writeln!(out)?;

    merged
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(next_move, _)| next_move)
        .ok_or_else(|| anyhow!("no legal moves to search from:\n{root_state}"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::game::NimState;

    #[test]
    fn workers_agree_on_the_immediate_win() {
        let options = SearchOptions {
            iterations: 400,
            parallelism: 2,
            exploration: 1.0,
        };
        let mut log = Vec::new();
        // Taking all three chips always scores 1.0 in every worker, so the
        // merged pick is stable no matter how the rollouts went.
        let best = search(&NimState::new(3), &options, &mut log).unwrap();
        assert_eq!(best, 3);

        let log = String::from_utf8(log).unwrap();
        assert!(log.contains("Nodes generated: "));
    }

    #[test]
    fn terminal_root_is_an_error() {
        let options = SearchOptions::with_iterations(10);
        assert!(search(&NimState::new(0), &options, &mut Vec::new()).is_err());
    }
}
