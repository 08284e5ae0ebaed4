//! The plain serial UCT loop: select by UCB1, expand one random untried move,
//! roll the game out to the end with random moves and backpropagate the
//! result along the walked path. The parallel strategies reuse these phases
//! and change only how work is spread over threads.

use std::io::Write;

use anyhow::{bail, Result};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::GameState;
use crate::search::tree::{NodeId, SearchTree};
use crate::search::SearchOptions;

/// Result of one walk from the root: the visited path (root first, expanded
/// node last) and the game state at the end of the walk.
pub(crate) struct Walk<S> {
    pub(crate) path: Vec<NodeId>,
    pub(crate) state: S,
}

/// Selection and expansion, shared by the serial and leaf-parallel
/// strategies.
pub(crate) fn descend<S: GameState>(
    tree: &mut SearchTree<S>,
    root: NodeId,
    exploration: f64,
    rng: &mut impl Rng,
) -> Walk<S> {
    let mut node = root;
    let mut path = vec![root];

    // Select: descend through fully expanded interior nodes by UCB.
    loop {
        let current = tree.get(node);
        if !current.untried().is_empty() || current.children().is_empty() {
            break;
        }
        match tree.select_child(node, exploration) {
            Some((_, child)) => {
                node = child;
                path.push(child);
            }
            None => break,
        }
    }

    let mut state = tree.get(node).state().clone();

    // Expand: play one random untried move and intern the resulting state.
    let untried_move = tree.get(node).untried().choose(rng).copied();
    if let Some(next_move) = untried_move {
        state.apply(next_move);
        let child = tree.node_for(&state);
        tree.add_child(node, next_move, child);
        path.push(child);
    }

    Walk { path, state }
}

/// Plays uniformly random moves until the game ends.
pub(crate) fn rollout<S: GameState>(state: &mut S, rng: &mut impl Rng) {
    loop {
        let moves = state.moves();
        match moves.choose(rng) {
            Some(&next_move) => state.apply(next_move),
            None => break,
        }
    }
}

/// Scores the terminal state once per path node, each from that node's own
/// just-moved viewpoint.
pub(crate) fn backpropagate<S: GameState>(
    tree: &mut SearchTree<S>,
    path: &[NodeId],
    terminal: &S,
) {
    for &id in path.iter().rev() {
        let viewpoint = tree.get(id).player_just_moved();
        tree.update(id, terminal.result(viewpoint));
    }
}

/// Writes the root's per-child statistics, sorted by move for a stable log.
pub(crate) fn write_children<S: GameState>(
    tree: &SearchTree<S>,
    root: NodeId,
    out: &mut impl Write,
) -> Result<()> {
    for (next_move, &child) in tree
        .get(root)
        .children()
        .iter()
        .sorted_by_key(|(next_move, _)| next_move.to_string())
    {
        let child = tree.get(child);
        writeln!(
            out,
            "[M:{next_move} W/V:{:.1}/{:.1} ({:.3})]",
            child.wins(),
            child.visits(),
            child.value()
        )?;
    }
    Ok(())
}

/// Runs `options.iterations` UCT iterations from `root_state` on the given
/// tree and returns the best move found (highest mean value at the root).
/// Progress statistics are written to `out`, which is where the benchmark
/// logs get their `Max search depth` samples from. With `prune` the pool is
/// cut down to the chosen child's subtree afterwards; that only pays off when
/// the same tree serves the whole game.
pub fn search<S: GameState>(
    tree: &mut SearchTree<S>,
    root_state: &S,
    options: &SearchOptions,
    rng: &mut impl Rng,
    out: &mut impl Write,
    prune: bool,
) -> Result<S::Move> {
    let initial_nodes = tree.len();
    let root = tree.node_for(root_state);
    let mut max_depth = 0;

    for _ in 0..options.iterations {
        let Walk { path, mut state } = descend(tree, root, options.exploration, rng);
        max_depth = max_depth.max(path.len() - 1);
        rollout(&mut state, rng);
        backpropagate(tree, &path, &state);
    }

    let Some((best, best_node)) = tree.select_child(root, 0.0) else {
        bail!("no legal moves to search from:\n{root_state}");
    };

    writeln!(out, "Max search depth: {max_depth}")?;
    writeln!(out, "Nodes generated: {}", tree.len() - initial_nodes)?;
    writeln!(out)?;
    write_children(tree, root, out)?;
    writeln!(out)?;

    if prune {
        let remaining = tree.retain_subtree(best_node);
        writeln!(out, "Nodes remaining: {remaining}")?;
        writeln!(out)?;
    }

    Ok(best)
}
