//! Tree parallelization: all workers hammer one shared tree. The pool index
//! sits behind its own lock and every node carries two small mutexes, one for
//! its win/visit statistics and one for its edges, mirroring where the
//! serial loop reads and writes. Workers therefore see each other's results
//! mid-search, at the cost of lock traffic on the hot nodes near the root.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

use anyhow::{bail, Result};
use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::game::GameState;
use crate::search::tree::NodeId;
use crate::search::{serial, SearchOptions};

#[derive(Clone, Copy)]
struct Stats {
    wins: f64,
    visits: f64,
}

impl Stats {
    fn value(self) -> f64 {
        self.wins / self.visits
    }
}

struct Edges<M> {
    children: HashMap<M, NodeId>,
    untried: Vec<M>,
}

struct SharedNode<S: GameState> {
    state: S,
    stats: Mutex<Stats>,
    edges: Mutex<Edges<S::Move>>,
}

/// The shared equivalent of [`crate::search::tree::SearchTree`]. All methods
/// take `&self`; the locks inside do the serialization.
pub struct ConcurrentTree<S: GameState> {
    nodes: RwLock<Vec<Arc<SharedNode<S>>>>,
    index: Mutex<HashMap<String, NodeId>>,
}

impl<S: GameState> ConcurrentTree<S> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
            index: Mutex::new(HashMap::new()),
        }
    }

    /// Number of nodes in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    /// Whether the pool holds no nodes yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: NodeId) -> Arc<SharedNode<S>> {
        Arc::clone(&self.nodes.read().unwrap()[id.position()])
    }

    /// The node for the given state, interning it under the index lock on
    /// first sight. Lock order is always index before arena.
    fn node_for(&self, state: &S) -> NodeId {
        let key = state.to_string();
        let mut index = self.index.lock().unwrap();
        if let Some(&id) = index.get(&key) {
            return id;
        }
        let mut nodes = self.nodes.write().unwrap();
        let id = NodeId::from_position(nodes.len());
        nodes.push(Arc::new(SharedNode {
            state: state.clone(),
            stats: Mutex::new(Stats {
                wins: 0.0,
                visits: 1.0,
            }),
            edges: Mutex::new(Edges {
                children: HashMap::new(),
                untried: state.moves(),
            }),
        }));
        let _ = index.insert(key, id);
        id
    }

    /// Whether the node still has untried moves, and whether it has no
    /// children. Both read under one edge-lock acquisition, so a concurrent
    /// expansion cannot produce a torn answer.
    fn frontier(&self, id: NodeId) -> (bool, bool) {
        let node = self.node(id);
        let edges = node.edges.lock().unwrap();
        (!edges.untried.is_empty(), edges.children.is_empty())
    }

    fn random_untried(&self, id: NodeId, rng: &mut impl Rng) -> Option<S::Move> {
        let node = self.node(id);
        let edges = node.edges.lock().unwrap();
        edges.untried.choose(rng).copied()
    }

    fn add_child(&self, parent: NodeId, next_move: S::Move, child: NodeId) {
        let node = self.node(parent);
        let mut edges = node.edges.lock().unwrap();
        edges.untried.retain(|&untried| untried != next_move);
        let _ = edges.children.entry(next_move).or_insert(child);
    }

    fn update(&self, id: NodeId, result: f64) {
        let node = self.node(id);
        let mut stats = node.stats.lock().unwrap();
        stats.visits += 1.0;
        stats.wins += result;
    }

    /// Best child by UCB. The parent's visit count and the children list are
    /// read first, then each child's statistics; at most one lock is held at
    /// a time.
    fn select_child(&self, id: NodeId, exploration: f64) -> Option<(S::Move, NodeId)> {
        let node = self.node(id);
        let parent_visits = node.stats.lock().unwrap().visits;
        let children: Vec<(S::Move, NodeId)> = {
            let edges = node.edges.lock().unwrap();
            edges
                .children
                .iter()
                .map(|(&next_move, &child)| (next_move, child))
                .collect()
        };
        children.into_iter().max_by(|&(_, a), &(_, b)| {
            let a = self.ucb_score(a, parent_visits, exploration);
            let b = self.ucb_score(b, parent_visits, exploration);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    fn ucb_score(&self, id: NodeId, parent_visits: f64, exploration: f64) -> f64 {
        let node = self.node(id);
        let stats = *node.stats.lock().unwrap();
        stats.value() + exploration * (2.0 * parent_visits.ln() / stats.visits).sqrt()
    }

    /// Drops everything not reachable from `keep`. Must only run while no
    /// workers are active; takes the arena write lock for its whole duration.
    fn retain_subtree(&self, keep: NodeId) -> usize {
        let mut index = self.index.lock().unwrap();
        let mut nodes = self.nodes.write().unwrap();

        let mut reachable = vec![false; nodes.len()];
        let mut stack = vec![keep];
        while let Some(id) = stack.pop() {
            if reachable[id.position()] {
                continue;
            }
            reachable[id.position()] = true;
            let edges = nodes[id.position()].edges.lock().unwrap();
            stack.extend(edges.children.values().copied());
        }

        let mut remap: Vec<Option<NodeId>> = vec![None; nodes.len()];
        let mut kept: Vec<Arc<SharedNode<S>>> = Vec::new();
        for (position, node) in nodes.drain(..).enumerate() {
            if reachable[position] {
                remap[position] = Some(NodeId::from_position(kept.len()));
                kept.push(node);
            }
        }
        for node in &kept {
            let mut edges = node.edges.lock().unwrap();
            let remapped = edges
                .children
                .iter()
                .filter_map(|(&next_move, &child)| remap[child.position()].map(|id| (next_move, id)))
                .collect();
            edges.children = remapped;
        }
        *index = kept
            .iter()
            .enumerate()
            .map(|(position, node)| (node.state.to_string(), NodeId::from_position(position)))
            .collect();
        *nodes = kept;
        nodes.len()
    }
}

impl<S: GameState> Default for ConcurrentTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// One select/expand/rollout/backpropagate iteration against the shared
/// tree. Same phases as the serial loop, but every tree access goes through
/// the node locks.
fn iterate<S: GameState>(
    tree: &ConcurrentTree<S>,
    root: NodeId,
    exploration: f64,
    rng: &mut impl Rng,
) {
    let mut node = root;
    let mut path = vec![root];
    loop {
        let (has_untried, is_leaf) = tree.frontier(node);
        if has_untried || is_leaf {
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

    let mut state = tree.node(node).state.clone();
    // Two workers can race to expand the same move; `add_child` is
    // idempotent, so both back their rollouts into the same child.
    if let Some(next_move) = tree.random_untried(node, rng) {
        state.apply(next_move);
        let child = tree.node_for(&state);
        tree.add_child(node, next_move, child);
        path.push(child);
    }

    serial::rollout(&mut state, rng);

    for &id in path.iter().rev() {
        let viewpoint = tree.node(id).state.player_just_moved();
        tree.update(id, state.result(viewpoint));
    }
}

/// Searches `root_state` with `options.parallelism` workers sharing the one
/// tree, then picks the best root child, prunes the pool to its subtree and
/// returns the move.
pub fn search<S>(
    tree: &ConcurrentTree<S>,
    root_state: &S,
    options: &SearchOptions,
    out: &mut impl Write,
) -> Result<S::Move>
where
    S: GameState + Send + Sync,
    S::Move: Send + Sync,
{
    let initial_nodes = tree.len();
    let root = tree.node_for(root_state);
    let per_worker = options.per_worker();

    thread::scope(|scope| {
        for _ in 0..options.workers() {
            let _ = scope.spawn(|| {
                let mut rng = SmallRng::from_entropy();
                for _ in 0..per_worker {
                    iterate(tree, root, options.exploration, &mut rng);
                }
            });
        }
    });

    let Some((best, best_node)) = tree.select_child(root, 0.0) else {
        bail!("no legal moves to search from:\n{root_state}");
    };

    writeln!(out, "Nodes generated: {}", tree.len() - initial_nodes)?;
    writeln!(out)?;
    {
        let node = tree.node(root);
        let children: Vec<(S::Move, NodeId)> = {
            let edges = node.edges.lock().unwrap();
            edges
                .children
                .iter()
                .map(|(&next_move, &child)| (next_move, child))
                .collect()
        };
        for (next_move, child) in children
            .into_iter()
            .sorted_by_key(|(next_move, _)| next_move.to_string())
        {
            let stats = *tree.node(child).stats.lock().unwrap();
            writeln!(
                out,
                "[M:{next_move} W/V:{:.1}/{:.1} ({:.3})]",
                stats.wins,
                stats.visits,
                stats.value()
            )?;
        }
    }
    writeln!(out)?;

    let remaining = tree.retain_subtree(best_node);
    writeln!(out, "Nodes remaining: {remaining}")?;
    writeln!(out)?;

    Ok(best)
}

#[cfg(test)]
mod tests {
    use std::io;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::game::NimState;

    #[test]
    fn interning_is_shared_between_workers() {
        let tree: ConcurrentTree<NimState> = ConcurrentTree::new();
        let state = NimState::new(10);
        let a = tree.node_for(&state);
        let b = tree.node_for(&state);
        assert_eq!(a, b);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn finds_the_immediate_win_with_contending_workers() {
        let tree = ConcurrentTree::new();
        let options = SearchOptions {
            iterations: 400,
            parallelism: 4,
            exploration: 1.0,
        };
        // The winning child accumulates value 1.0 from every rollout that
        // reaches it, regardless of scheduling, so the pick is stable.
        let best = search(&tree, &NimState::new(3), &options, &mut io::sink()).unwrap();
        assert_eq!(best, 3);
    }

    #[test]
    fn pruning_survives_a_searched_tree() {
        let tree = ConcurrentTree::new();
        let options = SearchOptions {
            iterations: 100,
            parallelism: 2,
            exploration: 1.0,
        };
        let mut log = Vec::new();
        let _best = search(&tree, &NimState::new(6), &options, &mut log).unwrap();
        let log = String::from_utf8(log).unwrap();
        assert!(log.contains("Nodes generated: "));
        assert!(log.contains("Nodes remaining: "));
        assert!(tree.len() >= 1);
    }
}
