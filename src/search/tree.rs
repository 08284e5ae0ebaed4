//! Storage for the UCT search tree. Nodes live in an arena and are addressed
//! by [`NodeId`]; a transposition index keyed by the state's rendering maps
//! every position to at most one node, so lines of play that converge on the
//! same position share statistics. Because of that sharing a node does not
//! know its parent: each search iteration remembers the path it walked and
//! backpropagates along it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::{GameState, Player};

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_position(position: usize) -> Self {
        Self(position as u32)
    }

    pub(crate) const fn position(self) -> usize {
        self.0 as usize
    }
}

/// One node of the search tree. `wins` is always from the viewpoint of the
/// player who just moved into this node's state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, S::Move: Serialize",
    deserialize = "S: Deserialize<'de>, S::Move: Deserialize<'de>"
))]
pub struct TreeNode<S: GameState> {
    wins: f64,
    // Visits start at 1 so a fresh node has a defined mean value and a
    // nonzero UCB denominator.
    visits: f64,
    state: S,
    children: HashMap<S::Move, NodeId>,
    untried: Vec<S::Move>,
}

impl<S: GameState> TreeNode<S> {
    fn new(state: &S) -> Self {
        Self {
            wins: 0.0,
            visits: 1.0,
            state: state.clone(),
            children: HashMap::new(),
            untried: state.moves(),
        }
    }

    /// The game state this node stands for.
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// The viewpoint `wins` is counted for.
    pub fn player_just_moved(&self) -> Player {
        self.state.player_just_moved()
    }

    /// Mean result of all simulations through this node.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.wins / self.visits
    }

    /// Accumulated wins, for reporting.
    #[must_use]
    pub const fn wins(&self) -> f64 {
        self.wins
    }

    /// Visit count (including the initial smoothing visit), for reporting.
    #[must_use]
    pub const fn visits(&self) -> f64 {
        self.visits
    }

    /// Moves not yet expanded into children.
    #[must_use]
    pub fn untried(&self) -> &[S::Move] {
        &self.untried
    }

    /// Expanded children by the move leading to them.
    pub const fn children(&self) -> &HashMap<S::Move, NodeId> {
        &self.children
    }
}

/// The arena plus the transposition index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize, S::Move: Serialize",
    deserialize = "S: Deserialize<'de>, S::Move: Deserialize<'de>"
))]
pub struct SearchTree<S: GameState> {
    nodes: Vec<TreeNode<S>>,
    index: HashMap<String, NodeId>,
}

impl<S: GameState> SearchTree<S> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of nodes in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the pool holds no nodes yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node for the given state, creating it on first sight. Two states
    /// that render identically share a node.
    pub fn node_for(&mut self, state: &S) -> NodeId {
        let key = state.to_string();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = NodeId::from_position(self.nodes.len());
        self.nodes.push(TreeNode::new(state));
        let _ = self.index.insert(key, id);
        id
    }

    /// Borrows a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &TreeNode<S> {
        &self.nodes[id.position()]
    }

    /// Records `child` as the successor of `parent` via `next_move` and
    /// retires the move from the untried list. Idempotent, because two
    /// traversals can race to expand the same move on a reused tree.
    pub fn add_child(&mut self, parent: NodeId, next_move: S::Move, child: NodeId) {
        let node = &mut self.nodes[parent.position()];
        node.untried.retain(|&untried| untried != next_move);
        let _ = node.children.entry(next_move).or_insert(child);
    }

    /// Adds one visit with the given result to a node.
    pub fn update(&mut self, id: NodeId, result: f64) {
        let node = &mut self.nodes[id.position()];
        node.visits += 1.0;
        node.wins += result;
    }

    /// UCB1 score of a child from its parent's standpoint.
    #[must_use]
    pub fn ucb_score(&self, parent: NodeId, child: NodeId, exploration: f64) -> f64 {
        let parent_visits = self.get(parent).visits;
        let child = self.get(child);
        child.value() + exploration * (2.0 * parent_visits.ln() / child.visits).sqrt()
    }

    /// The child of `id` with the highest UCB score, or `None` for a leaf.
    /// With `exploration` 0 this degenerates to the highest mean value, which
    /// is how the final move is picked.
    #[must_use]
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<(S::Move, NodeId)> {
        self.get(id)
            .children
            .iter()
            .map(|(&next_move, &child)| (next_move, child))
            .max_by(|&(_, a), &(_, b)| {
                let a = self.ucb_score(id, a, exploration);
                let b = self.ucb_score(id, b, exploration);
                a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Drops every node that is not reachable from `keep` and returns the
    /// number of surviving nodes. Run between moves to stop the pool from
    /// growing with positions the game has moved past.
    pub fn retain_subtree(&mut self, keep: NodeId) -> usize {
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack = vec![keep];
        while let Some(id) = stack.pop() {
            if reachable[id.position()] {
                continue;
            }
            reachable[id.position()] = true;
            stack.extend(self.get(id).children.values().copied());
        }

        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut kept: Vec<TreeNode<S>> = Vec::new();
        for (position, node) in self.nodes.drain(..).enumerate() {
            if reachable[position] {
                remap[position] = Some(NodeId::from_position(kept.len()));
                kept.push(node);
            }
        }
        for node in &mut kept {
            // Children of a reachable node are reachable, so the remap lookup
            // always succeeds.
            let remapped = node
                .children
                .iter()
                .filter_map(|(&next_move, &child)| remap[child.position()].map(|id| (next_move, id)))
                .collect();
            node.children = remapped;
        }
        self.index = kept
            .iter()
            .enumerate()
            .map(|(position, node)| (node.state.to_string(), NodeId::from_position(position)))
            .collect();
        self.nodes = kept;
        self.nodes.len()
    }
}

impl<S: GameState> Default for SearchTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::game::NimState;

    #[test]
    fn transpositions_share_a_node() {
        let mut tree = SearchTree::new();
        let a = tree.node_for(&NimState::new(10));
        let b = tree.node_for(&NimState::new(10));
        assert_eq!(a, b);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn expanding_retires_the_untried_move() {
        let mut tree = SearchTree::new();
        let root_state = NimState::new(10);
        let root = tree.node_for(&root_state);
        assert_eq!(tree.get(root).untried(), &[1, 2, 3]);

        let mut next = root_state.clone();
        next.apply(2);
        let child = tree.node_for(&next);
        tree.add_child(root, 2, child);

        assert_eq!(tree.get(root).untried(), &[1, 3]);
        assert_eq!(tree.get(root).children().get(&2), Some(&child));

        // A second expansion of the same move is a no-op.
        tree.add_child(root, 2, child);
        assert_eq!(tree.get(root).children().len(), 1);
    }

    #[test]
    fn update_accumulates_into_the_mean() {
        let mut tree = SearchTree::new();
        let id = tree.node_for(&NimState::new(4));
        tree.update(id, 1.0);
        tree.update(id, 0.0);
        tree.update(id, 1.0);
        // 2 wins over 4 visits (3 updates plus the smoothing visit).
        assert_eq!(tree.get(id).visits(), 4.0);
        assert_eq!(tree.get(id).value(), 0.5);
    }

    #[test]
    fn retain_subtree_drops_the_abandoned_branches() {
        let mut tree = SearchTree::new();
        let root_state = NimState::new(10);
        let root = tree.node_for(&root_state);
        let mut children = Vec::new();
        for next_move in root_state.moves() {
            let mut next = root_state.clone();
            next.apply(next_move);
            let child = tree.node_for(&next);
            tree.add_child(root, next_move, child);
            children.push((child, next));
        }
        assert_eq!(tree.len(), 4);

        let (kept, kept_state) = children[1].clone();
        assert_eq!(tree.retain_subtree(kept), 1);
        assert_eq!(tree.len(), 1);
        // The index is remapped: looking the state up again finds the
        // surviving node instead of allocating a fresh one.
        let relocated = tree.node_for(&kept_state);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(relocated).state().to_string(), kept_state.to_string());
    }

    #[test]
    fn select_child_prefers_the_better_mean_without_exploration() {
        let mut tree = SearchTree::new();
        let root_state = NimState::new(10);
        let root = tree.node_for(&root_state);
        for next_move in [1u8, 2] {
            let mut next = root_state.clone();
            next.apply(next_move);
            let child = tree.node_for(&next);
            tree.add_child(root, next_move, child);
            tree.update(root, 1.0);
            let result = if next_move == 2 { 1.0 } else { 0.0 };
            tree.update(child, result);
        }
        let (best, _) = tree.select_child(root, 0.0).expect("root has children");
        assert_eq!(best, 2);
    }
}
