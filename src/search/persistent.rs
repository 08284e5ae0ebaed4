//! Carries the search tree across process invocations. The pool is restored
//! from a binary snapshot at startup and written back when the run finishes,
//! so every benchmark run starts with everything earlier runs learned. The
//! pool is never pruned: positions from abandoned branches stay useful to
//! future games.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::game::GameState;
use crate::search::tree::SearchTree;
use crate::search::{serial, SearchOptions};

/// Default snapshot location, relative to the working directory of the run.
pub const SNAPSHOT_FILE: &str = "search_tree.bin";

/// A [`SearchTree`] with a disk snapshot attached.
pub struct PersistentTree<S: GameState> {
    tree: SearchTree<S>,
    path: PathBuf,
}

impl<S> PersistentTree<S>
where
    S: GameState + Serialize + DeserializeOwned,
    S::Move: Serialize + DeserializeOwned,
{
    /// Restores the snapshot at `path`. Starts with a fresh tree when there
    /// is no snapshot yet or the file cannot be decoded (e.g. it was written
    /// for a different game).
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tree = match File::open(&path) {
            Ok(file) => match bincode::deserialize_from(BufReader::new(file)) {
                Ok(tree) => tree,
                Err(error) => {
                    warn!(
                        "discarding undecodable snapshot {}: {error}",
                        path.display()
                    );
                    SearchTree::new()
                }
            },
            Err(_) => SearchTree::new(),
        };
        Self { tree, path }
    }

    /// Writes the snapshot back for the next invocation.
    pub fn save(&self) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("failed to create snapshot {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.tree)?;
        writer.flush()?;
        Ok(())
    }
}

impl<S: GameState> PersistentTree<S> {
    /// Serial search over the carried tree, without pruning.
    pub fn search(
        &mut self,
        root_state: &S,
        options: &SearchOptions,
        rng: &mut impl Rng,
        out: &mut impl Write,
    ) -> Result<S::Move> {
        serial::search(&mut self.tree, root_state, options, rng, out, false)
    }

    /// Number of pooled nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the pool holds no nodes yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
