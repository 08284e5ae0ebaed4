//! Plays one full game with both sides driven by the same search strategy.
//! This is what the benchmark targets actually execute: the whole trace,
//! including the per-move search statistics, is written to the target's log
//! file and later scraped by the statistics extractor.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::game::{GameState, GobangState, NimState, OthelloState};
use crate::search::parallel_tree::{self, ConcurrentTree};
use crate::search::persistent::{PersistentTree, SNAPSHOT_FILE};
use crate::search::tree::SearchTree;
use crate::search::{leaf, root, serial, SearchOptions, Strategy};

/// The available game environments with their traditional setups: a heap of
/// 15 chips for Nim, an 8x8 board for Othello, and an 8x8 board with five in
/// a row for Gobang.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Game {
    Nim,
    Othello,
    Gobang,
}

impl Game {
    /// The identifier used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nim => "nim",
            Self::Othello => "othello",
            Self::Gobang => "gobang",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "nim" => Ok(Self::Nim),
            "othello" => Ok(Self::Othello),
            "gobang" => Ok(Self::Gobang),
            _ => bail!("unknown game '{name}', expected nim, othello or gobang"),
        }
    }
}

/// Per-game searcher state. The strategies differ in what survives between
/// moves: nothing, a shared in-memory tree, or a tree snapshotted to disk.
enum Searcher<S: GameState> {
    Plain,
    RootParallel,
    TreeParallel(ConcurrentTree<S>),
    LeafParallel(SearchTree<S>),
    Persistent(PersistentTree<S>),
}

impl<S> Searcher<S>
where
    S: GameState + Send + Sync + Serialize + DeserializeOwned,
    S::Move: Send + Sync + Serialize + DeserializeOwned,
{
    fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Plain => Self::Plain,
            Strategy::RootParallel => Self::RootParallel,
            Strategy::TreeParallel => Self::TreeParallel(ConcurrentTree::new()),
            Strategy::LeafParallel => Self::LeafParallel(SearchTree::new()),
            Strategy::Persistent => Self::Persistent(PersistentTree::load(SNAPSHOT_FILE)),
        }
    }

    fn best_move(
        &mut self,
        state: &S,
        options: &SearchOptions,
        rng: &mut SmallRng,
        out: &mut impl Write,
    ) -> Result<S::Move> {
        match self {
            Self::Plain => {
                // A throwaway tree per move; nothing to prune.
                let mut tree = SearchTree::new();
                serial::search(&mut tree, state, options, rng, out, false)
            }
            Self::RootParallel => root::search(state, options, out),
            Self::TreeParallel(tree) => parallel_tree::search(tree, state, options, out),
            Self::LeafParallel(tree) => leaf::search(tree, state, options, rng, out),
            Self::Persistent(tree) => tree.search(state, options, rng, out),
        }
    }

    /// Flushes whatever outlives the game.
    fn finish(&self) -> Result<()> {
        if let Self::Persistent(tree) = self {
            tree.save()?;
        }
        Ok(())
    }
}

/// Plays a single game to the end with the given strategy steering both
/// players, writing the run header and the whole game trace to `out`.
pub fn play(
    game: Game,
    strategy: Strategy,
    options: &SearchOptions,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "Max iterations: {}", options.iterations)?;
    writeln!(out, "Parallel count: {}", options.parallelism)?;
    writeln!(out)?;
    match game {
        Game::Nim => play_game(NimState::new(15), strategy, options, out),
        Game::Othello => play_game(OthelloState::new(8), strategy, options, out),
        Game::Gobang => play_game(GobangState::new(8, 5), strategy, options, out),
    }
}

fn play_game<S>(
    mut state: S,
    strategy: Strategy,
    options: &SearchOptions,
    out: &mut impl Write,
) -> Result<()>
where
    S: GameState + Send + Sync + Serialize + DeserializeOwned,
    S::Move: Send + Sync + Serialize + DeserializeOwned,
{
    let mut searcher = Searcher::new(strategy);
    let mut rng = SmallRng::from_entropy();

    while !state.moves().is_empty() {
        writeln!(out, "{state}")?;
        writeln!(out)?;
        let next_move = searcher.best_move(&state, options, &mut rng, out)?;
        writeln!(out, ">> Best move: {next_move}")?;
        writeln!(out)?;
        state.apply(next_move);
    }
    searcher.finish()?;

    writeln!(out, "Game finished!")?;
    writeln!(out)?;
    writeln!(out, "{state}")?;
    let result = state.result(state.player_just_moved());
    if result > 0.75 {
        writeln!(out, "Player {} wins!", state.player_just_moved())?;
    } else if result < 0.25 {
        writeln!(out, "Player {} wins!", !state.player_just_moved())?;
    } else {
        writeln!(out, "Nobody wins!")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_names_round_trip() {
        for game in [Game::Nim, Game::Othello, Game::Gobang] {
            assert_eq!(game.name().parse::<Game>().unwrap(), game);
        }
        assert!("checkers".parse::<Game>().is_err());
    }

    #[test]
    fn plain_nim_game_runs_to_the_end() {
        let options = SearchOptions {
            iterations: 30,
            parallelism: 1,
            exploration: 1.0,
        };
        let mut trace = Vec::new();
        play(Game::Nim, Strategy::Plain, &options, &mut trace).unwrap();
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.starts_with("Max iterations: 30\n"));
        assert!(trace.contains(">> Best move: "));
        assert!(trace.contains("Max search depth: "));
        assert!(trace.contains("Game finished!"));
        assert!(trace.contains("wins!"));
    }

    #[test]
    fn leaf_parallel_gobang_game_reuses_its_tree() {
        let options = SearchOptions {
            iterations: 10,
            parallelism: 2,
            exploration: 1.0,
        };
        let mut trace = Vec::new();
        // A tiny board keeps the game short; the trace must show the pool
        // being pruned between moves.
        play_game(
            crate::game::GobangState::new(3, 3),
            Strategy::LeafParallel,
            &options,
            &mut trace,
        )
        .unwrap();
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.contains("Nodes remaining: "));
        assert!(trace.contains("Game finished!"));
    }
}
