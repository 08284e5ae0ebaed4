//! Game environments the search strategies are benchmarked on. All of them are
//! 2-player, zero-sum, perfect information games with results in `[0.0, 1.0]`
//! (1 is a win, 0 a loss, 0.5 a draw). The rules implementations favor clarity
//! over speed: the benchmark compares search strategies against each other, so
//! all of them pay the same per-move cost.

use std::fmt;
use std::hash::Hash;
use std::ops::Not;

use serde::{Deserialize, Serialize};

pub mod gobang;
pub mod nim;
pub mod othello;

pub use gobang::GobangState;
pub use nim::NimState;
pub use othello::OthelloState;

/// The two players. `One` has the advantage of the first turn.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Not for Player {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::One => '1',
                Self::Two => '2',
            }
        )
    }
}

/// A state of a game. These are the only operations the search needs: it never
/// looks inside a state, it only clones, advances and scores them.
///
/// The `Display` form must uniquely encode the state (board contents plus the
/// player who just moved) because it doubles as the transposition-pool key in
/// [`crate::search::tree::SearchTree`].
///
/// By convention the root of a search pretends [`Player::Two`] just moved, so
/// [`Player::One`] has the first move.
pub trait GameState: Clone + fmt::Display {
    /// A move of the game. Cheap to copy and printable for the game trace.
    type Move: Copy + Eq + Hash + fmt::Debug + fmt::Display;

    /// The player who made the move leading to this state.
    fn player_just_moved(&self) -> Player;

    /// All moves available to the player about to move. Empty iff the state
    /// is terminal.
    fn moves(&self) -> Vec<Self::Move>;

    /// Advances the state by carrying out the given move. Must flip
    /// [`Self::player_just_moved`]. Applying a move that is not in
    /// [`Self::moves`] is a caller bug.
    fn apply(&mut self, next_move: Self::Move);

    /// The result of a finished (or, for games that can score midway, the
    /// current) game from the given player's viewpoint.
    fn result(&self, viewpoint: Player) -> f64;
}

/// A coordinate on a square board.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: u8,
    pub y: u8,
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Narrows signed walk coordinates back to a square. Callers check
/// [`Grid::contains`] first.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) const fn square_at(x: i16, y: i16) -> Square {
    Square {
        x: x as u8,
        y: y as u8,
    }
}

/// A square board where each cell is empty or owned by one player. Shared by
/// the board games; Nim has no board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: u8,
    cells: Vec<Option<Player>>,
}

impl Grid {
    pub(crate) fn new(size: u8) -> Self {
        Self {
            size,
            cells: vec![None; usize::from(size) * usize::from(size)],
        }
    }

    pub(crate) const fn size(&self) -> u8 {
        self.size
    }

    /// Whether signed coordinates fall on the board. Signed so that direction
    /// walks can step off the edge and notice.
    pub(crate) fn contains(&self, x: i16, y: i16) -> bool {
        x >= 0 && x < i16::from(self.size) && y >= 0 && y < i16::from(self.size)
    }

    pub(crate) fn at(&self, square: Square) -> Option<Player> {
        self.cells[usize::from(square.x) * usize::from(self.size) + usize::from(square.y)]
    }

    pub(crate) fn set(&mut self, square: Square, player: Player) {
        self.cells[usize::from(square.x) * usize::from(self.size) + usize::from(square.y)] =
            Some(player);
    }

    /// All squares in row-major order.
    pub(crate) fn squares(&self) -> impl Iterator<Item = Square> + '_ {
        (0..self.size).flat_map(move |x| (0..self.size).map(move |y| Square { x, y }))
    }

    pub(crate) fn count(&self, player: Player) -> usize {
        self.cells.iter().filter(|&&cell| cell == Some(player)).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in 0..self.size {
            for y in 0..self.size {
                let glyph = match self.at(Square { x, y }) {
                    None => '.',
                    Some(Player::One) => 'X',
                    Some(Player::Two) => 'O',
                };
                write!(f, "{glyph} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn player_negation() {
        assert_eq!(!Player::One, Player::Two);
        assert_eq!(!Player::Two, Player::One);
    }

    #[test]
    fn grid_rendering() {
        let mut grid = Grid::new(2);
        grid.set(Square { x: 0, y: 1 }, Player::One);
        grid.set(Square { x: 1, y: 0 }, Player::Two);
        assert_eq!(grid.to_string(), ". X \nO . \n");
    }

    #[test]
    fn grid_counts() {
        let mut grid = Grid::new(3);
        assert_eq!(grid.count(Player::One), 0);
        grid.set(Square { x: 1, y: 1 }, Player::One);
        grid.set(Square { x: 2, y: 2 }, Player::One);
        grid.set(Square { x: 0, y: 0 }, Player::Two);
        assert_eq!(grid.count(Player::One), 2);
        assert_eq!(grid.count(Player::Two), 1);
    }
}
