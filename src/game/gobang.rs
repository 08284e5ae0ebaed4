//! Gobang (five-in-a-row): players alternately place stones on a square board
//! and the first to align `in_row` stones horizontally, vertically or
//! diagonally wins. A full board without such a row is a draw.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::{square_at, GameState, Grid, Player, Square};

/// Axes to check for a completed row. Each is counted in both directions from
/// the placed stone.
const AXES: [(i16, i16); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

/// A state of the game of Gobang.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GobangState {
    grid: Grid,
    just_moved: Player,
    in_row: u8,
    terminated: bool,
}

impl GobangState {
    /// Starts a game on an empty `size` x `size` board where `in_row` aligned
    /// stones win.
    ///
    /// # Panics
    ///
    /// Panics if `size` is outside of `1..=16` or `in_row` is zero.
    #[must_use]
    pub fn new(size: u8, in_row: u8) -> Self {
        assert!((1..=16).contains(&size), "board size must be in 1..=16, got {size}");
        assert!(in_row > 0, "winning row length must be positive");
        Self {
            grid: Grid::new(size),
            just_moved: Player::Two,
            in_row,
            terminated: false,
        }
    }

    /// Whether the game ended with the stone placed at `last`.
    fn completes_row(&self, last: Square) -> bool {
        debug_assert_eq!(self.grid.at(last), Some(self.just_moved));
        AXES.iter().any(|&(dx, dy)| {
            self.stones_towards(last, dx, dy) + self.stones_towards(last, -dx, -dy) + 1
                >= u32::from(self.in_row)
        })
    }

    fn stones_towards(&self, from: Square, dx: i16, dy: i16) -> u32 {
        let mut stones = 0;
        let (mut x, mut y) = (i16::from(from.x) + dx, i16::from(from.y) + dy);
        while self.grid.contains(x, y) && self.grid.at(square_at(x, y)) == Some(self.just_moved) {
            stones += 1;
            x += dx;
            y += dy;
        }
        stones
    }
}

impl GameState for GobangState {
    type Move = Square;

    fn player_just_moved(&self) -> Player {
        self.just_moved
    }

    fn moves(&self) -> Vec<Square> {
        if self.terminated {
            return Vec::new();
        }
        self.grid
            .squares()
            .filter(|&square| self.grid.at(square).is_none())
            .collect()
    }

    fn apply(&mut self, next_move: Square) {
        debug_assert!(!self.terminated, "the game is already over");
        debug_assert!(self.grid.at(next_move).is_none(), "square is occupied");
        self.just_moved = !self.just_moved;
        self.grid.set(next_move, self.just_moved);
        self.terminated = self.completes_row(next_move);
    }

    fn result(&self, viewpoint: Player) -> f64 {
        if !self.terminated {
            // The board filled up without a completed row.
            return 0.5;
        }
        if self.just_moved == viewpoint {
            1.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for GobangState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "JustPlayed:{}", self.just_moved)?;
        write!(f, "{}", self.grid)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn place(state: &mut GobangState, x: u8, y: u8) {
        state.apply(Square { x, y });
    }

    #[test]
    fn row_completion_ends_the_game() {
        let mut state = GobangState::new(5, 3);
        place(&mut state, 0, 0); // One
        place(&mut state, 4, 4); // Two
        place(&mut state, 0, 1); // One
        place(&mut state, 4, 3); // Two
        assert!(!state.moves().is_empty());
        place(&mut state, 0, 2); // One completes a horizontal row of three.
        assert!(state.moves().is_empty());
        assert_eq!(state.result(Player::One), 1.0);
        assert_eq!(state.result(Player::Two), 0.0);
    }

    #[test]
    fn row_counted_in_both_directions() {
        let mut state = GobangState::new(5, 3);
        place(&mut state, 2, 1); // One
        place(&mut state, 0, 0); // Two
        place(&mut state, 2, 3); // One
        place(&mut state, 0, 1); // Two
        // The middle stone extends the run on both sides at once.
        place(&mut state, 2, 2); // One
        assert!(state.moves().is_empty());
        assert_eq!(state.result(Player::One), 1.0);
    }

    #[test]
    fn full_board_without_a_row_is_a_draw() {
        let mut state = GobangState::new(1, 2);
        place(&mut state, 0, 0);
        assert!(state.moves().is_empty());
        assert_eq!(state.result(Player::One), 0.5);
        assert_eq!(state.result(Player::Two), 0.5);
    }
}
