//! Othello on a variable-sized square board. Each move has to sandwich at
//! least one run of opponent pieces between the placed piece and an own piece
//! already on the board; sandwiched pieces are flipped. The rules are modified
//! in one way: there is no pass move, the game ends as soon as the player
//! about to move has no legal move. The result is decided by piece count.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::game::{square_at, GameState, Grid, Player, Square};

/// The largest supported board edge. Keeps direction scans within a bounded
/// scratch buffer.
pub const MAX_SIZE: u8 = 16;

const DIRECTIONS: [(i16, i16); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// A state of the game of Othello.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OthelloState {
    grid: Grid,
    just_moved: Player,
}

impl OthelloState {
    /// Sets up the four center pieces of a fresh game.
    ///
    /// # Panics
    ///
    /// Panics if `size` is odd or outside of `4..=MAX_SIZE`.
    #[must_use]
    pub fn new(size: u8) -> Self {
        assert!(size % 2 == 0, "board size must be even, got {size}");
        assert!(
            (4..=MAX_SIZE).contains(&size),
            "board size must be in 4..={MAX_SIZE}, got {size}"
        );
        let mut grid = Grid::new(size);
        let mid = size / 2;
        grid.set(Square { x: mid, y: mid }, Player::One);
        grid.set(Square { x: mid - 1, y: mid - 1 }, Player::One);
        grid.set(Square { x: mid, y: mid - 1 }, Player::Two);
        grid.set(Square { x: mid - 1, y: mid }, Player::Two);
        Self {
            grid,
            just_moved: Player::Two,
        }
    }

    /// Directions in which the square borders a piece of the player who just
    /// moved, i.e. the opponent of the player about to move. Only those can
    /// start a sandwich, which prunes the per-square scan.
    fn enemy_directions(&self, square: Square) -> ArrayVec<(i16, i16), 8> {
        DIRECTIONS
            .iter()
            .copied()
            .filter(|&(dx, dy)| {
                let (x, y) = (i16::from(square.x) + dx, i16::from(square.y) + dy);
                self.grid.contains(x, y)
                    && self.grid.at(square_at(x, y)) == Some(self.just_moved)
            })
            .collect()
    }

    /// The run of opponent pieces sandwiched between `square` and an own piece
    /// in one direction, or empty if the run is unterminated.
    fn sandwiched(&self, square: Square, dx: i16, dy: i16) -> ArrayVec<Square, { MAX_SIZE as usize }> {
        let mut run = ArrayVec::new();
        let (mut x, mut y) = (i16::from(square.x) + dx, i16::from(square.y) + dy);
        while self.grid.contains(x, y) && self.grid.at(square_at(x, y)) == Some(self.just_moved) {
            run.push(square_at(x, y));
            x += dx;
            y += dy;
        }
        if self.grid.contains(x, y) && self.grid.at(square_at(x, y)) == Some(!self.just_moved) {
            run
        } else {
            ArrayVec::new()
        }
    }

    fn flips_anything(&self, square: Square) -> bool {
        self.enemy_directions(square)
            .iter()
            .any(|&(dx, dy)| !self.sandwiched(square, dx, dy).is_empty())
    }

    fn all_sandwiched(&self, square: Square) -> Vec<Square> {
        self.enemy_directions(square)
            .iter()
            .flat_map(|&(dx, dy)| self.sandwiched(square, dx, dy))
            .collect()
    }
}

impl GameState for OthelloState {
    type Move = Square;

    fn player_just_moved(&self) -> Player {
        self.just_moved
    }

    fn moves(&self) -> Vec<Square> {
        self.grid
            .squares()
            .filter(|&square| self.grid.at(square).is_none() && self.flips_anything(square))
            .collect()
    }

    fn apply(&mut self, next_move: Square) {
        debug_assert!(self.grid.at(next_move).is_none(), "square is occupied");
        let flipped = self.all_sandwiched(next_move);
        debug_assert!(!flipped.is_empty(), "move flips nothing");
        self.just_moved = !self.just_moved;
        self.grid.set(next_move, self.just_moved);
        for square in flipped {
            self.grid.set(square, self.just_moved);
        }
    }

    fn result(&self, viewpoint: Player) -> f64 {
        let own = self.grid.count(viewpoint);
        let other = self.grid.count(!viewpoint);
        if own > other {
            1.0
        } else if other > own {
            0.0
        } else {
            0.5
        }
    }
}

impl fmt::Display for OthelloState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "JustPlayed:{}", self.just_moved)?;
        write!(f, "{}", self.grid)?;
        write!(
            f,
            "Xs:{} Os:{}",
            self.grid.count(Player::One),
            self.grid.count(Player::Two)
        )
    }
}
