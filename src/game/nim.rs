//! The game of Nim: players alternately take 1, 2 or 3 chips from a shared
//! heap, and whoever takes the last chip wins. Any starting heap of the form
//! `4n + k` for `k` in 1..=3 is a win for the first player (by taking `k`),
//! any heap of the form `4n` is a win for the second. This makes Nim the
//! cheapest correctness check for a search strategy: the optimal move is known
//! in closed form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{GameState, Player};

/// A state of the game Nim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NimState {
    chips: u32,
    just_moved: Player,
}

impl NimState {
    /// Starts a game with `chips` chips on the heap.
    #[must_use]
    pub const fn new(chips: u32) -> Self {
        Self {
            chips,
            just_moved: Player::Two,
        }
    }

    /// Chips left on the heap.
    #[must_use]
    pub const fn chips(&self) -> u32 {
        self.chips
    }
}

impl GameState for NimState {
    type Move = u8;

    fn player_just_moved(&self) -> Player {
        self.just_moved
    }

    #[allow(clippy::cast_possible_truncation)]
    fn moves(&self) -> Vec<u8> {
        (1..=self.chips.min(3) as u8).collect()
    }

    fn apply(&mut self, next_move: u8) {
        debug_assert!((1..=3).contains(&next_move));
        debug_assert!(u32::from(next_move) <= self.chips);
        self.chips -= u32::from(next_move);
        self.just_moved = !self.just_moved;
    }

    fn result(&self, viewpoint: Player) -> f64 {
        debug_assert_eq!(self.chips, 0, "game is not over yet");
        if self.just_moved == viewpoint {
            1.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for NimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chips:{} JustPlayed:{}", self.chips, self.just_moved)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_player_moves_first() {
        let state = NimState::new(15);
        assert_eq!(state.player_just_moved(), Player::Two);
    }

    #[test]
    fn moves_are_capped_by_the_heap() {
        assert_eq!(NimState::new(15).moves(), vec![1, 2, 3]);
        assert_eq!(NimState::new(2).moves(), vec![1, 2]);
        assert_eq!(NimState::new(0).moves(), Vec::<u8>::new());
    }

    #[test]
    fn taking_the_last_chip_wins() {
        let mut state = NimState::new(3);
        state.apply(3);
        assert!(state.moves().is_empty());
        assert_eq!(state.result(Player::One), 1.0);
        assert_eq!(state.result(Player::Two), 0.0);
    }

    #[test]
    fn display_is_a_unique_key() {
        let mut a = NimState::new(5);
        let b = NimState::new(5);
        assert_eq!(a.to_string(), b.to_string());
        a.apply(2);
        // Same heap size reached by a different move history still compares
        // equal, which is exactly what the transposition pool wants.
        let mut c = NimState::new(9);
        c.apply(2);
        c.apply(2);
        c.apply(2);
        assert_eq!(a.to_string(), "Chips:3 JustPlayed:1");
        assert_eq!(a.to_string(), c.to_string());
    }
}
