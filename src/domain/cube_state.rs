//! Cube state simulator
//!
//! Tracks which corner/edge occupies each slot and how it is twisted or
//! flipped. Slot numbering:
//!
//! ```text
//! Corners: 0 URF  1 UFL  2 ULB  3 UBR  4 DFR  5 DLF  6 DBL  7 DRB
//! Edges:   0 UR   1 UF   2 UL   3 UB   4 DR   5 DF   6 DL   7 DB
//!          8 FR   9 FL  10 BL  11 BR
//! ```

use crate::domain::moves::{parse_formula, Face, Move};
use crate::error::{MoveParseError, StateError};
use serde::{Deserialize, Serialize};

/// Permutation and orientation deltas for one clockwise quarter turn.
///
/// `cp[i]`/`ep[i]` name the slot whose piece moves into slot `i`;
/// `co[i]`/`eo[i]` are added to that piece's orientation.
struct TurnTable {
    cp: [usize; 8],
    co: [u8; 8],
    ep: [usize; 12],
    eo: [u8; 12],
}

/// Quarter-turn tables in `URFDLB` order
const TURN_TABLES: [TurnTable; 6] = [
    // U
    TurnTable {
        cp: [3, 0, 1, 2, 4, 5, 6, 7],
        co: [0, 0, 0, 0, 0, 0, 0, 0],
        ep: [3, 0, 1, 2, 4, 5, 6, 7, 8, 9, 10, 11],
        eo: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    },
    // R
    TurnTable {
        cp: [4, 1, 2, 0, 7, 5, 6, 3],
        co: [2, 0, 0, 1, 1, 0, 0, 2],
        ep: [8, 1, 2, 3, 11, 5, 6, 7, 4, 9, 10, 0],
        eo: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    },
    // F
    TurnTable {
        cp: [1, 5, 2, 3, 0, 4, 6, 7],
        co: [1, 2, 0, 0, 2, 1, 0, 0],
        ep: [0, 9, 2, 3, 4, 8, 6, 7, 1, 5, 10, 11],
        eo: [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0],
    },
    // D
    TurnTable {
        cp: [0, 1, 2, 3, 5, 6, 7, 4],
        co: [0, 0, 0, 0, 0, 0, 0, 0],
        ep: [0, 1, 2, 3, 5, 6, 7, 4, 8, 9, 10, 11],
        eo: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    },
    // L
    TurnTable {
        cp: [0, 2, 6, 3, 4, 1, 5, 7],
        co: [0, 1, 2, 0, 0, 2, 1, 0],
        ep: [0, 1, 10, 3, 4, 5, 9, 7, 8, 2, 6, 11],
        eo: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    },
    // B
    TurnTable {
        cp: [0, 1, 3, 7, 4, 5, 2, 6],
        co: [0, 0, 1, 2, 0, 0, 2, 1],
        ep: [0, 1, 2, 11, 4, 5, 6, 10, 8, 9, 3, 7],
        eo: [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1],
    },
];

const SOLVED_CORNERS: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const SOLVED_EDGES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Corner/edge permutation and orientation of a 3x3x3 cube
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CubeState {
    pub corner_permutation: [u8; 8],
    pub corner_orientation: [u8; 8],
    pub edge_permutation: [u8; 12],
    pub edge_orientation: [u8; 12],
}

impl Default for CubeState {
    fn default() -> Self {
        Self::solved()
    }
}

impl CubeState {
    pub fn solved() -> Self {
        Self {
            corner_permutation: SOLVED_CORNERS,
            corner_orientation: [0; 8],
            edge_permutation: SOLVED_EDGES,
            edge_orientation: [0; 12],
        }
    }

    pub fn is_solved(&self) -> bool {
        *self == Self::solved()
    }

    /// Apply a move. Half and inverse turns are composed from quarter turns.
    pub fn apply(&mut self, mv: Move) {
        for _ in 0..mv.modifier.quarter_turns() {
            self.quarter_turn(mv.face);
        }
    }

    /// Apply moves in order
    pub fn apply_all<'a>(&mut self, moves: impl IntoIterator<Item = &'a Move>) {
        for mv in moves {
            self.apply(*mv);
        }
    }

    /// Apply a space-separated formula left to right.
    ///
    /// The formula is parsed completely before any move is applied, so a bad
    /// token leaves the state untouched.
    pub fn apply_formula(&mut self, formula: &str) -> Result<(), MoveParseError> {
        let moves = parse_formula(formula)?;
        self.apply_all(&moves);
        Ok(())
    }

    /// Copy of this state with `mv` applied
    pub fn after(&self, mv: Move) -> Self {
        let mut next = self.clone();
        next.apply(mv);
        next
    }

    fn quarter_turn(&mut self, face: Face) {
        let table = &TURN_TABLES[face.index()];
        let old = self.clone();

        for i in 0..8 {
            let src = table.cp[i];
            self.corner_permutation[i] = old.corner_permutation[src];
            self.corner_orientation[i] = (old.corner_orientation[src] + table.co[i]) % 3;
        }
        for i in 0..12 {
            let src = table.ep[i];
            self.edge_permutation[i] = old.edge_permutation[src];
            self.edge_orientation[i] = (old.edge_orientation[src] + table.eo[i]) % 2;
        }
    }

    /// Check bijection and parity rules.
    ///
    /// States reported by a device are not trusted: corrupted or partial
    /// snapshots fail here instead of poisoning the simulator.
    pub fn validate(&self) -> Result<(), StateError> {
        if !is_bijection(&self.corner_permutation) {
            return Err(StateError::CornerPermutation(self.corner_permutation));
        }
        if !is_bijection(&self.edge_permutation) {
            return Err(StateError::EdgePermutation(self.edge_permutation));
        }

        let co = &self.corner_orientation;
        if co.iter().any(|&o| o > 2) || co.iter().map(|&o| o as u32).sum::<u32>() % 3 != 0 {
            return Err(StateError::CornerTwist(*co));
        }

        let eo = &self.edge_orientation;
        if eo.iter().any(|&o| o > 1) || eo.iter().map(|&o| o as u32).sum::<u32>() % 2 != 0 {
            return Err(StateError::EdgeFlip(*eo));
        }

        Ok(())
    }
}

fn is_bijection<const N: usize>(perm: &[u8; N]) -> bool {
    let mut seen = [false; N];
    for &p in perm {
        let p = p as usize;
        if p >= N || seen[p] {
            return false;
        }
        seen[p] = true;
    }
    true
}
