//! Missed-move search
//!
//! Diagnostic fallback for reconciliation: when the simulated state and a
//! device snapshot disagree, try every single move and every pair of moves
//! to explain the gap. Move decoding never depends on this.

use crate::domain::cube_state::CubeState;
use crate::domain::moves::Move;

/// Find the shortest sequence of at most two moves turning `from` into `to`.
///
/// Returns `Some(vec![])` when the states already match and `None` when no
/// sequence of one or two moves explains the difference.
pub fn find_missed_moves(from: &CubeState, to: &CubeState) -> Option<Vec<Move>> {
    if from == to {
        return Some(Vec::new());
    }

    let singles: Vec<(Move, CubeState)> = Move::all().map(|mv| (mv, from.after(mv))).collect();

    if let Some((mv, _)) = singles.iter().find(|(_, state)| state == to) {
        return Some(vec![*mv]);
    }

    for (first, state) in &singles {
        for second in Move::all() {
            // Same-face pairs collapse into a single move already tried above
            if second.face == first.face {
                continue;
            }
            if state.after(second) == *to {
                return Some(vec![*first, second]);
            }
        }
    }

    None
}
