use crate::domain::cube_state::CubeState;
use crate::domain::moves::Move;
use crate::domain::orientation::Quaternion;
use serde::{Deserialize, Serialize};

/// Full cube state reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceletsSnapshot {
    /// Move counter / serial at the time of the snapshot
    pub serial: u16,
    pub state: CubeState,
}

/// Events produced by a [`CubeSession`](crate::session::CubeSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CubeEvent {
    Move(Move),
    /// Gen2 moves recovered from one notification, oldest first
    MoveBatch { moves: Vec<Move> },
    OrientationSample {
        absolute: Quaternion,
        relative: Quaternion,
        velocity: [i8; 3],
    },
    FaceletsSnapshot(FaceletsSnapshot),
    /// Simulated state disagreed with a snapshot; the snapshot was adopted
    ReconciliationWarning {
        expected: CubeState,
        actual: CubeState,
        likely_missed: Option<Vec<Move>>,
    },
    Unknown { raw_tag: u8 },
}

impl CubeEvent {
    /// Moves carried by this event, in order
    pub fn moves(&self) -> &[Move] {
        match self {
            CubeEvent::Move(mv) => std::slice::from_ref(mv),
            CubeEvent::MoveBatch { moves } => moves,
            _ => &[],
        }
    }
}
