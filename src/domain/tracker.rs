//! Gen2 move counter tracking
//!
//! Gen2 cubes repeat their last seven moves in every move notification along
//! with a wrapping 8-bit move counter. The tracker remembers the last counter
//! seen so only the slots that are actually new get emitted.

/// Maximum number of move slots carried by one Gen2 notification
pub const BATCH_CAPACITY: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveCounterTracker {
    /// No snapshot received yet; move batches cannot be interpreted
    #[default]
    Unseeded,
    Seeded(u8),
}

/// Outcome of feeding a move batch counter to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Tracker has not been seeded by a snapshot; emit nothing
    Uninitialized,
    Pending {
        /// Number of new slots to read, at most [`BATCH_CAPACITY`]
        count: u8,
        /// More moves happened than one notification can carry
        overflowed: bool,
    },
}

impl MoveCounterTracker {
    pub fn new() -> Self {
        Self::Unseeded
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self, Self::Seeded(_))
    }

    pub fn last_seen(&self) -> Option<u8> {
        match self {
            Self::Seeded(count) => Some(*count),
            Self::Unseeded => None,
        }
    }

    /// Seed from a state snapshot's move counter
    pub fn seed(&mut self, count: u8) {
        *self = Self::Seeded(count);
    }

    /// Account for a move batch reporting `count`
    pub fn advance(&mut self, count: u8) -> Advance {
        match *self {
            Self::Unseeded => Advance::Uninitialized,
            Self::Seeded(last) => {
                let delta = count.wrapping_sub(last);
                *self = Self::Seeded(count);
                Advance::Pending {
                    count: delta.min(BATCH_CAPACITY),
                    overflowed: delta > BATCH_CAPACITY,
                }
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::Unseeded;
    }
}
