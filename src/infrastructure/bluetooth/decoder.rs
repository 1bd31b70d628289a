//! Packet decoding entry point
//!
//! Each protocol generation has its own bit layout (see [`gen2`], [`gen3`],
//! [`gen4`]); [`decode`] dispatches on the generation selected for the
//! connection. Decoders are stateless: Gen2 move batches come back as raw
//! slots and are resolved against the move counter by the session.
//!
//! [`gen2`]: super::gen2
//! [`gen3`]: super::gen3
//! [`gen4`]: super::gen4

use crate::domain::cube_state::CubeState;
use crate::domain::events::FaceletsSnapshot;
use crate::domain::moves::{Face, Move};
use crate::domain::orientation::{decode_velocity, Quaternion};
use crate::domain::tracker::BATCH_CAPACITY;
use crate::error::DecodeError;
use crate::infrastructure::bluetooth::bits::BitReader;
use crate::infrastructure::bluetooth::protocol::ProtocolGeneration;
use crate::infrastructure::bluetooth::{gen2, gen3, gen4};
use tracing::warn;

/// Gen3/Gen4 one-hot face position -> index into [`ONE_HOT_FACE_LETTERS`]
const ONE_HOT_FACE_REMAP: [usize; 6] = [1, 5, 3, 0, 4, 2];
const ONE_HOT_FACE_LETTERS: [Face; 6] = [Face::B, Face::R, Face::D, Face::F, Face::U, Face::L];

/// A decoded plaintext notification
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Single face turn (Gen3/Gen4)
    Move(Move),
    /// Gen2 move batch before counter reconciliation
    MoveSlots(MoveSlots),
    Facelets(FaceletsSnapshot),
    Orientation(OrientationReading),
    /// Tag not handled by this decoder
    Unknown { tag: u8 },
}

/// Raw gyroscope fields of an orientation packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationReading {
    pub qw: u16,
    pub qx: u16,
    pub qy: u16,
    pub qz: u16,
    /// 4-bit sign-magnitude angular velocity (x, y, z)
    pub velocity: [u8; 3],
}

impl OrientationReading {
    pub fn quaternion(&self) -> Quaternion {
        Quaternion::from_raw(self.qw, self.qx, self.qy, self.qz)
    }

    pub fn velocity(&self) -> [i8; 3] {
        self.velocity.map(decode_velocity)
    }
}

/// One Gen2 move slot; `None` marks a corrupted face value
pub type MoveSlot = Option<Move>;

/// The seven move slots of a Gen2 move notification, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSlots {
    pub counter: u8,
    pub slots: [MoveSlot; BATCH_CAPACITY as usize],
}

impl MoveSlots {
    /// Moves for the `pending` newest slots, oldest first.
    ///
    /// Corrupted slots inside the window are skipped without dropping the
    /// rest of the batch.
    pub fn resolve(&self, pending: u8) -> Vec<Move> {
        let pending = (pending as usize).min(self.slots.len());
        let mut moves = Vec::with_capacity(pending);
        for i in (0..pending).rev() {
            match self.slots[i] {
                Some(mv) => moves.push(mv),
                None => warn!(slot = i, counter = self.counter, "Skipping corrupted move slot"),
            }
        }
        moves
    }
}

/// Decode a decrypted notification for the given protocol generation
pub fn decode(generation: ProtocolGeneration, payload: &[u8]) -> Result<Packet, DecodeError> {
    match generation {
        ProtocolGeneration::Gen2 => gen2::decode(payload),
        ProtocolGeneration::Gen3 => gen3::decode(payload),
        ProtocolGeneration::Gen4 => gen4::decode(payload),
    }
}

/// Gen3/Gen4 single-move layout: 2-bit direction then 6-bit one-hot face
pub(crate) fn read_one_hot_move(reader: &BitReader, offset: usize) -> Result<Move, DecodeError> {
    let counter_clockwise = reader.bits(offset, 2)? & 0b01 != 0;
    let position = reader.one_hot(offset + 2, 6)?;
    let face = ONE_HOT_FACE_LETTERS[ONE_HOT_FACE_REMAP[position]];
    Ok(Move::from_direction(face, counter_clockwise))
}

/// Bit offsets of the packed piece arrays inside a facelets packet
pub(crate) struct SnapshotLayout {
    pub corners: usize,
    pub corner_twists: usize,
    pub edges: usize,
    pub edge_flips: usize,
}

/// Read a packed cube state.
///
/// The device sends 7 corners and 11 edges; the last piece of each is
/// implied by the permutation sum and the orientation parity.
pub(crate) fn read_cube_state(
    reader: &BitReader,
    layout: &SnapshotLayout,
) -> Result<CubeState, DecodeError> {
    let mut state = CubeState::solved();

    let mut corner_sum = 0u32;
    let mut twist_sum = 0u32;
    for i in 0..7 {
        let cp = reader.u8_at(layout.corners + i * 3, 3)?;
        let co = reader.u8_at(layout.corner_twists + i * 2, 2)?;
        state.corner_permutation[i] = cp;
        state.corner_orientation[i] = co;
        corner_sum += cp as u32;
        twist_sum += co as u32;
    }
    state.corner_permutation[7] = 28u32
        .checked_sub(corner_sum)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or(DecodeError::InvalidSnapshot)?;
    state.corner_orientation[7] = ((3 - twist_sum % 3) % 3) as u8;

    let mut edge_sum = 0u32;
    let mut flip_sum = 0u32;
    for i in 0..11 {
        let ep = reader.u8_at(layout.edges + i * 4, 4)?;
        let eo = reader.u8_at(layout.edge_flips + i, 1)?;
        state.edge_permutation[i] = ep;
        state.edge_orientation[i] = eo;
        edge_sum += ep as u32;
        flip_sum += eo as u32;
    }
    state.edge_permutation[11] = 66u32
        .checked_sub(edge_sum)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or(DecodeError::InvalidSnapshot)?;
    state.edge_orientation[11] = ((2 - flip_sum % 2) % 2) as u8;

    Ok(state)
}
