//! Gen2 protocol decoder
//!
//! # Layout (bit offsets, MSB first)
//!
//! ```text
//! [0..4]    : Event tag
//!
//! Tag 0x1 - gyroscope
//! [4..68]   : qw, qx, qy, qz (16 bits each, sign-magnitude)
//! [68..80]  : vx, vy, vz (4 bits each, sign-magnitude)
//!
//! Tag 0x2 - move batch
//! [4..12]   : Move counter (wrapping)
//! slot i    : face @ 12+5i (4 bits, index into "URFDLB"),
//!             direction @ 16+5i (1 bit, 1 = counter-clockwise)
//!             slot 0 is the newest move, slot 6 the oldest
//!
//! Tag 0x4 - facelets
//! [4..12]   : Move counter
//! [12..33]  : 7 corners, 3 bits each
//! [33..47]  : 7 corner twists, 2 bits each
//! [47..91]  : 11 edges, 4 bits each
//! [91..102] : 11 edge flips, 1 bit each
//! ```

use crate::domain::events::FaceletsSnapshot;
use crate::domain::moves::{Face, Move};
use crate::domain::tracker::BATCH_CAPACITY;
use crate::error::DecodeError;
use crate::infrastructure::bluetooth::bits::BitReader;
use crate::infrastructure::bluetooth::decoder::{
    read_cube_state, MoveSlots, OrientationReading, Packet, SnapshotLayout,
};
use tracing::trace;

pub const TAG_GYRO: u8 = 0x1;
pub const TAG_MOVE: u8 = 0x2;
pub const TAG_FACELETS: u8 = 0x4;

const COUNTER_OFFSET: usize = 4;

pub(crate) const SNAPSHOT_LAYOUT: SnapshotLayout = SnapshotLayout {
    corners: 12,
    corner_twists: 33,
    edges: 47,
    edge_flips: 91,
};

pub fn decode(payload: &[u8]) -> Result<Packet, DecodeError> {
    let reader = BitReader::new(payload);
    let tag = reader.u8_at(0, 4)?;
    trace!("Gen2 packet tag {:#X}: {:02X?}", tag, payload);

    match tag {
        TAG_MOVE => decode_moves(&reader).map(Packet::MoveSlots),
        TAG_FACELETS => decode_facelets(&reader).map(Packet::Facelets),
        TAG_GYRO => decode_gyro(&reader).map(Packet::Orientation),
        _ => Ok(Packet::Unknown { tag }),
    }
}

fn decode_moves(reader: &BitReader) -> Result<MoveSlots, DecodeError> {
    let counter = reader.u8_at(COUNTER_OFFSET, 8)?;
    let mut slots = [None; BATCH_CAPACITY as usize];
    for (i, slot) in slots.iter_mut().enumerate() {
        let face = reader.u8_at(12 + 5 * i, 4)?;
        let counter_clockwise = reader.bits(16 + 5 * i, 1)? != 0;
        // Face values above 5 mark slots the cube could not fill
        *slot = Face::ALL
            .get(face as usize)
            .map(|&face| Move::from_direction(face, counter_clockwise));
    }
    Ok(MoveSlots { counter, slots })
}

fn decode_facelets(reader: &BitReader) -> Result<FaceletsSnapshot, DecodeError> {
    let serial = reader.u8_at(COUNTER_OFFSET, 8)? as u16;
    let state = read_cube_state(reader, &SNAPSHOT_LAYOUT)?;
    Ok(FaceletsSnapshot { serial, state })
}

fn decode_gyro(reader: &BitReader) -> Result<OrientationReading, DecodeError> {
    Ok(OrientationReading {
        qw: reader.u16_at(4)?,
        qx: reader.u16_at(20)?,
        qy: reader.u16_at(36)?,
        qz: reader.u16_at(52)?,
        velocity: [
            reader.u8_at(68, 4)?,
            reader.u8_at(72, 4)?,
            reader.u8_at(76, 4)?,
        ],
    })
}
