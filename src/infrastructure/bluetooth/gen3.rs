//! Gen3 protocol decoder
//!
//! # Layout (bit offsets, MSB first)
//!
//! ```text
//! [0..8]    : Magic (0x55)
//! [8..16]   : Event type
//! [16..24]  : Data length
//!
//! Event 0x01 - move
//! [72..74]  : Direction (second bit set = counter-clockwise)
//! [74..80]  : Face, one-hot
//!
//! Event 0x02 - facelets
//! [24..40]  : Serial (little-endian)
//! [40..61]  : 7 corners, 3 bits each
//! [61..75]  : 7 corner twists, 2 bits each
//! [75..77]  : unused
//! [77..121] : 11 edges, 4 bits each
//! [121..132]: 11 edge flips, 1 bit each
//! ```

use crate::domain::events::FaceletsSnapshot;
use crate::error::DecodeError;
use crate::infrastructure::bluetooth::bits::BitReader;
use crate::infrastructure::bluetooth::decoder::{
    read_cube_state, read_one_hot_move, Packet, SnapshotLayout,
};
use tracing::trace;

pub const MAGIC: u8 = 0x55;
pub const EVENT_MOVE: u8 = 0x01;
pub const EVENT_FACELETS: u8 = 0x02;

const MOVE_OFFSET: usize = 72;

pub(crate) const SNAPSHOT_LAYOUT: SnapshotLayout = SnapshotLayout {
    corners: 40,
    corner_twists: 61,
    edges: 77,
    edge_flips: 121,
};

pub fn decode(payload: &[u8]) -> Result<Packet, DecodeError> {
    let reader = BitReader::new(payload);
    let magic = reader.u8_at(0, 8)?;
    let event = reader.u8_at(8, 8)?;
    let marker = reader.u8_at(16, 8)?;
    trace!("Gen3 packet event {:#04X}: {:02X?}", event, payload);

    // Either legacy check is enough to accept the frame
    if magic != MAGIC && marker != 0x00 {
        return Err(DecodeError::InvalidFrame { magic, marker });
    }

    match event {
        EVENT_MOVE => read_one_hot_move(&reader, MOVE_OFFSET).map(Packet::Move),
        EVENT_FACELETS => {
            let serial = reader.u16_le_at(24)?;
            let state = read_cube_state(&reader, &SNAPSHOT_LAYOUT)?;
            Ok(Packet::Facelets(FaceletsSnapshot { serial, state }))
        }
        _ => Ok(Packet::Unknown { tag: event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cube_state::CubeState;
    use crate::domain::moves::{Face, Move};
    use crate::infrastructure::bluetooth::decoder::test_support::BitWriter;

    fn frame(event: u8) -> BitWriter {
        let mut w = BitWriter::new(20);
        w.put(0, 8, MAGIC as u32).put(8, 8, event as u32).put(16, 8, 0x10);
        w
    }

    #[test]
    fn test_move() {
        let mut w = frame(EVENT_MOVE);
        // direction 01, one-hot position 4 -> U
        w.put(72, 2, 0b01).put(74, 6, 0b000010);
        assert_eq!(
            decode(&w.bytes).unwrap(),
            Packet::Move(Move::counter_clockwise(Face::U))
        );

        let mut w = frame(EVENT_MOVE);
        w.put(72, 2, 0b00).put(74, 6, 0b100000);
        assert_eq!(
            decode(&w.bytes).unwrap(),
            Packet::Move(Move::clockwise(Face::R))
        );
    }

    #[test]
    fn test_frame_validity() {
        // No magic but byte 2 is zero: accepted
        let mut w = BitWriter::new(20);
        w.put(0, 8, 0x12).put(8, 8, EVENT_MOVE as u32).put(16, 8, 0x00);
        w.put(72, 2, 0).put(74, 6, 0b001000);
        assert_eq!(
            decode(&w.bytes).unwrap(),
            Packet::Move(Move::clockwise(Face::F))
        );

        // Neither check passes: dropped
        w.put(16, 8, 0x07);
        assert_eq!(
            decode(&w.bytes),
            Err(DecodeError::InvalidFrame {
                magic: 0x12,
                marker: 0x07
            })
        );
    }

    #[test]
    fn test_missing_face_bit() {
        let w = frame(EVENT_MOVE);
        assert_eq!(decode(&w.bytes), Err(DecodeError::NoFaceBit));
    }

    #[test]
    fn test_facelets() {
        let mut state = CubeState::solved();
        state.apply_formula("F2 R' D L").unwrap();

        let mut w = frame(EVENT_FACELETS);
        w.put(24, 16, 0x3412);
        w.put_state(&SNAPSHOT_LAYOUT, &state);

        match decode(&w.bytes).unwrap() {
            Packet::Facelets(snapshot) => {
                assert_eq!(snapshot.serial, 0x1234);
                assert_eq!(snapshot.state, state);
            }
            other => panic!("expected facelets, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event() {
        let w = frame(0x07);
        assert_eq!(decode(&w.bytes).unwrap(), Packet::Unknown { tag: 0x07 });
    }
}
