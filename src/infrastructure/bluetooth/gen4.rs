//! Gen4 protocol decoder
//!
//! # Layout (bit offsets, MSB first)
//!
//! ```text
//! [0..8]    : Event tag
//!
//! Tag 0x01 - move
//! [56..72]  : Serial (little-endian)
//! [64..66]  : Direction (second bit set = counter-clockwise)
//! [66..72]  : Face, one-hot
//!
//! Tag 0xEC - gyroscope
//! [16..80]  : qw, qx, qy, qz (16 bits each, sign-magnitude)
//! [80..92]  : vx, vy, vz (4 bits each, sign-magnitude)
//!
//! Tag 0xED - facelets
//! [16..32]  : Serial (little-endian)
//! [32..53]  : 7 corners, 3 bits each
//! [53..67]  : 7 corner twists, 2 bits each
//! [69..113] : 11 edges, 4 bits each
//! [113..124]: 11 edge flips, 1 bit each
//! ```

use crate::domain::events::FaceletsSnapshot;
use crate::error::DecodeError;
use crate::infrastructure::bluetooth::bits::BitReader;
use crate::infrastructure::bluetooth::decoder::{
    read_cube_state, read_one_hot_move, OrientationReading, Packet, SnapshotLayout,
};
use tracing::trace;

pub const TAG_MOVE: u8 = 0x01;
pub const TAG_GYRO: u8 = 0xEC;
pub const TAG_FACELETS: u8 = 0xED;

const MOVE_OFFSET: usize = 64;

pub(crate) const SNAPSHOT_LAYOUT: SnapshotLayout = SnapshotLayout {
    corners: 32,
    corner_twists: 53,
    edges: 69,
    edge_flips: 113,
};

pub fn decode(payload: &[u8]) -> Result<Packet, DecodeError> {
    let reader = BitReader::new(payload);
    let tag = reader.u8_at(0, 8)?;
    trace!("Gen4 packet tag {:#04X}: {:02X?}", tag, payload);

    match tag {
        TAG_MOVE => read_one_hot_move(&reader, MOVE_OFFSET).map(Packet::Move),
        TAG_GYRO => Ok(Packet::Orientation(OrientationReading {
            qw: reader.u16_at(16)?,
            qx: reader.u16_at(32)?,
            qy: reader.u16_at(48)?,
            qz: reader.u16_at(64)?,
            velocity: [
                reader.u8_at(80, 4)?,
                reader.u8_at(84, 4)?,
                reader.u8_at(88, 4)?,
            ],
        })),
        TAG_FACELETS => {
            let serial = reader.u16_le_at(16)?;
            let state = read_cube_state(&reader, &SNAPSHOT_LAYOUT)?;
            Ok(Packet::Facelets(FaceletsSnapshot { serial, state }))
        }
        _ => Ok(Packet::Unknown { tag }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cube_state::CubeState;
    use crate::domain::moves::{Face, Move};
    use crate::infrastructure::bluetooth::decoder::test_support::BitWriter;

    #[test]
    fn test_move_fixture() {
        // Tag 0x01, bit 65 set, one-hot index 2 -> remap 3 -> 'F'
        let mut payload = [0u8; 20];
        payload[0] = 0x01;
        payload[8] = 0b0100_1000;
        assert_eq!(
            decode(&payload).unwrap(),
            Packet::Move(Move::counter_clockwise(Face::F))
        );
    }

    #[test]
    fn test_clockwise_move() {
        let mut w = BitWriter::new(20);
        w.put(0, 8, TAG_MOVE as u32).put(64, 2, 0b00).put(66, 6, 0b000001);
        assert_eq!(
            decode(&w.bytes).unwrap(),
            Packet::Move(Move::clockwise(Face::D))
        );
    }

    #[test]
    fn test_ambiguous_face() {
        let mut w = BitWriter::new(20);
        w.put(0, 8, TAG_MOVE as u32).put(66, 6, 0b000011);
        assert!(matches!(
            decode(&w.bytes),
            Err(DecodeError::AmbiguousFace { .. })
        ));
    }

    #[test]
    fn test_gyro() {
        let mut w = BitWriter::new(20);
        w.put(0, 8, TAG_GYRO as u32)
            .put(16, 16, 0x0000)
            .put(32, 16, 0x7FFF)
            .put(48, 16, 0x0000)
            .put(64, 16, 0x8000)
            .put(80, 4, 0x9)
            .put(84, 4, 0x1)
            .put(88, 4, 0x7);
        match decode(&w.bytes).unwrap() {
            Packet::Orientation(reading) => {
                let q = reading.quaternion();
                assert_eq!((q.w, q.x, q.y), (0.0, 1.0, 0.0));
                assert_eq!(q.z, -0.0);
                assert_eq!(reading.velocity(), [-1, 1, 7]);
            }
            other => panic!("expected orientation, got {:?}", other),
        }
    }

    #[test]
    fn test_facelets() {
        let mut state = CubeState::solved();
        state.apply_formula("U2 B L' F").unwrap();

        let mut w = BitWriter::new(20);
        w.put(0, 8, TAG_FACELETS as u32).put(16, 16, 0x0100);
        w.put_state(&SNAPSHOT_LAYOUT, &state);

        match decode(&w.bytes).unwrap() {
            Packet::Facelets(snapshot) => {
                assert_eq!(snapshot.serial, 1);
                assert_eq!(snapshot.state, state);
            }
            other => panic!("expected facelets, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let mut payload = [0u8; 20];
        payload[0] = 0xEF;
        assert_eq!(decode(&payload).unwrap(), Packet::Unknown { tag: 0xEF });
    }
}
