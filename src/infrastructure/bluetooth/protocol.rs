//! Smart Cube Protocol Generations
//!
//! GATT characteristic identifiers used to recognise each protocol
//! generation, protocol selection, and the outbound command templates.

use crate::error::CubeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Gen2 notify characteristic
/// (GAN Mini ui FreePlay, GAN12 ui, GAN356 i Carry S, GAN356 i 3, Monster Go 3Ai)
pub const GEN2_NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x28be4cb6_cd67_11e9_a32f_2a2ae2dbcce4);
pub const GEN2_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x28be4a4a_cd67_11e9_a32f_2a2ae2dbcce4);

/// Gen3 notify characteristic (GAN356 i Carry 2)
pub const GEN3_NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x8653000b_43e6_47b7_9cb0_5fc21d4ae340);
pub const GEN3_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x8653000c_43e6_47b7_9cb0_5fc21d4ae340);

/// Gen4 notify characteristic (GAN12 ui Maglev, GAN14 ui FreePlay)
pub const GEN4_NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x0000fff6_0000_1000_8000_00805f9b34fb);
pub const GEN4_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x0000fff5_0000_1000_8000_00805f9b34fb);

/// Vendor protocol revision spoken by a connected cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolGeneration {
    Gen2,
    Gen3,
    Gen4,
}

impl ProtocolGeneration {
    /// Selection order: the first generation whose notify characteristic is
    /// present wins
    pub const ALL: [ProtocolGeneration; 3] = [
        ProtocolGeneration::Gen2,
        ProtocolGeneration::Gen3,
        ProtocolGeneration::Gen4,
    ];

    pub fn notify_uuid(self) -> Uuid {
        match self {
            Self::Gen2 => GEN2_NOTIFY_CHAR_UUID,
            Self::Gen3 => GEN3_NOTIFY_CHAR_UUID,
            Self::Gen4 => GEN4_NOTIFY_CHAR_UUID,
        }
    }

    pub fn write_uuid(self) -> Uuid {
        match self {
            Self::Gen2 => GEN2_WRITE_CHAR_UUID,
            Self::Gen3 => GEN3_WRITE_CHAR_UUID,
            Self::Gen4 => GEN4_WRITE_CHAR_UUID,
        }
    }

    /// Size of an outbound command before encryption
    pub fn command_len(self) -> usize {
        match self {
            Self::Gen2 | Self::Gen4 => 20,
            Self::Gen3 => 16,
        }
    }
}

impl fmt::Display for ProtocolGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gen2 => "Gen2",
            Self::Gen3 => "Gen3",
            Self::Gen4 => "Gen4",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtocolGeneration {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gen2" | "2" => Ok(Self::Gen2),
            "gen3" | "3" => Ok(Self::Gen3),
            "gen4" | "4" => Ok(Self::Gen4),
            _ => Err(CubeError::UnknownGeneration(s.to_string())),
        }
    }
}

/// Pick the protocol generation from the characteristics a device exposes.
///
/// Identifiers are compared as parsed UUIDs, so case does not matter and the
/// simple, hyphenated, braced and urn forms all match; identifiers that do not
/// parse are skipped.
pub fn select_protocol<S: AsRef<str>>(
    characteristics: &[S],
) -> Result<ProtocolGeneration, CubeError> {
    let exposed: Vec<Uuid> = characteristics
        .iter()
        .filter_map(|c| match Uuid::parse_str(c.as_ref()) {
            Ok(uuid) => Some(uuid),
            Err(e) => {
                debug!("Ignoring characteristic {:?}: {}", c.as_ref(), e);
                None
            }
        })
        .collect();

    for generation in ProtocolGeneration::ALL {
        if exposed.contains(&generation.notify_uuid()) {
            info!("Chose protocol {}", generation);
            return Ok(generation);
        }
    }

    warn!("No known protocol among {} characteristics", characteristics.len());
    Err(CubeError::UnsupportedProtocol(characteristics.len()))
}

/// Commands sent to the cube's write characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeCommand {
    /// Ask the cube to report its full state (and move counter)
    RequestFacelets,
    /// Tell the cube its current physical state is solved
    ResetState,
}

const RESET_BODY: [u8; 11] = [
    0x05, 0x39, 0x77, 0x00, 0x00, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB,
];

impl CubeCommand {
    /// Plaintext command for the given generation, zero padded to the
    /// generation's command length
    pub fn payload(self, generation: ProtocolGeneration) -> Vec<u8> {
        let prefix: &[u8] = match (self, generation) {
            (Self::RequestFacelets, ProtocolGeneration::Gen2) => &[0x04],
            (Self::RequestFacelets, ProtocolGeneration::Gen3) => &[0x68, 0x01],
            (Self::RequestFacelets, ProtocolGeneration::Gen4) => {
                &[0xDD, 0x04, 0x00, 0xED, 0x00, 0x00]
            }
            (Self::ResetState, ProtocolGeneration::Gen2) => &[0x0A],
            (Self::ResetState, ProtocolGeneration::Gen3) => &[0x68, 0x05],
            (Self::ResetState, ProtocolGeneration::Gen4) => &[0xD2, 0x0D],
        };

        let mut bytes = vec![0u8; generation.command_len()];
        bytes[..prefix.len()].copy_from_slice(prefix);
        if self == Self::ResetState {
            bytes[prefix.len()..prefix.len() + RESET_BODY.len()].copy_from_slice(&RESET_BODY);
        }
        bytes
    }
}
