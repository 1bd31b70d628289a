//! Error types for the cube protocol engine

use thiserror::Error;

/// A notification could not be turned into a packet.
///
/// These are always recovered locally: the session logs them and drops the
/// offending notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Payload too short: {len} bytes, field needs bits {start}..{end}")]
    TooShort { len: usize, start: usize, end: usize },

    #[error("Gen3 frame rejected (magic {magic:#04X}, byte 2 {marker:#04X})")]
    InvalidFrame { magic: u8, marker: u8 },

    #[error("No face bit set in one-hot field")]
    NoFaceBit,

    #[error("More than one face bit set in one-hot field: {bits:#08b}")]
    AmbiguousFace { bits: u8 },

    #[error("Snapshot piece data out of range")]
    InvalidSnapshot,
}

/// A move token could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("Empty move token")]
    Empty,

    #[error("Unknown face '{0}'")]
    UnknownFace(char),

    #[error("Unknown modifier '{modifier}' in move '{token}'")]
    UnknownModifier { token: String, modifier: String },
}

/// A cube state violates the permutation or parity rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Corner permutation is not a bijection: {0:?}")]
    CornerPermutation([u8; 8]),

    #[error("Edge permutation is not a bijection: {0:?}")]
    EdgePermutation([u8; 12]),

    #[error("Corner orientation out of range or twist sum not divisible by 3: {0:?}")]
    CornerTwist([u8; 8]),

    #[error("Edge orientation out of range or flip sum not even: {0:?}")]
    EdgeFlip([u8; 12]),
}

/// Failure reported by a packet cipher implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("Packet size {0} outside the cipher's accepted range")]
    InvalidLength(usize),

    #[error("Cipher failure: {0}")]
    Other(String),
}

/// Failures escalated to the caller of the engine.
#[derive(Debug, Error)]
pub enum CubeError {
    #[error("No known cube protocol among {0} characteristics")]
    UnsupportedProtocol(usize),

    #[error("Unknown protocol generation: {0}")]
    UnknownGeneration(String),

    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),
}
