//! Smart cube notification decoding and move tracking.
//!
//! Feed decrypted or encrypted BLE notifications into a [`CubeSession`] and
//! get back [`CubeEvent`]s: face turns, orientation samples, full-state
//! snapshots and reconciliation warnings.

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod session;

pub use domain::cube_state::CubeState;
pub use domain::events::{CubeEvent, FaceletsSnapshot};
pub use domain::moves::{Face, Modifier, Move};
pub use error::{CipherError, CubeError, DecodeError, MoveParseError, StateError};
pub use infrastructure::bluetooth::{
    CubeCommand, DeviceIdentity, PacketCipher, PlaintextCipher, ProtocolGeneration,
};
pub use session::{CubeSession, SessionConfig};
