//! Bluetooth Module
//!
//! Wire-level handling of smart cube notifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      CubeSession                        │
//! │        (per-connection state, see crate::session)       │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────────┐
//! │  Cipher   │  │  Protocol  │  │   Decoder    │
//! │           │  │            │  │              │
//! │ - decrypt │  │ - UUIDs    │  │ - Gen2 bits  │
//! │ - encrypt │  │ - selection│  │ - Gen3 bits  │
//! │           │  │ - commands │  │ - Gen4 bits  │
//! └───────────┘  └────────────┘  └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Generations, characteristic UUIDs, selection, commands
//! - [`cipher`] - Packet cipher boundary and device identity
//! - [`decoder`] - Decoded packet types and the generation dispatch
//! - [`gen2`], [`gen3`], [`gen4`] - Per-generation bit layouts
//! - [`bits`] - MSB-first bit window reader

pub mod bits;
pub mod cipher;
pub mod decoder;
pub mod gen2;
pub mod gen3;
pub mod gen4;
pub mod protocol;

pub use cipher::{DeviceIdentity, PacketCipher, PlaintextCipher};
pub use decoder::{decode, Packet};
pub use protocol::{select_protocol, CubeCommand, ProtocolGeneration};
