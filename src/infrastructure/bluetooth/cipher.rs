//! Packet cipher boundary
//!
//! Cube notifications and commands are encrypted with a key derived from the
//! device identity. Key derivation and the block cipher itself live outside
//! this crate; the engine only sees this trait.

use crate::error::CipherError;
use std::fmt;
use std::str::FromStr;

/// Bluetooth address of a cube, used to key the packet cipher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(pub [u8; 6]);

impl DeviceIdentity {
    /// From the 48-bit address form used by the platform BLE APIs
    pub fn from_u64(address: u64) -> Self {
        let bytes = address.to_be_bytes();
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes[2..]);
        Self(mac)
    }

    pub fn as_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(bytes)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

impl FromStr for DeviceIdentity {
    type Err = CipherError;

    /// Parses `AA:BB:CC:DD:EE:FF` (or `-` separated)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(CipherError::Other(format!("Invalid device address: {}", s)));
        }
        let mut mac = [0u8; 6];
        for (byte, part) in mac.iter_mut().zip(parts) {
            *byte = u8::from_str_radix(part, 16)
                .map_err(|e| CipherError::Other(format!("Invalid device address {}: {}", s, e)))?;
        }
        Ok(Self(mac))
    }
}

/// Symmetric cipher applied to every notification and command
pub trait PacketCipher: Send {
    fn decrypt(&self, ciphertext: &[u8], device: &DeviceIdentity) -> Result<Vec<u8>, CipherError>;

    fn encrypt(&self, plaintext: &[u8], device: &DeviceIdentity) -> Result<Vec<u8>, CipherError>;
}

/// Pass-through cipher for captures that were decrypted upstream
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

impl PacketCipher for PlaintextCipher {
    fn decrypt(
        &self,
        ciphertext: &[u8],
        _device: &DeviceIdentity,
    ) -> Result<Vec<u8>, CipherError> {
        Ok(ciphertext.to_vec())
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        _device: &DeviceIdentity,
    ) -> Result<Vec<u8>, CipherError> {
        Ok(plaintext.to_vec())
    }
}
