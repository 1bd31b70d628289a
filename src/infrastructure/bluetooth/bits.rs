//! MSB-first bit window extraction over a decrypted payload

use crate::error::DecodeError;

/// Reads fixed-offset bit windows; bit 0 is the most significant bit of
/// byte 0.
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    data: &'a [u8],
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Read `width` bits (at most 32) starting at bit `start`
    pub fn bits(&self, start: usize, width: usize) -> Result<u32, DecodeError> {
        debug_assert!(width <= 32);
        let end = start + width;
        if end > self.len_bits() {
            return Err(DecodeError::TooShort {
                len: self.data.len(),
                start,
                end,
            });
        }

        let mut value = 0u32;
        for bit in start..end {
            value <<= 1;
            if self.data[bit / 8] & (0x80 >> (bit % 8)) != 0 {
                value |= 1;
            }
        }
        Ok(value)
    }

    pub fn u8_at(&self, start: usize, width: usize) -> Result<u8, DecodeError> {
        debug_assert!(width <= 8);
        Ok(self.bits(start, width)? as u8)
    }

    pub fn u16_at(&self, start: usize) -> Result<u16, DecodeError> {
        Ok(self.bits(start, 16)? as u16)
    }

    /// 16-bit window whose two bytes are stored little-endian
    pub fn u16_le_at(&self, start: usize) -> Result<u16, DecodeError> {
        Ok(self.u16_at(start)?.swap_bytes())
    }

    /// Position (0 = most significant) of the single set bit in a one-hot
    /// field
    pub fn one_hot(&self, start: usize, width: usize) -> Result<usize, DecodeError> {
        let value = self.bits(start, width)?;
        match value.count_ones() {
            0 => Err(DecodeError::NoFaceBit),
            1 => Ok(width - 1 - value.trailing_zeros() as usize),
            _ => Err(DecodeError::AmbiguousFace { bits: value as u8 }),
        }
    }
}
