//! CRC-8 integrity primitive.
//!
//! Polynomial 0x07, MSB-first, no reflection, no final XOR (catalogued as
//! CRC-8/SMBUS). The frame header and the payload are checked by two
//! independent running computations, both seeded with [`CRC8_SEED`].

use crc::{CRC_8_SMBUS, Crc};

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Seed used for both the header and the payload checksum.
pub const CRC8_SEED: u8 = 0;

/// Fold one byte into a running CRC-8 value.
pub const fn crc8_step(acc: u8, byte: u8) -> u8 {
    let mut crc = acc ^ byte;
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ 0x07
        } else {
            crc << 1
        };
        bit += 1;
    }
    crc
}

/// CRC-8 of a whole slice, seeded with [`CRC8_SEED`].
///
/// Table-driven; equal to folding [`crc8_step`] over `data`.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}
