// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Primitives for extracting and packing arbitrary-width
//! big-endian integers within byte buffers
//!
//! Most of the container is big-endian and bit-packed,
//! so these let us pull a field out of a buffer
//! without caring whether it straddles byte boundaries.
//!
//! ```
//! use flac_meta::bits::read_bits;
//!
//! let data = [0b1010_1100, 0b0101_0000];
//!
//! // 3 bits, starting 2 bits into the first byte
//! assert_eq!(read_bits(&data, 0, 3, 2).unwrap(), 0b101);
//!
//! // 8 bits, straddling both bytes
//! assert_eq!(read_bits(&data, 0, 8, 4).unwrap(), 0b1100_0101);
//! ```

use crate::Error;
use arrayvec::ArrayVec;
use bitstream_io::{BigEndian, BitRead, BitReader};

/// Reads `bit_count` bits from `buffer`, starting `bit_offset`
/// bits into the byte at `byte_offset`
///
/// Bits are consumed most-significant first and returned
/// right-aligned.  A `bit_count` of 0 always returns 0.
///
/// # Errors
///
/// Returns [`Error::InvalidBitRange`] if `bit_offset` is not
/// within a single byte, or if `bit_offset + bit_count`
/// exceeds 64 bits.
/// Returns an I/O error if the range runs past the end
/// of the buffer.
pub fn read_bits(
    buffer: &[u8],
    byte_offset: usize,
    bit_count: u32,
    bit_offset: u32,
) -> Result<u64, Error> {
    if bit_offset >= 8 || bit_offset + bit_count > u64::BITS {
        return Err(Error::InvalidBitRange {
            bit_offset,
            bit_count,
        });
    } else if bit_count == 0 {
        return Ok(0);
    }

    let mut r = BitReader::endian(
        buffer
            .get(byte_offset..)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?,
        BigEndian,
    );
    r.skip(bit_offset)?;
    Ok(r.read_var::<u64>(bit_count)?)
}

/// Reads `bit_count` bits from the start of the byte at `byte_offset`
///
/// ```
/// use flac_meta::bits::read_bits_at;
///
/// assert_eq!(read_bits_at(&[0x00, 0x01, 0x02], 1, 16).unwrap(), 0x0102);
/// ```
#[inline]
pub fn read_bits_at(buffer: &[u8], byte_offset: usize, bit_count: u32) -> Result<u64, Error> {
    read_bits(buffer, byte_offset, bit_count, 0)
}

/// Reads a single bit as a boolean
#[inline]
pub fn read_bool(buffer: &[u8], byte_offset: usize, bit_offset: u32) -> Result<bool, Error> {
    read_bits(buffer, byte_offset, 1, bit_offset).map(|bit| bit == 1)
}

/// Reverses `length` bytes of `buffer` in place, starting at `offset`
///
/// This turns a little-endian field into a big-endian one
/// (and back again).
///
/// # Panics
///
/// Panics if the range is outside of `buffer`.
///
/// ```
/// use flac_meta::bits::{read_bits_at, reverse_bytes};
///
/// let mut length = [0x20, 0x00, 0x00, 0x00];  // 32, little-endian
/// reverse_bytes(&mut length, 0, 4);
/// assert_eq!(read_bits_at(&length, 0, 32).unwrap(), 32);
/// ```
pub fn reverse_bytes(buffer: &mut [u8], offset: usize, length: usize) {
    buffer[offset..offset + length].reverse()
}

/// Packs the low `byte_width` bytes of `value`, big-endian
///
/// # Errors
///
/// Returns [`Error::InvalidBitRange`] if `byte_width`
/// is larger than 8 or `value` does not fit in that many bytes.
///
/// ```
/// use flac_meta::bits::pack;
///
/// assert_eq!(pack(0x01_02_03, 3).unwrap().as_slice(), &[0x01, 0x02, 0x03]);
/// assert!(pack(0x01_02_03, 2).is_err());
/// ```
pub fn pack(value: u64, byte_width: usize) -> Result<ArrayVec<u8, 8>, Error> {
    let out_of_range = || Error::InvalidBitRange {
        bit_offset: 0,
        bit_count: (byte_width * 8).try_into().unwrap_or(u32::MAX),
    };

    let skip = 8usize.checked_sub(byte_width).ok_or_else(out_of_range)?;
    let bytes = value.to_be_bytes();
    match bytes[0..skip].iter().all(|b| *b == 0) {
        true => Ok(bytes[skip..].iter().copied().collect()),
        false => Err(out_of_range()),
    }
}
