//! Bit-packed validity bitmaps.

use crate::error::Error;
use crate::memory::Buffer;
use crate::util::bit_util;
use thiserror::Error;

/// One bit per element, least-significant bit first; a set bit marks a valid
/// element.
#[derive(PartialEq, Debug, Clone)]
pub struct Bitmap {
    pub(crate) bits: Buffer,
    len: usize,
}

impl Bitmap {
    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of bytes holding the bits, `ceil(len / 8)`.
    pub fn num_bytes(&self) -> usize {
        self.bits.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bits.data()
    }

    pub fn buffer(&self) -> &Buffer {
        &self.bits
    }

    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn is_set(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index out of bound");
        unsafe { bit_util::get_bit_raw(self.bits.raw_data(), i) }
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        let bytes = self.as_bytes();
        (0..self.len).map(move |i| bit_util::get_bit(bytes, i))
    }

    pub fn count_set_bits(&self) -> usize {
        let full = self.len / 8;
        let bytes = self.as_bytes();
        let mut count: usize = bytes[..full].iter().map(|b| b.count_ones() as usize).sum();
        for i in full * 8..self.len {
            if bit_util::get_bit(bytes, i) {
                count += 1;
            }
        }
        count
    }
}

/// Packs a host logical array into a validity bitmap of `len` bits.
///
/// Each byte of `valid` must be `0` or `1`. An empty `valid` with a non-zero
/// `len` means the host did not supply validity, and every element is valid.
///
/// # Errors
///
/// Returns `Error::BitPackValidity` if `valid` holds a byte other than `0` or
/// `1`, or if its length is neither `0` nor `len`. Returns `Error::Allocation`
/// if the bitmap cannot be allocated.
pub fn pack(valid: &[u8], len: usize) -> Result<Bitmap, Error> {
    let mut bytes = vec![0_u8; bit_util::bytes_for(len)];
    if valid.is_empty() {
        for i in 0..len {
            bit_util::set_bit(&mut bytes, i);
        }
    } else if valid.len() == len {
        for (i, &v) in valid.iter().enumerate() {
            match v {
                0 => {}
                1 => bit_util::set_bit(&mut bytes, i),
                value => return Err(PackError::InvalidLogical { index: i, value }.into()),
            }
        }
    } else {
        return Err(PackError::LengthMismatch {
            expected: len,
            actual: valid.len(),
        }
        .into());
    }
    Ok(Bitmap {
        bits: Buffer::from_slice_copy(&bytes)?,
        len,
    })
}

/// Expands a bitmap back into one `bool` per element.
pub fn unpack(bitmap: &Bitmap) -> Vec<bool> {
    bitmap.iter().collect()
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("validity element {index} is not a logical value: {value}")]
    InvalidLogical { index: usize, value: u8 },
    #[error("expected {expected} validity elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}
