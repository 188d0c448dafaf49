use crate::compiler::{
    ast::{Scalar, MAX_BIT_WIDTH},
    config::BitPacking,
};

use super::{ebcdic, error::LayoutError};

/// Size of the simulated 24-bit address space.
pub const MEMORY_SIZE: u32 = 1 << 24;

/// Longest CHARACTER value, in bytes.
pub const MAX_STRING: usize = 256;

/**
The compile time image of simulated memory.  Variables and character data
are allocated upward from address 0 at the `cursor`; the data of BIT values
wider than 32 bits is allocated downward from the top of memory at the
`free_limit`.  The two regions may never meet.

The `put`/`get` functions mirror the runtime library functions of the same
names, storing FIXED values as big-endian words and CHARACTER values as a
descriptor, `((length - 1) << 24) | address`, pointing at EBCDIC data.
 */
pub struct MemoryImage {
    bytes: Vec<u8>,
    cursor: u32,
    free_limit: u32,
    packing: BitPacking,
}

impl MemoryImage {
    pub fn new(packing: BitPacking) -> MemoryImage {
        MemoryImage {
            bytes: vec![0; MEMORY_SIZE as usize],
            cursor: 0,
            free_limit: MEMORY_SIZE,
            packing,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Reserves `n` bytes at the cursor and returns their address.
    pub fn allocate(&mut self, n: u32) -> Result<u32, LayoutError> {
        let address = self.cursor;
        self.cursor = self
            .cursor
            .checked_add(n)
            .ok_or(LayoutError::AddressOutOfRange(self.cursor))?;
        self.check_limits()?;
        Ok(address)
    }

    fn check_limits(&self) -> Result<(), LayoutError> {
        if self.cursor > self.free_limit {
            Err(LayoutError::OutOfMemory {
                cursor: self.cursor,
                limit: self.free_limit,
            })
        } else {
            Ok(())
        }
    }

    fn range(&self, address: u32, n: u32) -> Result<std::ops::Range<usize>, LayoutError> {
        let end = address as u64 + n as u64;
        if end > MEMORY_SIZE as u64 {
            Err(LayoutError::AddressOutOfRange(address))
        } else {
            Ok(address as usize..end as usize)
        }
    }

    /// Stores the low 32 bits of `value`.
    pub fn put_fixed(&mut self, address: u32, value: i64) -> Result<(), LayoutError> {
        let r = self.range(address, 4)?;
        self.bytes[r].copy_from_slice(&(value as u32).to_be_bytes());
        Ok(())
    }

    pub fn get_fixed(&self, address: u32) -> Result<u32, LayoutError> {
        let r = self.range(address, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[r]);
        Ok(u32::from_be_bytes(word))
    }

    /**
    Stores `value` as a BIT(`width`).  Values up to 32 bits wide are stored
    directly at `address`.  Wider values are stored in the downward growing
    region: the first store allocates their bytes and leaves a descriptor at
    `address`; later stores reuse the data area the descriptor points at.
     */
    pub fn put_bit(&mut self, address: u32, width: u32, value: i64) -> Result<(), LayoutError> {
        check_width(width)?;
        let num_bytes = Scalar::bit_bytes(width);
        let data = if width > 32 {
            let mut descriptor = self.get_fixed(address)?;
            if descriptor == 0 {
                self.free_limit = self
                    .free_limit
                    .checked_sub(num_bytes)
                    .ok_or(LayoutError::AddressOutOfRange(self.free_limit))?;
                self.check_limits()?;
                descriptor = ((num_bytes - 1) << 24) | self.free_limit;
                self.put_fixed(address, descriptor as i64)?;
            }
            self.follow(address, descriptor, num_bytes)?
        } else {
            address
        };

        let mut bytes = widen(value, num_bytes as usize);
        mask(&mut bytes, width);
        if let Some(shift) = self.shift(width) {
            shift_left(&mut bytes, shift);
        }

        let r = self.range(data, num_bytes)?;
        self.bytes[r].copy_from_slice(&bytes);
        Ok(())
    }

    /// Reads a BIT(`width`), returning its bytes right justified.
    pub fn get_bit(&self, address: u32, width: u32) -> Result<Vec<u8>, LayoutError> {
        check_width(width)?;
        let num_bytes = Scalar::bit_bytes(width);
        let data = if width > 32 {
            let descriptor = self.get_fixed(address)?;
            self.follow(address, descriptor, num_bytes)?
        } else {
            address
        };

        let r = self.range(data, num_bytes)?;
        let mut bytes = self.bytes[r].to_vec();
        if let Some(shift) = self.shift(width) {
            shift_right(&mut bytes, shift);
        }
        Ok(bytes)
    }

    fn follow(&self, address: u32, descriptor: u32, num_bytes: u32) -> Result<u32, LayoutError> {
        let found = (descriptor >> 24) + 1;
        if found != num_bytes {
            return Err(LayoutError::DescriptorMismatch {
                address,
                expected: num_bytes,
                found,
            });
        }
        Ok(descriptor & 0xFF_FFFF)
    }

    /// Bits that a wide BIT value is shifted left by when stored.
    fn shift(&self, width: u32) -> Option<u32> {
        match self.packing {
            BitPacking::Shifted if width > 32 && width % 8 != 0 => Some(8 - width % 8),
            _ => None,
        }
    }

    /// Stores `text` as EBCDIC data at the cursor and writes its descriptor
    /// at `address`.  An empty string is stored as a zero descriptor.
    pub fn put_character(&mut self, address: u32, text: &str) -> Result<(), LayoutError> {
        let data = ebcdic::encode(text).map_err(LayoutError::Unencodable)?;
        self.put_character_bytes(address, &data)
    }

    pub fn put_character_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), LayoutError> {
        if data.len() > MAX_STRING {
            return Err(LayoutError::StringTooLong(data.len()));
        }
        if data.is_empty() {
            return self.put_fixed(address, 0);
        }

        let len = data.len() as u32;
        let saddress = self.allocate(len)?;
        let r = self.range(saddress, len)?;
        self.bytes[r].copy_from_slice(data);
        self.put_fixed(address, (((len - 1) << 24) | saddress) as i64)
    }

    /// The EBCDIC data of the CHARACTER whose descriptor is at `address`.
    pub fn get_character(&self, address: u32) -> Result<Vec<u8>, LayoutError> {
        let descriptor = self.get_fixed(address)?;
        if descriptor == 0 {
            return Ok(vec![]);
        }
        let len = (descriptor >> 24) + 1;
        let r = self.range(descriptor & 0xFF_FFFF, len)?;
        Ok(self.bytes[r].to_vec())
    }
}

fn check_width(width: u32) -> Result<(), LayoutError> {
    if width == 0 || width > MAX_BIT_WIDTH {
        Err(LayoutError::BitWidth(String::new(), width))
    } else {
        Ok(())
    }
}

/// `value`, sign extended to `n` big-endian bytes.
fn widen(value: i64, n: usize) -> Vec<u8> {
    let fill = if value < 0 { 0xFF } else { 0x00 };
    (0..n)
        .map(|i| {
            let k = n - 1 - i;
            if k < 8 {
                (value >> (8 * k)) as u8
            } else {
                fill
            }
        })
        .collect()
}

/// Clears every bit above the low `width` bits.
fn mask(bytes: &mut [u8], width: u32) {
    let n = bytes.len();
    let full = (width / 8) as usize;
    let rem = width % 8;
    for (i, b) in bytes.iter_mut().enumerate() {
        let k = n - 1 - i;
        if k == full {
            *b &= ((1u16 << rem) - 1) as u8;
        } else if k > full {
            *b = 0;
        }
    }
}

fn shift_left(bytes: &mut [u8], shift: u32) {
    let n = bytes.len();
    for i in 0..n {
        let carry = if i + 1 < n {
            bytes[i + 1] >> (8 - shift)
        } else {
            0
        };
        bytes[i] = (bytes[i] << shift) | carry;
    }
}

fn shift_right(bytes: &mut [u8], shift: u32) {
    for i in (0..bytes.len()).rev() {
        let carry = if i > 0 { bytes[i - 1] << (8 - shift) } else { 0 };
        bytes[i] = (bytes[i] >> shift) | carry;
    }
}
