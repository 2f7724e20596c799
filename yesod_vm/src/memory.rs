// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte-addressable machine memory.
//!
//! All accesses are bounds-checked against the allocated size. Multi-byte accesses validate the
//! whole range before touching any byte, so a failed store leaves memory unchanged.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// An access fell outside the allocated memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutOfBounds {
    /// First address of the rejected access.
    pub addr: u32,
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory access out of bounds at {:#010x}", self.addr)
    }
}

impl core::error::Error for OutOfBounds {}

/// Zero-initialized memory of a fixed size.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl Memory {
    /// Allocates `size` zeroed bytes.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            bytes: vec![0; size as usize],
        }
    }

    /// Returns the size in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        u32::try_from(self.bytes.len()).unwrap_or(u32::MAX)
    }

    /// Returns the whole memory as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, OutOfBounds> {
        let start = addr as usize;
        let end = start.checked_add(len).ok_or(OutOfBounds { addr })?;
        if end > self.bytes.len() {
            return Err(OutOfBounds { addr });
        }
        Ok(start..end)
    }

    /// Reads the byte at `addr`.
    pub fn read_u8(&self, addr: u32) -> Result<u8, OutOfBounds> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(OutOfBounds { addr })
    }

    /// Writes the byte at `addr`.
    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), OutOfBounds> {
        let slot = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(OutOfBounds { addr })?;
        *slot = value;
        Ok(())
    }

    /// Reads a little-endian word at `addr`.
    pub fn read_u32_le(&self, addr: u32) -> Result<u32, OutOfBounds> {
        let b = &self.bytes[self.range(addr, 4)?];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Writes a little-endian word at `addr`.
    pub fn write_u32_le(&mut self, addr: u32, value: u32) -> Result<(), OutOfBounds> {
        let range = self.range(addr, 4)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Returns `len` bytes starting at `addr`.
    pub fn read_bytes(&self, addr: u32, len: usize) -> Result<&[u8], OutOfBounds> {
        Ok(&self.bytes[self.range(addr, len)?])
    }

    /// Copies `data` into memory starting at `addr`.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), OutOfBounds> {
        let range = self.range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Zeroes every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}
