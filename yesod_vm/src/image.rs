// Copyright 2026 the Yesod VM Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `YSWD` program image format.
//!
//! Everything is little-endian:
//!
//! ```text
//! offset  size    field
//! 0       4       magic "YSWD"
//! 4       4       announced size (22 + text + data + rodata)
//! 8       4       text size
//! 12      4       data size
//! 16      4       rodata size
//! 20      1       version
//! 21      1       padding (ignored)
//! 22      text    code
//! ..      rodata  read-only data
//! ..      data    initial data
//! end     1       terminator, 0x00
//! ```
//!
//! Note that the section payloads appear in text, rodata, data order while the header lists
//! sizes in text, data, rodata order.

use alloc::vec::Vec;
use core::fmt;

use crate::format::{DecodeError, Reader, Writer};
use crate::isa::VERSION;

/// Image magic bytes.
pub const MAGIC: [u8; 4] = *b"YSWD";

/// Fixed header length in bytes.
pub const HEADER_LEN: u32 = 22;

/// Reasons an image cannot be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The input ended before a header field, section or the terminator.
    Truncated,
    /// The magic bytes were not `YSWD`.
    BadMagic,
    /// The announced size disagrees with the section sizes.
    SizeMismatch {
        /// Size stored in the header.
        announced: u32,
        /// Sum of the three section sizes.
        sections: u64,
    },
    /// Sections plus the stack do not fit in memory.
    TooLarge {
        /// Sum of the three section sizes.
        sections: u64,
        /// Configured stack size.
        stack: u32,
        /// Configured memory size.
        memory: u32,
    },
    /// The image targets a different engine version.
    UnsupportedVersion {
        /// Version byte in the image.
        found: u8,
        /// Version this engine implements.
        expected: u8,
    },
    /// The byte after the last section was missing or nonzero.
    MissingTerminator,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "image truncated"),
            Self::BadMagic => write!(f, "invalid magic number"),
            Self::SizeMismatch {
                announced,
                sections,
            } => write!(
                f,
                "announced binary size ({announced}) incoherent with section sizes ({sections})"
            ),
            Self::TooLarge {
                sections,
                stack,
                memory,
            } => write!(
                f,
                "binary too large ({sections} bytes + {stack} bytes stack) for allocated memory ({memory})"
            ),
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "program version ({found}) incoherent with emulator version ({expected})"
            ),
            Self::MissingTerminator => write!(f, "missing zero terminator at binary file end"),
        }
    }
}

impl core::error::Error for LoadError {}

impl From<DecodeError> for LoadError {
    fn from(_: DecodeError) -> Self {
        Self::Truncated
    }
}

/// A parsed program image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    text: Vec<u8>,
    data: Vec<u8>,
    rodata: Vec<u8>,
}

fn len_u32(bytes: &[u8]) -> u32 {
    u32::try_from(bytes.len()).unwrap_or(u32::MAX)
}

impl Image {
    /// Builds an image from its three sections.
    #[must_use]
    pub fn new(text: Vec<u8>, data: Vec<u8>, rodata: Vec<u8>) -> Self {
        Self { text, data, rodata }
    }

    /// Builds an image whose code is `words`, with empty data sections.
    #[must_use]
    pub fn from_words(words: &[u32]) -> Self {
        let text = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Self::new(text, Vec::new(), Vec::new())
    }

    /// Parses and validates an image.
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = Reader::new(bytes);

        if r.read_bytes(4)? != MAGIC.as_slice() {
            return Err(LoadError::BadMagic);
        }
        let announced = r.read_u32_le()?;
        let text_len = r.read_u32_le()?;
        let data_len = r.read_u32_le()?;
        let rodata_len = r.read_u32_le()?;

        let sections = u64::from(text_len) + u64::from(data_len) + u64::from(rodata_len);
        if sections + u64::from(HEADER_LEN) != u64::from(announced) {
            return Err(LoadError::SizeMismatch {
                announced,
                sections,
            });
        }

        let version = r.read_u8()?;
        if version != VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: version,
                expected: VERSION,
            });
        }
        let _padding = r.read_u8()?;

        let text = r.read_bytes(text_len as usize)?.to_vec();
        let rodata = r.read_bytes(rodata_len as usize)?.to_vec();
        let data = r.read_bytes(data_len as usize)?.to_vec();

        match r.read_u8() {
            Ok(0) => {}
            _ => return Err(LoadError::MissingTerminator),
        }

        Ok(Self { text, data, rodata })
    }

    /// Serializes the image, header and terminator included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let announced = u32::try_from(self.sections_len() + u64::from(HEADER_LEN))
            .unwrap_or(u32::MAX);
        let mut w = Writer::new();
        w.write_bytes(&MAGIC);
        w.write_u32_le(announced);
        w.write_u32_le(self.text_len());
        w.write_u32_le(self.data_len());
        w.write_u32_le(self.rodata_len());
        w.write_u8(VERSION);
        w.write_u8(0);
        w.write_bytes(&self.text);
        w.write_bytes(&self.rodata);
        w.write_bytes(&self.data);
        w.write_u8(0);
        w.into_vec()
    }

    /// Code section.
    #[must_use]
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// Data section.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read-only data section.
    #[must_use]
    pub fn rodata(&self) -> &[u8] {
        &self.rodata
    }

    /// Code section size.
    #[must_use]
    pub fn text_len(&self) -> u32 {
        len_u32(&self.text)
    }

    /// Data section size.
    #[must_use]
    pub fn data_len(&self) -> u32 {
        len_u32(&self.data)
    }

    /// Read-only data section size.
    #[must_use]
    pub fn rodata_len(&self) -> u32 {
        len_u32(&self.rodata)
    }

    /// Combined size of the three sections.
    #[must_use]
    pub fn sections_len(&self) -> u64 {
        u64::from(self.text_len()) + u64::from(self.data_len()) + u64::from(self.rodata_len())
    }
}
