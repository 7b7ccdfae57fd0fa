//! Chunk header decoding.
//!
//! A header's size field keeps the chunk size in its high bits and two flag bits in
//! its low bits. Whether a chunk is in use is *not* recorded in its own header: the
//! allocator stores it as the `PREV_INUSE` bit of the following chunk. Decoding
//! chunk N therefore always needs chunk N + 1's header as well.

use std::fmt::Display;

use crate::address::Address;

pub const FLAG_MASK: u64 = 0x3;
pub const PREV_INUSE: u64 = 0x1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ChunkFlags(u8);

impl ChunkFlags {
    pub fn from_bits(bits: u64) -> Self {
        Self((bits & FLAG_MASK) as u8)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether the chunk *before* this one is in use
    pub fn prev_in_use(self) -> bool {
        self.0 as u64 & PREV_INUSE != 0
    }
}

impl Display for ChunkFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04b}", self.0)
    }
}

/// A decoded size field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub size: u64,
    pub flags: ChunkFlags,
}

impl ChunkHeader {
    /// Splits a raw size field. Any bit pattern decodes; validity is the caller's concern.
    pub fn decode(raw: u64) -> Self {
        Self {
            size: raw & !FLAG_MASK,
            flags: ChunkFlags::from_bits(raw),
        }
    }

    pub fn encode(size: u64, flags: ChunkFlags) -> u64 {
        (size & !FLAG_MASK) | flags.bits() as u64
    }
}

/// In-use status of a chunk, read from the header of the chunk that follows it
pub fn is_in_use(next: &ChunkHeader) -> bool {
    next.flags.prev_in_use()
}

/// One row of the heap map
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub address: Address,
    pub raw_size: u64,
    pub size: u64,
    /// The chunk's own flag bits, kept verbatim
    pub flags: ChunkFlags,
    pub in_use: bool,
    /// Start of the client's data, only present on in-use chunks
    pub user_data: Option<Address>,
}

impl Chunk {
    pub fn is_free(&self) -> bool {
        !self.in_use
    }
}
