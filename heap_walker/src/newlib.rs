//! Locating newlib's heap from its malloc statics.

use crate::{
    accessor::{Endian, MemoryAccessor},
    address::Address,
    error::HeapError,
    layout::{ChunkLayout, MALLOC_CHUNK_TYPE},
};

/// `char *__malloc_sbrk_base`: first byte handed out by `sbrk`, i.e. the first chunk
pub const SBRK_BASE_SYMBOL: &str = "__malloc_sbrk_base";
/// `mbinptr __malloc_av_[]`: the bin array. Slot 2 holds the top chunk.
pub const MALLOC_AV_SYMBOL: &str = "__malloc_av_";
pub const TOP_BIN_INDEX: u64 = 2;

/// Allocator parameters for the target
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeapGeometry {
    pub word_size: usize,
    pub alignment: u64,
    pub min_chunk_size: u64,
    pub endian: Endian,
}

impl HeapGeometry {
    /// newlib defaults: `MALLOC_ALIGNMENT` is two words, `MINSIZE` is `sizeof(struct malloc_chunk)`
    pub fn for_word_size(word_size: usize) -> Self {
        let w = word_size as u64;
        Self {
            word_size,
            alignment: 2 * w,
            min_chunk_size: 4 * w,
            endian: Endian::Little,
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Largest number of chunks that can fit between `base` and `top` inclusive
    pub fn chunk_bound(&self, span: u64) -> u64 {
        (span / self.min_chunk_size.max(1)).saturating_add(1)
    }
}

impl Default for HeapGeometry {
    fn default() -> Self {
        Self::for_word_size(4)
    }
}

/// The span to walk: from the first chunk up to and including the top chunk
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeapRegion {
    pub base: Address,
    pub top: Address,
}

impl HeapRegion {
    pub fn new(base: Address, top: Address) -> Self {
        Self { base, top }
    }
}

/// Reads the heap base and top chunk out of the target's malloc statics
pub fn locate_region<A: MemoryAccessor + ?Sized>(
    accessor: &A,
    geometry: &HeapGeometry,
) -> Result<HeapRegion, HeapError> {
    let w = geometry.word_size;
    let sbrk_base = accessor.resolve_symbol(SBRK_BASE_SYMBOL)?;
    let bins = accessor.resolve_symbol(MALLOC_AV_SYMBOL)?;

    let base = Address::new(accessor.read_word(sbrk_base, w, geometry.endian)?);
    // newlib initialises the base to (char *)-1 and only replaces it on the first sbrk
    let unset = if w >= 8 { u64::MAX } else { (1u64 << (8 * w)) - 1 };
    if base.get() == 0 || base.get() == unset {
        return Err(HeapError::HeapUninitialized { base });
    }

    let top_slot = bins
        .checked_add(TOP_BIN_INDEX * w as u64)
        .ok_or_else(|| {
            HeapError::memory_access(bins, w, "top bin slot overflows the address space")
        })?;
    let top = Address::new(accessor.read_word(top_slot, w, geometry.endian)?);
    Ok(HeapRegion { base, top })
}

pub fn chunk_layout<A: MemoryAccessor + ?Sized>(accessor: &A) -> Result<ChunkLayout, HeapError> {
    let layout = accessor.resolve_type_layout(MALLOC_CHUNK_TYPE)?;
    ChunkLayout::from_type_layout(&layout)
}
