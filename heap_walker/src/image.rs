//! Offline targets: memory captured into byte buffers, e.g. with gdb's
//! `dump binary memory heap.bin <start> <end>`.

use crate::{
    accessor::{Endian, MemoryAccessor},
    address::Address,
    chunk::{ChunkFlags, ChunkHeader, PREV_INUSE},
    error::HeapError,
    layout::{LayoutTable, TypeLayout},
    newlib::{HeapRegion, MALLOC_AV_SYMBOL, SBRK_BASE_SYMBOL},
    symbols::SymbolTable,
};

#[derive(Clone, Debug)]
struct Segment {
    base: Address,
    bytes: Vec<u8>,
}

impl Segment {
    fn slice(&self, address: Address, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(self.base.bytes_until(address)?).ok()?;
        let end = start.checked_add(len)?;
        self.bytes.get(start..end)
    }
}

/// A snapshot of target memory made of one or more segments, plus the symbols
/// and type layouts that describe it
#[derive(Clone, Debug, Default)]
pub struct MemoryImage {
    segments: Vec<Segment>,
    symbols: SymbolTable,
    layouts: LayoutTable,
}

impl MemoryImage {
    pub fn new(base: Address, bytes: Vec<u8>) -> Self {
        Self::default().with_segment(base, bytes)
    }

    pub fn with_segment(mut self, base: Address, bytes: Vec<u8>) -> Self {
        self.segments.push(Segment { base, bytes });
        self
    }

    pub fn with_symbols(mut self, symbols: SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_layouts(mut self, layouts: LayoutTable) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl MemoryAccessor for MemoryImage {
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>, HeapError> {
        self.segments
            .iter()
            .find_map(|segment| segment.slice(address, len))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| HeapError::memory_access(address, len, "address is not mapped in the image"))
    }

    fn resolve_symbol(&self, name: &str) -> Result<Address, HeapError> {
        self.symbols.resolve(name)
    }

    fn resolve_type_layout(&self, name: &str) -> Result<TypeLayout, HeapError> {
        self.layouts.resolve(name)
    }
}

pub fn encode_word(value: u64, width: usize, endian: Endian) -> Vec<u8> {
    match endian {
        Endian::Little => value.to_le_bytes()[..width].to_vec(),
        Endian::Big => value.to_be_bytes()[8 - width..].to_vec(),
    }
}

/// Builds a newlib-shaped heap in memory from a list of chunk sizes.
///
/// The last chunk pushed becomes the top chunk. Each chunk's `PREV_INUSE` bit is
/// set from the in-use state of the chunk before it; the first chunk always has
/// it set, as newlib does.
#[derive(Clone, Debug)]
pub struct SyntheticHeap {
    base: Address,
    word_size: usize,
    endian: Endian,
    chunks: Vec<(u64, bool)>,
    raw_overrides: Vec<(usize, u64)>,
    statics: Option<Address>,
}

impl SyntheticHeap {
    pub fn new(base: Address, word_size: usize) -> Self {
        Self {
            base,
            word_size,
            endian: Endian::Little,
            chunks: Vec::new(),
            raw_overrides: Vec::new(),
            statics: None,
        }
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn chunk(mut self, size: u64, in_use: bool) -> Self {
        self.chunks.push((size, in_use));
        self
    }

    /// Overwrites the raw size field of the chunk at `index` after layout
    pub fn corrupt_size(mut self, index: usize, raw: u64) -> Self {
        self.raw_overrides.push((index, raw));
        self
    }

    /// Places `__malloc_sbrk_base` and `__malloc_av_` at `address`, pointing at this heap
    pub fn with_newlib_statics(mut self, address: Address) -> Self {
        self.statics = Some(address);
        self
    }

    pub fn chunk_addresses(&self) -> Vec<Address> {
        let mut addresses = Vec::with_capacity(self.chunks.len());
        let mut offset = 0;
        for (size, _) in &self.chunks {
            addresses.push(Address::new(self.base.get() + offset));
            offset += size;
        }
        addresses
    }

    pub fn region(&self) -> HeapRegion {
        let top = self.chunk_addresses().last().copied().unwrap_or(self.base);
        HeapRegion::new(self.base, top)
    }

    pub fn build(&self) -> MemoryImage {
        let w = self.word_size;
        let total: u64 = self.chunks.iter().map(|(size, _)| size).sum();
        // Room for the top chunk's header even if its size is tiny
        let mut bytes = vec![0u8; total as usize + 2 * w];

        let mut offset = 0usize;
        let mut prev_in_use = true;
        for (index, &(size, in_use)) in self.chunks.iter().enumerate() {
            let flags = if prev_in_use {
                ChunkFlags::from_bits(PREV_INUSE)
            } else {
                ChunkFlags::default()
            };
            let raw = self
                .raw_overrides
                .iter()
                .rev()
                .find(|(i, _)| *i == index)
                .map(|(_, raw)| *raw)
                .unwrap_or_else(|| ChunkHeader::encode(size, flags));
            let field = offset + w;
            bytes[field..field + w].copy_from_slice(&encode_word(raw, w, self.endian));
            offset += size as usize;
            prev_in_use = in_use;
        }

        let mut image =
            MemoryImage::new(self.base, bytes).with_layouts(LayoutTable::newlib_default(w));

        if let Some(statics) = self.statics {
            let region = self.region();
            let mut words = Vec::with_capacity(4 * w);
            // __malloc_sbrk_base, then __malloc_av_[0..3]
            words.extend(encode_word(region.base.get(), w, self.endian));
            words.extend(encode_word(0, w, self.endian));
            words.extend(encode_word(0, w, self.endian));
            words.extend(encode_word(region.top.get(), w, self.endian));
            let symbols = SymbolTable::new()
                .with_symbol(SBRK_BASE_SYMBOL, statics)
                .with_symbol(MALLOC_AV_SYMBOL, Address::new(statics.get() + w as u64));
            image = image.with_segment(statics, words).with_symbols(symbols);
        }
        image
    }
}
