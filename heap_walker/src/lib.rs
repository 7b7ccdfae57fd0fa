//! Read-only walker for newlib's (Doug Lea style) boundary-tag heap.
//!
//! The walker never touches target memory directly. Everything goes through a
//! [`MemoryAccessor`], which is implemented for byte snapshots ([`image::MemoryImage`])
//! here and for live processes by the `newlib-heapdump` binary.

pub mod accessor;
pub mod address;
pub mod chunk;
pub mod error;
pub mod image;
pub mod layout;
pub mod newlib;
pub mod report;
pub mod symbols;
pub mod walker;

pub use accessor::{Endian, MemoryAccessor};
pub use address::Address;
pub use chunk::{Chunk, ChunkFlags, ChunkHeader};
pub use error::{Corruption, HeapError};
pub use newlib::{HeapGeometry, HeapRegion, chunk_layout, locate_region};
pub use report::{ReportAggregator, WalkReport};
pub use walker::{HeapWalker, PartialWalk};
