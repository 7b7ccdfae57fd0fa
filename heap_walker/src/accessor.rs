use serde::Deserialize;

use crate::{address::Address, error::HeapError, layout::TypeLayout};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Read-only view of the inspected process.
///
/// Every byte the walker looks at comes through here; implementations must never
/// write to the target.
pub trait MemoryAccessor {
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>, HeapError>;

    fn resolve_symbol(&self, name: &str) -> Result<Address, HeapError>;

    fn resolve_type_layout(&self, name: &str) -> Result<TypeLayout, HeapError>;

    /// Reads an unsigned integer of `width` bytes (1 to 8) at `address`
    fn read_word(&self, address: Address, width: usize, endian: Endian) -> Result<u64, HeapError> {
        if width == 0 || width > 8 {
            return Err(HeapError::memory_access(
                address,
                width,
                format!("unsupported word width of {} bytes", width),
            ));
        }
        let bytes = self.read_memory(address, width)?;
        if bytes.len() != width {
            return Err(HeapError::memory_access(
                address,
                width,
                format!("short read of {} bytes", bytes.len()),
            ));
        }
        let mut buf = [0u8; 8];
        let value = match endian {
            Endian::Little => {
                buf[..width].copy_from_slice(&bytes);
                u64::from_le_bytes(buf)
            }
            Endian::Big => {
                buf[8 - width..].copy_from_slice(&bytes);
                u64::from_be_bytes(buf)
            }
        };
        Ok(value)
    }
}

impl<T: MemoryAccessor + ?Sized> MemoryAccessor for &T {
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>, HeapError> {
        (**self).read_memory(address, len)
    }

    fn resolve_symbol(&self, name: &str) -> Result<Address, HeapError> {
        (**self).resolve_symbol(name)
    }

    fn resolve_type_layout(&self, name: &str) -> Result<TypeLayout, HeapError> {
        (**self).resolve_type_layout(name)
    }
}

impl<T: MemoryAccessor + ?Sized> MemoryAccessor for Box<T> {
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>, HeapError> {
        (**self).read_memory(address, len)
    }

    fn resolve_symbol(&self, name: &str) -> Result<Address, HeapError> {
        (**self).resolve_symbol(name)
    }

    fn resolve_type_layout(&self, name: &str) -> Result<TypeLayout, HeapError> {
        (**self).resolve_type_layout(name)
    }
}
