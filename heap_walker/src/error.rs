use std::fmt::Display;

use thiserror::Error;

use crate::address::Address;

/// The invariant a chunk violated while walking the heap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    ZeroSize,
    Misaligned { alignment: u64 },
    /// The next chunk would start past the top sentinel without ever landing on it
    Overshoot { next: Address, top: Address },
    IterationBound { bound: u64 },
    AddressOverflow,
    TopBelowBase { base: Address, top: Address },
}

impl Display for Corruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Corruption::ZeroSize => write!(f, "chunk size is zero"),
            Corruption::Misaligned { alignment } => {
                write!(f, "chunk size is not a multiple of the {} byte alignment", alignment)
            }
            Corruption::Overshoot { next, top } => write!(
                f,
                "next chunk at {} lies past the top chunk at {}",
                next, top
            ),
            Corruption::IterationBound { bound } => write!(
                f,
                "walk did not reach the top chunk within {} chunks",
                bound
            ),
            Corruption::AddressOverflow => write!(f, "chunk size overflows the address space"),
            Corruption::TopBelowBase { base, top } => {
                write!(f, "top chunk {} lies below the heap base {}", top, base)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("symbol `{name}` could not be resolved")]
    SymbolNotFound { name: String },
    #[error("type layout for `{name}` is unavailable")]
    TypeNotFound { name: String },
    #[error("type `{type_name}` has no field `{field}`")]
    FieldNotFound { type_name: String, field: String },
    #[error("failed to read {len} bytes at {address} : {reason}")]
    MemoryAccess {
        address: Address,
        len: usize,
        reason: String,
    },
    #[error("corrupt heap at {address} (observed size field {observed:#x}) : {corruption}")]
    CorruptHeap {
        address: Address,
        observed: u64,
        corruption: Corruption,
    },
    #[error("heap has not been initialised yet (heap base is {base})")]
    HeapUninitialized { base: Address },
}

impl HeapError {
    /// Stable name of the failure class, used as the operator-facing error tag
    pub fn kind(&self) -> &'static str {
        match self {
            HeapError::SymbolNotFound { .. } => "SymbolNotFound",
            HeapError::TypeNotFound { .. } | HeapError::FieldNotFound { .. } => "TypeNotFound",
            HeapError::MemoryAccess { .. } => "MemoryAccessError",
            HeapError::CorruptHeap { .. } => "CorruptHeapError",
            HeapError::HeapUninitialized { .. } => "HeapUninitialized",
        }
    }

    /// Whether rows gathered before this error are still worth showing
    pub fn allows_partial_output(&self) -> bool {
        matches!(
            self,
            HeapError::MemoryAccess { .. } | HeapError::CorruptHeap { .. }
        )
    }

    pub fn memory_access(address: Address, len: usize, reason: impl Into<String>) -> Self {
        HeapError::MemoryAccess {
            address,
            len,
            reason: reason.into(),
        }
    }
}
