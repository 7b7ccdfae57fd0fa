use std::collections::HashMap;

use serde::Deserialize;

use crate::error::HeapError;

pub const MALLOC_CHUNK_TYPE: &str = "struct malloc_chunk";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u64,
    pub size: usize,
}

/// Byte layout of a structure in the target, as debug info would describe it
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TypeLayout {
    pub name: String,
    pub size: usize,
    pub fields: Vec<FieldLayout>,
}

impl TypeLayout {
    pub fn field(&self, name: &str) -> Result<&FieldLayout, HeapError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| HeapError::FieldNotFound {
                type_name: self.name.clone(),
                field: name.to_string(),
            })
    }

    /// `struct malloc_chunk` as newlib's mallocr.c declares it, for the given pointer width
    pub fn newlib_malloc_chunk(word_size: usize) -> Self {
        let w = word_size as u64;
        let field = |name: &str, index: u64| FieldLayout {
            name: name.to_string(),
            offset: index * w,
            size: word_size,
        };
        Self {
            name: MALLOC_CHUNK_TYPE.to_string(),
            size: 4 * word_size,
            fields: vec![
                field("prev_size", 0),
                field("size", 1),
                field("fd", 2),
                field("bk", 3),
            ],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayoutTable {
    layouts: HashMap<String, TypeLayout>,
}

impl LayoutTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn newlib_default(word_size: usize) -> Self {
        Self::new().with_layout(TypeLayout::newlib_malloc_chunk(word_size))
    }

    pub fn with_layout(mut self, layout: TypeLayout) -> Self {
        self.insert(layout);
        self
    }

    /// Replaces any layout already registered under the same name
    pub fn insert(&mut self, layout: TypeLayout) {
        self.layouts.insert(layout.name.clone(), layout);
    }

    pub fn resolve(&self, name: &str) -> Result<TypeLayout, HeapError> {
        self.layouts
            .get(name)
            .cloned()
            .ok_or_else(|| HeapError::TypeNotFound {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// The parts of a chunk header the walker needs, pulled out of `struct malloc_chunk`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    pub size_offset: u64,
    pub size_width: usize,
    /// Offset of `fd`, which is where the client's data begins on an in-use chunk
    pub user_data_offset: u64,
}

impl ChunkLayout {
    pub fn from_type_layout(layout: &TypeLayout) -> Result<Self, HeapError> {
        let size = layout.field("size")?;
        let fd = layout.field("fd")?;
        Ok(Self {
            size_offset: size.offset,
            size_width: size.size,
            user_data_offset: fd.offset,
        })
    }

    pub fn newlib(word_size: usize) -> Self {
        let w = word_size as u64;
        Self {
            size_offset: w,
            size_width: word_size,
            user_data_offset: 2 * w,
        }
    }
}
