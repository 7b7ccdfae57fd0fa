use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use heap_walker::{
    Address, Endian, HeapGeometry,
    layout::{LayoutTable, TypeLayout},
    symbols::SymbolTable,
};
use logger::severity::LogSeverity;
use serde::Deserialize;

use crate::error::ConfigError;

/// A raw memory dump and the address its first byte was captured from
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageSegment {
    pub path: PathBuf,
    pub base: Address,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// A live process, which must be stopped for the duration of the walk
    Pid(u32),
    /// Memory dumps: the heap itself plus wherever the malloc statics live
    Image { segments: Vec<ImageSegment> },
}

fn default_word_size() -> usize {
    4
}

fn default_log_level() -> LogSeverity {
    LogSeverity::Info
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct HeapDumpConfig {
    pub target: TargetSpec,
    /// `nm` listing of the target's executable
    #[serde(default)]
    pub symbol_file: Option<PathBuf>,
    /// Applied on top of `symbol_file`
    #[serde(default)]
    pub symbols: HashMap<String, Address>,
    #[serde(default = "default_word_size")]
    pub word_size: usize,
    #[serde(default)]
    pub alignment: Option<u64>,
    #[serde(default)]
    pub min_chunk_size: Option<u64>,
    #[serde(default)]
    pub endian: Endian,
    /// Extra or replacement type layouts; `struct malloc_chunk` defaults to newlib's
    #[serde(default)]
    pub layouts: Vec<TypeLayout>,
    #[serde(default = "default_log_level")]
    pub log_level: LogSeverity,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub partial_output: bool,
    #[serde(default)]
    pub color: bool,
}

impl HeapDumpConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&text, base_dir)
    }

    /// Parses a config, resolving relative file paths against `base_dir`
    pub fn from_json(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text)?;
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        if let TargetSpec::Image { segments } = &mut config.target {
            segments.iter_mut().for_each(|s| rebase(&mut s.path));
        }
        config.symbol_file.iter_mut().for_each(rebase);
        config.log_file.iter_mut().for_each(rebase);
        config.geometry()?;
        Ok(config)
    }

    pub fn geometry(&self) -> Result<HeapGeometry, ConfigError> {
        if self.word_size != 4 && self.word_size != 8 {
            return Err(ConfigError::InvalidGeometry(format!(
                "word_size must be 4 or 8, got {}",
                self.word_size
            )));
        }
        let mut geometry = HeapGeometry::for_word_size(self.word_size).with_endian(self.endian);
        if let Some(alignment) = self.alignment {
            geometry.alignment = alignment;
        }
        if let Some(min) = self.min_chunk_size {
            geometry.min_chunk_size = min;
        }
        // The two flag bits live below the alignment
        if geometry.alignment < 4 || !geometry.alignment.is_power_of_two() {
            return Err(ConfigError::InvalidGeometry(format!(
                "alignment must be a power of two of at least 4, got {}",
                geometry.alignment
            )));
        }
        if geometry.min_chunk_size == 0 || geometry.min_chunk_size % geometry.alignment != 0 {
            return Err(ConfigError::InvalidGeometry(format!(
                "min_chunk_size must be a positive multiple of the alignment ({}), got {}",
                geometry.alignment, geometry.min_chunk_size
            )));
        }
        Ok(geometry)
    }

    pub fn symbol_table(&self) -> Result<SymbolTable, ConfigError> {
        let mut table = match &self.symbol_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                SymbolTable::parse_nm(&text)
            }
            None => SymbolTable::new(),
        };
        for (name, address) in &self.symbols {
            table.insert(name.clone(), *address);
        }
        Ok(table)
    }

    pub fn layout_table(&self) -> LayoutTable {
        let mut table = LayoutTable::newlib_default(self.word_size);
        for layout in &self.layouts {
            table.insert(layout.clone());
        }
        table
    }
}
