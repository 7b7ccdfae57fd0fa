use heap_walker::{
    Address, HeapError, MemoryAccessor,
    image::MemoryImage,
    layout::{LayoutTable, TypeLayout},
    symbols::SymbolTable,
};
use process_memory::{CopyAddress, Pid, ProcessHandle, TryIntoProcessHandle};

use crate::{
    config::{HeapDumpConfig, TargetSpec},
    error::{CommandError, ConfigError},
};

/// Where a command gets its view of the target from. Each invocation opens a fresh
/// accessor so nothing read from the target outlives the command.
pub trait TargetSource {
    fn open(&self) -> Result<Box<dyn MemoryAccessor>, CommandError>;

    fn describe(&self) -> String;
}

/// A running (and stopped) process, read with `process_memory`
pub struct ProcessTarget {
    pid: u32,
    handle: ProcessHandle,
    symbols: SymbolTable,
    layouts: LayoutTable,
}

impl ProcessTarget {
    pub fn attach(
        pid: u32,
        symbols: SymbolTable,
        layouts: LayoutTable,
    ) -> Result<Self, CommandError> {
        let handle = (pid as Pid)
            .try_into_process_handle()
            .map_err(|source| CommandError::Attach { pid, source })?;
        Ok(Self {
            pid,
            handle,
            symbols,
            layouts,
        })
    }
}

impl MemoryAccessor for ProcessTarget {
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>, HeapError> {
        let addr = usize::try_from(address.get()).map_err(|_| {
            HeapError::memory_access(address, len, "address does not fit this host's pointer width")
        })?;
        let mut buf = vec![0u8; len];
        self.handle
            .copy_address(addr, &mut buf)
            .map_err(|e| {
                HeapError::memory_access(address, len, format!("process {} : {}", self.pid, e))
            })?;
        Ok(buf)
    }

    fn resolve_symbol(&self, name: &str) -> Result<Address, HeapError> {
        self.symbols.resolve(name)
    }

    fn resolve_type_layout(&self, name: &str) -> Result<TypeLayout, HeapError> {
        self.layouts.resolve(name)
    }
}

impl TargetSource for HeapDumpConfig {
    fn open(&self) -> Result<Box<dyn MemoryAccessor>, CommandError> {
        let symbols = self.symbol_table()?;
        let layouts = self.layout_table();
        match &self.target {
            TargetSpec::Pid(pid) => Ok(Box::new(ProcessTarget::attach(*pid, symbols, layouts)?)),
            TargetSpec::Image { segments } => {
                let mut image = MemoryImage::default()
                    .with_symbols(symbols)
                    .with_layouts(layouts);
                for segment in segments {
                    let bytes = std::fs::read(&segment.path).map_err(|source| ConfigError::Io {
                        path: segment.path.clone(),
                        source,
                    })?;
                    image = image.with_segment(segment.base, bytes);
                }
                Ok(Box::new(image))
            }
        }
    }

    fn describe(&self) -> String {
        match &self.target {
            TargetSpec::Pid(pid) => format!("process {}", pid),
            TargetSpec::Image { segments } => format!("memory image ({} segments)", segments.len()),
        }
    }
}

/// An in-memory image handed straight to commands, without touching the filesystem
impl TargetSource for MemoryImage {
    fn open(&self) -> Result<Box<dyn MemoryAccessor>, CommandError> {
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        format!("memory image ({} segments)", self.segment_count())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use heap_walker::{Endian, image::SyntheticHeap, locate_region};

    #[test]
    fn image_config_reads_dump_files() {
        let dir = std::env::temp_dir().join(format!("heapdump-target-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("heap.bin"), [0u8, 0, 0, 0, 0x11, 0, 0, 0]).unwrap();
        std::fs::write(dir.join("statics.bin"), [0x00u8, 0x10, 0, 0]).unwrap();

        let config = HeapDumpConfig::from_json(
            r#"{
                "target": { "image": { "segments": [
                    { "path": "heap.bin", "base": "0x1000" },
                    { "path": "statics.bin", "base": "0x400" }
                ] } },
                "symbols": { "__malloc_sbrk_base": "0x400" }
            }"#,
            &dir,
        )
        .unwrap();
        let target = config.open().unwrap();
        assert_eq!(config.describe(), "memory image (2 segments)");
        assert_eq!(
            target.read_word(Address::new(0x1004), 4, Endian::Little).unwrap(),
            0x11
        );
        let sbrk = target.resolve_symbol("__malloc_sbrk_base").unwrap();
        assert_eq!(target.read_word(sbrk, 4, Endian::Little).unwrap(), 0x1000);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_dump_file_is_a_config_error() {
        let config = HeapDumpConfig::from_json(
            r#"{ "target": { "image": { "segments": [ { "path": "nope.bin", "base": 0 } ] } } }"#,
            Path::new("/definitely/not/here"),
        )
        .unwrap();
        assert!(matches!(
            config.open(),
            Err(CommandError::Config(ConfigError::Io { .. }))
        ));
    }

    #[test]
    fn image_source_hands_out_copies() {
        let image = SyntheticHeap::new(Address::new(0x1000), 4)
            .chunk(16, true)
            .chunk(16, true)
            .with_newlib_statics(Address::new(0x400))
            .build();
        let target = image.open().unwrap();
        let region = locate_region(&*target, &heap_walker::HeapGeometry::default()).unwrap();
        assert_eq!(region.top, Address::new(0x1010));
    }
}
