use std::collections::HashMap;

use crate::{address::Address, error::HeapError};

/// Static symbol addresses in the target, typically loaded from an `nm` listing
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Address>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Parses `nm` output (`<hex address> <type> <name>` per line).
    ///
    /// Undefined symbols have no address column and are skipped, as are blank lines.
    pub fn parse_nm(text: &str) -> Self {
        let mut table = Self::new();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(addr), Some(_kind), Some(name)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if let Ok(raw) = u64::from_str_radix(addr, 16) {
                table.insert(name, Address::new(raw));
            }
        }
        table
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: Address) -> Self {
        self.insert(name, address);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, address: Address) {
        self.symbols.insert(name.into(), address);
    }

    pub fn resolve(&self, name: &str) -> Result<Address, HeapError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| HeapError::SymbolNotFound {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NM_OUTPUT: &str = "\
20000a4c B __malloc_sbrk_base
20000430 D __malloc_av_
         U _sbrk_r
0800123c T _malloc_r

not a symbol line
";

    #[test]
    fn parses_defined_symbols_only() {
        let table = SymbolTable::parse_nm(NM_OUTPUT);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.resolve("__malloc_sbrk_base").unwrap(),
            Address::new(0x2000_0a4c)
        );
        assert_eq!(table.resolve("__malloc_av_").unwrap(), Address::new(0x2000_0430));
        assert!(matches!(
            table.resolve("_sbrk_r"),
            Err(HeapError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn overrides_win() {
        let mut table = SymbolTable::parse_nm(NM_OUTPUT);
        table.insert("__malloc_av_", Address::new(0x1234));
        assert_eq!(table.resolve("__malloc_av_").unwrap(), Address::new(0x1234));
    }
}
