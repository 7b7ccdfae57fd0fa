use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, de};

/// An address in the inspected process.
///
/// This is deliberately not a pointer: nothing can be read through an `Address`
/// without going through a [`MemoryAccessor`](crate::accessor::MemoryAccessor).
/// The only arithmetic supported is stepping forward by a byte count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Address(u64);

impl Address {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, bytes: u64) -> Option<Address> {
        self.0.checked_add(bytes).map(Address)
    }

    /// Number of bytes from `self` forward to `later`, or `None` if `later` lies before `self`.
    pub fn bytes_until(self, later: Address) -> Option<u64> {
        later.0.checked_sub(self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for Address {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse::<u64>()?,
        };
        Ok(Self(raw))
    }
}

// Config files carry addresses either as "0x..." strings or plain integers
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Int(raw) => Ok(Address(raw)),
            Repr::Text(text) => text
                .parse()
                .map_err(|e| de::Error::custom(format!("invalid address `{}` : {}", text, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!("0x1000".parse::<Address>().unwrap(), Address::new(0x1000));
        assert_eq!("0X20".parse::<Address>().unwrap(), Address::new(0x20));
        assert_eq!("4096".parse::<Address>().unwrap(), Address::new(4096));
        assert!("0xnope".parse::<Address>().is_err());
    }

    #[test]
    fn forward_distance() {
        let base = Address::new(0x1000);
        let top = Address::new(0x1030);
        assert_eq!(base.bytes_until(top), Some(0x30));
        assert_eq!(top.bytes_until(base), None);
        assert_eq!(base.bytes_until(base), Some(0));
    }

    #[test]
    fn add_overflow_is_caught() {
        assert_eq!(Address::new(u64::MAX - 1).checked_add(8), None);
        assert_eq!(Address::new(0x1000).checked_add(0x10), Some(Address::new(0x1010)));
    }

    #[test]
    fn deserializes_from_strings_and_integers() {
        let addrs: Vec<Address> = serde_json::from_str(r#"["0x20001000", 4096]"#).unwrap();
        assert_eq!(addrs, vec![Address::new(0x2000_1000), Address::new(4096)]);
        assert!(serde_json::from_str::<Address>(r#""heap""#).is_err());
    }

    #[test]
    fn displays_as_hex() {
        assert_eq!(Address::new(0x1010).to_string(), "0x1010");
    }
}
