//! Hardware Address

use crate::BleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bluetooth hardware address in `xx:xx:xx:xx:xx:xx` form.
///
/// Stored as given (case preserved) because configured device identifiers
/// are matched against it by exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BleAddress(String);

impl BleAddress {
    /// Parse an address, accepting six `:`-separated hex octets
    pub fn parse(text: &str) -> Result<Self, BleError> {
        let octets: Vec<&str> = text.split(':').collect();
        let valid = octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
        if valid {
            Ok(Self(text.to_string()))
        } else {
            Err(BleError::InvalidAddress(text.to_string()))
        }
    }

    /// Address text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BleAddress {
    type Err = BleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BleAddress {
    type Error = BleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BleAddress> for String {
    fn from(addr: BleAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for BleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let addr = BleAddress::parse("a4:C1:38:0b:11:2F").unwrap();
        assert_eq!(addr.as_str(), "a4:C1:38:0b:11:2F");
        assert_eq!(addr.as_str().len(), 17);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(BleAddress::parse("").is_err());
        assert!(BleAddress::parse("Thermo-1").is_err());
        assert!(BleAddress::parse("a4:c1:38:0b:11").is_err());
        assert!(BleAddress::parse("a4:c1:38:0b:11:zz").is_err());
        assert!(BleAddress::parse("a4:c1:38:0b:11:2f:00").is_err());
    }
}
