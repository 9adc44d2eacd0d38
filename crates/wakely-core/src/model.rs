// ── Domain model ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── MacAddress ──────────────────────────────────────────────────────

/// Validated MAC address, canonicalized to lowercase colon-separated
/// pairs (aa:bb:cc:dd:ee:ff).
///
/// A string is accepted iff, after stripping `:` separators, exactly
/// 12 hex digits remain. This is the single validation gate for every
/// place a MAC enters the system: interactive flows, single-line
/// commands, and the registry file itself (deserialization re-parses).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress {
    octets: [u8; 6],
}

impl MacAddress {
    /// Parse and validate a MAC address from user input.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let hex: String = raw.chars().filter(|c| *c != ':').collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidMac { input: raw.to_owned() });
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            // Slice bounds are safe: exactly 12 ASCII hex digits.
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| CoreError::InvalidMac { input: raw.to_owned() })?;
        }
        Ok(Self { octets })
    }

    /// The six raw octets, for magic-packet construction.
    pub fn octets(&self) -> [u8; 6] {
        self.octets
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.octets;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A named wake target. `name` is the identity key; uniqueness is
/// enforced by the registry at mutation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub mac: MacAddress,
}

impl Device {
    pub fn new(name: impl Into<String>, mac: MacAddress) -> Self {
        Self { name: name.into(), mac }
    }
}
