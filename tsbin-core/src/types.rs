//! Core types for TsBin

use crate::{Result, TsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in seconds of simulation time
pub type Timestamp = f64;

/// Byte order of every multi-byte field after the leading marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

impl ByteOrder {
    /// Pick the byte order from the raw leading four bytes.
    ///
    /// The marker is always written as `1`. If it reads as `1` under a
    /// little-endian interpretation the file is little-endian; any other
    /// value means the rest of the file is big-endian.
    pub fn from_marker(raw: [u8; 4]) -> Self {
        if u32::from_le_bytes(raw) == crate::config::BYTE_ORDER_MARKER {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Byte order of the machine we are running on
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(TsError::InvalidFormat(format!(
                "Unknown byte order: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert_eq!(ByteOrder::from_marker(1u32.to_le_bytes()), ByteOrder::Little);
        assert_eq!(ByteOrder::from_marker(1u32.to_be_bytes()), ByteOrder::Big);
        // Anything that is not a little-endian one falls back to big-endian
        assert_eq!(ByteOrder::from_marker([0, 0, 0, 0]), ByteOrder::Big);
        assert_eq!(ByteOrder::from_marker([2, 0, 0, 0]), ByteOrder::Big);
    }

    #[test]
    fn test_parse_byte_order() {
        assert_eq!("little".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert_eq!("BE".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert!("middle".parse::<ByteOrder>().is_err());
    }
}
