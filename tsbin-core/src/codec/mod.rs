//! Binary codec for time-series files
//!
//! File layout (all fields fixed width, no padding):
//!
//! - 4 bytes: byte order marker (`1` in the file's byte order)
//! - 4 bytes: description length `D`
//! - D bytes: description text
//! - 4 bytes: row count `R`
//! - 4 bytes: data column count plus one `C1`
//! - per data column: 1 signed byte name length `L`, then `L` bytes if `L > 0`
//! - R doubles: time column
//! - per data column: R doubles
//!
//! A file may be followed by extra segments, each holding `R'`, `C1'` and
//! the same time and column blocks. Readers stop at the first segment whose
//! column count does not match the primary block.

mod reader;
mod writer;

pub use reader::{decode, decode_with, read_file};
pub use writer::{append_segment, encode, encode_segment, write_file};

use crate::ByteOrder;
use serde::Serialize;

/// Size of a segment header (`R` and `C1`)
pub const SEGMENT_HEADER_SIZE: usize = 8;

/// Size of one encoded value
pub const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Options controlling how a file is decoded
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Read segments appended after the primary block
    pub follow_segments: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            follow_segments: true,
        }
    }
}

/// What the decoder learned about a file besides its contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    /// Byte order selected by the marker
    pub byte_order: ByteOrder,
    /// Number of blocks read, including the primary block
    pub segments: usize,
    /// Bytes consumed by the decoder
    pub bytes_read: usize,
    /// Bytes left unread after the last matching segment
    pub trailing_bytes: usize,
}

/// Size of the data body for `rows` rows and `columns` data columns
pub(crate) fn body_size(rows: usize, columns: usize) -> Option<usize> {
    columns
        .checked_add(1)?
        .checked_mul(rows)?
        .checked_mul(VALUE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_size() {
        assert_eq!(body_size(3, 2), Some(72));
        assert_eq!(body_size(0, 5), Some(0));
        assert_eq!(body_size(10, 0), Some(80));
        assert_eq!(body_size(usize::MAX, 1), None);
    }
}
