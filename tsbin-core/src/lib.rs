//! TsBin Core - Columnar Time-Series Container
//!
//! An in-memory table of one time column plus N data columns, backed by a
//! compact binary file format that describes its own byte order.
//!
//! # Architecture
//!
//! - **Buffer**: Growable row-major storage with a doubling growth policy
//! - **Field Catalog**: Column names, read from file headers or synthesized
//! - **Codec**: Reader and writer for the binary layout, including
//!   trailing segments appended to an existing file
//! - **TimeSeries**: The public container with append, resize and load
//!
//! # Example
//!
//! ```no_run
//! use tsbin_core::{ByteOrder, TimeSeries};
//!
//! fn main() -> tsbin_core::Result<()> {
//!     let mut series = TimeSeries::with_fields("bus voltages", ["v1", "v2"]);
//!     series.append_row(0.0, &[1.0, 0.98])?;
//!     series.append_row(0.5, &[1.01, 0.97])?;
//!     series.save("voltages.bin", ByteOrder::Little)?;
//!
//!     let loaded = TimeSeries::load("voltages.bin")?;
//!     assert_eq!(loaded.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod codec;
pub mod fields;
pub mod series;

mod error;
mod types;

pub use codec::{DecodeOptions, FileSummary};
pub use error::{Result, TsError};
pub use series::TimeSeries;
pub use types::*;

/// TsBin version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Capacity an empty buffer grows to on its first append
    pub const MIN_APPEND_CAPACITY: usize = 16;

    /// Capacity multiplier applied when a buffer is full
    pub const GROWTH_FACTOR: usize = 2;

    /// Value of the leading marker, as written by every encoder
    pub const BYTE_ORDER_MARKER: u32 = 1;

    /// Longest field name the signed length byte can describe
    pub const MAX_FIELD_NAME_LEN: usize = i8::MAX as usize;

    /// Prefix for synthesized column names
    pub const FIELD_NAME_PREFIX: &str = "field_";
}
