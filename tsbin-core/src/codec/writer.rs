//! Encoder for time-series files

use super::{decode_with, DecodeOptions};
use crate::config::{BYTE_ORDER_MARKER, MAX_FIELD_NAME_LEN};
use crate::{ByteOrder, Result, TimeSeries, TsError};
use bytes::{BufMut, Bytes, BytesMut};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

struct FieldWriter {
    buf: BytesMut,
    order: ByteOrder,
}

impl FieldWriter {
    fn with_capacity(capacity: usize, order: ByteOrder) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            order,
        }
    }

    fn u32(&mut self, value: u32) {
        match self.order {
            ByteOrder::Little => self.buf.put_u32_le(value),
            ByteOrder::Big => self.buf.put_u32(value),
        }
    }

    fn f64(&mut self, value: f64) {
        match self.order {
            ByteOrder::Little => self.buf.put_f64_le(value),
            ByteOrder::Big => self.buf.put_f64(value),
        }
    }

    /// Row count and column count plus one
    fn block_header(&mut self, series: &TimeSeries) -> Result<()> {
        self.u32(header_word(series.len(), "row count")?);
        self.u32(column_word(series.columns())?);
        Ok(())
    }

    /// Time block followed by one block per column
    fn body(&mut self, series: &TimeSeries) {
        for &t in series.time() {
            self.f64(t);
        }
        for column in 0..series.columns() {
            for value in series.column_iter(column) {
                self.f64(value);
            }
        }
    }

    fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Header fields are 32 bits wide
fn header_word(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| TsError::InvalidFormat(format!("{} {} does not fit in 32 bits", what, value)))
}

/// Column count plus one, as stored in block headers
fn column_word(columns: usize) -> Result<u32> {
    columns
        .checked_add(1)
        .and_then(|c1| u32::try_from(c1).ok())
        .ok_or_else(|| {
            TsError::InvalidFormat(format!("{} columns do not fit in a 32 bit header", columns))
        })
}

/// Longest prefix of `name` that fits the signed length byte
fn clamp_name(name: &str) -> &str {
    if name.len() <= MAX_FIELD_NAME_LEN {
        return name;
    }
    let mut end = MAX_FIELD_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn block_size(series: &TimeSeries) -> usize {
    super::SEGMENT_HEADER_SIZE + super::body_size(series.len(), series.columns()).unwrap_or(0)
}

/// Encode a complete file image.
///
/// Format:
/// - 4 bytes: marker `1`
/// - 4 bytes: description length
/// - N bytes: description
/// - 4 bytes: row count
/// - 4 bytes: column count plus one
/// - per column: 1 byte name length, name bytes
/// - time block, then one block per column
pub fn encode(series: &TimeSeries, order: ByteOrder) -> Result<Bytes> {
    let names_size: usize = series.fields().iter().map(|f| 1 + clamp_name(f).len()).sum();
    let capacity = 8 + series.description().len() + names_size + block_size(series);
    let mut writer = FieldWriter::with_capacity(capacity, order);

    writer.u32(BYTE_ORDER_MARKER);

    let description = series.description().as_bytes();
    writer.u32(header_word(description.len(), "description length")?);
    writer.buf.put_slice(description);

    writer.block_header(series)?;
    for name in series.fields() {
        let name = clamp_name(name);
        writer.buf.put_i8(name.len() as i8);
        writer.buf.put_slice(name.as_bytes());
    }
    writer.body(series);

    debug!(
        rows = series.len(),
        columns = series.columns(),
        byte_order = %order,
        "encoded time series"
    );
    Ok(writer.finish())
}

/// Encode the rows of `series` as a segment to append after an existing file
pub fn encode_segment(series: &TimeSeries, order: ByteOrder) -> Result<Bytes> {
    let mut writer = FieldWriter::with_capacity(block_size(series), order);
    writer.block_header(series)?;
    writer.body(series);
    Ok(writer.finish())
}

/// Write `series` to `path`, replacing any existing file
pub fn write_file(path: impl AsRef<Path>, series: &TimeSeries, order: ByteOrder) -> Result<()> {
    let path = path.as_ref();
    let encoded = encode(series, order)?;

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&encoded)?;
    file.flush()?;

    info!(
        "Wrote {} rows x {} columns to {:?} ({} bytes)",
        series.len(),
        series.columns(),
        path,
        encoded.len()
    );
    Ok(())
}

/// Append the rows of `series` as a new segment of an existing file.
///
/// The segment is written in the file's own byte order and must have the
/// same number of columns as the file. The existing file must end exactly
/// after its last block, otherwise the new segment could never be read
/// back. Returns the file's byte order.
pub fn append_segment(path: impl AsRef<Path>, series: &TimeSeries) -> Result<ByteOrder> {
    let path = path.as_ref();
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;

    let mut existing = Vec::new();
    file.read_to_end(&mut existing)?;
    let (current, summary) = decode_with(&existing, &DecodeOptions::default())?;

    if current.columns() != series.columns() {
        return Err(TsError::InvalidFormat(format!(
            "Segment has {} columns, file {:?} has {}",
            series.columns(),
            path,
            current.columns()
        )));
    }
    if summary.trailing_bytes > 0 {
        return Err(TsError::InvalidFormat(format!(
            "File {:?} has {} unreadable trailing bytes after its last block",
            path, summary.trailing_bytes
        )));
    }

    let order = summary.byte_order;
    let encoded = encode_segment(series, order)?;
    file.write_all(&encoded)?;
    file.flush()?;

    info!(
        "Appended segment of {} rows to {:?} ({} byte order)",
        series.len(),
        path,
        order
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, decode_with, DecodeOptions};
    use tempfile::TempDir;

    fn sample_series() -> TimeSeries {
        let mut series = TimeSeries::with_fields("bus 4 voltage", ["V", "angle"]);
        series.append_row(0.0, &[1.0, 0.0]).unwrap();
        series.append_row(0.1, &[0.99, -0.02]).unwrap();
        series.append_row(0.2, &[0.97, -0.05]).unwrap();
        series
    }

    #[test]
    fn test_encoded_layout() {
        let series = sample_series();
        let encoded = encode(&series, ByteOrder::Little).unwrap();

        assert_eq!(&encoded[0..4], &1u32.to_le_bytes());
        assert_eq!(&encoded[4..8], &13u32.to_le_bytes());
        assert_eq!(&encoded[8..21], b"bus 4 voltage");
        assert_eq!(&encoded[21..25], &3u32.to_le_bytes());
        assert_eq!(&encoded[25..29], &3u32.to_le_bytes());
        assert_eq!(encoded[29], 1);
        assert_eq!(&encoded[30..31], b"V");
        assert_eq!(encoded[31], 5);
        assert_eq!(&encoded[32..37], b"angle");
        // 3 times + 2 columns of 3 values
        assert_eq!(encoded.len(), 37 + 9 * 8);
        assert_eq!(&encoded[37..45], &0.0f64.to_le_bytes());
        // First value of the second column
        assert_eq!(&encoded[37 + 48..37 + 56], &0.0f64.to_le_bytes());
        assert_eq!(&encoded[37 + 56..37 + 64], &(-0.02f64).to_le_bytes());
    }

    #[test]
    fn test_encode_decode_both_orders() {
        let series = sample_series();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let encoded = encode(&series, order).unwrap();
            let (decoded, summary) = decode_with(&encoded, &DecodeOptions::default()).unwrap();
            assert_eq!(summary.byte_order, order);
            assert_eq!(decoded.description(), series.description());
            assert_eq!(decoded.fields(), series.fields());
            assert_eq!(decoded.time(), series.time());
            assert_eq!(decoded.column(1), series.column(1));
        }
    }

    #[test]
    fn test_long_field_name_is_clamped() {
        let long = "é".repeat(100);
        let series = TimeSeries::with_fields("", [long.as_str()]);
        let decoded = decode(&encode(&series, ByteOrder::Little).unwrap()).unwrap();

        let name = &decoded.fields()[0];
        assert!(name.len() <= MAX_FIELD_NAME_LEN);
        assert_eq!(name.len(), 126);
        assert!(long.starts_with(name.as_str()));
    }

    #[test]
    fn test_write_and_append_segment() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("series.bin");

        let series = sample_series();
        write_file(&path, &series, ByteOrder::Big).unwrap();

        let mut more = TimeSeries::with_fields("", ["V", "angle"]);
        more.append_row(0.3, &[0.96, -0.06]).unwrap();
        let order = append_segment(&path, &more).unwrap();
        assert_eq!(order, ByteOrder::Big);

        let data = std::fs::read(&path).unwrap();
        let (loaded, summary) = decode_with(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(summary.segments, 2);
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.time(), &[0.0, 0.1, 0.2, 0.3]);
        assert_eq!(loaded.row(3), &[0.96, -0.06]);
        assert_eq!(loaded.description(), "bus 4 voltage");
    }

    #[test]
    fn test_append_segment_rejects_other_width() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("series.bin");
        write_file(&path, &sample_series(), ByteOrder::Little).unwrap();

        let narrow = TimeSeries::with_columns(1);
        let err = append_segment(&path, &narrow).unwrap_err();
        assert!(matches!(err, TsError::InvalidFormat(_)));
    }

    #[test]
    fn test_append_segment_to_short_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("short.bin");
        std::fs::write(&path, [1u8, 0]).unwrap();

        let err = append_segment(&path, &sample_series()).unwrap_err();
        assert!(matches!(err, TsError::Truncated { .. }));
    }

    #[test]
    fn test_append_segment_rejects_trailing_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tail.bin");

        let mut series = TimeSeries::with_columns(1);
        series.append_value(0.0, 1.0, 0).unwrap();
        let mut data = encode(&series, ByteOrder::Little).unwrap().to_vec();
        data.extend_from_slice(&[0u8; 9]);
        std::fs::write(&path, &data).unwrap();
        assert_eq!(decode(&data).unwrap().len(), 1);

        let mut more = TimeSeries::with_columns(1);
        more.append_value(1.0, 2.0, 0).unwrap();
        let err = append_segment(&path, &more).unwrap_err();
        assert!(matches!(err, TsError::InvalidFormat(_)));

        // The file is left as it was
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_append_segment_rejects_truncated_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cut.bin");

        let encoded = encode(&sample_series(), ByteOrder::Big).unwrap();
        let cut = &encoded[..encoded.len() - 3];
        std::fs::write(&path, cut).unwrap();

        let mut more = TimeSeries::with_fields("", ["V", "angle"]);
        more.append_row(0.3, &[0.96, -0.06]).unwrap();
        let err = append_segment(&path, &more).unwrap_err();
        assert!(matches!(err, TsError::Truncated { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), cut);
    }

    #[test]
    fn test_oversized_header_fields_are_rejected() {
        assert_eq!(header_word(7, "row count").unwrap(), 7);
        assert_eq!(column_word(2).unwrap(), 3);
        assert!(matches!(column_word(u32::MAX as usize), Err(TsError::InvalidFormat(_))));

        #[cfg(target_pointer_width = "64")]
        {
            let too_big = u32::MAX as usize + 1;
            assert!(matches!(
                header_word(too_big, "row count"),
                Err(TsError::InvalidFormat(_))
            ));
            assert!(column_word(too_big).is_err());
        }
    }
}
