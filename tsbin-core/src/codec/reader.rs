//! Decoder for time-series files

use super::{body_size, DecodeOptions, FileSummary, SEGMENT_HEADER_SIZE};
use crate::buffer::SeriesBuffer;
use crate::fields::FieldCatalog;
use crate::{ByteOrder, Result, TimeSeries, TsError};
use bytes::Buf;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Cursor over the bytes after the marker, aware of the file's byte order
#[derive(Clone)]
struct FieldReader<'a> {
    input: &'a [u8],
    order: ByteOrder,
}

impl<'a> FieldReader<'a> {
    fn remaining(&self) -> usize {
        self.input.remaining()
    }

    fn require(&self, needed: usize, context: &'static str) -> Result<()> {
        let available = self.remaining();
        if available < needed {
            return Err(TsError::Truncated {
                context,
                needed,
                available,
            });
        }
        Ok(())
    }

    fn u32(&mut self, context: &'static str) -> Result<u32> {
        self.require(4, context)?;
        Ok(match self.order {
            ByteOrder::Little => self.input.get_u32_le(),
            ByteOrder::Big => self.input.get_u32(),
        })
    }

    fn i8(&mut self, context: &'static str) -> Result<i8> {
        self.require(1, context)?;
        Ok(self.input.get_i8())
    }

    fn text(&mut self, len: usize, context: &'static str) -> Result<String> {
        self.require(len, context)?;
        let (raw, rest) = self.input.split_at(len);
        self.input = rest;

        let text = String::from_utf8_lossy(raw);
        if let Cow::Owned(_) = text {
            warn!("Invalid UTF-8 in {}, replaced with U+FFFD", context);
        }
        Ok(text.into_owned())
    }

    /// Read one value. Callers check the bounds for the whole block first.
    fn f64(&mut self) -> f64 {
        match self.order {
            ByteOrder::Little => self.input.get_f64_le(),
            ByteOrder::Big => self.input.get_f64(),
        }
    }
}

/// Decode a complete file image with default options
pub fn decode(data: &[u8]) -> Result<TimeSeries> {
    decode_with(data, &DecodeOptions::default()).map(|(series, _)| series)
}

/// Decode a complete file image
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<(TimeSeries, FileSummary)> {
    if data.len() < 4 {
        return Err(TsError::Truncated {
            context: "byte order marker",
            needed: 4,
            available: data.len(),
        });
    }

    let mut marker = [0u8; 4];
    marker.copy_from_slice(&data[..4]);
    let order = ByteOrder::from_marker(marker);
    let mut reader = FieldReader {
        input: &data[4..],
        order,
    };

    // Header
    let description_len = reader.u32("description length")? as usize;
    let description = reader.text(description_len, "description")?;
    let rows = reader.u32("row count")? as usize;
    let columns_plus_one = reader.u32("column count")?;
    let columns = columns_plus_one.checked_sub(1).ok_or_else(|| {
        TsError::InvalidFormat("Column count field is 0, must include the time column".into())
    })? as usize;

    debug!(
        byte_order = %order,
        rows,
        columns,
        "decoding time-series header"
    );

    // Field headers, each at least one length byte
    reader.require(columns, "field headers")?;
    let mut names = Vec::with_capacity(columns);
    for _ in 0..columns {
        let len = reader.i8("field name length")?;
        if len > 0 {
            names.push(Some(reader.text(len as usize, "field name")?));
        } else {
            names.push(None);
        }
    }
    let fields = FieldCatalog::from_names(names);

    // Primary block
    let mut buffer = SeriesBuffer::new(columns);
    read_block(&mut reader, &mut buffer, 0, rows, "data block")?;
    let mut count = rows;
    let mut segments = 1;

    // Segments appended after the primary block
    if options.follow_segments {
        while reader.remaining() >= SEGMENT_HEADER_SIZE {
            let mut probe = reader.clone();
            let segment_rows = probe.u32("segment row count")? as usize;
            let segment_columns = probe.u32("segment column count")? as usize;
            if segment_columns != columns + 1 {
                debug!(
                    found = segment_columns,
                    expected = columns + 1,
                    "segment column count mismatch, stopping"
                );
                break;
            }

            reader = probe;
            read_block(&mut reader, &mut buffer, count, segment_rows, "segment data block")?;
            count += segment_rows;
            segments += 1;
        }
    }

    let trailing_bytes = reader.remaining();
    if trailing_bytes > 0 {
        debug!("Ignoring {} trailing bytes", trailing_bytes);
    }

    let summary = FileSummary {
        byte_order: order,
        segments,
        bytes_read: data.len() - trailing_bytes,
        trailing_bytes,
    };

    Ok((TimeSeries::from_parts(description, fields, buffer, count), summary))
}

/// Read `rows` time values and `rows` values per column into the buffer
/// starting at row `start`
fn read_block(
    reader: &mut FieldReader<'_>,
    buffer: &mut SeriesBuffer,
    start: usize,
    rows: usize,
    context: &'static str,
) -> Result<()> {
    let columns = buffer.columns();
    let needed = body_size(rows, columns).ok_or(TsError::Truncated {
        context,
        needed: usize::MAX,
        available: reader.remaining(),
    })?;
    reader.require(needed, context)?;

    buffer.ensure_capacity(start + rows);

    for slot in &mut buffer.time_mut()[start..start + rows] {
        *slot = reader.f64();
    }
    for column in 0..columns {
        buffer.fill_column(column, start, (0..rows).map(|_| reader.f64()));
    }

    Ok(())
}

/// Load a file from disk
pub fn read_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<(TimeSeries, FileSummary)> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let (series, summary) = decode_with(&data, options)?;
    info!(
        "Loaded {} rows x {} columns from {:?} ({} byte order, {} segments)",
        series.len(),
        series.columns(),
        path,
        summary.byte_order,
        summary.segments
    );

    Ok((series, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    /// Hand-assembled file image, independent of the writer
    struct Image {
        buf: BytesMut,
        order: ByteOrder,
    }

    impl Image {
        fn new(order: ByteOrder) -> Self {
            let mut image = Self {
                buf: BytesMut::new(),
                order,
            };
            image.u32(1);
            image
        }

        fn u32(&mut self, v: u32) -> &mut Self {
            match self.order {
                ByteOrder::Little => self.buf.put_u32_le(v),
                ByteOrder::Big => self.buf.put_u32(v),
            }
            self
        }

        fn text(&mut self, s: &str) -> &mut Self {
            self.u32(s.len() as u32);
            self.buf.put_slice(s.as_bytes());
            self
        }

        fn name(&mut self, s: &str) -> &mut Self {
            self.buf.put_i8(s.len() as i8);
            self.buf.put_slice(s.as_bytes());
            self
        }

        fn values(&mut self, values: &[f64]) -> &mut Self {
            for v in values {
                match self.order {
                    ByteOrder::Little => self.buf.put_f64_le(*v),
                    ByteOrder::Big => self.buf.put_f64(*v),
                }
            }
            self
        }

        fn bytes(&self) -> Vec<u8> {
            self.buf.to_vec()
        }
    }

    fn sample_image(order: ByteOrder) -> Image {
        let mut image = Image::new(order);
        image
            .text("test")
            .u32(3)
            .u32(3)
            .name("A")
            .name("")
            .values(&[0.0, 1.0, 2.0])
            .values(&[10.0, 20.0, 30.0])
            .values(&[100.0, 200.0, 300.0]);
        image
    }

    #[test]
    fn test_decode_reference_file() {
        let data = sample_image(ByteOrder::Little).bytes();
        let (series, summary) = decode_with(&data, &DecodeOptions::default()).unwrap();

        assert_eq!(summary.byte_order, ByteOrder::Little);
        assert_eq!(summary.segments, 1);
        assert_eq!(summary.trailing_bytes, 0);
        assert_eq!(summary.bytes_read, data.len());

        assert_eq!(series.description(), "test");
        assert_eq!(series.fields(), &["A", "field_1"]);
        assert_eq!(series.time(), &[0.0, 1.0, 2.0]);
        assert_eq!(series.column(0), vec![10.0, 20.0, 30.0]);
        assert_eq!(series.column(1), vec![100.0, 200.0, 300.0]);
        assert_eq!(series.capacity(), 3);
    }

    #[test]
    fn test_decode_big_endian() {
        let little = decode(&sample_image(ByteOrder::Little).bytes()).unwrap();
        let data = sample_image(ByteOrder::Big).bytes();
        assert_eq!(&data[..4], &[0, 0, 0, 1]);

        let (big, summary) = decode_with(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(summary.byte_order, ByteOrder::Big);
        assert_eq!(big.time(), little.time());
        assert_eq!(big.fields(), little.fields());
        assert_eq!(big.column(1), little.column(1));
    }

    #[test]
    fn test_column_count_is_header_minus_one() {
        for c1 in 1u32..5 {
            let mut image = Image::new(ByteOrder::Little);
            image.text("").u32(0).u32(c1);
            for _ in 1..c1 {
                image.name("");
            }
            let series = decode(&image.bytes()).unwrap();
            assert_eq!(series.columns(), (c1 - 1) as usize);
            assert_eq!(series.fields().len(), (c1 - 1) as usize);
        }
    }

    #[test]
    fn test_zero_data_columns() {
        let mut image = Image::new(ByteOrder::Little);
        image.text("clock").u32(2).u32(1).values(&[0.5, 1.5]);

        let series = decode(&image.bytes()).unwrap();
        assert_eq!(series.columns(), 0);
        assert_eq!(series.time(), &[0.5, 1.5]);
        assert!(series.fields().is_empty());
    }

    #[test]
    fn test_zero_column_field_rejected() {
        let mut image = Image::new(ByteOrder::Little);
        image.text("").u32(0).u32(0);

        let err = decode(&image.bytes()).unwrap_err();
        assert!(matches!(err, TsError::InvalidFormat(_)));
    }

    #[test]
    fn test_negative_name_length_is_synthesized() {
        let mut image = Image::new(ByteOrder::Little);
        image.text("").u32(1).u32(3);
        image.buf.put_i8(-4);
        image.name("B").values(&[1.0, 2.0, 3.0]);

        let series = decode(&image.bytes()).unwrap();
        assert_eq!(series.fields(), &["field_0", "B"]);
        assert_eq!(series.row(0), &[2.0, 3.0]);
    }

    #[test]
    fn test_truncated_file() {
        let data = sample_image(ByteOrder::Little).bytes();

        // Cut inside every region of the file
        for cut in [0, 3, 6, 10, 14, 18, 21, 30, data.len() - 1] {
            let err = decode(&data[..cut]).unwrap_err();
            assert!(
                matches!(err, TsError::Truncated { .. }),
                "cut at {} gave {:?}",
                cut,
                err
            );
        }
    }

    #[test]
    fn test_huge_row_count_fails_before_allocating() {
        let mut image = Image::new(ByteOrder::Little);
        image.text("").u32(u32::MAX).u32(u32::MAX);

        let err = decode(&image.bytes()).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_trailing_segments() {
        let mut image = sample_image(ByteOrder::Big);
        image
            .u32(2)
            .u32(3)
            .values(&[3.0, 4.0])
            .values(&[40.0, 50.0])
            .values(&[400.0, 500.0]);

        let (series, summary) = decode_with(&image.bytes(), &DecodeOptions::default()).unwrap();
        assert_eq!(summary.segments, 2);
        assert_eq!(series.len(), 5);
        assert_eq!(series.time(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.column(0), vec![10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(series.column(1), vec![100.0, 200.0, 300.0, 400.0, 500.0]);
    }

    #[test]
    fn test_segment_with_other_width_is_ignored() {
        let mut image = sample_image(ByteOrder::Little);
        image.u32(1).u32(2).values(&[9.0, 9.0]);
        let data = image.bytes();

        let (series, summary) = decode_with(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(summary.segments, 1);
        assert_eq!(summary.trailing_bytes, 24);
    }

    #[test]
    fn test_segments_can_be_disabled() {
        let mut image = sample_image(ByteOrder::Little);
        image.u32(1).u32(3).values(&[3.0, 40.0, 400.0]);

        let options = DecodeOptions {
            follow_segments: false,
        };
        let (series, summary) = decode_with(&image.bytes(), &options).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(summary.trailing_bytes, 8 + 24);
    }

    #[test]
    fn test_truncated_segment_is_an_error() {
        let mut image = sample_image(ByteOrder::Little);
        image.u32(2).u32(3).values(&[3.0, 4.0, 40.0]);

        let err = decode(&image.bytes()).unwrap_err();
        assert!(matches!(
            err,
            TsError::Truncated {
                context: "segment data block",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut image = Image::new(ByteOrder::Little);
        image.u32(2);
        image.buf.put_slice(&[0x66, 0xff]);
        image.u32(0).u32(1);

        let series = decode(&image.bytes()).unwrap();
        assert_eq!(series.description(), "f\u{fffd}");
    }

    #[test]
    fn test_read_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("sample.bin");
        std::fs::write(&path, sample_image(ByteOrder::Little).bytes()).unwrap();

        let (series, summary) = read_file(&path, &DecodeOptions::default()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(summary.byte_order, ByteOrder::Little);

        let missing = read_file(temp_dir.path().join("missing.bin"), &DecodeOptions::default());
        assert!(matches!(missing, Err(TsError::Io(_))));
    }
}
