//! The time-series container

use crate::buffer::SeriesBuffer;
use crate::codec::{self, DecodeOptions};
use crate::fields::FieldCatalog;
use crate::{ByteOrder, Result, Timestamp, TsError};
use std::path::Path;

/// A table of one time column plus `columns` data columns.
///
/// Rows are stored in a buffer whose capacity grows by doubling; only the
/// first [`len`](TimeSeries::len) rows are valid. Timestamps are expected to
/// increase: appending at or before the last timestamp overwrites the last
/// row instead of adding one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    description: String,
    buffer: SeriesBuffer,
    fields: FieldCatalog,
    count: usize,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeries {
    /// Create an empty series with a single data column
    pub fn new() -> Self {
        Self::with_columns(1)
    }

    /// Create an empty series with `columns` unnamed data columns
    pub fn with_columns(columns: usize) -> Self {
        Self {
            description: String::new(),
            buffer: SeriesBuffer::new(columns),
            fields: FieldCatalog::synthesized(columns),
            count: 0,
        }
    }

    /// Create an empty series with named columns.
    ///
    /// Empty names are replaced by `field_<index>`.
    pub fn with_fields<I, S>(description: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = FieldCatalog::from_names(fields.into_iter().map(Some));
        Self {
            description: description.into(),
            buffer: SeriesBuffer::new(fields.len()),
            fields,
            count: 0,
        }
    }

    pub(crate) fn from_parts(
        description: String,
        fields: FieldCatalog,
        buffer: SeriesBuffer,
        count: usize,
    ) -> Self {
        debug_assert_eq!(fields.len(), buffer.columns());
        debug_assert!(count <= buffer.capacity());
        Self {
            description,
            buffer,
            fields,
            count,
        }
    }

    /// Load a file, following any appended segments
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &DecodeOptions::default())
    }

    /// Load a file with explicit decode options
    pub fn load_with(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        codec::read_file(path, options).map(|(series, _)| series)
    }

    /// Write the series to `path`, replacing the file
    pub fn save(&self, path: impl AsRef<Path>, order: ByteOrder) -> Result<()> {
        codec::write_file(path, self, order)
    }

    /// Append the rows of this series as a segment of an existing file
    pub fn append_to_file(&self, path: impl AsRef<Path>) -> Result<ByteOrder> {
        codec::append_segment(path, self)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Free-text label
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replace the free-text label
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Number of valid rows
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if there are no valid rows
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of data columns
    pub fn columns(&self) -> usize {
        self.buffer.columns()
    }

    /// Number of physical rows
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Timestamps of the valid rows
    pub fn time(&self) -> &[f64] {
        &self.buffer.time()[..self.count]
    }

    /// Values of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.len()`.
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.count, "row {} out of range ({} rows)", row, self.count);
        self.buffer.row(row)
    }

    /// Values of one column over the valid rows
    pub fn column_iter(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        let rows = if column < self.columns() { self.count } else { 0 };
        self.buffer.column_values(column, rows)
    }

    /// Values of one column, collected
    pub fn column(&self, column: usize) -> Vec<f64> {
        self.column_iter(column).collect()
    }

    /// A single value, if both indices are valid
    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        (column < self.columns() && row < self.count).then(|| self.buffer.get(row, column))
    }

    /// Timestamp of the last valid row
    pub fn last_time(&self) -> Option<Timestamp> {
        self.time().last().copied()
    }

    /// Values of the last valid row
    pub fn last_row(&self) -> Option<&[f64]> {
        self.count.checked_sub(1).map(|row| self.buffer.row(row))
    }

    /// First and last timestamps
    pub fn time_span(&self) -> Option<(Timestamp, Timestamp)> {
        let time = self.time();
        Some((*time.first()?, *time.last()?))
    }

    /// Column names
    pub fn fields(&self) -> &[String] {
        self.fields.as_slice()
    }

    /// Name of one column
    pub fn field(&self, column: usize) -> Option<&str> {
        self.fields.get(column)
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.position(name)
    }

    // ------------------------------------------------------------------
    // Sizing
    // ------------------------------------------------------------------

    /// Grow the physical row count to at least `capacity` (never shrinks)
    pub fn set_capacity(&mut self, capacity: usize) {
        self.buffer.ensure_capacity(capacity);
    }

    /// Grow the number of data columns to `columns` (never shrinks).
    ///
    /// Existing columns keep their values, new ones are zero and get
    /// synthesized names.
    pub fn set_column_count(&mut self, columns: usize) {
        self.buffer.ensure_columns(columns);
        self.fields.extend_to(columns);
    }

    /// Set the number of valid rows, zeroing any newly exposed rows
    pub fn resize(&mut self, rows: usize) {
        self.buffer.ensure_capacity(rows);
        for row in self.count..rows {
            self.buffer.time_mut()[row] = 0.0;
            self.buffer.row_mut(row).fill(0.0);
        }
        self.count = rows;
    }

    /// Drop all rows, keeping capacity and columns
    pub fn clear(&mut self) {
        self.count = 0;
    }

    // ------------------------------------------------------------------
    // Appending
    // ------------------------------------------------------------------

    /// Append a sample at time `t`.
    ///
    /// A single value is written to `column` (default 0) and leaves the
    /// other columns of the row untouched. Otherwise `values` must hold one
    /// value per column. If `t` is not after the last timestamp the last row
    /// is overwritten.
    ///
    /// On error the series is left unchanged.
    pub fn append(&mut self, t: Timestamp, values: &[f64], column: Option<usize>) -> Result<()> {
        let columns = self.columns();
        match values {
            [value] => {
                let column = column.unwrap_or(0);
                if column >= columns {
                    return Err(TsError::ColumnOutOfRange { column, columns });
                }
                let row = self.claim_row(t);
                self.buffer.set(row, column, *value);
            }
            _ if values.len() == columns => {
                let row = self.claim_row(t);
                self.buffer.row_mut(row).copy_from_slice(values);
            }
            _ => {
                return Err(TsError::ShapeMismatch {
                    expected: columns,
                    actual: values.len(),
                })
            }
        }
        Ok(())
    }

    /// Append a single value to one column
    pub fn append_value(&mut self, t: Timestamp, value: f64, column: usize) -> Result<()> {
        self.append(t, &[value], Some(column))
    }

    /// Append a full row
    pub fn append_row(&mut self, t: Timestamp, row: &[f64]) -> Result<()> {
        if row.len() != self.columns() {
            return Err(TsError::ShapeMismatch {
                expected: self.columns(),
                actual: row.len(),
            });
        }
        self.append(t, row, None)
    }

    /// Pick the row a sample at `t` is written to and stamp it
    fn claim_row(&mut self, t: Timestamp) -> usize {
        let overwrite = self.last_time().is_some_and(|last| t <= last);
        if overwrite {
            self.count -= 1;
        } else {
            self.buffer.grow_for_append(self.count);
            self.buffer.row_mut(self.count).fill(0.0);
        }

        let row = self.count;
        self.buffer.time_mut()[row] = t;
        self.count += 1;
        row
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.columns() {
            return Err(TsError::ColumnOutOfRange {
                column,
                columns: self.columns(),
            });
        }
        Ok(())
    }

    /// Overwrite one value in place
    pub fn update(&mut self, column: usize, row: usize, value: f64) -> Result<()> {
        self.check_column(column)?;
        if row >= self.count {
            return Err(TsError::RowOutOfRange {
                row,
                rows: self.count,
            });
        }
        self.buffer.set(row, column, value);
        Ok(())
    }

    /// Multiply one column by `factor`
    pub fn scale_column(&mut self, column: usize, factor: f64) -> Result<()> {
        self.check_column(column)?;
        for row in 0..self.count {
            let value = self.buffer.get(row, column);
            self.buffer.set(row, column, value * factor);
        }
        Ok(())
    }

    /// Multiply every value by `factor`
    pub fn scale_all(&mut self, factor: f64) {
        for value in self.buffer.values_mut(self.count) {
            *value *= factor;
        }
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Sum of absolute differences over the columns and rows both series have
    pub fn compare(&self, other: &TimeSeries) -> f64 {
        let columns = self.columns().min(other.columns());
        (0..columns)
            .map(|column| sum_abs_diff(self.column_iter(column), other.column_iter(column)))
            .sum()
    }

    /// Sum of absolute differences between one column of each series
    pub fn compare_columns(&self, column: usize, other: &TimeSeries, other_column: usize) -> Result<f64> {
        self.check_column(column)?;
        other.check_column(other_column)?;
        Ok(sum_abs_diff(
            self.column_iter(column),
            other.column_iter(other_column),
        ))
    }
}

fn sum_abs_diff(a: impl Iterator<Item = f64>, b: impl Iterator<Item = f64>) -> f64 {
    a.zip(b).map(|(x, y)| (x - y).abs()).sum()
}
