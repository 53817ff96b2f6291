//! Growable row-major storage for the time column and data columns
//!
//! The buffer only tracks physical allocation. The logical row count lives
//! in [`TimeSeries`](crate::TimeSeries), which decides which rows are valid.
//! Capacity and column width only ever grow.

use crate::config::{GROWTH_FACTOR, MIN_APPEND_CAPACITY};
use tracing::trace;

/// Physical storage for a time series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBuffer {
    /// One timestamp per physical row
    time: Vec<f64>,
    /// `capacity * columns` values, row `i` at `[i * columns .. (i + 1) * columns]`
    data: Vec<f64>,
    /// Width of each row
    columns: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer with the given row width
    pub fn new(columns: usize) -> Self {
        Self {
            time: Vec::new(),
            data: Vec::new(),
            columns,
        }
    }

    /// Number of physical rows
    pub fn capacity(&self) -> usize {
        self.time.len()
    }

    /// Number of data columns
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Grow the physical row count to at least `required`.
    ///
    /// A non-empty buffer doubles until it fits, so the result is the
    /// smallest `capacity * 2^k >= required`. An empty buffer is sized to
    /// `required` exactly. New rows are zeroed. Returns `true` if the
    /// buffer grew.
    pub fn ensure_capacity(&mut self, required: usize) -> bool {
        let current = self.capacity();
        if required <= current {
            return false;
        }

        let mut new_capacity = if current == 0 { required } else { current };
        while new_capacity < required {
            new_capacity = new_capacity.saturating_mul(GROWTH_FACTOR);
        }

        // Row-major layout: new rows land at the tail
        self.time.resize(new_capacity, 0.0);
        self.data.resize(new_capacity * self.columns, 0.0);

        trace!(from = current, to = new_capacity, "grew buffer capacity");
        true
    }

    /// Make room for one more row after `count` logical rows
    pub fn grow_for_append(&mut self, count: usize) {
        if count < self.capacity() {
            return;
        }
        let target = if self.capacity() == 0 {
            MIN_APPEND_CAPACITY
        } else {
            self.capacity() * GROWTH_FACTOR
        };
        self.ensure_capacity(target.max(count + 1));
    }

    /// Widen every row to `required` columns.
    ///
    /// Existing columns keep their values and position; new columns are
    /// zero. Returns `true` if the buffer was widened.
    pub fn ensure_columns(&mut self, required: usize) -> bool {
        let old = self.columns;
        if required <= old {
            return false;
        }

        let capacity = self.capacity();
        let mut data = vec![0.0; capacity * required];
        if old > 0 {
            for (row, values) in self.data.chunks_exact(old).enumerate() {
                let start = row * required;
                data[start..start + old].copy_from_slice(values);
            }
        }

        self.data = data;
        self.columns = required;

        trace!(from = old, to = required, "widened buffer columns");
        true
    }

    /// All physical timestamps
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Mutable access to all physical timestamps
    pub fn time_mut(&mut self) -> &mut [f64] {
        &mut self.time
    }

    /// One physical row
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.columns;
        &self.data[start..start + self.columns]
    }

    /// One physical row, mutable
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.columns;
        &mut self.data[start..start + self.columns]
    }

    /// Read a single cell
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.columns + column]
    }

    /// Write a single cell
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        self.data[row * self.columns + column] = value;
    }

    /// Values of one column over the first `rows` rows
    pub fn column_values(&self, column: usize, rows: usize) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .skip(column)
            .step_by(self.columns.max(1))
            .take(if self.columns == 0 { 0 } else { rows })
            .copied()
    }

    /// Overwrite one column starting at `start_row` with `values`
    pub fn fill_column<I>(&mut self, column: usize, start_row: usize, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let width = self.columns;
        for (offset, value) in values.into_iter().enumerate() {
            self.data[(start_row + offset) * width + column] = value;
        }
    }

    /// Mutable view over every value in the first `rows` rows
    pub fn values_mut(&mut self, rows: usize) -> &mut [f64] {
        let end = rows * self.columns;
        &mut self.data[..end]
    }
}
