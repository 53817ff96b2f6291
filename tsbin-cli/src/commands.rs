//! One-shot commands: info, dump, convert, concat

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use tsbin_core::codec::read_file;
use tsbin_core::{ByteOrder, TimeSeries};

/// Row selection written as `START..END`, `START..` or `..END`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RowRange {
    /// Clamp to a series of `len` rows
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let end = self.end.unwrap_or(len).min(len);
        let start = self.start.unwrap_or(0).min(end);
        start..end
    }
}

impl FromStr for RowRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (start, end) = s
            .split_once("..")
            .ok_or_else(|| format!("expected START..END, got {:?}", s))?;
        let parse = |part: &str| -> std::result::Result<Option<usize>, String> {
            if part.is_empty() {
                Ok(None)
            } else {
                part.parse()
                    .map(Some)
                    .map_err(|e| format!("invalid row index {:?}: {}", part, e))
            }
        };
        Ok(Self {
            start: parse(start)?,
            end: parse(end)?,
        })
    }
}

/// Resolve column selectors (indices or field names) against a series.
/// An empty selection means every column.
pub fn resolve_columns(series: &TimeSeries, selectors: &[String]) -> Result<Vec<usize>> {
    if selectors.is_empty() {
        return Ok((0..series.columns()).collect());
    }
    selectors
        .iter()
        .map(|selector| -> Result<usize> {
            let column = match selector.parse::<usize>() {
                Ok(index) => index,
                Err(_) => series
                    .column_index(selector)
                    .with_context(|| format!("no field named {:?}", selector))?,
            };
            if column >= series.columns() {
                bail!(
                    "column {} out of range ({} columns)",
                    column,
                    series.columns()
                );
            }
            Ok(column)
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct SeriesInfo<'a> {
    path: String,
    description: &'a str,
    byte_order: ByteOrder,
    segments: usize,
    trailing_bytes: usize,
    rows: usize,
    columns: usize,
    capacity: usize,
    time_start: Option<f64>,
    time_end: Option<f64>,
    fields: &'a [String],
}

/// Print what a file contains
pub fn info(path: &Path, json: bool, config: &CliConfig, out: &mut impl Write) -> Result<()> {
    let (series, summary) =
        read_file(path, &config.decode).with_context(|| format!("failed to load {:?}", path))?;
    let span = series.time_span();

    let report = SeriesInfo {
        path: path.display().to_string(),
        description: series.description(),
        byte_order: summary.byte_order,
        segments: summary.segments,
        trailing_bytes: summary.trailing_bytes,
        rows: series.len(),
        columns: series.columns(),
        capacity: series.capacity(),
        time_start: span.map(|(start, _)| start),
        time_end: span.map(|(_, end)| end),
        fields: series.fields(),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "file:        {}", report.path)?;
    writeln!(out, "description: {}", report.description)?;
    writeln!(out, "byte order:  {}", report.byte_order)?;
    writeln!(out, "segments:    {}", report.segments)?;
    if report.trailing_bytes > 0 {
        writeln!(out, "trailing:    {} bytes ignored", report.trailing_bytes)?;
    }
    writeln!(out, "rows:        {}", report.rows)?;
    writeln!(out, "columns:     {}", report.columns)?;
    writeln!(out, "capacity:    {}", report.capacity)?;
    if let Some((start, end)) = span {
        writeln!(out, "time:        {} .. {}", start, end)?;
    }
    for (index, name) in report.fields.iter().enumerate() {
        writeln!(out, "  [{}] {}", index, name)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DumpRow {
    time: f64,
    values: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct Dump<'a> {
    fields: Vec<&'a str>,
    rows: Vec<DumpRow>,
}

/// Print rows of a file
pub fn dump(
    path: &Path,
    rows: RowRange,
    selectors: &[String],
    json: bool,
    config: &CliConfig,
    out: &mut impl Write,
) -> Result<()> {
    let series = TimeSeries::load_with(path, &config.decode)
        .with_context(|| format!("failed to load {:?}", path))?;
    let columns = resolve_columns(&series, selectors)?;
    let range = rows.resolve(series.len());

    if json {
        let dump = Dump {
            fields: columns
                .iter()
                .map(|&c| series.field(c).unwrap_or_default())
                .collect(),
            rows: range
                .map(|row| DumpRow {
                    time: series.time()[row],
                    values: columns.iter().map(|&c| series.row(row)[c]).collect(),
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &dump)?;
        writeln!(out)?;
        return Ok(());
    }

    write_table(&series, &columns, range, config.precision, out)
}

/// Tab separated table of the given rows and columns
pub fn write_table(
    series: &TimeSeries,
    columns: &[usize],
    rows: impl IntoIterator<Item = usize>,
    precision: usize,
    out: &mut impl Write,
) -> Result<()> {
    write!(out, "time")?;
    for &column in columns {
        write!(out, "\t{}", series.field(column).unwrap_or_default())?;
    }
    writeln!(out)?;

    for row in rows {
        write!(out, "{:.*}", precision, series.time()[row])?;
        let values = series.row(row);
        for &column in columns {
            write!(out, "\t{:.*}", precision, values[column])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Re-encode a file in the given byte order
pub fn convert(input: &Path, output: &Path, order: ByteOrder, config: &CliConfig) -> Result<()> {
    let series = TimeSeries::load_with(input, &config.decode)
        .with_context(|| format!("failed to load {:?}", input))?;
    series
        .save(output, order)
        .with_context(|| format!("failed to write {:?}", output))?;
    info!("Converted {:?} -> {:?} ({} byte order)", input, output, order);
    Ok(())
}

/// Append every row of `source` to `target` as a new segment
pub fn concat(target: &Path, source: &Path, config: &CliConfig) -> Result<()> {
    let series = TimeSeries::load_with(source, &config.decode)
        .with_context(|| format!("failed to load {:?}", source))?;
    let order = series
        .append_to_file(target)
        .with_context(|| format!("failed to append to {:?}", target))?;
    info!(
        "Appended {} rows from {:?} to {:?} ({} byte order)",
        series.len(),
        source,
        target,
        order
    );
    Ok(())
}
