//! Interactive viewer shell
//!
//! Everything the viewer knows lives in [`ViewerState`], which each command
//! handler receives explicitly. The loaded [`TimeSeries`] is never modified
//! by the viewer.

use crate::commands::{resolve_columns, write_table};
use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tsbin_core::TimeSeries;

const DEFAULT_SHOW_ROWS: usize = 20;

/// State of a viewer session
pub struct ViewerState {
    config: CliConfig,
    series: Option<TimeSeries>,
    path: Option<PathBuf>,
    selected: Vec<usize>,
    window: Option<(f64, f64)>,
}

enum CommandAction {
    Continue,
    Quit,
}

/// Summary of one column over the visible rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub last: f64,
}

impl ViewerState {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            series: None,
            path: None,
            selected: Vec::new(),
            window: None,
        }
    }

    /// Load a file, selecting every column and clearing the time window
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let series = TimeSeries::load_with(path, &self.config.decode)
            .with_context(|| format!("failed to load {:?}", path))?;
        self.selected = (0..series.columns()).collect();
        self.window = None;
        self.series = Some(series);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn series(&self) -> Result<&TimeSeries> {
        self.series.as_ref().context("no file open, use `open <path>`")
    }

    /// Rows whose timestamp falls inside the window
    fn visible_rows(&self, series: &TimeSeries) -> Vec<usize> {
        series
            .time()
            .iter()
            .enumerate()
            .filter(|(_, &t)| match self.window {
                Some((start, end)) => t >= start && t <= end,
                None => true,
            })
            .map(|(row, _)| row)
            .collect()
    }

    /// Statistics for every selected column over the visible rows
    pub fn stats(&self) -> Result<Vec<(usize, Option<ColumnStats>)>> {
        let series = self.series()?;
        let rows = self.visible_rows(series);
        Ok(self
            .selected
            .iter()
            .map(|&column| (column, column_stats(series, column, &rows)))
            .collect())
    }
}

fn column_stats(series: &TimeSeries, column: usize, rows: &[usize]) -> Option<ColumnStats> {
    let values: Vec<f64> = rows.iter().filter_map(|&row| series.value(column, row)).collect();
    let last = *values.last()?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(ColumnStats {
        samples: values.len(),
        min,
        max,
        mean,
        last,
    })
}

fn print_help(out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        r#"commands:
  open <path>           load a file
  info                  file summary
  fields                list columns, * marks selected
  select all            select every column
  select <col>...       select columns by index or name
  window <start> <end>  only show rows with start <= time <= end
  window clear          show every row
  show [rows]           print visible rows (default {})
  stats                 min / max / mean / last of selected columns
  help
  exit | quit"#,
        DEFAULT_SHOW_ROWS
    )?;
    Ok(())
}

fn handle_command(state: &mut ViewerState, line: &str, out: &mut impl Write) -> Result<CommandAction> {
    let mut tokens = line.split_whitespace();
    let Some(command) = tokens.next() else {
        return Ok(CommandAction::Continue);
    };
    let args: Vec<&str> = tokens.collect();
    debug!(command, ?args, "viewer command");

    match command {
        "open" => {
            let [path] = args.as_slice() else {
                bail!("usage: open <path>");
            };
            state.open(Path::new(path))?;
            let series = state.series()?;
            writeln!(
                out,
                "opened {} ({} rows, {} columns)",
                path,
                series.len(),
                series.columns()
            )?;
        }
        "info" => {
            let series = state.series()?;
            if let Some(path) = &state.path {
                writeln!(out, "file:        {}", path.display())?;
            }
            writeln!(out, "description: {}", series.description())?;
            writeln!(out, "rows:        {}", series.len())?;
            writeln!(out, "columns:     {}", series.columns())?;
            if let Some((start, end)) = series.time_span() {
                writeln!(out, "time:        {} .. {}", start, end)?;
            }
            if let Some((start, end)) = state.window {
                writeln!(out, "window:      {} .. {}", start, end)?;
            }
        }
        "fields" => {
            let series = state.series()?;
            for (index, name) in series.fields().iter().enumerate() {
                let mark = if state.selected.contains(&index) { '*' } else { ' ' };
                writeln!(out, "{} [{}] {}", mark, index, name)?;
            }
        }
        "select" => {
            let series = state.series()?;
            let selected = match args.as_slice() {
                [] => bail!("usage: select all | select <col>..."),
                ["all"] => (0..series.columns()).collect(),
                selectors => {
                    let selectors: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
                    resolve_columns(series, &selectors)?
                }
            };
            state.selected = selected;
            writeln!(out, "{} columns selected", state.selected.len())?;
        }
        "window" => match args.as_slice() {
            ["clear"] => {
                state.window = None;
                writeln!(out, "window cleared")?;
            }
            [start, end] => {
                let start: f64 = start.parse().context("invalid window start")?;
                let end: f64 = end.parse().context("invalid window end")?;
                if start > end {
                    bail!("window start {} is after end {}", start, end);
                }
                state.window = Some((start, end));
                writeln!(out, "window {} .. {}", start, end)?;
            }
            _ => bail!("usage: window <start> <end> | window clear"),
        },
        "show" => {
            let limit = match args.as_slice() {
                [] => DEFAULT_SHOW_ROWS,
                [n] => n.parse().context("invalid row count")?,
                _ => bail!("usage: show [rows]"),
            };
            let series = state.series()?;
            let rows = state.visible_rows(series);
            write_table(
                series,
                &state.selected,
                rows.iter().copied().take(limit),
                state.config.precision,
                out,
            )?;
            if rows.len() > limit {
                writeln!(out, "... {} more rows", rows.len() - limit)?;
            }
        }
        "stats" => {
            let stats = state.stats()?;
            let series = state.series()?;
            for (column, stats) in stats {
                let name = series.field(column).unwrap_or_default();
                match stats {
                    Some(s) => writeln!(
                        out,
                        "{}: n={} min={:.*} max={:.*} mean={:.*} last={:.*}",
                        name,
                        s.samples,
                        state.config.precision,
                        s.min,
                        state.config.precision,
                        s.max,
                        state.config.precision,
                        s.mean,
                        state.config.precision,
                        s.last
                    )?,
                    None => writeln!(out, "{}: no samples in window", name)?,
                }
            }
        }
        "help" => print_help(out)?,
        "exit" | "quit" => return Ok(CommandAction::Quit),
        other => bail!("unknown command {:?}, try `help`", other),
    }

    Ok(CommandAction::Continue)
}

/// Read commands from `input` until it ends or the user quits.
///
/// Command errors are reported on `out` and do not end the session.
pub fn run_shell(
    state: &mut ViewerState,
    mut input: impl BufRead,
    out: &mut impl Write,
    interactive: bool,
) -> Result<()> {
    let mut line = String::new();
    loop {
        if interactive {
            write!(out, "tsbin> ")?;
            out.flush()?;
        }

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        match handle_command(state, line.trim(), out) {
            Ok(CommandAction::Continue) => {}
            Ok(CommandAction::Quit) => break,
            Err(e) => writeln!(out, "error: {:#}", e)?,
        }
    }
    Ok(())
}
