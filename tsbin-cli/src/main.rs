//! TsBin CLI - inspect, convert and browse binary time-series files

mod commands;
mod config;
mod viewer;

use clap::{Parser, Subcommand};
use commands::RowRange;
use config::{CliConfig, LogFormat};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::debug;
use tsbin_core::{ByteOrder, DecodeOptions};
use viewer::ViewerState;

#[derive(Debug, Parser)]
#[command(name = "tsbin", version, about = "Inspect and convert binary time-series files")]
struct Cli {
    /// Log filter directive, overridden by TSBIN_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Only read the primary block, ignoring appended segments
    #[arg(long, global = true)]
    no_segments: bool,

    /// Digits after the decimal point in table output
    #[arg(long, global = true, default_value_t = 6)]
    precision: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the header and layout of a file
    Info {
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print rows of a file
    Dump {
        file: PathBuf,
        /// Rows to print, as START..END
        #[arg(long, default_value = "..")]
        rows: RowRange,
        /// Columns to print, by index or name
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-encode a file in another byte order
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Byte order of the output file
        #[arg(long, default_value_t = ByteOrder::native())]
        byte_order: ByteOrder,
    },
    /// Append the rows of SOURCE to TARGET as a new segment
    Concat { target: PathBuf, source: PathBuf },
    /// Browse files in an interactive shell
    View {
        /// File to open on start
        file: Option<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> CliConfig {
        CliConfig {
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            decode: DecodeOptions {
                follow_segments: !self.no_segments,
            },
            precision: self.precision,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    config::init_logging(&config);
    debug!(?config, "starting tsbin {}", tsbin_core::VERSION);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Info { file, json } => commands::info(&file, json, &config, &mut out)?,
        Command::Dump {
            file,
            rows,
            columns,
            json,
        } => commands::dump(&file, rows, &columns, json, &config, &mut out)?,
        Command::Convert {
            input,
            output,
            byte_order,
        } => commands::convert(&input, &output, byte_order, &config)?,
        Command::Concat { target, source } => commands::concat(&target, &source, &config)?,
        Command::View { file } => {
            let mut state = ViewerState::new(config);
            if let Some(file) = file {
                state.open(&file)?;
            }
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            viewer::run_shell(&mut state, stdin.lock(), &mut out, interactive)?;
        }
    }

    Ok(())
}
