use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod info;
mod merge;
mod reduce;
mod run;

use config::Overrides;

/// nh3harvest - Ammonia/amine CIMS data harvest
#[derive(Parser)]
#[command(name = "nh3harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Window bounds, local time.
#[derive(Args, Debug, Default)]
pub struct WindowArgs {
    /// Window start (MM-DD-YYYY_HHMM, exclusive)
    #[arg(short = 's', long, value_name = "STAMP")]
    start: Option<String>,

    /// Window end (MM-DD-YYYY_HHMM, exclusive)
    #[arg(short = 'e', long, value_name = "STAMP")]
    end: Option<String>,
}

/// Settings shared by every command that writes files.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Directory for the written tables
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Extension for written tables (default: txt)
    #[arg(long, value_name = "EXT")]
    extension: Option<String>,
}

/// Merge-stage tuning.
#[derive(Args, Debug, Default)]
pub struct MergeArgs {
    /// Directory holding the amin_H_*.txt logs
    #[arg(short = 'i', long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Hours between instrument UTC and local time (default: 5)
    #[arg(long, value_name = "HOURS", allow_negative_numbers = true)]
    utc_offset: Option<i64>,

    /// Slack around the window when selecting files (default: 20)
    #[arg(long, value_name = "MINUTES")]
    file_margin: Option<i64>,

    /// Keep rows in file order instead of sorting by time
    #[arg(long)]
    no_sort: bool,
}

/// Reduce-stage tuning.
#[derive(Args, Debug, Default)]
pub struct ReduceArgs {
    /// Gap that closes an interval (default: 5)
    #[arg(long, value_name = "MINUTES")]
    gap_minutes: Option<i64>,

    /// Settling samples discarded at the start of every interval (default: 60)
    #[arg(long, value_name = "N")]
    trim: Option<usize>,

    /// Average the interval still open at the end of each stream
    #[arg(long)]
    close_trailing_chunk: bool,

    /// Also write the reduction report as JSON
    #[arg(long)]
    report_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge instrument logs into one master table
    Merge {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        merge: MergeArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Reduce a master table into differential and concentration tables
    Reduce {
        /// Master table written by `merge`
        #[arg(value_name = "MASTER")]
        master: PathBuf,

        // read from the master file name when omitted
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        reduce: ReduceArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Merge and reduce in one pass
    Run {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        merge: MergeArgs,

        #[command(flatten)]
        reduce: ReduceArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Display a summary of a master table
    Info {
        /// Master table path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Gap used to count intervals (default: 5)
        #[arg(long, value_name = "MINUTES")]
        gap_minutes: Option<i64>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

fn collect_overrides(
    window: WindowArgs,
    merge: Option<&MergeArgs>,
    reduce: Option<&ReduceArgs>,
    common: &CommonArgs,
) -> Overrides {
    let mut overrides = Overrides {
        start: window.start,
        end: window.end,
        extension: common.extension.clone(),
        ..Default::default()
    };
    if let Some(merge) = merge {
        overrides.utc_offset_hours = merge.utc_offset;
        overrides.file_margin_minutes = merge.file_margin;
        overrides.no_sort = merge.no_sort;
    }
    if let Some(reduce) = reduce {
        overrides.gap_minutes = reduce.gap_minutes;
        overrides.trim_count = reduce.trim;
        overrides.close_trailing_chunk = reduce.close_trailing_chunk;
        overrides.report_json = reduce.report_json;
    }
    overrides
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Merge {
            window,
            merge,
            common,
        } => {
            let overrides = collect_overrides(window, Some(&merge), None, &common);
            merge::run(&merge.input_dir, &common, &overrides)
        }
        Commands::Reduce {
            master,
            window,
            reduce,
            common,
        } => {
            let overrides = collect_overrides(window, None, Some(&reduce), &common);
            reduce::run(&master, &common, &overrides)
        }
        Commands::Run {
            window,
            merge,
            reduce,
            common,
        } => {
            let overrides = collect_overrides(window, Some(&merge), Some(&reduce), &common);
            run::run(&merge.input_dir, &common, &overrides)
        }
        Commands::Info { file, gap_minutes } => info::run(&file, gap_minutes),
    }
}
