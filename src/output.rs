//! # Result Tables
//!
//! Writers for the files produced by a reduction:
//!
//! | File | Contents |
//! |------|----------|
//! | `nh3calib<MMDDMM>.<ext>` | differential signals and EtOH total per interval |
//! | `nh3concs<start>-<end>.<ext>` | calibrated concentrations per interval |
//! | `tempbg.<ext>`, `tempms.<ext>` | raw background / measurement samples, first four channels |
//! | `nh3report<start>-<end>.json` | optional machine-readable reduction report |
//!
//! Each file is created, written in full and flushed before the next one is
//! opened.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::config::TimeWindow;
use crate::reducer::{Analyte, IntervalResult, Reduction, ReductionReport};
use crate::sample::Sample;
use crate::timestamp::{format_master_time, format_result_time};

/// Header of the differential table.
pub const DIFFERENTIAL_HEADER: &str = "date, NH3 signal (Signal-BG), C1 signal (Signal-BG), C2 signal (Signal-BG), C3 signal (Signal-BG), EtOH signal";

/// Header of the concentration table.
pub const CONCENTRATION_HEADER: &str = "date, [NH3], [MA], [DMA], [TMA]";

/// Channels copied into the raw dumps.
pub const DUMP_CHANNELS: usize = 4;

/// Errors raised while writing result files.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A result file could not be created
    #[error("Failed to create {path}: {source}")]
    Create {
        /// Target path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// I/O error while writing
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Locations of every file a harvest run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Merged master table
    pub master: PathBuf,
    /// Differential signal table
    pub differential: PathBuf,
    /// Concentration table
    pub concentration: PathBuf,
    /// Raw background dump
    pub background_dump: PathBuf,
    /// Raw measurement dump
    pub measurement_dump: PathBuf,
    /// JSON report
    pub report: PathBuf,
}

impl OutputPaths {
    /// File names for a window, placed under `dir`.
    ///
    /// The differential table is stamped with month, day and minute of the
    /// window start so repeated runs overwrite the same file.
    pub fn new(dir: &Path, window: &TimeWindow, extension: &str) -> Self {
        let stamp = window.file_stamp();
        let calib = window.start.format("%m%d%M");
        Self {
            master: dir.join(format!("NH3{}.{}", stamp, extension)),
            differential: dir.join(format!("nh3calib{}.{}", calib, extension)),
            concentration: dir.join(format!("nh3concs{}.{}", stamp, extension)),
            background_dump: dir.join(format!("tempbg.{}", extension)),
            measurement_dump: dir.join(format!("tempms.{}", extension)),
            report: dir.join(format!("nh3report{}.json", stamp)),
        }
    }
}

/// Recover the window from a master table name such as
/// `NH306-02-2022_0900-06-02-2022_2200.txt`.
pub fn window_from_master_name(path: &Path) -> Option<TimeWindow> {
    let stem = path.file_stem()?.to_str()?;
    let stamps = stem.strip_prefix("NH3")?;
    // both stamps are MM-DD-YYYY_HHMM, 15 characters each
    if stamps.len() != 31 || stamps.as_bytes()[15] != b'-' {
        return None;
    }
    TimeWindow::parse(stamps.get(..15)?, stamps.get(16..)?).ok()
}

fn header_fields(header: &str) -> Vec<&str> {
    // keep the space after each comma: it is part of the published header
    header.split(',').collect()
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

/// Write the differential table.
pub fn write_differential_table<W: Write>(
    writer: W,
    intervals: &[IntervalResult],
) -> Result<(), OutputError> {
    let mut out = csv_writer(writer);
    out.write_record(header_fields(DIFFERENTIAL_HEADER))?;
    for interval in intervals {
        let mut record = vec![format_result_time(&interval.time)];
        record.extend(
            Analyte::ALL
                .iter()
                .map(|&a| interval.differential(a).to_string()),
        );
        record.push(interval.ethanol_total.to_string());
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the concentration table.
pub fn write_concentration_table<W: Write>(
    writer: W,
    intervals: &[IntervalResult],
) -> Result<(), OutputError> {
    let mut out = csv_writer(writer);
    out.write_record(header_fields(CONCENTRATION_HEADER))?;
    for interval in intervals {
        let mut record = vec![format_result_time(&interval.time)];
        record.extend(
            Analyte::ALL
                .iter()
                .map(|&a| interval.concentration(a).to_string()),
        );
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write a raw stream dump: timestamp plus the first four channels, no header.
pub fn write_stream_dump<W: Write>(writer: W, samples: &[Sample]) -> Result<(), OutputError> {
    let mut out = csv_writer(writer);
    for sample in samples {
        let mut record = vec![format_master_time(&sample.time)];
        record.extend(
            sample.signals[..DUMP_CHANNELS]
                .iter()
                .map(|v| v.to_string()),
        );
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the report as pretty-printed JSON.
pub fn write_report_json<W: Write>(mut writer: W, report: &ReductionReport) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| OutputError::Create {
            path: path.to_path_buf(),
            source,
        })
}

/// Summary of the files written for a reduction.
#[derive(Debug, Clone, Default)]
pub struct OutputStats {
    /// Files written
    pub files_written: usize,
    /// Interval rows in each result table
    pub interval_rows: usize,
    /// Rows in the background dump
    pub background_rows: usize,
    /// Rows in the measurement dump
    pub measurement_rows: usize,
}

impl std::fmt::Display for OutputStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} files ({} intervals, {} background and {} measurement samples dumped)",
            self.files_written, self.interval_rows, self.background_rows, self.measurement_rows
        )
    }
}

/// Write every result file for a reduction.
pub fn write_reduction(
    paths: &OutputPaths,
    reduction: &Reduction,
    with_report: bool,
) -> Result<OutputStats, OutputError> {
    write_differential_table(create(&paths.differential)?, &reduction.intervals)?;
    info!("Wrote {}", paths.differential.display());

    write_concentration_table(create(&paths.concentration)?, &reduction.intervals)?;
    info!("Wrote {}", paths.concentration.display());

    write_stream_dump(create(&paths.background_dump)?, &reduction.streams.background)?;
    write_stream_dump(create(&paths.measurement_dump)?, &reduction.streams.measurement)?;

    let mut files_written = 4;
    if with_report {
        write_report_json(create(&paths.report)?, &reduction.report)?;
        info!("Wrote {}", paths.report.display());
        files_written += 1;
    }

    Ok(OutputStats {
        files_written,
        interval_rows: reduction.intervals.len(),
        background_rows: reduction.streams.background.len(),
        measurement_rows: reduction.streams.measurement.len(),
    })
}
