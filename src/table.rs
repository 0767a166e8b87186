//! # Master Table
//!
//! The merged record stream is persisted as a comma-delimited table with a
//! fixed 13-column header:
//!
//! ```text
//! time,valve,Hz18,Hz63,Hz47,Hz93,Hz140,Hz30,Hz46,Hz60,Hz74,Hz88,Hz102
//! 02-06-2022_090002,0,1520.5,88.25,...
//! ```
//!
//! Timestamps use the `DD-MM-YYYY_HHMMSS` format in local time.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::sample::{Sample, CHANNEL_COUNT, CHANNEL_NAMES};
use crate::timestamp::{format_master_time, parse_master_time};

/// Number of columns in the master table.
pub const MASTER_COLUMNS: usize = CHANNEL_COUNT + 2;

/// Errors raised while reading or writing the master table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV framing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Header row does not match the master layout
    #[error("Unexpected master table header: {0}")]
    BadHeader(String),

    /// Row has the wrong number of fields
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number
        line: u64,
        /// Required column count
        expected: usize,
        /// Columns present
        found: usize,
    },

    /// Timestamp field could not be parsed
    #[error("Line {line}: invalid timestamp '{value}' (expected DD-MM-YYYY_HHMMSS)")]
    InvalidTime {
        /// 1-based line number
        line: u64,
        /// Offending text
        value: String,
    },

    /// Numeric field could not be parsed
    #[error("Line {line}, column {column}: '{value}' is not numeric")]
    NotNumeric {
        /// 1-based line number
        line: u64,
        /// Column name
        column: &'static str,
        /// Offending text
        value: String,
    },
}

/// Header fields of the master table.
pub fn master_header() -> Vec<&'static str> {
    let mut header = Vec::with_capacity(MASTER_COLUMNS);
    header.push("time");
    header.push("valve");
    header.extend_from_slice(&CHANNEL_NAMES);
    header
}

/// Write samples to any writer, header first.
pub fn write_master_table<W: Write>(writer: W, samples: &[Sample]) -> Result<(), TableError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(master_header())?;

    let mut record = Vec::with_capacity(MASTER_COLUMNS);
    for sample in samples {
        record.clear();
        record.push(format_master_time(&sample.time));
        record.push(sample.valve.to_string());
        record.extend(sample.signals.iter().map(|v| v.to_string()));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Create (or overwrite) a master table file.
pub fn write_master_table_file<P: AsRef<Path>>(path: P, samples: &[Sample]) -> Result<(), TableError> {
    let file = File::create(path)?;
    write_master_table(BufWriter::new(file), samples)
}

/// Read a master table produced by [`write_master_table`].
pub fn read_master_table<R: Read>(reader: R) -> Result<Vec<Sample>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header = csv_reader.headers()?.clone();
    if !header.iter().eq(master_header().into_iter()) {
        return Err(TableError::BadHeader(header.iter().collect::<Vec<_>>().join(",")));
    }

    let mut samples = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        if record.len() != MASTER_COLUMNS {
            return Err(TableError::ColumnCount {
                line,
                expected: MASTER_COLUMNS,
                found: record.len(),
            });
        }

        let time = parse_master_time(&record[0]).ok_or_else(|| TableError::InvalidTime {
            line,
            value: record[0].to_string(),
        })?;

        let number = |idx: usize, column: &'static str| -> Result<f64, TableError> {
            record[idx].parse::<f64>().map_err(|_| TableError::NotNumeric {
                line,
                column,
                value: record[idx].to_string(),
            })
        };

        let valve = number(1, "valve")?;
        let mut signals = [0.0; CHANNEL_COUNT];
        for (ch, slot) in signals.iter_mut().enumerate() {
            *slot = number(ch + 2, CHANNEL_NAMES[ch])?;
        }

        samples.push(Sample::new(time, valve, signals));
    }

    Ok(samples)
}

/// Read a master table from disk.
pub fn read_master_table_file<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>, TableError> {
    let file = File::open(path)?;
    read_master_table(std::io::BufReader::new(file))
}
