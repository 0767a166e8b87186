//! Parser for the instrument's whitespace-delimited log rows.
//!
//! Each log starts with a preamble line and a column-name line, followed by
//! one reading per row. Columns are addressed by position only.

use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime};

use crate::sample::CHANNEL_COUNT;

/// Errors produced while parsing a single source log.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The underlying reader failed
    #[error("Failed to read source log: {0}")]
    Io(#[from] std::io::Error),

    /// Row is shorter than the layout requires
    #[error("Line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        /// 1-based line number
        line: usize,
        /// Minimum column count
        expected: usize,
        /// Columns present
        found: usize,
    },

    /// A numeric column holds something else
    #[error("Line {line}, column {column}: '{value}' is not numeric")]
    NotNumeric {
        /// 1-based line number
        line: usize,
        /// 0-based column index
        column: usize,
        /// Offending text
        value: String,
    },

    /// Date fields parse as numbers but do not form a valid date/time
    #[error("Line {line}: invalid date/time '{value}'")]
    InvalidTime {
        /// 1-based line number
        line: usize,
        /// The joined date fields
        value: String,
    },
}

/// Column positions of one instrument log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Lines to skip before the first data row
    pub header_lines: usize,
    /// Year, month, day, hour, minute, second columns
    pub date_columns: [usize; 6],
    /// Scrubber valve state column
    pub valve_column: usize,
    /// Source column for each channel, in `CHANNEL_NAMES` order
    pub channel_columns: [usize; CHANNEL_COUNT],
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            header_lines: 2,
            date_columns: [2, 3, 4, 5, 6, 7],
            valve_column: 11,
            //                Hz18 Hz63 Hz47 Hz93 Hz140 Hz30 Hz46 Hz60 Hz74 Hz88 Hz102
            channel_columns: [27, 24, 15, 18, 21, 30, 33, 36, 39, 42, 45],
        }
    }
}

impl ColumnLayout {
    /// Minimum number of columns a data row must carry.
    pub fn min_columns(&self) -> usize {
        self.date_columns
            .iter()
            .chain(self.channel_columns.iter())
            .chain(std::iter::once(&self.valve_column))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// One parsed log row, timestamp still on the instrument (UTC) clock.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Instrument timestamp (UTC)
    pub utc: NaiveDateTime,
    /// Raw valve value
    pub valve: f64,
    /// Channel values in `CHANNEL_NAMES` order
    pub signals: [f64; CHANNEL_COUNT],
}

/// Parse a whole log. Stops at the first malformed row.
pub fn parse_source<R: BufRead>(reader: R, layout: &ColumnLayout) -> Result<Vec<RawRow>, ParseError> {
    let mut rows = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx < layout.header_lines || line.trim().is_empty() {
            continue;
        }
        rows.push(parse_row(&line, idx + 1, layout)?);
    }

    Ok(rows)
}

/// Parse a single data row. `line_no` is only used for error messages.
pub fn parse_row(line: &str, line_no: usize, layout: &ColumnLayout) -> Result<RawRow, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let expected = layout.min_columns();
    if fields.len() < expected {
        return Err(ParseError::MissingColumns {
            line: line_no,
            expected,
            found: fields.len(),
        });
    }

    let number = |column: usize| -> Result<f64, ParseError> {
        fields[column]
            .parse::<f64>()
            .map_err(|_| ParseError::NotNumeric {
                line: line_no,
                column,
                value: fields[column].to_string(),
            })
    };

    let mut date = [0u32; 6];
    for (slot, &column) in date.iter_mut().zip(layout.date_columns.iter()) {
        *slot = fields[column]
            .parse::<u32>()
            .map_err(|_| ParseError::NotNumeric {
                line: line_no,
                column,
                value: fields[column].to_string(),
            })?;
    }
    let [year, month, day, hour, minute, second] = date;
    let utc = i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| ParseError::InvalidTime {
            line: line_no,
            value: layout
                .date_columns
                .iter()
                .map(|&c| fields[c])
                .collect::<Vec<_>>()
                .join(" "),
        })?;

    let valve = number(layout.valve_column)?;

    let mut signals = [0.0; CHANNEL_COUNT];
    for (slot, &column) in signals.iter_mut().zip(layout.channel_columns.iter()) {
        *slot = number(column)?;
    }

    Ok(RawRow {
        utc,
        valve,
        signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a 48-column row with recognizable values in every channel column.
    fn row(h: u32, m: u32, s: u32, valve: f64) -> String {
        let layout = ColumnLayout::default();
        let mut cols: Vec<String> = (0..48).map(|i| format!("{}.5", i)).collect();
        let date = ["2022", "6", "2", &h.to_string(), &m.to_string(), &s.to_string()];
        for (c, v) in layout.date_columns.iter().zip(date.iter()) {
            cols[*c] = v.to_string();
        }
        cols[layout.valve_column] = valve.to_string();
        cols.join("\t")
    }

    #[test]
    fn test_min_columns() {
        assert_eq!(ColumnLayout::default().min_columns(), 46);
    }

    #[test]
    fn test_parse_row_maps_columns() {
        let layout = ColumnLayout::default();
        let parsed = parse_row(&row(14, 30, 5, 1.0), 3, &layout).unwrap();
        assert_eq!(parsed.utc.to_string(), "2022-06-02 14:30:05");
        assert_eq!(parsed.valve, 1.0);
        assert_eq!(parsed.signals[0], 27.5); // Hz18
        assert_eq!(parsed.signals[1], 24.5); // Hz63
        assert_eq!(parsed.signals[4], 21.5); // Hz140
        assert_eq!(parsed.signals[10], 45.5); // Hz102
    }

    #[test]
    fn test_parse_source_skips_headers_and_blank_lines() {
        let text = format!(
            "preamble line\ncol0 col1 col2\n{}\n\n{}\n",
            row(14, 0, 0, 0.0),
            row(14, 0, 2, 0.0)
        );
        let rows = parse_source(Cursor::new(text), &ColumnLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].utc.to_string(), "2022-06-02 14:00:02");
    }

    #[test]
    fn test_short_row_is_rejected() {
        let text = "h\nh\n1 2 3\n";
        let err = parse_source(Cursor::new(text), &ColumnLayout::default()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingColumns {
                line: 3,
                expected: 46,
                found: 3
            }
        ));
    }

    #[test]
    fn test_non_numeric_field_is_rejected() {
        let layout = ColumnLayout::default();
        let mut fields: Vec<String> = row(14, 0, 0, 0.0)
            .split('\t')
            .map(str::to_string)
            .collect();
        fields[30] = "n/a".to_string();
        let err = parse_row(&fields.join(" "), 7, &layout).unwrap_err();
        assert!(matches!(err, ParseError::NotNumeric { line: 7, column: 30, .. }));
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let err = parse_row(&row(25, 0, 0, 0.0), 4, &ColumnLayout::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidTime { line: 4, .. }));
    }
}
