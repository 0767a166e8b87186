//! Diagnostics collected over a reduction, printable as text or JSON.

use std::fmt;

use chrono::NaiveDateTime;
#[cfg(feature = "colorized_output")]
use console::style;
use serde::Serialize;

use super::average::AverageError;
use super::pairing::{PairOrder, PairingWarning};
use crate::sample::Label;

/// Per-stream chunking summary.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    /// Stream label
    pub label: Label,
    /// Samples in the stream
    pub samples: usize,
    /// Chunks closed by a gap
    pub sealed_chunks: usize,
    /// Chunks that produced an average
    pub averaged_chunks: usize,
    /// Length of the run still open at stream end, if any
    pub trailing_chunk_samples: Option<usize>,
    /// Whether that trailing run was sealed and averaged
    pub trailing_chunk_closed: bool,
}

impl StreamSummary {
    pub(crate) fn new(label: Label, samples: usize) -> Self {
        Self {
            label,
            samples,
            sealed_chunks: 0,
            averaged_chunks: 0,
            trailing_chunk_samples: None,
            trailing_chunk_closed: false,
        }
    }

    /// True when a trailing run was left out of the averages.
    pub fn dropped_trailing(&self) -> bool {
        self.trailing_chunk_samples.is_some() && !self.trailing_chunk_closed
    }
}

/// A chunk that could not be averaged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedChunk {
    /// Stream label
    pub label: Label,
    /// Chunk position in its stream
    pub index: usize,
    /// First sample time
    pub start: NaiveDateTime,
    /// Samples in the chunk
    pub samples: usize,
    /// Settling samples that had to be discarded
    pub trim: usize,
}

impl From<AverageError> for SkippedChunk {
    fn from(error: AverageError) -> Self {
        match error {
            AverageError::InsufficientData {
                label,
                index,
                start,
                samples,
                trim,
            } => Self {
                label,
                index,
                start,
                samples,
                trim,
            },
        }
    }
}

/// Diagnostics gathered over one reduction.
#[derive(Debug, Clone, Serialize)]
pub struct ReductionReport {
    /// Samples handed to the reducer
    pub input_samples: usize,
    /// Samples dropped for an unrecognized valve value
    pub unrecognized_valve: usize,
    /// Background stream summary
    pub background: StreamSummary,
    /// Measurement stream summary
    pub measurement: StreamSummary,
    /// Chunks with too few samples to average
    pub skipped_chunks: Vec<SkippedChunk>,
    /// Order established by the first pair
    pub pair_order: Option<PairOrder>,
    /// Pairing integrity warnings
    pub pairing_warnings: Vec<PairingWarning>,
    /// Paired intervals produced
    pub intervals: usize,
}

impl ReductionReport {
    pub(crate) fn new(input_samples: usize) -> Self {
        Self {
            input_samples,
            unrecognized_valve: 0,
            background: StreamSummary::new(Label::Background, 0),
            measurement: StreamSummary::new(Label::Measurement, 0),
            skipped_chunks: Vec::new(),
            pair_order: None,
            pairing_warnings: Vec::new(),
            intervals: 0,
        }
    }

    /// True when something in the run deserves a second look.
    pub fn has_warnings(&self) -> bool {
        !self.skipped_chunks.is_empty()
            || !self.pairing_warnings.is_empty()
            || self.background.dropped_trailing()
            || self.measurement.dropped_trailing()
    }

    /// Number of trailing runs left out of the averages.
    pub fn trailing_chunks_dropped(&self) -> usize {
        [&self.background, &self.measurement]
            .iter()
            .filter(|s| s.dropped_trailing())
            .count()
    }

    fn stream_line(summary: &StreamSummary) -> String {
        let trailing = match summary.trailing_chunk_samples {
            None => "none".to_string(),
            Some(n) if summary.trailing_chunk_closed => format!("{} samples, closed", n),
            Some(n) => format!("{} samples, not averaged", n),
        };
        format!(
            "{}: {} samples, {} sealed chunks, {} averaged, trailing run: {}",
            summary.label, summary.samples, summary.sealed_chunks, summary.averaged_chunks, trailing
        )
    }

    fn warning_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .skipped_chunks
            .iter()
            .map(|c| {
                format!(
                    "skipped {} chunk {} starting {} ({} samples, needs more than {})",
                    c.label, c.index, c.start, c.samples, c.trim
                )
            })
            .collect();
        lines.extend(self.pairing_warnings.iter().map(|w| w.to_string()));
        lines
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();

            output.push_str(&format!("{}\n", style("Reduction Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("================").cyan()));
            output.push_str(&format!(
                "{}: {} ({} with unrecognized valve state)\n",
                style("Samples").bold(),
                self.input_samples,
                self.unrecognized_valve
            ));
            output.push_str(&format!("  {}\n", Self::stream_line(&self.background)));
            output.push_str(&format!("  {}\n", Self::stream_line(&self.measurement)));

            for line in self.warning_lines() {
                output.push_str(&format!("[{}] {}\n", style("WARN").yellow().bold(), line));
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} intervals",
                style("Summary").bold(),
                style(self.intervals).green()
            ));
            if let Some(order) = self.pair_order {
                output.push_str(&format!(" ({})", order));
            }
            output.push('\n');

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ReductionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reduction Report")?;
        writeln!(f, "================")?;
        writeln!(
            f,
            "Samples: {} ({} with unrecognized valve state)",
            self.input_samples, self.unrecognized_valve
        )?;
        writeln!(f, "  {}", Self::stream_line(&self.background))?;
        writeln!(f, "  {}", Self::stream_line(&self.measurement))?;

        for line in self.warning_lines() {
            writeln!(f, "[WARN] {}", line)?;
        }

        writeln!(f)?;
        write!(f, "Summary: {} intervals", self.intervals)?;
        if let Some(order) = self.pair_order {
            write!(f, " ({})", order)?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_lists_skipped_and_trailing() {
        let mut report = ReductionReport::new(200);
        report.background = StreamSummary {
            samples: 120,
            sealed_chunks: 1,
            averaged_chunks: 0,
            trailing_chunk_samples: Some(20),
            ..StreamSummary::new(Label::Background, 0)
        };
        report.skipped_chunks.push(SkippedChunk {
            label: Label::Background,
            index: 0,
            start: NaiveDate::from_ymd_opt(2022, 6, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            samples: 60,
            trim: 60,
        });

        let text = report.to_string();
        assert!(text.contains("background: 120 samples, 1 sealed chunks, 0 averaged, trailing run: 20 samples, not averaged"));
        assert!(text.contains("[WARN] skipped background chunk 0 starting 2022-06-02 09:00:00 (60 samples, needs more than 60)"));
        assert!(text.contains("Summary: 0 intervals"));
        assert!(report.has_warnings());
        assert_eq!(report.trailing_chunks_dropped(), 1);
    }

    #[test]
    fn test_clean_report() {
        let report = ReductionReport::new(0);
        assert!(!report.has_warnings());
        assert_eq!(report.trailing_chunks_dropped(), 0);
    }
}
