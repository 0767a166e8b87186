//! # Merger
//!
//! Assembles the master table: every instrument reading whose local time lies
//! strictly inside the configured window, drawn from the log files whose
//! filename stamp falls inside the window widened by a margin.
//!
//! A malformed row aborts the file it belongs to; the merge carries on with
//! the remaining files. A file that cannot be opened ends the run.
//!
//! ```rust,no_run
//! use nh3harvest::config::{MergeConfig, TimeWindow};
//! use nh3harvest::merger::Merger;
//! use std::path::Path;
//!
//! let window = TimeWindow::parse("06-02-2022_0900", "06-02-2022_2200")?;
//! let merger = Merger::new(MergeConfig::new(window));
//! let output = merger.merge_dir(Path::new("data"))?;
//! println!("{}", output.stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod parser;
mod source;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use log::{debug, info, warn};

pub use parser::{parse_row, parse_source, ColumnLayout, ParseError, RawRow};
pub use source::{discover_sources, is_candidate, parse_source_stamp, SourceFile, SOURCE_PREFIX};

use crate::config::MergeConfig;
use crate::sample::Sample;

/// Fatal merge errors. Per-file parse failures are not fatal and are
/// collected in [`MergeStats::failed_files`] instead.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The source directory could not be listed
    #[error("Failed to list source directory {path}: {source}")]
    ReadDir {
        /// Directory path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A selected source log could not be opened
    #[error("Failed to open source log {path}: {source}")]
    Open {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// A source log that was abandoned because of a malformed row.
#[derive(Debug, Clone)]
pub struct FailedSource {
    /// File path
    pub path: PathBuf,
    /// Parse error description
    pub reason: String,
}

/// Statistics from a completed merge.
#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    /// Candidate files found in the window
    pub files_selected: usize,
    /// Files parsed to completion
    pub files_merged: usize,
    /// Files abandoned on a parse error
    pub failed_files: Vec<FailedSource>,
    /// Rows parsed across merged files
    pub rows_read: usize,
    /// Rows inside the window
    pub rows_in_window: usize,
    /// Rows dropped because another file already supplied that timestamp
    pub duplicates_dropped: usize,
    /// Whether the concatenated rows were out of time order before sorting
    pub reordered: bool,
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Merged {} of {} files: {} rows read, {} in window",
            self.files_merged, self.files_selected, self.rows_read, self.rows_in_window
        )?;
        if self.duplicates_dropped > 0 {
            write!(f, ", {} duplicates dropped", self.duplicates_dropped)?;
        }
        if !self.failed_files.is_empty() {
            write!(f, ", {} files failed", self.failed_files.len())?;
        }
        Ok(())
    }
}

/// Merged samples plus the statistics describing how they were gathered.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Samples in output order
    pub samples: Vec<Sample>,
    /// Merge statistics
    pub stats: MergeStats,
}

/// Builds the master record stream from instrument logs.
#[derive(Debug, Clone)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    /// Create a merger for the given configuration.
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Discover candidate logs in `dir` and merge them.
    pub fn merge_dir(&self, dir: &std::path::Path) -> Result<MergeOutput, MergeError> {
        let sources = discover_sources(dir, &self.config)?;
        info!(
            "Found {} source logs for window {} in {}",
            sources.len(),
            self.config.window,
            dir.display()
        );
        self.merge_sources(&sources)
    }

    /// Merge an explicit list of logs, in the given order.
    pub fn merge_sources(&self, sources: &[SourceFile]) -> Result<MergeOutput, MergeError> {
        let mut stats = MergeStats {
            files_selected: sources.len(),
            ..Default::default()
        };
        let mut samples = Vec::new();

        for source in sources {
            let file = File::open(&source.path).map_err(|e| MergeError::Open {
                path: source.path.clone(),
                source: e,
            })?;

            match parse_source(BufReader::new(file), &self.config.layout) {
                Ok(rows) => {
                    debug!("{}: {} rows", source.path.display(), rows.len());
                    stats.files_merged += 1;
                    stats.rows_read += rows.len();
                    stats.rows_in_window += self.collect_rows(rows, &mut samples);
                }
                Err(e) => {
                    warn!("Abandoning {}: {}", source.path.display(), e);
                    stats.failed_files.push(FailedSource {
                        path: source.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        stats.reordered = samples.windows(2).any(|w| w[1].time < w[0].time);
        if self.config.sort_output {
            if stats.reordered {
                info!("Source logs overlap or arrived out of order; sorting merged rows");
            }
            let before = samples.len();
            samples.sort_by_key(|s| s.time);
            samples.dedup_by(|later, earlier| later.time == earlier.time);
            stats.duplicates_dropped = before - samples.len();
        } else if stats.reordered {
            warn!("Merged rows are not in time order and sorting is disabled");
        }

        info!("{}", stats);
        Ok(MergeOutput { samples, stats })
    }

    /// Convert rows to local time and keep those inside the window.
    /// Returns the number of rows kept.
    pub fn collect_rows<I>(&self, rows: I, samples: &mut Vec<Sample>) -> usize
    where
        I: IntoIterator<Item = RawRow>,
    {
        let before = samples.len();
        samples.extend(rows.into_iter().filter_map(|row| {
            let local = self.config.to_local(row.utc)?;
            self.config
                .window
                .contains(&local)
                .then(|| Sample::new(local, row.valve, row.signals))
        }));
        samples.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeWindow;
    use chrono::{Duration, NaiveDateTime};

    fn window() -> TimeWindow {
        TimeWindow::parse("06-02-2022_0900", "06-02-2022_1000").unwrap()
    }

    fn raw(utc: NaiveDateTime) -> RawRow {
        RawRow {
            utc,
            valve: 0.0,
            signals: [1.0; 11],
        }
    }

    #[test]
    fn test_collect_rows_applies_offset_and_window() {
        let merger = Merger::new(MergeConfig::new(window()));
        let start_utc = window().start + Duration::hours(5);
        let rows = vec![
            raw(start_utc),                          // exactly start: excluded
            raw(start_utc + Duration::seconds(2)),   // inside
            raw(start_utc + Duration::minutes(59)),  // inside
            raw(start_utc + Duration::minutes(60)),  // exactly end: excluded
        ];
        let mut samples = Vec::new();
        let kept = merger.collect_rows(rows, &mut samples);
        assert_eq!(kept, 2);
        assert_eq!(samples[0].time, window().start + Duration::seconds(2));
        assert!(samples.iter().all(|s| window().contains(&s.time)));
    }

    #[test]
    fn test_merge_stats_display() {
        let stats = MergeStats {
            files_selected: 3,
            files_merged: 2,
            rows_read: 10,
            rows_in_window: 8,
            duplicates_dropped: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "Merged 2 of 3 files: 10 rows read, 8 in window, 1 duplicates dropped"
        );
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let merger = Merger::new(MergeConfig::new(window()));
        let sources = vec![SourceFile {
            path: PathBuf::from("/no/such/amin_H_2022-06-02_14-00-00.txt"),
            stamp: window().start,
        }];
        assert!(matches!(
            merger.merge_sources(&sources),
            Err(MergeError::Open { .. })
        ));
    }
}
