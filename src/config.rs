//! # Harvest Configuration
//!
//! All tunables live in explicit structs that are passed into the
//! [`Merger`](crate::merger::Merger) and [`Reducer`](crate::reducer::Reducer).
//! There is no process-wide state.

use chrono::{Duration, NaiveDateTime};

use crate::merger::ColumnLayout;
use crate::reducer::Analyte;
use crate::timestamp::{format_window_time, parse_window_time, WINDOW_FORMAT};

/// Errors raised when a configuration is inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A window boundary could not be parsed.
    #[error("Invalid timestamp '{value}': expected {expected}")]
    InvalidTimestamp {
        /// Offending text
        value: String,
        /// Expected format
        expected: &'static str,
    },

    /// The window end does not come after its start.
    #[error("Invalid time window: end {end} is not after start {start}")]
    EmptyWindow {
        /// Window start
        start: NaiveDateTime,
        /// Window end
        end: NaiveDateTime,
    },

    /// Gap threshold must be strictly positive.
    #[error("Gap threshold must be positive, got {0} s")]
    NonPositiveGap(i64),

    /// Negative margins make no sense for file selection.
    #[error("File margin must not be negative, got {0} s")]
    NegativeMargin(i64),

    /// File margin larger than [`MAX_CLOCK_SHIFT`].
    #[error("File margin must not exceed {max} h, got {seconds} s")]
    MarginTooLarge {
        /// Requested margin
        seconds: i64,
        /// Upper bound in hours
        max: i64,
    },

    /// UTC offset larger than [`MAX_CLOCK_SHIFT`] in either direction.
    #[error("UTC offset must lie within +/-{max} h, got {seconds} s")]
    OffsetOutOfRange {
        /// Requested offset
        seconds: i64,
        /// Upper bound in hours
        max: i64,
    },

    /// A calibration factor that would divide by zero or propagate NaN.
    #[error("Calibration factor for {analyte} must be finite and non-zero, got {value}")]
    InvalidCalibration {
        /// Analyte name
        analyte: &'static str,
        /// Offending value
        value: f64,
    },

    /// Output extension must be a bare extension.
    #[error("Invalid output extension '{0}'")]
    InvalidExtension(String),
}

/// Largest accepted UTC offset or file margin, in hours.
pub const MAX_CLOCK_SHIFT: i64 = 24;

/// Requested data window in local time. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Window start (exclusive)
    pub start: NaiveDateTime,
    /// Window end (exclusive)
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Create a window, rejecting an empty or inverted range.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ConfigError> {
        if end <= start {
            return Err(ConfigError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a window from `MM-DD-YYYY_HHMM` stamps.
    pub fn parse(start: &str, end: &str) -> Result<Self, ConfigError> {
        let parse = |value: &str| {
            parse_window_time(value).ok_or_else(|| ConfigError::InvalidTimestamp {
                value: value.to_string(),
                expected: WINDOW_FORMAT,
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// True when `time` lies strictly between start and end.
    pub fn contains(&self, time: &NaiveDateTime) -> bool {
        *time > self.start && *time < self.end
    }

    /// The window widened by `margin` on both sides, clamped to the
    /// representable date range.
    pub fn widened(&self, margin: Duration) -> TimeWindow {
        TimeWindow {
            start: self
                .start
                .checked_sub_signed(margin)
                .unwrap_or(NaiveDateTime::MIN),
            end: self
                .end
                .checked_add_signed(margin)
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    /// `<start>-<end>` stamp used in output file names.
    pub fn file_stamp(&self) -> String {
        format!(
            "{}-{}",
            format_window_time(&self.start),
            format_window_time(&self.end)
        )
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Per-analyte sensitivity, in normalized counts per pptv.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationFactors {
    /// Ammonia
    pub nh3: f64,
    /// Methylamine
    pub c1: f64,
    /// Dimethylamine
    pub c2: f64,
    /// Trimethylamine
    pub c3: f64,
}

impl Default for CalibrationFactors {
    fn default() -> Self {
        Self {
            nh3: 13.11,
            c1: 8.58,
            c2: 2.57,
            c3: 4.34,
        }
    }
}

impl CalibrationFactors {
    /// Factor for one analyte.
    pub fn factor(&self, analyte: Analyte) -> f64 {
        match analyte {
            Analyte::Nh3 => self.nh3,
            Analyte::C1 => self.c1,
            Analyte::C2 => self.c2,
            Analyte::C3 => self.c3,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for analyte in Analyte::ALL {
            let value = self.factor(analyte);
            if !value.is_finite() || value == 0.0 {
                return Err(ConfigError::InvalidCalibration {
                    analyte: analyte.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Settings for assembling the master table.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Local-time window to keep
    pub window: TimeWindow,

    /// Offset between instrument clock (UTC) and local time.
    /// Local = UTC - offset. Must be adjusted by hand across DST changes.
    pub utc_offset: Duration,

    /// Slack applied around the window when selecting files by their
    /// filename stamp
    pub file_margin: Duration,

    /// Column positions inside each source log row
    pub layout: ColumnLayout,

    /// Sort the merged stream by time and drop duplicate timestamps.
    /// When false, rows stay in file-encounter order.
    pub sort_output: bool,
}

impl MergeConfig {
    /// Defaults for the given window: UTC-5, 20 minute margin, sorted output.
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            utc_offset: Duration::hours(5),
            file_margin: Duration::minutes(20),
            layout: ColumnLayout::default(),
            sort_output: true,
        }
    }

    /// Convert an instrument (UTC) timestamp to local time.
    /// `None` when the result falls outside the representable date range.
    pub fn to_local(&self, utc: NaiveDateTime) -> Option<NaiveDateTime> {
        utc.checked_sub_signed(self.utc_offset)
    }
}

/// Settings for segmentation, averaging and concentration.
#[derive(Debug, Clone)]
pub struct ReductionConfig {
    /// A gap at or above this closes the current chunk
    pub gap_threshold: Duration,

    /// Number of leading samples discarded from every chunk (settling time)
    pub trim_count: usize,

    /// Seal the chunk still open when a stream runs out. Off by default,
    /// which drops the final interval of each stream.
    pub close_trailing_chunk: bool,

    /// Sensitivities used for the concentration table
    pub calibration: CalibrationFactors,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            gap_threshold: Duration::minutes(5),
            // ~2 minutes at 2 s sampling
            trim_count: 60,
            close_trailing_chunk: false,
            calibration: CalibrationFactors::default(),
        }
    }
}

impl ReductionConfig {
    /// Check the settings for values that would make the reduction meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gap_threshold <= Duration::zero() {
            return Err(ConfigError::NonPositiveGap(self.gap_threshold.num_seconds()));
        }
        self.calibration.validate()
    }
}

/// Output file settings.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Extension for every table written (without the dot)
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
        }
    }
}

/// Complete configuration for a merge + reduce run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Merger settings
    pub merge: MergeConfig,
    /// Reducer settings
    pub reduction: ReductionConfig,
    /// Output naming
    pub output: OutputConfig,
}

impl HarvestConfig {
    /// Default configuration for a window.
    pub fn new(window: TimeWindow) -> Self {
        Self {
            merge: MergeConfig::new(window),
            reduction: ReductionConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_shift = Duration::hours(MAX_CLOCK_SHIFT);
        let margin = self.merge.file_margin;
        if margin < Duration::zero() {
            return Err(ConfigError::NegativeMargin(margin.num_seconds()));
        }
        if margin > max_shift {
            return Err(ConfigError::MarginTooLarge {
                seconds: margin.num_seconds(),
                max: MAX_CLOCK_SHIFT,
            });
        }
        let offset = self.merge.utc_offset;
        if offset > max_shift || offset < -max_shift {
            return Err(ConfigError::OffsetOutOfRange {
                seconds: offset.num_seconds(),
                max: MAX_CLOCK_SHIFT,
            });
        }
        let ext = &self.output.extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidExtension(ext.clone()));
        }
        self.reduction.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeWindow {
        TimeWindow::parse("06-02-2022_0900", "06-02-2022_2200").unwrap()
    }

    #[test]
    fn test_window_parse_and_contains() {
        let w = window();
        assert!(w.contains(&(w.start + Duration::seconds(1))));
        assert!(!w.contains(&w.start));
        assert!(!w.contains(&w.end));
        assert_eq!(w.file_stamp(), "06-02-2022_0900-06-02-2022_2200");
    }

    #[test]
    fn test_window_rejects_inverted() {
        let err = TimeWindow::parse("06-02-2022_2200", "06-02-2022_0900").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyWindow { .. }));
        let err = TimeWindow::parse("bogus", "06-02-2022_0900").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_widened() {
        let w = window().widened(Duration::minutes(20));
        assert_eq!(w.start.format("%H:%M").to_string(), "08:40");
        assert_eq!(w.end.format("%H:%M").to_string(), "22:20");
    }

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::new(window());
        assert_eq!(config.reduction.trim_count, 60);
        assert_eq!(config.reduction.gap_threshold, Duration::minutes(5));
        assert!(!config.reduction.close_trailing_chunk);
        assert_eq!(config.merge.utc_offset, Duration::hours(5));
        assert_eq!(config.reduction.calibration.factor(Analyte::C2), 2.57);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_factor() {
        let mut config = HarvestConfig::new(window());
        config.reduction.calibration.c3 = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCalibration { analyte: "C3", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_gap_and_extension() {
        let mut config = HarvestConfig::new(window());
        config.reduction.gap_threshold = Duration::zero();
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveGap(0))));

        let mut config = HarvestConfig::new(window());
        config.output.extension = ".csv".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidExtension(_))));
    }

    #[test]
    fn test_to_local() {
        let config = MergeConfig::new(window());
        let utc = window().start + Duration::hours(5);
        assert_eq!(config.to_local(utc), Some(window().start));
        assert_eq!(config.to_local(NaiveDateTime::MIN), None);
    }

    #[test]
    fn test_widened_clamps_at_date_range() {
        let w = TimeWindow::new(NaiveDateTime::MIN, NaiveDateTime::MAX).unwrap();
        assert_eq!(w.widened(Duration::hours(1)), w);
    }

    #[test]
    fn test_validate_bounds_clock_shifts() {
        let mut config = HarvestConfig::new(window());
        config.merge.file_margin = Duration::hours(24);
        config.merge.utc_offset = Duration::hours(-24);
        assert!(config.validate().is_ok());

        config.merge.file_margin = Duration::days(1_000_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MarginTooLarge { max: 24, .. })
        ));

        let mut config = HarvestConfig::new(window());
        config.merge.utc_offset = Duration::hours(25);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OffsetOutOfRange { seconds: 90_000, .. })
        ));
    }
}
