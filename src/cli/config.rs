//! TOML configuration file support.
//!
//! Settings that rarely change between runs can live in a config file
//! instead of being repeated on the command line:
//!
//! ```toml
//! # nh3harvest.toml
//! [window]
//! start = "06-02-2022_0900"
//! end = "06-02-2022_2200"
//!
//! [merge]
//! utc_offset_hours = 5
//! file_margin_minutes = 20
//! sort_output = true
//!
//! [calibration]
//! nh3 = 13.11
//! c1 = 8.58
//! c2 = 2.57
//! c3 = 4.34
//!
//! [reduction]
//! gap_minutes = 5
//! trim_count = 60
//! close_trailing_chunk = false
//!
//! [output]
//! extension = "txt"
//! report_json = true
//! ```
//!
//! Command-line flags win over file values, which win over the built-in
//! defaults.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

use nh3harvest::config::{HarvestConfig, TimeWindow};

/// Root configuration structure for nh3harvest.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data window.
    #[serde(default)]
    pub window: WindowSection,

    /// Merger settings.
    #[serde(default)]
    pub merge: MergeSection,

    /// Calibration factors.
    #[serde(default)]
    pub calibration: CalibrationSection,

    /// Reducer settings.
    #[serde(default)]
    pub reduction: ReductionSection,

    /// Output settings.
    #[serde(default)]
    pub output: OutputSection,
}

/// Window bounds in `MM-DD-YYYY_HHMM` local time.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Configuration for the merge stage.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeSection {
    /// Hours between instrument UTC and local time (local = UTC - offset).
    pub utc_offset_hours: Option<i64>,

    /// Slack around the window when selecting files.
    pub file_margin_minutes: Option<i64>,

    /// Sort merged rows and drop duplicate timestamps.
    pub sort_output: Option<bool>,
}

/// Per-analyte calibration factors.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationSection {
    pub nh3: Option<f64>,
    pub c1: Option<f64>,
    pub c2: Option<f64>,
    pub c3: Option<f64>,
}

/// Configuration for the reduce stage.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReductionSection {
    /// Gap that closes a chunk.
    pub gap_minutes: Option<i64>,

    /// Settling samples discarded per chunk.
    pub trim_count: Option<usize>,

    /// Seal and average the run still open at the end of each stream.
    pub close_trailing_chunk: Option<bool>,
}

/// Output naming and extras.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Extension of every table written.
    pub extension: Option<String>,

    /// Write the JSON reduction report.
    pub report_json: Option<bool>,
}

/// Values given on the command line. `None` and `false` defer to the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub start: Option<String>,
    pub end: Option<String>,
    pub utc_offset_hours: Option<i64>,
    pub file_margin_minutes: Option<i64>,
    pub no_sort: bool,
    pub gap_minutes: Option<i64>,
    pub trim_count: Option<usize>,
    pub close_trailing_chunk: bool,
    pub extension: Option<String>,
    pub report_json: bool,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the file if one was given, otherwise start from an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// The window from CLI flags, falling back to the file.
    pub fn window(&self, overrides: &Overrides) -> Result<TimeWindow> {
        let start = overrides
            .start
            .as_deref()
            .or(self.window.start.as_deref())
            .context("No window start given (use --start or [window] start)")?;
        let end = overrides
            .end
            .as_deref()
            .or(self.window.end.as_deref())
            .context("No window end given (use --end or [window] end)")?;
        Ok(TimeWindow::parse(start, end)?)
    }

    /// Whether the JSON report was requested by flag or file.
    pub fn report_json(&self, overrides: &Overrides) -> bool {
        overrides.report_json || self.output.report_json.unwrap_or(false)
    }

    /// Layer CLI overrides and file values over the defaults.
    pub fn resolve(&self, window: TimeWindow, overrides: &Overrides) -> Result<HarvestConfig> {
        let mut config = HarvestConfig::new(window);

        if let Some(hours) = overrides.utc_offset_hours.or(self.merge.utc_offset_hours) {
            config.merge.utc_offset =
                Duration::try_hours(hours).context("UTC offset out of range")?;
        }
        if let Some(minutes) = overrides
            .file_margin_minutes
            .or(self.merge.file_margin_minutes)
        {
            config.merge.file_margin =
                Duration::try_minutes(minutes).context("File margin out of range")?;
        }
        if overrides.no_sort {
            config.merge.sort_output = false;
        } else if let Some(sort) = self.merge.sort_output {
            config.merge.sort_output = sort;
        }

        let calibration = &mut config.reduction.calibration;
        if let Some(v) = self.calibration.nh3 {
            calibration.nh3 = v;
        }
        if let Some(v) = self.calibration.c1 {
            calibration.c1 = v;
        }
        if let Some(v) = self.calibration.c2 {
            calibration.c2 = v;
        }
        if let Some(v) = self.calibration.c3 {
            calibration.c3 = v;
        }

        if let Some(minutes) = overrides.gap_minutes.or(self.reduction.gap_minutes) {
            config.reduction.gap_threshold =
                Duration::try_minutes(minutes).context("Gap threshold out of range")?;
        }
        if let Some(trim) = overrides.trim_count.or(self.reduction.trim_count) {
            config.reduction.trim_count = trim;
        }
        config.reduction.close_trailing_chunk = overrides.close_trailing_chunk
            || self.reduction.close_trailing_chunk.unwrap_or(false);

        if let Some(ext) = overrides
            .extension
            .clone()
            .or_else(|| self.output.extension.clone())
        {
            config.output.extension = ext;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeWindow {
        TimeWindow::parse("06-02-2022_0900", "06-02-2022_2200").unwrap()
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [window]
            start = "06-02-2022_0900"
            end = "06-02-2022_2200"

            [merge]
            utc_offset_hours = 4
            sort_output = false

            [calibration]
            nh3 = 12.0

            [reduction]
            gap_minutes = 3
            trim_count = 30
            close_trailing_chunk = true

            [output]
            extension = "csv"
            report_json = true
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.window.start.as_deref(), Some("06-02-2022_0900"));
        assert_eq!(config.merge.utc_offset_hours, Some(4));
        assert_eq!(config.calibration.nh3, Some(12.0));
        assert_eq!(config.calibration.c1, None);
        assert_eq!(config.reduction.trim_count, Some(30));

        let overrides = Overrides::default();
        let resolved = config.resolve(config.window(&overrides).unwrap(), &overrides).unwrap();
        assert_eq!(resolved.merge.utc_offset, Duration::hours(4));
        assert!(!resolved.merge.sort_output);
        assert_eq!(resolved.reduction.gap_threshold, Duration::minutes(3));
        assert_eq!(resolved.reduction.calibration.nh3, 12.0);
        assert_eq!(resolved.reduction.calibration.c1, 8.58);
        assert!(resolved.reduction.close_trailing_chunk);
        assert_eq!(resolved.output.extension, "csv");
        assert!(config.report_json(&overrides));
    }

    #[test]
    fn test_empty_config_gives_defaults() {
        let config = Config::from_str("").unwrap();
        let resolved = config.resolve(window(), &Overrides::default()).unwrap();
        assert_eq!(resolved.merge.utc_offset, Duration::hours(5));
        assert_eq!(resolved.merge.file_margin, Duration::minutes(20));
        assert!(resolved.merge.sort_output);
        assert_eq!(resolved.reduction.trim_count, 60);
        assert_eq!(resolved.output.extension, "txt");
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::from_str(
            r#"
            [reduction]
            gap_minutes = 3
            [output]
            extension = "csv"
            "#,
        )
        .unwrap();
        let overrides = Overrides {
            gap_minutes: Some(10),
            extension: Some("dat".to_string()),
            no_sort: true,
            ..Default::default()
        };
        let resolved = config.resolve(window(), &overrides).unwrap();
        assert_eq!(resolved.reduction.gap_threshold, Duration::minutes(10));
        assert_eq!(resolved.output.extension, "dat");
        assert!(!resolved.merge.sort_output);
    }

    #[test]
    fn test_missing_window_is_an_error() {
        let config = Config::default();
        let overrides = Overrides {
            start: Some("06-02-2022_0900".to_string()),
            ..Default::default()
        };
        assert!(config.window(&overrides).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = Config::from_str("[calibration]\nc2 = 0.0\n").unwrap();
        assert!(config.resolve(window(), &Overrides::default()).is_err());

        assert!(Config::from_str("[reduction]\nunknown = 1\n").is_err());
    }

    #[test]
    fn test_extreme_clock_shifts_are_rejected() {
        let config = Config::default();
        let overrides = Overrides {
            file_margin_minutes: Some(i64::MAX / 120_000),
            ..Default::default()
        };
        assert!(config.resolve(window(), &overrides).is_err());

        let overrides = Overrides {
            utc_offset_hours: Some(-25),
            ..Default::default()
        };
        assert!(config.resolve(window(), &overrides).is_err());
    }
}
