//! # nh3harvest - Ammonia/Amine CIMS Data Harvest
//!
//! `nh3harvest` turns the raw logs of a chemical-ionization mass spectrometer
//! into background-subtracted ammonia and amine concentrations.
//!
//! The instrument alternates between sampling ambient air and sampling
//! through a zeroing filter. A valve-state column records which half of the
//! cycle every row belongs to. Processing happens in two stages:
//!
//! - **Merge**: select the hourly `amin_H_*.txt` logs that can touch a local
//!   time window, extract timestamp, valve state and eleven signal channels,
//!   convert the timestamps from UTC and write one master table.
//!
//! - **Reduce**: split the master table into background and measurement
//!   streams, cut each stream into intervals at gaps of five minutes or more,
//!   average each interval after discarding its settling samples, pair the
//!   intervals and compute differential signals and concentrations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use nh3harvest::prelude::*;
//!
//! let window = TimeWindow::parse("06-02-2022_0900", "06-02-2022_2200")?;
//! let config = HarvestConfig::new(window);
//!
//! let merged = Merger::new(config.merge.clone()).merge_dir(Path::new("logs"))?;
//! println!("{}", merged.stats);
//!
//! let reduction = Reducer::new(config.reduction.clone())?.reduce(&merged.samples)?;
//! let paths = OutputPaths::new(Path::new("."), &window, &config.output.extension);
//! write_master_table_file(&paths.master, &merged.samples)?;
//! write_reduction(&paths, &reduction, false)?;
//!
//! println!("{}", reduction.report);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`merger`]: source discovery, log parsing and window filtering
//! - [`table`]: the master table format, read and written with `csv`
//! - [`reducer`]: chunking, averaging, pairing and concentration
//! - [`output`]: result tables, raw dumps and the JSON report
//! - [`config`]: explicit configuration for every stage
//!
//! ## Channels
//!
//! | Index | Channel | Used for |
//! |-------|---------|----------|
//! | 0 | Hz18 | NH3 |
//! | 1 | Hz63 | NH3 |
//! | 2 | Hz47 | EtOH reagent |
//! | 3 | Hz93 | EtOH reagent |
//! | 4 | Hz140 | EtOH reagent |
//! | 5 | Hz30 | methylamine (C1) |
//! | 6 | Hz46 | dimethylamine (C2) |
//! | 7 | Hz60 | trimethylamine (C3) |
//! | 8-10 | Hz74, Hz88, Hz102 | carried through, not reduced |

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod merger;
pub mod output;
pub mod reducer;
pub mod sample;
pub mod table;
pub mod timestamp;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{
        CalibrationFactors, ConfigError, HarvestConfig, MergeConfig, OutputConfig,
        ReductionConfig, TimeWindow,
    };
    pub use crate::merger::{MergeError, MergeOutput, MergeStats, Merger, SourceFile};
    pub use crate::output::{write_reduction, OutputError, OutputPaths, OutputStats};
    pub use crate::reducer::{
        Analyte, IntervalResult, ReduceError, Reducer, Reduction, ReductionReport,
    };
    pub use crate::sample::{Label, Sample, CHANNEL_COUNT, CHANNEL_NAMES};
    pub use crate::table::{
        read_master_table_file, write_master_table_file, TableError,
    };
}
