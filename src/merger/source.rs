//! Discovery of instrument log files by their embedded UTC stamp.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};

use super::MergeError;
use crate::config::MergeConfig;
use crate::timestamp::SOURCE_FILE_FORMAT;

/// File-name prefix written by the instrument software.
pub const SOURCE_PREFIX: &str = "amin_H_";

/// File-name suffix of instrument logs.
pub const SOURCE_SUFFIX: &str = ".txt";

/// A candidate instrument log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path to the log
    pub path: PathBuf,
    /// Stamp taken from the file name (instrument clock, UTC)
    pub stamp: NaiveDateTime,
}

/// Extract the UTC stamp from a name like `amin_H_2022-06-02_14-00-00.txt`.
pub fn parse_source_stamp(file_name: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(SOURCE_PREFIX)?
        .strip_suffix(SOURCE_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, SOURCE_FILE_FORMAT).ok()
}

/// True when the file's stamp, converted to local time, lies strictly inside
/// the window widened by the configured margin.
pub fn is_candidate(stamp: NaiveDateTime, config: &MergeConfig) -> bool {
    let window = config.window.widened(config.file_margin);
    config
        .to_local(stamp)
        .is_some_and(|local| window.contains(&local))
}

/// List the logs in `dir` that may hold data for the configured window,
/// oldest first.
pub fn discover_sources(dir: &Path, config: &MergeConfig) -> Result<Vec<SourceFile>, MergeError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MergeError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MergeError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(SOURCE_PREFIX) {
            continue;
        }

        let Some(stamp) = parse_source_stamp(&name) else {
            warn!("Skipping {}: file name carries no valid timestamp", name);
            continue;
        };

        if is_candidate(stamp, config) {
            debug!("Selected source {}", name);
            sources.push(SourceFile {
                path: entry.path(),
                stamp,
            });
        } else {
            debug!("Ignoring source {} (outside window)", name);
        }
    }

    sources.sort_by(|a, b| a.stamp.cmp(&b.stamp).then_with(|| a.path.cmp(&b.path)));
    Ok(sources)
}
