use anyhow::Result;
use log::info;
use std::path::Path;

use super::config::{Config, Overrides};
use super::merge::merge_to_table;
use super::reduce::reduce_to_tables;
use super::CommonArgs;

/// Merge and reduce in one pass
pub fn run(input_dir: &Path, common: &CommonArgs, overrides: &Overrides) -> Result<()> {
    let file = Config::load(common.config.as_deref())?;
    let window = file.window(overrides)?;
    let config = file.resolve(window, overrides)?;

    let merged = merge_to_table(input_dir, &common.output_dir, &config)?;
    let reduction = reduce_to_tables(
        &merged.samples,
        &common.output_dir,
        &config,
        file.report_json(overrides),
    )?;

    info!(
        "Harvest complete: {} samples merged, {} intervals reduced",
        merged.samples.len(),
        reduction.intervals.len()
    );
    Ok(())
}
