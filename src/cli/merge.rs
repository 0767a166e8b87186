use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

use nh3harvest::config::HarvestConfig;
use nh3harvest::merger::{MergeOutput, Merger};
use nh3harvest::output::OutputPaths;
use nh3harvest::table::write_master_table_file;

use super::config::{Config, Overrides};
use super::CommonArgs;

/// Merge instrument logs into the master table
pub fn run(input_dir: &Path, common: &CommonArgs, overrides: &Overrides) -> Result<()> {
    let file = Config::load(common.config.as_deref())?;
    let window = file.window(overrides)?;
    let config = file.resolve(window, overrides)?;

    let output = merge_to_table(input_dir, &common.output_dir, &config)?;
    if output.samples.is_empty() {
        warn!("No readings fall inside {}", config.merge.window);
    }
    Ok(())
}

/// Merge stage shared with `run`: select, parse and filter the logs, then
/// write the master table.
pub(super) fn merge_to_table(
    input_dir: &Path,
    output_dir: &Path,
    config: &HarvestConfig,
) -> Result<MergeOutput> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input_dir.display());
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let window = &config.merge.window;
    let paths = OutputPaths::new(output_dir, window, &config.output.extension);

    info!("nh3harvest - merge");
    info!("==================");
    info!("Input:  {}", input_dir.display());
    info!("Window: {}", window);
    info!(
        "UTC offset: {} h, file margin: {} min",
        config.merge.utc_offset.num_hours(),
        config.merge.file_margin.num_minutes()
    );

    let output = Merger::new(config.merge.clone())
        .merge_dir(input_dir)
        .context("Merge failed")?;

    write_master_table_file(&paths.master, &output.samples)
        .with_context(|| format!("Failed to write master table: {}", paths.master.display()))?;

    info!("Master table: {}", paths.master.display());
    info!("  Samples: {}", output.samples.len());
    if !output.stats.failed_files.is_empty() {
        info!("  Files abandoned: {}", output.stats.failed_files.len());
    }

    Ok(output)
}
