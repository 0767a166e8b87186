use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use nh3harvest::config::HarvestConfig;
use nh3harvest::output::{window_from_master_name, write_reduction, OutputPaths};
use nh3harvest::reducer::{Reducer, Reduction};
use nh3harvest::sample::Sample;
use nh3harvest::table::read_master_table_file;

use super::config::{Config, Overrides};
use super::CommonArgs;

/// Reduce an existing master table
pub fn run(master: &Path, common: &CommonArgs, overrides: &Overrides) -> Result<()> {
    if !master.exists() {
        anyhow::bail!("Master table does not exist: {}", master.display());
    }

    let file = Config::load(common.config.as_deref())?;
    let window_given = overrides.start.is_some()
        || overrides.end.is_some()
        || file.window.start.is_some()
        || file.window.end.is_some();
    let window = if window_given {
        file.window(overrides)?
    } else {
        window_from_master_name(master).with_context(|| {
            format!(
                "Cannot infer the window from {}; pass --start and --end",
                master.display()
            )
        })?
    };
    let config = file.resolve(window, overrides)?;

    let samples = read_master_table_file(master)
        .with_context(|| format!("Failed to read master table: {}", master.display()))?;
    info!("Read {} samples from {}", samples.len(), master.display());

    reduce_to_tables(
        &samples,
        &common.output_dir,
        &config,
        file.report_json(overrides),
    )?;
    Ok(())
}

/// Reduce stage shared with `run`: reduce, write every result file and print
/// the report.
pub(super) fn reduce_to_tables(
    samples: &[Sample],
    output_dir: &Path,
    config: &HarvestConfig,
    report_json: bool,
) -> Result<Reduction> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    info!("nh3harvest - reduce");
    info!("===================");
    info!(
        "Gap threshold: {} min, settling trim: {} samples",
        config.reduction.gap_threshold.num_minutes(),
        config.reduction.trim_count
    );
    if config.reduction.close_trailing_chunk {
        info!("Trailing intervals: closed at stream end");
    }

    let reducer = Reducer::new(config.reduction.clone()).context("Invalid reduction settings")?;
    let reduction = reducer.reduce(samples).context("Reduction failed")?;

    let paths = OutputPaths::new(output_dir, &config.merge.window, &config.output.extension);
    let stats = write_reduction(&paths, &reduction, report_json)
        .context("Failed to write result tables")?;
    info!("{}", stats);

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", reduction.report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", reduction.report);
    }

    Ok(reduction)
}
