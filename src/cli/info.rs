use anyhow::{Context, Result};
use chrono::Duration;
use std::path::Path;

use nh3harvest::config::ReductionConfig;
use nh3harvest::reducer::{chunk_stream, split_streams};
use nh3harvest::sample::Label;
use nh3harvest::table::read_master_table_file;

/// Display information about a master table
pub fn run(file: &Path, gap_minutes: Option<i64>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let samples = read_master_table_file(file)
        .with_context(|| format!("Failed to read master table: {}", file.display()))?;

    let gap = match gap_minutes {
        Some(minutes) => Duration::try_minutes(minutes).context("Gap out of range")?,
        None => ReductionConfig::default().gap_threshold,
    };
    if gap <= Duration::zero() {
        anyhow::bail!("Gap must be positive, got {} min", gap.num_minutes());
    }

    println!("Master Table Information");
    println!("========================");
    println!("File: {}", file.display());
    println!();

    println!("Samples: {}", samples.len());
    if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
        println!("  First: {}", first.time);
        println!("  Last:  {}", last.time);
    }
    let backwards = samples.windows(2).filter(|w| w[1].time < w[0].time).count();
    if backwards > 0 {
        println!("  Out of order: {} steps backwards in time", backwards);
    }
    println!();

    let streams = split_streams(&samples);
    println!("Streams (gap >= {} min):", gap.num_minutes());
    for label in [Label::Background, Label::Measurement] {
        let stream = streams.stream(label);
        let chunks = chunk_stream(label, stream, gap);
        println!(
            "  {}: {} samples, {} closed intervals{}",
            label,
            stream.len(),
            chunks.sealed.len(),
            match chunks.trailing {
                Some(open) => format!(", 1 open at end ({} samples)", open.len()),
                None => String::new(),
            }
        );
    }
    if streams.unrecognized > 0 {
        println!("  unrecognized valve state: {} samples", streams.unrecognized);
    }

    Ok(())
}
