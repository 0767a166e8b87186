//! # Reducer
//!
//! Turns the master record stream into background-subtracted interval
//! results:
//!
//! 1. split samples into background and measurement streams by valve state
//! 2. cut each stream into chunks at gaps of `gap_threshold` or more
//! 3. drop the settling samples of each chunk and average the rest
//! 4. pair the i-th background average with the i-th measurement average
//! 5. subtract, normalize to the EtOH reagent signal, and calibrate
//!
//! A chunk too short to average is reported and skipped; the run continues.
//! Because pairing is positional, a skipped chunk shifts every later pair.
//! The shift is reported in the [`ReductionReport`] as a length mismatch, an
//! order violation, or a misaligned pair when the order happens to survive.
//!
//! ```rust
//! use nh3harvest::config::ReductionConfig;
//! use nh3harvest::reducer::Reducer;
//!
//! let reducer = Reducer::new(ReductionConfig::default())?;
//! let reduction = reducer.reduce(&[])?;
//! assert!(reduction.intervals.is_empty());
//! # Ok::<(), nh3harvest::reducer::ReduceError>(())
//! ```

mod average;
mod chunk;
mod pairing;
mod report;
mod signal;

use chrono::NaiveDateTime;
use log::{debug, info, warn};

pub use average::{average_chunk, AverageError, ChunkAverage};
pub use chunk::{chunk_stream, split_streams, Chunk, ChunkSet, LabelStreams};
pub use pairing::{pair_intervals, PairOrder, PairedInterval, Pairing, PairingWarning};
pub use report::{ReductionReport, SkippedChunk, StreamSummary};
pub use signal::{
    concentration, differential_signal, ethanol_total, Analyte, IntervalResult, ETHANOL_CHANNELS,
};

use crate::config::{ConfigError, ReductionConfig};
use crate::sample::{Label, Sample};

/// Errors that stop a reduction.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    /// Input timestamps go backwards
    #[error("Input is not in time order: sample {index} at {current} follows {previous}")]
    UnsortedInput {
        /// Index of the offending sample
        index: usize,
        /// Time of the preceding sample
        previous: NaiveDateTime,
        /// Time of the offending sample
        current: NaiveDateTime,
    },

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Everything produced by one reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The split streams, for the raw dumps
    pub streams: LabelStreams,
    /// One result per paired interval
    pub intervals: Vec<IntervalResult>,
    /// Diagnostics
    pub report: ReductionReport,
}

/// Segments, averages and pairs a record stream.
#[derive(Debug, Clone)]
pub struct Reducer {
    config: ReductionConfig,
}

impl Reducer {
    /// Create a reducer, validating the configuration.
    pub fn new(config: ReductionConfig) -> Result<Self, ReduceError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Run the full reduction over time-ordered samples.
    pub fn reduce(&self, samples: &[Sample]) -> Result<Reduction, ReduceError> {
        check_order(samples)?;

        let streams = split_streams(samples);
        let mut report = ReductionReport::new(samples.len());
        report.unrecognized_valve = streams.unrecognized;
        if streams.unrecognized > 0 {
            debug!("Dropped {} samples with unrecognized valve state", streams.unrecognized);
        }

        let (background, bg_summary, bg_skipped) =
            self.average_stream(Label::Background, streams.stream(Label::Background));
        let (measurement, ms_summary, ms_skipped) =
            self.average_stream(Label::Measurement, streams.stream(Label::Measurement));
        report.background = bg_summary;
        report.measurement = ms_summary;
        report.skipped_chunks.extend(bg_skipped);
        report.skipped_chunks.extend(ms_skipped);

        let pairing = pair_intervals(background, measurement);
        for warning in &pairing.warnings {
            warn!("Pairing: {}", warning);
        }

        let intervals: Vec<IntervalResult> = pairing
            .pairs
            .iter()
            .map(|pair| IntervalResult::from_pair(pair, &self.config.calibration))
            .collect();

        report.pair_order = pairing.order;
        report.pairing_warnings = pairing.warnings;
        report.intervals = intervals.len();

        info!(
            "Reduced {} samples into {} intervals ({} chunks skipped, {} trailing runs dropped)",
            samples.len(),
            intervals.len(),
            report.skipped_chunks.len(),
            report.trailing_chunks_dropped()
        );

        Ok(Reduction {
            streams,
            intervals,
            report,
        })
    }

    /// Chunk and average one stream.
    fn average_stream(
        &self,
        label: Label,
        stream: &[Sample],
    ) -> (Vec<ChunkAverage>, StreamSummary, Vec<SkippedChunk>) {
        let set = chunk_stream(label, stream, self.config.gap_threshold);
        let mut summary = StreamSummary::new(label, stream.len());
        summary.sealed_chunks = set.sealed.len();
        summary.trailing_chunk_samples = set.trailing.map(|c| c.len());

        let mut chunks = set.sealed;
        if let Some(trailing) = set.trailing {
            if self.config.close_trailing_chunk {
                summary.trailing_chunk_closed = true;
                chunks.push(trailing);
            } else {
                debug!(
                    "{} run of {} samples starting {} is still open at stream end; not averaged",
                    label,
                    trailing.len(),
                    trailing.start()
                );
            }
        }

        let mut averages = Vec::with_capacity(chunks.len());
        let mut skipped = Vec::new();
        for chunk in &chunks {
            match average_chunk(chunk, self.config.trim_count) {
                Ok(avg) => {
                    debug!(
                        "{} chunk {}: {} samples averaged, centred {}",
                        label, avg.chunk_index, avg.samples, avg.time
                    );
                    averages.push(avg);
                }
                Err(e) => {
                    warn!("Skipping chunk: {}", e);
                    skipped.push(SkippedChunk::from(e));
                }
            }
        }
        summary.averaged_chunks = averages.len();

        (averages, summary, skipped)
    }
}

fn check_order(samples: &[Sample]) -> Result<(), ReduceError> {
    match samples
        .windows(2)
        .position(|w| w[1].time < w[0].time)
    {
        Some(i) => Err(ReduceError::UnsortedInput {
            index: i + 1,
            previous: samples[i].time,
            current: samples[i + 1].time,
        }),
        None => Ok(()),
    }
}
