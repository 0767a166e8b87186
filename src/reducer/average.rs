//! Trim-and-average of a single chunk.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::chunk::Chunk;
use crate::sample::{Label, CHANNEL_COUNT};

/// Why a chunk produced no average.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AverageError {
    /// Nothing is left once the settling samples are removed
    #[error("{label} chunk {index} starting {start} has {samples} samples, needs more than {trim}")]
    InsufficientData {
        /// Stream of the chunk
        label: Label,
        /// Chunk position in its stream
        index: usize,
        /// First sample time
        start: NaiveDateTime,
        /// Samples in the chunk
        samples: usize,
        /// Settling samples discarded
        trim: usize,
    },
}

/// Per-channel mean of one chunk after settling-time trim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkAverage {
    /// Stream of the chunk
    pub label: Label,
    /// Chunk position in its stream
    pub chunk_index: usize,
    /// Midpoint of the averaged span
    pub time: NaiveDateTime,
    /// First averaged sample time
    pub first: NaiveDateTime,
    /// Last averaged sample time
    pub last: NaiveDateTime,
    /// Number of samples averaged
    pub samples: usize,
    /// Mean of each channel
    pub signals: [f64; CHANNEL_COUNT],
}

/// Drop the first `trim` samples of a chunk and average the rest.
pub fn average_chunk(chunk: &Chunk<'_>, trim: usize) -> Result<ChunkAverage, AverageError> {
    let kept = chunk.samples().get(trim..).unwrap_or(&[]);
    let (Some(first), Some(last)) = (kept.first(), kept.last()) else {
        return Err(AverageError::InsufficientData {
            label: chunk.label(),
            index: chunk.index(),
            start: chunk.start(),
            samples: chunk.len(),
            trim,
        });
    };

    let mut sums = [0.0; CHANNEL_COUNT];
    for sample in kept {
        for (sum, value) in sums.iter_mut().zip(sample.signals.iter()) {
            *sum += value;
        }
    }
    let n = kept.len() as f64;
    let signals = sums.map(|sum| sum / n);

    Ok(ChunkAverage {
        label: chunk.label(),
        chunk_index: chunk.index(),
        time: first.time + (last.time - first.time) / 2,
        first: first.time,
        last: last.time,
        samples: kept.len(),
        signals,
    })
}
