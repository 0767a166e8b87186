//! Valve-state split and gap-based chunking.

use chrono::{Duration, NaiveDateTime};

use crate::sample::{Label, Sample};

/// Samples partitioned by valve state, input order preserved.
#[derive(Debug, Clone, Default)]
pub struct LabelStreams {
    /// Valve = 0 samples
    pub background: Vec<Sample>,
    /// Valve = 1 samples
    pub measurement: Vec<Sample>,
    /// Samples whose valve value was neither 0 nor 1
    pub unrecognized: usize,
}

impl LabelStreams {
    /// The stream for one label.
    pub fn stream(&self, label: Label) -> &[Sample] {
        match label {
            Label::Background => &self.background,
            Label::Measurement => &self.measurement,
        }
    }
}

/// Split samples into background and measurement streams. Unrecognized
/// valve values are dropped and counted.
pub fn split_streams(samples: &[Sample]) -> LabelStreams {
    let mut streams = LabelStreams::default();
    for sample in samples {
        match sample.label() {
            Some(Label::Background) => streams.background.push(sample.clone()),
            Some(Label::Measurement) => streams.measurement.push(sample.clone()),
            None => streams.unrecognized += 1,
        }
    }
    streams
}

/// A run of consecutive same-label samples with no gap at or above the
/// threshold. Never empty.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    label: Label,
    index: usize,
    samples: &'a [Sample],
}

impl<'a> Chunk<'a> {
    /// Wrap a slice as a chunk. Returns `None` for an empty slice.
    pub fn new(label: Label, index: usize, samples: &'a [Sample]) -> Option<Self> {
        (!samples.is_empty()).then_some(Self {
            label,
            index,
            samples,
        })
    }

    /// Stream this chunk came from.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Position of the chunk within its stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The chunk's samples.
    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; chunks are never empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the first sample.
    pub fn start(&self) -> NaiveDateTime {
        self.samples[0].time
    }

    /// Time of the last sample.
    pub fn end(&self) -> NaiveDateTime {
        self.samples[self.samples.len() - 1].time
    }
}

/// Result of chunking one stream.
#[derive(Debug, Clone, Default)]
pub struct ChunkSet<'a> {
    /// Chunks closed by a gap
    pub sealed: Vec<Chunk<'a>>,
    /// Chunk still open when the stream ended
    pub trailing: Option<Chunk<'a>>,
}

/// Cut a stream into chunks wherever consecutive samples are `gap` or more
/// apart. The run after the last gap is returned as `trailing`, not sealed.
pub fn chunk_stream(label: Label, stream: &[Sample], gap: Duration) -> ChunkSet<'_> {
    let mut set = ChunkSet::default();
    if stream.is_empty() {
        return set;
    }

    let mut start = 0;
    for i in 1..stream.len() {
        if stream[i].time - stream[i - 1].time >= gap {
            set.sealed
                .extend(Chunk::new(label, set.sealed.len(), &stream[start..i]));
            start = i;
        }
    }
    set.trailing = Chunk::new(label, set.sealed.len(), &stream[start..]);
    set
}
