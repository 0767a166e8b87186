//! Index-wise pairing of background and measurement averages.
//!
//! Pairing is positional: the i-th background average goes with the i-th
//! measurement average. This only holds if the two streams alternate 1:1.
//! Every pair is checked three ways and violations are reported rather than
//! silently accepted:
//!
//! - its order must match the order of the first pair
//! - its leading side must come after the trailing side of the previous pair
//! - its two sides must not sit more than twice as far apart as the first pair's

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::average::ChunkAverage;

/// Which half of the valve cycle comes first within a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairOrder {
    /// Background interval precedes its measurement interval
    BackgroundFirst,
    /// Measurement interval precedes its background interval
    MeasurementFirst,
}

impl PairOrder {
    fn of(background: &NaiveDateTime, measurement: &NaiveDateTime) -> Self {
        if background <= measurement {
            PairOrder::BackgroundFirst
        } else {
            PairOrder::MeasurementFirst
        }
    }
}

impl std::fmt::Display for PairOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairOrder::BackgroundFirst => write!(f, "background first"),
            PairOrder::MeasurementFirst => write!(f, "measurement first"),
        }
    }
}

/// A problem found while pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairingWarning {
    /// The two average lists differ in length; the excess is discarded
    LengthMismatch {
        /// Background averages available
        background: usize,
        /// Measurement averages available
        measurement: usize,
    },
    /// A pair runs in the opposite order to the first pair
    OrderViolation {
        /// Pair index
        index: usize,
        /// Background representative time
        background: NaiveDateTime,
        /// Measurement representative time
        measurement: NaiveDateTime,
        /// Order established by the first pair
        expected: PairOrder,
    },
    /// A pair keeps the expected order but no longer comes from one valve
    /// cycle, so it and the pairs after it are shifted
    Misaligned {
        /// Pair index
        index: usize,
        /// Background representative time
        background: NaiveDateTime,
        /// Measurement representative time
        measurement: NaiveDateTime,
    },
}

impl std::fmt::Display for PairingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairingWarning::LengthMismatch {
                background,
                measurement,
            } => write!(
                f,
                "{} background vs {} measurement intervals; extra intervals dropped",
                background, measurement
            ),
            PairingWarning::OrderViolation {
                index,
                background,
                measurement,
                expected,
            } => write!(
                f,
                "pair {} (background {}, measurement {}) breaks the {} ordering",
                index, background, measurement, expected
            ),
            PairingWarning::Misaligned {
                index,
                background,
                measurement,
            } => write!(
                f,
                "pair {} (background {}, measurement {}) spans more than one valve cycle; \
                 later pairs are shifted",
                index, background, measurement
            ),
        }
    }
}

/// One background average matched with one measurement average.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedInterval {
    /// Pair position
    pub index: usize,
    /// Background side
    pub background: ChunkAverage,
    /// Measurement side
    pub measurement: ChunkAverage,
}

/// Pairs plus the integrity findings.
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    /// Positional pairs, truncated to the shorter list
    pub pairs: Vec<PairedInterval>,
    /// Order taken from the first pair
    pub order: Option<PairOrder>,
    /// Integrity warnings
    pub warnings: Vec<PairingWarning>,
}

fn separation(a: &NaiveDateTime, b: &NaiveDateTime) -> Duration {
    if a <= b {
        *b - *a
    } else {
        *a - *b
    }
}

/// Zip the two average lists by position and check pair ordering and
/// interleaving.
pub fn pair_intervals(background: Vec<ChunkAverage>, measurement: Vec<ChunkAverage>) -> Pairing {
    let mut pairing = Pairing::default();

    if background.len() != measurement.len() {
        pairing.warnings.push(PairingWarning::LengthMismatch {
            background: background.len(),
            measurement: measurement.len(),
        });
    }

    // order and spacing of the first pair, trailing side of the previous one
    let mut first: Option<(PairOrder, Duration)> = None;
    let mut previous_end: Option<NaiveDateTime> = None;

    for (index, (bg, ms)) in background.into_iter().zip(measurement).enumerate() {
        let order = PairOrder::of(&bg.time, &ms.time);
        let (leading, trailing) = match order {
            PairOrder::BackgroundFirst => (bg.time, ms.time),
            PairOrder::MeasurementFirst => (ms.time, bg.time),
        };
        let spacing = separation(&bg.time, &ms.time);

        match first {
            None => first = Some((order, spacing)),
            Some((expected, _)) if expected != order => {
                pairing.warnings.push(PairingWarning::OrderViolation {
                    index,
                    background: bg.time,
                    measurement: ms.time,
                    expected,
                });
            }
            Some((_, baseline)) => {
                let overlaps = previous_end.is_some_and(|end| leading <= end);
                let stretched = baseline > Duration::zero() && spacing > baseline * 2;
                if overlaps || stretched {
                    pairing.warnings.push(PairingWarning::Misaligned {
                        index,
                        background: bg.time,
                        measurement: ms.time,
                    });
                }
            }
        }

        previous_end = Some(trailing);
        pairing.pairs.push(PairedInterval {
            index,
            background: bg,
            measurement: ms,
        });
    }

    pairing.order = first.map(|(order, _)| order);
    pairing
}
