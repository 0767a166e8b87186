//! Property and scenario tests for chunking, averaging and concentration
//!
//! This test suite validates:
//! - chunk boundaries fall exactly at gaps of the threshold or more
//! - averages exist only for chunks longer than the settling trim
//! - representative times stay inside the averaged span
//! - the concentration guard

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use nh3harvest::config::ReductionConfig;
use nh3harvest::reducer::{
    average_chunk, chunk_stream, concentration, AverageError, Chunk, Reducer,
};
use nh3harvest::sample::{channels, Label, Sample, CHANNEL_COUNT};

// ============================================================================
// Helper Functions
// ============================================================================

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 6, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn sample_at(seconds: i64, valve: f64, value: f64) -> Sample {
    Sample::new(
        t0() + Duration::seconds(seconds),
        valve,
        [value; CHANNEL_COUNT],
    )
}

/// Samples at cumulative offsets built from the given gaps.
fn from_gaps(gaps: &[i64]) -> Vec<Sample> {
    let mut at = 0;
    let mut samples = vec![sample_at(0, 0.0, 0.0)];
    for (i, gap) in gaps.iter().enumerate() {
        at += gap;
        samples.push(sample_at(at, 0.0, i as f64));
    }
    samples
}

// ============================================================================
// Scenario Tests
// ============================================================================

/// 65 background then 65 measurement samples at 1 s spacing
fn interleaved_65() -> Vec<Sample> {
    let mut samples: Vec<Sample> = (0..65).map(|i| sample_at(i, 0.0, 1.0)).collect();
    samples.extend((65..130).map(|i| sample_at(i, 1.0, 2.0)));
    samples
}

#[test]
fn test_65_65_with_closed_trailing_chunk_gives_one_pair() {
    let config = ReductionConfig {
        close_trailing_chunk: true,
        ..Default::default()
    };
    let reduction = Reducer::new(config)
        .unwrap()
        .reduce(&interleaved_65())
        .unwrap();
    assert_eq!(reduction.intervals.len(), 1);
    let pair = &reduction.intervals[0];
    // five samples survive the trim on each side
    assert_eq!(pair.background_time, t0() + Duration::seconds(62));
    assert_eq!(pair.time, t0() + Duration::seconds(127));
}

#[test]
fn test_65_65_sealed_by_following_gap_gives_one_pair() {
    let mut samples = interleaved_65();
    samples.push(sample_at(1000, 0.0, 1.0));
    samples.push(sample_at(1001, 1.0, 2.0));
    let reduction = Reducer::new(ReductionConfig::default())
        .unwrap()
        .reduce(&samples)
        .unwrap();
    assert_eq!(reduction.intervals.len(), 1);
    assert_eq!(reduction.report.trailing_chunks_dropped(), 2);
}

#[test]
fn test_65_65_without_sealing_gives_nothing() {
    let reduction = Reducer::new(ReductionConfig::default())
        .unwrap()
        .reduce(&interleaved_65())
        .unwrap();
    assert!(reduction.intervals.is_empty());
    assert_eq!(reduction.report.background.trailing_chunk_samples, Some(65));
}

#[test]
fn test_six_minute_gap_splits_run() {
    let mut samples: Vec<Sample> = (0..100).map(|i| sample_at(2 * i, 0.0, 1.0)).collect();
    samples.extend((0..100).map(|i| sample_at(198 + 360 + 2 * i, 0.0, 1.0)));
    let set = chunk_stream(Label::Background, &samples, Duration::minutes(5));
    assert_eq!(set.sealed.len(), 1);
    assert_eq!(set.sealed[0].len(), 100);
    assert_eq!(set.trailing.map(|c| c.len()), Some(100));
}

#[test]
fn test_sixty_sample_chunk_is_reported_not_fatal() {
    let mut samples: Vec<Sample> = (0..60).map(|i| sample_at(i, 0.0, 1.0)).collect();
    samples.extend((0..100).map(|i| sample_at(1000 + i, 0.0, 1.0)));
    samples.push(sample_at(5000, 0.0, 1.0));
    let reduction = Reducer::new(ReductionConfig::default())
        .unwrap()
        .reduce(&samples)
        .unwrap();
    assert_eq!(reduction.report.skipped_chunks.len(), 1);
    assert_eq!(reduction.report.skipped_chunks[0].samples, 60);
    assert_eq!(reduction.report.background.averaged_chunks, 1);
}

#[test]
fn test_equal_channel_averages_give_zero_c1() {
    let mut samples: Vec<Sample> = Vec::new();
    for (start, valve) in [(0, 0.0), (600, 1.0), (1200, 0.0), (1800, 1.0)] {
        samples.extend((0..80).map(|i| {
            let mut s = sample_at(start + 2 * i, valve, 3.0);
            s.signals[channels::HZ47] = 1e5;
            s
        }));
    }
    let reduction = Reducer::new(ReductionConfig::default())
        .unwrap()
        .reduce(&samples)
        .unwrap();
    assert_eq!(reduction.intervals.len(), 1);
    assert_eq!(
        reduction.intervals[0].differential(nh3harvest::reducer::Analyte::C1),
        0.0
    );
    assert_eq!(
        reduction.intervals[0].concentration(nh3harvest::reducer::Analyte::C1),
        0.0
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Chunk-internal gaps stay under the threshold; boundaries are at or over it
    #[test]
    fn test_chunk_boundaries(gaps in prop::collection::vec(1i64..700, 0..200)) {
        let samples = from_gaps(&gaps);
        let threshold = Duration::minutes(5);
        let set = chunk_stream(Label::Background, &samples, threshold);

        let mut chunks: Vec<Chunk<'_>> = set.sealed.clone();
        chunks.extend(set.trailing);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        prop_assert_eq!(total, samples.len());

        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            for w in chunk.samples().windows(2) {
                prop_assert!(w[1].time - w[0].time < threshold);
            }
        }
        for pair in chunks.windows(2) {
            prop_assert!(pair[1].start() - pair[0].end() >= threshold);
        }
    }

    /// An average exists iff the chunk is longer than the trim, and equals the
    /// mean of the kept samples
    #[test]
    fn test_average_definedness(
        values in prop::collection::vec(-1e6f64..1e6, 1..200),
        trim in 0usize..80,
    ) {
        let samples: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| sample_at(2 * i as i64, 1.0, v))
            .collect();
        let chunk = Chunk::new(Label::Measurement, 3, &samples).unwrap();

        match average_chunk(&chunk, trim) {
            Ok(avg) => {
                prop_assert!(samples.len() > trim);
                let kept = &values[trim..];
                let mean = kept.iter().sum::<f64>() / kept.len() as f64;
                prop_assert!((avg.signals[0] - mean).abs() <= 1e-6 * mean.abs().max(1.0));
                prop_assert_eq!(avg.samples, kept.len());
                prop_assert!(avg.first <= avg.time && avg.time <= avg.last);
                prop_assert_eq!(avg.first, samples[trim].time);
            }
            Err(AverageError::InsufficientData { samples: n, index, .. }) => {
                prop_assert!(samples.len() <= trim);
                prop_assert_eq!(n, samples.len());
                prop_assert_eq!(index, 3);
            }
        }
    }

    /// Concentration is zero iff the differential is not positive
    #[test]
    fn test_concentration_guard(
        diff in -1e4f64..1e4,
        eth in 1e3f64..1e7,
        factor in 0.1f64..50.0,
    ) {
        let c = concentration(diff, eth, factor);
        if diff > 0.0 {
            prop_assert!(c > 0.0);
            prop_assert!((c - (diff / (1e6 / eth)) / factor).abs() < 1e-9);
        } else {
            prop_assert_eq!(c, 0.0);
        }
    }
}
