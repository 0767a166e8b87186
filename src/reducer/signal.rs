//! Background subtraction and concentration.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::pairing::PairedInterval;
use crate::config::CalibrationFactors;
use crate::sample::{channels, CHANNEL_COUNT};

/// Analytes reported in the result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Analyte {
    /// Ammonia, from Hz18 + Hz63
    Nh3,
    /// Methylamine, from Hz30
    C1,
    /// Dimethylamine, from Hz46
    C2,
    /// Trimethylamine, from Hz60
    C3,
}

impl Analyte {
    /// All analytes in table column order.
    pub const ALL: [Analyte; 4] = [Analyte::Nh3, Analyte::C1, Analyte::C2, Analyte::C3];

    /// Short name.
    pub fn name(&self) -> &'static str {
        match self {
            Analyte::Nh3 => "NH3",
            Analyte::C1 => "C1",
            Analyte::C2 => "C2",
            Analyte::C3 => "C3",
        }
    }

    /// Concentration column label.
    pub fn concentration_label(&self) -> &'static str {
        match self {
            Analyte::Nh3 => "[NH3]",
            Analyte::C1 => "[MA]",
            Analyte::C2 => "[DMA]",
            Analyte::C3 => "[TMA]",
        }
    }

    /// Channels whose sum forms this analyte's signal.
    pub fn channels(&self) -> &'static [usize] {
        match self {
            Analyte::Nh3 => &[channels::HZ18, channels::HZ63],
            Analyte::C1 => &[channels::HZ30],
            Analyte::C2 => &[channels::HZ46],
            Analyte::C3 => &[channels::HZ60],
        }
    }

    fn position(&self) -> usize {
        match self {
            Analyte::Nh3 => 0,
            Analyte::C1 => 1,
            Analyte::C2 => 2,
            Analyte::C3 => 3,
        }
    }
}

/// Channels summed into the EtOH reagent total.
pub const ETHANOL_CHANNELS: [usize; 3] = [channels::HZ47, channels::HZ93, channels::HZ140];

/// Measurement minus background for one analyte. Multi-channel analytes are
/// summed on each side before subtracting.
pub fn differential_signal(
    analyte: Analyte,
    background: &[f64; CHANNEL_COUNT],
    measurement: &[f64; CHANNEL_COUNT],
) -> f64 {
    let sum = |signals: &[f64; CHANNEL_COUNT]| -> f64 {
        analyte.channels().iter().map(|&c| signals[c]).sum()
    };
    sum(measurement) - sum(background)
}

/// Total EtOH reagent signal, background side only.
pub fn ethanol_total(background: &[f64; CHANNEL_COUNT]) -> f64 {
    ETHANOL_CHANNELS.iter().map(|&c| background[c]).sum()
}

/// Normalize a differential signal to one million reagent counts and apply
/// the calibration factor. Non-positive signals yield exactly zero.
pub fn concentration(differential: f64, ethanol_total: f64, factor: f64) -> f64 {
    if differential > 0.0 {
        (differential / (1e6 / ethanol_total)) / factor
    } else {
        0.0
    }
}

/// Reduced values for one paired interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalResult {
    /// Representative time (measurement side midpoint)
    pub time: NaiveDateTime,
    /// Representative time of the background side
    pub background_time: NaiveDateTime,
    /// Measurement minus background, in [`Analyte::ALL`] order
    pub differential: [f64; 4],
    /// Background EtOH total
    pub ethanol_total: f64,
    /// Calibrated concentrations, in [`Analyte::ALL`] order
    pub concentrations: [f64; 4],
}

impl IntervalResult {
    /// Reduce one pair.
    pub fn from_pair(pair: &PairedInterval, calibration: &CalibrationFactors) -> Self {
        let bg = &pair.background.signals;
        let ms = &pair.measurement.signals;
        let ethanol = ethanol_total(bg);

        let differential = Analyte::ALL.map(|a| differential_signal(a, bg, ms));
        let mut concentrations = [0.0; 4];
        for analyte in Analyte::ALL {
            let i = analyte.position();
            concentrations[i] = concentration(differential[i], ethanol, calibration.factor(analyte));
        }

        Self {
            time: pair.measurement.time,
            background_time: pair.background.time,
            differential,
            ethanol_total: ethanol,
            concentrations,
        }
    }

    /// Differential signal for one analyte.
    pub fn differential(&self, analyte: Analyte) -> f64 {
        self.differential[analyte.position()]
    }

    /// Concentration for one analyte.
    pub fn concentration(&self, analyte: Analyte) -> f64 {
        self.concentrations[analyte.position()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::average::ChunkAverage;
    use crate::sample::Label;
    use chrono::NaiveDate;

    fn signals(values: &[(usize, f64)]) -> [f64; CHANNEL_COUNT] {
        let mut s = [0.0; CHANNEL_COUNT];
        for &(c, v) in values {
            s[c] = v;
        }
        s
    }

    #[test]
    fn test_nh3_sums_two_channels() {
        let bg = signals(&[(channels::HZ18, 10.0), (channels::HZ63, 5.0)]);
        let ms = signals(&[(channels::HZ18, 30.0), (channels::HZ63, 1.0)]);
        assert_eq!(differential_signal(Analyte::Nh3, &bg, &ms), 16.0);
    }

    #[test]
    fn test_equal_averages_give_zero() {
        let bg = signals(&[(channels::HZ30, 42.5)]);
        let ms = signals(&[(channels::HZ30, 42.5)]);
        assert_eq!(differential_signal(Analyte::C1, &bg, &ms), 0.0);
        assert_eq!(concentration(0.0, 1e5, 8.58), 0.0);
    }

    #[test]
    fn test_ethanol_total_uses_three_channels() {
        let bg = signals(&[
            (channels::HZ47, 1000.0),
            (channels::HZ93, 200.0),
            (channels::HZ140, 30.0),
            (channels::HZ18, 99.0),
        ]);
        assert_eq!(ethanol_total(&bg), 1230.0);
    }

    #[test]
    fn test_concentration_formula_and_guard() {
        let c = concentration(50.0, 2e5, 2.0);
        assert!((c - (50.0 / (1e6 / 2e5)) / 2.0).abs() < 1e-12);
        assert_eq!(c, 5.0);
        assert_eq!(concentration(-3.0, 2e5, 2.0), 0.0);
        assert_eq!(concentration(-0.0, 2e5, 2.0), 0.0);
        assert_eq!(concentration(f64::NAN, 2e5, 2.0), 0.0);
    }

    #[test]
    fn test_interval_result_uses_background_ethanol() {
        let t = NaiveDate::from_ymd_opt(2022, 6, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let side = |label, signals| ChunkAverage {
            label,
            chunk_index: 0,
            time: t,
            first: t,
            last: t,
            samples: 1,
            signals,
        };
        let pair = PairedInterval {
            index: 0,
            background: side(
                Label::Background,
                signals(&[(channels::HZ47, 1e5), (channels::HZ18, 10.0), (channels::HZ46, 5.0)]),
            ),
            measurement: side(
                Label::Measurement,
                signals(&[(channels::HZ47, 9e5), (channels::HZ18, 20.0), (channels::HZ46, 4.0)]),
            ),
        };
        let result = IntervalResult::from_pair(&pair, &CalibrationFactors::default());
        assert_eq!(result.ethanol_total, 1e5);
        assert_eq!(result.differential(Analyte::Nh3), 10.0);
        assert_eq!(result.differential(Analyte::C2), -1.0);
        assert_eq!(result.concentration(Analyte::C2), 0.0);
        let expected = (10.0 / (1e6 / 1e5)) / 13.11;
        assert!((result.concentration(Analyte::Nh3) - expected).abs() < 1e-12);
    }
}
