//! # Sample Model
//!
//! A [`Sample`] is one instrument reading: a local timestamp, the raw scrubber
//! valve value and a fixed vector of 11 ion-count channels. Channel identity is
//! fixed by position, never by content; use the constants in [`channels`] to
//! index into [`Sample::signals`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of signal channels carried by every sample.
pub const CHANNEL_COUNT: usize = 11;

/// Channel names in storage order. These double as master-table column names.
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = [
    "Hz18", "Hz63", "Hz47", "Hz93", "Hz140", "Hz30", "Hz46", "Hz60", "Hz74", "Hz88", "Hz102",
];

/// Positional indices into the signal vector.
pub mod channels {
    /// Ammonia
    pub const HZ18: usize = 0;
    /// Ammonia + EtOH cluster
    pub const HZ63: usize = 1;
    /// EtOH monomer
    pub const HZ47: usize = 2;
    /// EtOH dimer
    pub const HZ93: usize = 3;
    /// EtOH trimer
    pub const HZ140: usize = 4;
    /// C1 amine (methylamine)
    pub const HZ30: usize = 5;
    /// C2 amine (dimethylamine)
    pub const HZ46: usize = 6;
    /// C3 amine (trimethylamine)
    pub const HZ60: usize = 7;
    /// C4 amine
    pub const HZ74: usize = 8;
    /// C5 amine
    pub const HZ88: usize = 9;
    /// C6 amine
    pub const HZ102: usize = 10;
}

/// Which half of the valve cycle a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Valve = 0: scrubber in line, instrument sees background air.
    Background,
    /// Valve = 1: scrubber bypassed, instrument sees ambient air.
    Measurement,
}

impl Label {
    /// Map a raw valve reading onto a label. Anything other than exactly
    /// 0 or 1 is unrecognized.
    pub fn from_valve(valve: f64) -> Option<Self> {
        if valve == 0.0 {
            Some(Label::Background)
        } else if valve == 1.0 {
            Some(Label::Measurement)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Background => write!(f, "background"),
            Label::Measurement => write!(f, "measurement"),
        }
    }
}

/// A single corrected instrument reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Local time of the reading (UTC offset already removed).
    pub time: NaiveDateTime,
    /// Raw valve value as logged by the instrument.
    pub valve: f64,
    /// Ion-count signals in [`CHANNEL_NAMES`] order.
    pub signals: [f64; CHANNEL_COUNT],
}

impl Sample {
    /// Create a new sample.
    pub fn new(time: NaiveDateTime, valve: f64, signals: [f64; CHANNEL_COUNT]) -> Self {
        Self {
            time,
            valve,
            signals,
        }
    }

    /// Label derived from the valve value, if recognized.
    pub fn label(&self) -> Option<Label> {
        Label::from_valve(self.valve)
    }
}
