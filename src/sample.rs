use serde::{Deserialize, Serialize};

/// A bin index on the on-radio FFT, always in `[0, nfft)`.
pub type BinIndex = u32;

/// A single complex FFT bin that exceeded its per-bin threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FftSample {
    /// Odd/even window marker, derived from the low bit of the header time.
    /// Carried through for diagnostics only; not used by any decode logic.
    pub window_id: u8,
    pub bin: BinIndex,
    pub time_ns: f64,
    pub re: i16,
    pub im: i16,
}

/// A per-bin running magnitude average, emitted once per averaging window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvgSample {
    pub bin: BinIndex,
    pub time_ns: f64,
    pub magnitude: u32,
}

/// A single decoded unit from a V1 or V2 stream.
///
/// Decoders emit one sequence of these rather than two parallel
/// "tuple lists" — consumers pattern-match, aggregators split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Sample {
    Fft(FftSample),
    Avg(AvgSample),
}

impl Sample {
    pub fn time_ns(&self) -> f64 {
        match self {
            Sample::Fft(s) => s.time_ns,
            Sample::Avg(s) => s.time_ns,
        }
    }

    pub fn bin(&self) -> BinIndex {
        match self {
            Sample::Fft(s) => s.bin,
            Sample::Avg(s) => s.bin,
        }
    }

    pub fn as_avg(&self) -> Option<AvgSample> {
        match self {
            Sample::Avg(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_fft(&self) -> Option<FftSample> {
        match self {
            Sample::Fft(s) => Some(*s),
            _ => None,
        }
    }
}
