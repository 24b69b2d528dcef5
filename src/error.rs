use std::fmt;

/// Errors that can occur while decoding SparSDR streams or computing calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum SparSdrError {
    /// A record/word stream ended in the middle of a record.
    TruncatedRecord { offset: usize, needed: usize },
    /// A bin index decoded from the wire fell outside `[0, nfft)`.
    BadBinIndex(u32),
    /// `nfft` was not a power of two, or otherwise out of range.
    InvalidNfft(usize),
    /// Structural problem that isn't a truncation (e.g. malformed config text).
    InvalidStructure(String),
    /// No captures were supplied to calibrate from.
    MissingCalibration,
    /// The threshold config file couldn't be parsed.
    ConfigParse(String),
    /// Wrapped I/O error from opening/reading a calibration file.
    Io(String),
}

impl fmt::Display for SparSdrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SparSdrError::TruncatedRecord { offset, needed } => {
                write!(f, "[offset {}] truncated record, need {} more bytes", offset, needed)
            }
            SparSdrError::BadBinIndex(idx) => write!(f, "bin index {} out of range", idx),
            SparSdrError::InvalidNfft(nfft) => {
                write!(f, "invalid nfft {}: must be a power of two in [1, 1024]", nfft)
            }
            SparSdrError::InvalidStructure(msg) => write!(f, "invalid structure: {}", msg),
            SparSdrError::MissingCalibration => {
                write!(f, "no capture data was supplied to calibrate from")
            }
            SparSdrError::ConfigParse(msg) => write!(f, "threshold config parse error: {}", msg),
            SparSdrError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SparSdrError {}

impl From<std::io::Error> for SparSdrError {
    fn from(e: std::io::Error) -> Self {
        SparSdrError::Io(e.to_string())
    }
}
