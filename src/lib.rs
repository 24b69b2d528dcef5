pub mod aggregate;
pub mod calibration;
pub mod clip_check;
pub mod clock;
pub mod decode;
pub mod error;
pub mod nfft;
pub mod sample;
pub mod wire;

pub use calibration::{calibrate_noise_floor, conservative_shift, rescale_thresholds, CalibrationRecord, ShiftFit};
pub use decode::{transcode_v2_to_v1, V1Decoder, V2Decoder};
pub use error::SparSdrError;
pub use nfft::Nfft;
pub use sample::{AvgSample, BinIndex, FftSample, Sample};
