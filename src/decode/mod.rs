pub mod transcode;
pub mod v1;
pub mod v2;

pub use transcode::transcode_v2_to_v1;
pub use v1::V1Decoder;
pub use v2::V2Decoder;
