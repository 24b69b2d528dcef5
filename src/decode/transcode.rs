use crate::clock::{ns_per_wire_tick, PLUTO_CLOCK_HZ};
use crate::decode::v2::V2Decoder;
use crate::error::SparSdrError;
use crate::nfft::Nfft;
use crate::sample::Sample;
use crate::wire::ByteWriter;

/// Re-encodes a V2 word stream as V1 fixed-size records.
///
/// Decodes the V2 stream to its sample sequence (resolving both time
/// counters to absolute nanoseconds along the way), then re-derives each
/// sample's truncated V1 time field from that absolute time rather than
/// carrying the V2 counter bits across verbatim — the two formats use
/// different counter widths (30 bits vs `31 - log2(nfft)`), so a straight
/// bit copy would alias differently than the original stream's own wraps.
pub fn transcode_v2_to_v1(data: &[u8], nfft: Nfft) -> Result<Vec<u8>, SparSdrError> {
    let mut decoder = V2Decoder::new(nfft);
    let samples = decoder.decode_all(data)?;
    let ns_per_tick = ns_per_wire_tick(PLUTO_CLOCK_HZ, nfft.get());
    let time_width = 31 - nfft.log2();
    let time_mask = (1u32 << time_width) - 1;

    let mut writer = ByteWriter::new();
    for sample in samples {
        match sample {
            Sample::Fft(f) => {
                let ticks = (f.time_ns / ns_per_tick).round() as u32;
                let hdr = (f.bin << time_width) | (ticks & time_mask);
                writer.write_i16_le(f.im).write_i16_le(f.re).write_u32_le(hdr);
            }
            Sample::Avg(a) => {
                let ticks = (a.time_ns / ns_per_tick).round() as u32;
                let time = ticks & time_mask & !1u32;
                let hdr = (1u32 << 31) | (a.bin << time_width) | time;
                let imag = (a.magnitude & 0xFFFF) as u16 as i16;
                let real = ((a.magnitude >> 16) & 0xFFFF) as u16 as i16;
                writer.write_i16_le(imag).write_i16_le(real).write_u32_le(hdr);
            }
        }
    }
    Ok(writer.into_bytes())
}
