use crate::clock::{ns_per_wire_tick, PLUTO_CLOCK_HZ};
use crate::error::SparSdrError;
use crate::nfft::Nfft;
use crate::sample::{AvgSample, FftSample, Sample};
use crate::wire::ByteReader;

/// Decodes a V1 stream: fixed 8-byte little-endian records of
/// `imag:i16, real:i16, hdr:u32`.
///
/// `hdr` packs `is_avg:1 | index:L | time:(31-L)`, where `L = log2(nfft)`.
/// FFT and average sections each carry an independent wrapping time
/// counter; this decoder tracks one wrap offset per section so that
/// `time_ns` is monotonically non-decreasing across a wrap.
pub struct V1Decoder {
    nfft: Nfft,
    ns_per_tick: f64,
    fft_time_offset: i64,
    avg_time_offset: i64,
    last_fft_time: u32,
    last_avg_time: u32,
}

impl V1Decoder {
    pub fn new(nfft: Nfft) -> Self {
        Self::with_clock_hz(nfft, PLUTO_CLOCK_HZ)
    }

    pub fn with_clock_hz(nfft: Nfft, clock_hz: f64) -> Self {
        Self {
            nfft,
            ns_per_tick: ns_per_wire_tick(clock_hz, nfft.get()),
            fft_time_offset: 0,
            avg_time_offset: 0,
            last_fft_time: 0,
            last_avg_time: 0,
        }
    }

    /// Decode every complete record in `data`. A short read in the middle
    /// of a record is a hard error; a clean end-of-stream at a record
    /// boundary simply ends the returned sequence.
    pub fn decode_all(&mut self, data: &[u8]) -> Result<Vec<Sample>, SparSdrError> {
        let mut reader = ByteReader::new(data);
        let mut out = Vec::new();
        while !reader.is_empty() {
            out.push(self.decode_one(&mut reader)?);
        }
        Ok(out)
    }

    fn decode_one(&mut self, reader: &mut ByteReader) -> Result<Sample, SparSdrError> {
        let imag = reader.read_i16_le()?;
        let real = reader.read_i16_le()?;
        let hdr = reader.read_u32_le()?;

        let time_width = 31 - self.nfft.log2();
        let is_avg = (hdr >> 31) & 1 != 0;
        let index = (hdr >> time_width) & self.nfft.bin_mask();
        let time = hdr & ((1u32 << time_width) - 1);

        if is_avg {
            if time < self.last_avg_time {
                self.avg_time_offset += 1i64 << time_width;
            }
            self.last_avg_time = time;
            let ticks = (time & !1u32) as i64 + self.avg_time_offset;
            let magnitude = (imag as u16 as u32) | ((real as u16 as u32) << 16);
            Ok(Sample::Avg(AvgSample {
                bin: index,
                time_ns: ticks as f64 * self.ns_per_tick,
                magnitude,
            }))
        } else {
            if time < self.last_fft_time {
                self.fft_time_offset += 1i64 << time_width;
            }
            self.last_fft_time = time;
            let ticks = time as i64 + self.fft_time_offset;
            Ok(Sample::Fft(FftSample {
                window_id: (time & 1) as u8,
                bin: index,
                time_ns: ticks as f64 * self.ns_per_tick,
                re: real,
                im: imag,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteWriter;

    fn record(imag: i16, real: i16, hdr: u32) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_i16_le(imag).write_i16_le(real).write_u32_le(hdr);
        w.into_bytes()
    }

    #[test]
    fn single_fft_sample_reconstructs_time_from_raw_ticks() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V1Decoder::new(nfft);
        let bytes = record(10, 5, 1);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 1);
        let fft = samples[0].as_fft().unwrap();
        assert_eq!(fft.bin, 0);
        assert_eq!(fft.re, 5);
        assert_eq!(fft.im, 10);
        let expected = 1.0 * 16.2760417 * 512.0;
        assert!((fft.time_ns - expected).abs() < 1e-3);
    }

    #[test]
    fn fft_time_wraps_and_offsets_monotonically() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V1Decoder::new(nfft);
        let first = record(0, 0, 0x1FFFFE);
        let second = record(0, 0, 0x000001);
        let mut bytes = first;
        bytes.extend(second);
        let samples = dec.decode_all(&bytes).unwrap();
        let t0 = samples[0].as_fft().unwrap().time_ns;
        let t1 = samples[1].as_fft().unwrap().time_ns;
        assert!(t1 > t0);
        let scale = 16.2760417 * 512.0;
        let expected_t1 = (1u32 + (1u32 << 21)) as f64 * scale;
        assert!((t1 - expected_t1).abs() < 1.0);
    }

    #[test]
    fn avg_bit_selects_magnitude_interpretation_and_clears_lsb() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V1Decoder::new(nfft);
        let hdr = (1u32 << 31) | (3u32 << 21) | 7u32;
        let bytes = record(0x0010, 0x0000, hdr);
        let samples = dec.decode_all(&bytes).unwrap();
        let avg = samples[0].as_avg().unwrap();
        assert_eq!(avg.bin, 3);
        assert_eq!(avg.magnitude, 0x0010_0000);
        let scale = 16.2760417 * 512.0;
        assert!((avg.time_ns - 6.0 * scale).abs() < 1e-3);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V1Decoder::new(nfft);
        let bytes = vec![0x01, 0x02, 0x03];
        assert!(dec.decode_all(&bytes).is_err());
    }

    #[test]
    fn empty_input_yields_no_samples() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V1Decoder::new(nfft);
        assert_eq!(dec.decode_all(&[]).unwrap().len(), 0);
    }
}
