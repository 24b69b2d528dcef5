use crate::error::SparSdrError;
use crate::wire::ByteReader;

/// Amplitude above which a raw capture is considered clipped.
const CLIP_THRESHOLD: f64 = 2000.0;
/// Below this headroom (in dB) a gain bump isn't worth recommending.
const MIN_ADJUSTMENT_DB: f64 = 2.0;

/// One complex short (`cshort`) sample: real then imaginary, matching the
/// interleaving a raw front-end capture file uses before any SparSDR
/// framing is applied.
pub type CshortSample = (i16, i16);

/// Parses a raw `cshort` capture: pairs of little-endian `i16`, real then
/// imaginary, with no header or framing at all.
pub fn read_cshort(data: &[u8]) -> Result<Vec<CshortSample>, SparSdrError> {
    let mut reader = ByteReader::new(data);
    let mut out = Vec::new();
    while !reader.is_empty() {
        let real = reader.read_i16_le()?;
        let imag = reader.read_i16_le()?;
        out.push((real, imag));
    }
    Ok(out)
}

/// Suggests a receiver gain setting from a raw `clipCheck.iq` capture.
///
/// Mirrors `autoThreshComputePluto.py`'s `clipCheck`: if the peak sample
/// clips past `2000`, halve the gain outright; if there's more than
/// `2000/max` of headroom but less than 2 dB of it, keep the gain as
/// given; otherwise nudge it up by the headroom in dB, rounded.
pub fn suggest_rxgain(samples: &[CshortSample], rxgain: i32) -> i32 {
    let max_abs = samples
        .iter()
        .flat_map(|&(r, i)| [r.unsigned_abs(), i.unsigned_abs()])
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    if max_abs > CLIP_THRESHOLD {
        rxgain / 2
    } else {
        let headroom_db = 20.0 * (CLIP_THRESHOLD / max_abs).log10();
        if headroom_db < MIN_ADJUSTMENT_DB {
            rxgain
        } else {
            rxgain + headroom_db.round() as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteWriter;

    #[test]
    fn parses_interleaved_real_imag_pairs() {
        let mut w = ByteWriter::new();
        w.write_i16_le(10).write_i16_le(-20).write_i16_le(30).write_i16_le(-40);
        let samples = read_cshort(&w.into_bytes()).unwrap();
        assert_eq!(samples, vec![(10, -20), (30, -40)]);
    }

    #[test]
    fn clipped_capture_halves_gain() {
        let samples = vec![(2500, 0)];
        assert_eq!(suggest_rxgain(&samples, 30), 15);
    }

    #[test]
    fn ample_headroom_keeps_gain_unchanged() {
        let samples = vec![(1800, 0)];
        assert_eq!(suggest_rxgain(&samples, 30), 30);
    }

    #[test]
    fn quiet_capture_bumps_gain_up() {
        let samples = vec![(100, 100)];
        let adjusted = suggest_rxgain(&samples, 30);
        assert!(adjusted > 30);
    }
}
