/// ADC sample clock of the Pluto-class front end, in Hz.
pub const PLUTO_CLOCK_HZ: f64 = 61.44e6;

/// Nanoseconds per ADC sample tick: `1e9 / clock_hz`.
///
/// Computed from the clock constant rather than hard-coded, so the
/// `16.2760417 ns` figure quoted in the wire-format notes is a derived
/// fact, not a second source of truth.
pub fn ns_per_tick(clock_hz: f64) -> f64 {
    1.0e9 / clock_hz
}

/// Nanoseconds per wire-format time unit, for a capture at `clock_hz` with
/// the given FFT size. The wire `time` field counts windows of `nfft/2`
/// samples, not individual samples, so the tick duration is scaled up by
/// that window size.
pub fn ns_per_wire_tick(clock_hz: f64, nfft: usize) -> f64 {
    ns_per_tick(clock_hz) * (nfft / 2) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluto_scale_matches_documented_constant() {
        let scale = ns_per_tick(PLUTO_CLOCK_HZ);
        assert!((scale - 16.2760417).abs() < 1e-6);
    }

    #[test]
    fn wire_tick_scales_by_half_nfft() {
        let scale = ns_per_wire_tick(PLUTO_CLOCK_HZ, 1024);
        assert!((scale - 16.2760417 * 512.0).abs() < 1e-3);
    }
}
