const PLUTO_CLOCK_MHZ: f64 = 61.44;

/// Conservative shift for a target bandwidth and peak-to-average power
/// ratio, as an exact float: `CalibrationRecord::conservative_shift` keeps
/// this precision so later re-derivations (e.g. comparing a chosen shift
/// against `ceil(conservative_shift)`) aren't rounded twice.
///
/// `bins_in_bw = ceil(nfft * bw_mhz / 61.44)`; the shift solves
/// `7 - log2(10^((papr_db + 10*log10(bins_in_bw)) / 20))`.
pub fn conservative_shift_exact(nfft: usize, bw_mhz: f64, papr_db: f64) -> f64 {
    let bins_in_bw = ((nfft as f64 * bw_mhz) / PLUTO_CLOCK_MHZ).ceil();
    let exponent = (papr_db + 10.0 * bins_in_bw.log10()) / 20.0;
    7.0 - 10f64.powf(exponent).log2()
}

/// The conservative shift rounded to a usable integer shift in `[0, 7]`.
pub fn conservative_shift(nfft: usize, bw_mhz: f64, papr_db: f64) -> u8 {
    conservative_shift_exact(nfft, bw_mhz, papr_db)
        .round()
        .clamp(0.0, 7.0) as u8
}

/// Estimated dynamic-range loss, in dB, from using a shift `d` steps
/// higher than the one a calibration suggested: each shift step discards
/// one bit either side of the product, i.e. `2^d` in amplitude.
pub fn dynamic_range_loss_db(shift_delta: i32) -> f64 {
    20.0 * 2f64.powi(shift_delta).log10()
}

/// Rescales a set of linear thresholds captured at one shift so they
/// remain valid noise-floor thresholds at another.
///
/// Each shift step changes bin energy by a factor of 4 (two bits), so
/// moving from `old_shift` to `new_shift` divides by `4^(new_shift -
/// old_shift)`; `offset_db` folds in any additional calibration-source
/// gain difference the caller wants to apply in the same pass.
pub fn rescale_thresholds(
    thresholds: &[u32],
    old_shift: i32,
    new_shift: i32,
    offset_db: f64,
) -> Vec<u32> {
    let shift_delta = new_shift - old_shift;
    let scale = 10f64.powf(offset_db / 10.0) / 4f64.powi(shift_delta);
    thresholds
        .iter()
        .map(|&t| ((t as f64) * scale).round().max(0.0) as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservative_shift_matches_worked_example() {
        // NFFT=1024, papr=10 dB, bw=1 MHz: bins_in_bw = ceil(1024/61.44) = 17.
        let exact = conservative_shift_exact(1024, 1.0, 10.0);
        assert!((exact - 3.296).abs() < 0.01);
    }

    #[test]
    fn conservative_shift_stays_in_range() {
        let shift = conservative_shift(1024, 10.0, 12.0);
        assert!((0..=7).contains(&shift));
    }

    #[test]
    fn dynamic_range_loss_is_six_db_per_shift() {
        assert!((dynamic_range_loss_db(1) - 6.0206).abs() < 0.01);
    }

    #[test]
    fn rescale_same_shift_only_applies_offset() {
        let thresholds = vec![100, 200];
        let out = rescale_thresholds(&thresholds, 5, 5, 0.0);
        assert_eq!(out, vec![100, 200]);
    }

    #[test]
    fn rescale_shift_above_suggested_quarters_threshold() {
        // used shift (5) one above suggested (4): raw magnitudes are smaller
        // at the higher shift, so the threshold must shrink to match.
        let thresholds = vec![400];
        let out = rescale_thresholds(&thresholds, 4, 5, 0.0);
        assert_eq!(out, vec![100]);
    }

    #[test]
    fn rescale_shift_below_suggested_quadruples_threshold() {
        // used shift (4) one below suggested (5): raw magnitudes are larger
        // at the lower shift, so the threshold must grow to match.
        let thresholds = vec![100];
        let out = rescale_thresholds(&thresholds, 5, 4, 0.0);
        assert_eq!(out, vec![400]);
    }
}
