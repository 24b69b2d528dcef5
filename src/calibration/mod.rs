pub mod config;
pub mod fit;
pub mod transform;

pub use config::CalibrationRecord;
pub use fit::{calibrate_noise_floor, ShiftFit};
pub use transform::{
    conservative_shift, conservative_shift_exact, dynamic_range_loss_db, rescale_thresholds,
};

/// Rewrites a calibration record's thresholds for a new shift and/or gain
/// offset without recomputing the noise-floor fit — a thin composition of
/// [`CalibrationRecord`]'s codec and [`rescale_thresholds`], matching the
/// original tooling's small "rewrite at a different offset" script.
pub fn rescale_config(record: &CalibrationRecord, new_shift: u8, offset_db: f64) -> CalibrationRecord {
    let bins = rescale_thresholds(
        &record.bins,
        record.suggested_shift as i32,
        new_shift as i32,
        offset_db,
    );
    CalibrationRecord {
        suggested_shift: new_shift,
        bins,
        ..record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_config_updates_shift_and_bins() {
        let record = CalibrationRecord {
            rx_gain_db: 30,
            est_papr_db: 10.0,
            est_bw_mhz: 1.0,
            conservative_shift: 3.3,
            suggested_shift: 5,
            bins: vec![400, 800],
        };
        let rescaled = rescale_config(&record, 4, 0.0);
        assert_eq!(rescaled.suggested_shift, 4);
        // new shift (4) is below the record's suggested shift (5), so the
        // rewritten thresholds grow to match the larger raw magnitudes.
        assert_eq!(rescaled.bins, vec![1600, 3200]);
        assert_eq!(rescaled.rx_gain_db, record.rx_gain_db);
    }
}
