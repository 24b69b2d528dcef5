use crate::error::SparSdrError;

/// A calibration file: capture conditions plus one linear threshold per bin.
///
/// Text format is five fixed header lines followed by exactly `bins.len()`
/// `"<bin> <threshold>"` lines (bin count, i.e. `nfft`, is inferred from how
/// many lines follow rather than written explicitly):
///
/// ```text
/// RxGaindB 30
/// EstPAPRdB 10.0
/// estBWMHz 1.0
/// ConservativeShift 3.3
/// SuggestedShift 5
/// 0 12
/// 1 9
/// ...
/// ```
///
/// Thresholds are written as the ceiling of the fitted linear value
/// (already applied by the caller) and parsed back with rounding, so a
/// file hand-edited with fractional values still loads.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRecord {
    pub rx_gain_db: i32,
    pub est_papr_db: f64,
    pub est_bw_mhz: f64,
    pub conservative_shift: f64,
    pub suggested_shift: u8,
    pub bins: Vec<u32>,
}

impl CalibrationRecord {
    pub fn nfft(&self) -> usize {
        self.bins.len()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("RxGaindB {}\n", self.rx_gain_db));
        out.push_str(&format!("EstPAPRdB {}\n", self.est_papr_db));
        out.push_str(&format!("estBWMHz {}\n", self.est_bw_mhz));
        out.push_str(&format!("ConservativeShift {}\n", self.conservative_shift));
        out.push_str(&format!("SuggestedShift {}\n", self.suggested_shift));
        for (bin, threshold) in self.bins.iter().enumerate() {
            out.push_str(&format!("{} {}\n", bin, threshold));
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self, SparSdrError> {
        let mut rx_gain_db: Option<i32> = None;
        let mut est_papr_db: Option<f64> = None;
        let mut est_bw_mhz: Option<f64> = None;
        let mut conservative_shift: Option<f64> = None;
        let mut suggested_shift: Option<u8> = None;
        let mut bins: Vec<(usize, u32)> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let key = parts
                .next()
                .ok_or_else(|| SparSdrError::ConfigParse(format!("empty line: {:?}", line)))?;
            let value = parts.next().ok_or_else(|| {
                SparSdrError::ConfigParse(format!("missing value field: {:?}", line))
            })?;

            let bad = |what: &str| SparSdrError::ConfigParse(format!("bad {} value: {:?}", what, value));

            match key {
                "RxGaindB" => rx_gain_db = Some(value.parse().map_err(|_| bad("RxGaindB"))?),
                "EstPAPRdB" => est_papr_db = Some(value.parse().map_err(|_| bad("EstPAPRdB"))?),
                "estBWMHz" => est_bw_mhz = Some(value.parse().map_err(|_| bad("estBWMHz"))?),
                "ConservativeShift" => {
                    conservative_shift = Some(value.parse().map_err(|_| bad("ConservativeShift"))?)
                }
                "SuggestedShift" => {
                    suggested_shift = Some(value.parse().map_err(|_| bad("SuggestedShift"))?)
                }
                _ => {
                    let bin: usize = key
                        .parse()
                        .map_err(|_| SparSdrError::ConfigParse(format!("bad bin index: {:?}", key)))?;
                    let raw: f64 = value.parse().map_err(|_| bad("threshold"))?;
                    bins.push((bin, raw.round().max(0.0) as u32));
                }
            }
        }

        let rx_gain_db = rx_gain_db
            .ok_or_else(|| SparSdrError::ConfigParse("missing 'RxGaindB' header line".to_string()))?;
        let est_papr_db = est_papr_db
            .ok_or_else(|| SparSdrError::ConfigParse("missing 'EstPAPRdB' header line".to_string()))?;
        let est_bw_mhz = est_bw_mhz
            .ok_or_else(|| SparSdrError::ConfigParse("missing 'estBWMHz' header line".to_string()))?;
        let conservative_shift = conservative_shift.ok_or_else(|| {
            SparSdrError::ConfigParse("missing 'ConservativeShift' header line".to_string())
        })?;
        let suggested_shift = suggested_shift.ok_or_else(|| {
            SparSdrError::ConfigParse("missing 'SuggestedShift' header line".to_string())
        })?;

        bins.sort_by_key(|&(bin, _)| bin);
        let nfft = bins.len();
        let mut ordered = vec![0u32; nfft];
        for (bin, threshold) in bins {
            if bin >= nfft {
                return Err(SparSdrError::BadBinIndex(bin as u32));
            }
            ordered[bin] = threshold;
        }

        Ok(CalibrationRecord {
            rx_gain_db,
            est_papr_db,
            est_bw_mhz,
            conservative_shift,
            suggested_shift,
            bins: ordered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CalibrationRecord {
        CalibrationRecord {
            rx_gain_db: 30,
            est_papr_db: 10.0,
            est_bw_mhz: 1.0,
            conservative_shift: 3.296,
            suggested_shift: 5,
            bins: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn round_trips_through_text() {
        let record = sample();
        let text = record.to_text();
        let parsed = CalibrationRecord::from_text(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn nfft_is_inferred_from_bin_line_count() {
        let parsed = CalibrationRecord::from_text(&sample().to_text()).unwrap();
        assert_eq!(parsed.nfft(), 4);
    }

    #[test]
    fn rounds_fractional_thresholds_on_read() {
        let mut text = String::new();
        text.push_str("RxGaindB 30\nEstPAPRdB 0\nestBWMHz 0.01\nConservativeShift 1.0\nSuggestedShift 3\n");
        text.push_str("0 1.2\n1 2.9\n");
        let parsed = CalibrationRecord::from_text(&text).unwrap();
        assert_eq!(parsed.bins, vec![1, 3]);
    }

    #[test]
    fn missing_header_line_is_an_error() {
        let text = "EstPAPRdB 0\nestBWMHz 0.01\nConservativeShift 1.0\nSuggestedShift 3\n0 1\n";
        assert!(CalibrationRecord::from_text(text).is_err());
    }

    #[test]
    fn out_of_range_bin_is_an_error() {
        let mut text = String::new();
        text.push_str("RxGaindB 30\nEstPAPRdB 0\nestBWMHz 0.01\nConservativeShift 1.0\nSuggestedShift 3\n");
        text.push_str("0 1\n5 2\n");
        assert!(matches!(
            CalibrationRecord::from_text(&text),
            Err(SparSdrError::BadBinIndex(5))
        ));
    }
}
