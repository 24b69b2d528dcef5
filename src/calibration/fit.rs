use crate::aggregate::reshape_avg_matrix;
use crate::error::SparSdrError;
use crate::nfft::Nfft;

const BOX_WIDTH: usize = 8;
const OUTLIER_DB: f64 = 4.0;

/// Result of fitting a noise floor at a single shift value.
///
/// `threshold_linear` and `threshold_linear_outliers` are both in
/// FFT-native bin order (bin 0 = DC, matching the wire format), even
/// though the fit itself runs in FFT-shifted (DC-centred) order
/// internally. `thresholds` is the value a config file actually writes
/// per bin: the outlier-corrected value where one exists, the baseline
/// fit otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftFit {
    pub shift: u8,
    pub threshold_linear: Vec<u32>,
    pub threshold_linear_outliers: Vec<Option<u32>>,
    pub thresholds: Vec<u32>,
    /// `[c, b, a]` such that the fitted dB curve (on the centred bin axis)
    /// is `c + b*x + a*x^2`.
    pub fit_coeffs: [f64; 3],
    /// Set when no candidate shift's smoothed noise floor was entirely
    /// non-negative in dB; the fit returned is still the last shift tried
    /// (conventionally shift 0), just flagged as degraded.
    pub degraded: bool,
}

/// Walks candidate shifts (caller supplies them, conventionally `7..=0`),
/// accepting the first whose smoothed, dB-converted noise floor is
/// non-negative in every bin. If none qualifies, falls back to the last
/// shift tried rather than failing outright — calibration is degraded,
/// not impossible. `MissingCalibration` is reserved for the case where
/// the caller supplied no captures at all.
pub fn calibrate_noise_floor(
    captures: &[(u8, Vec<u32>)],
    nfft: Nfft,
) -> Result<ShiftFit, SparSdrError> {
    if captures.is_empty() {
        return Err(SparSdrError::MissingCalibration);
    }

    let width = nfft.get();
    let mut last_fit: Option<ShiftFit> = None;

    for (shift, raw) in captures {
        let matrix = reshape_avg_matrix(raw, nfft)?;
        let medians = per_bin_median(&matrix, width);

        let centred = fftshift(&medians);
        let smoothed = box_convolve_same(&centred, BOX_WIDTH);
        let db: Vec<f64> = smoothed.iter().map(|&v| lin_to_db(v)).collect();
        let xs: Vec<f64> = (0..width).map(|i| i as f64).collect();
        let coeffs = polyfit2(&xs, &db);

        let passes = db.iter().all(|&y| y >= 0.0);
        let fit = build_fit(*shift, &xs, &db, coeffs, false);

        if passes {
            return Ok(fit);
        }
        last_fit = Some(fit);
    }

    let mut fit = last_fit.expect("at least one capture was provided");
    fit.degraded = true;
    Ok(fit)
}

fn build_fit(shift: u8, xs: &[f64], db_centred: &[f64], coeffs: [f64; 3], degraded: bool) -> ShiftFit {
    let mut baseline_centred = Vec::with_capacity(db_centred.len());
    let mut outliers_centred: Vec<Option<u32>> = Vec::with_capacity(db_centred.len());

    for (&x, &smooth_db) in xs.iter().zip(db_centred.iter()) {
        let fitted = coeffs[0] + coeffs[1] * x + coeffs[2] * x * x;
        let err = smooth_db - fitted;
        baseline_centred.push(lin_threshold(fitted));
        outliers_centred.push(if err >= OUTLIER_DB {
            Some(lin_threshold(fitted + err))
        } else {
            None
        });
    }

    // Un-shift back to FFT-native bin order; the rotation is its own
    // inverse for the power-of-two widths this crate accepts.
    let threshold_linear = fftshift(&baseline_centred);
    let threshold_linear_outliers = fftshift(&outliers_centred);
    let thresholds = threshold_linear
        .iter()
        .zip(threshold_linear_outliers.iter())
        .map(|(&baseline, &outlier)| outlier.unwrap_or(baseline))
        .collect();

    ShiftFit {
        shift,
        threshold_linear,
        threshold_linear_outliers,
        thresholds,
        fit_coeffs: coeffs,
        degraded,
    }
}

fn lin_threshold(y_db: f64) -> u32 {
    (10f64.powf(y_db / 10.0)).ceil().max(0.0) as u32
}

fn per_bin_median(matrix: &[Vec<i64>], width: usize) -> Vec<f64> {
    (0..width)
        .map(|bin| {
            let mut col: Vec<i64> = matrix.iter().map(|row| row[bin]).collect();
            col.sort_unstable();
            let n = col.len();
            let mid = n / 2;
            if n % 2 == 0 {
                (col[mid - 1] + col[mid]) as f64 / 2.0
            } else {
                col[mid] as f64
            }
        })
        .collect()
}

/// Array-rotation "FFT shift": swaps the two halves of `v`, the same way
/// `numpy.fft.fftshift` reorders a spectrum around DC. No transform is
/// computed here; the bins are already in the frequency domain. Used both
/// to centre the median before smoothing and, applied a second time, to
/// un-centre the resulting thresholds — swapping halves twice is the
/// identity for the power-of-two lengths this crate deals in.
fn fftshift<T: Clone>(v: &[T]) -> Vec<T> {
    let n = v.len();
    let mid = n / 2;
    let mut out = Vec::with_capacity(n);
    out.extend(v[mid..].iter().cloned());
    out.extend(v[..mid].iter().cloned());
    out
}

/// Zero-padded `width`-wide box (moving-sum) convolution in numpy's
/// `mode='same'` alignment: output has the same length as `v`.
fn box_convolve_same(v: &[f64], width: usize) -> Vec<f64> {
    let n = v.len();
    let start = (width - 1) / 2;
    let mut out = vec![0.0; n];
    for j in 0..n {
        let full_idx = j + start;
        let mut sum = 0.0;
        for k in 0..width {
            let i = full_idx as isize - k as isize;
            if i >= 0 && (i as usize) < n {
                sum += v[i as usize];
            }
        }
        out[j] = sum;
    }
    out
}

/// `10*log10(v)`, with non-positive smoothed magnitudes mapped to negative
/// infinity rather than `NaN` so they always fail the "all bins >= 0 dB"
/// pass check instead of silently comparing false either way.
fn lin_to_db(v: f64) -> f64 {
    if v <= 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * v.log10()
    }
}

/// Degree-2 least-squares fit via the normal equations, solved directly
/// since nothing else in this crate needs a general linear-algebra
/// dependency for a single 3x3 solve.
fn polyfit2(xs: &[f64], ys: &[f64]) -> [f64; 3] {
    let mut s = [0.0f64; 5];
    let mut t = [0.0f64; 3];
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let x2 = x * x;
        let x3 = x2 * x;
        let x4 = x3 * x;
        s[0] += 1.0;
        s[1] += x;
        s[2] += x2;
        s[3] += x3;
        s[4] += x4;
        t[0] += y;
        t[1] += y * x;
        t[2] += y * x2;
    }
    let m = [[s[0], s[1], s[2]], [s[1], s[2], s[3]], [s[2], s[3], s[4]]];
    solve3(m, t)
}

/// Gaussian elimination with partial pivoting for a 3x3 system.
fn solve3(mut m: [[f64; 3]; 3], mut rhs: [f64; 3]) -> [f64; 3] {
    for col in 0..3 {
        let mut pivot = col;
        for row in (col + 1)..3 {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        let diag = m[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in (col + 1)..3 {
            let factor = m[row][col] / diag;
            for k in col..3 {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0; 3];
    for row in (0..3).rev() {
        let mut sum = rhs[row];
        for k in (row + 1)..3 {
            sum -= m[row][k] * x[k];
        }
        x[row] = if m[row][row].abs() > 1e-12 {
            sum / m[row][row]
        } else {
            0.0
        };
    }
    x
}
