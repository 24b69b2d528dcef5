use crate::error::SparSdrError;
use crate::nfft::Nfft;

/// Reshapes a flat stream of raw average-magnitude words into an
/// `(windows, nfft)` matrix, one row per averaging window.
///
/// The capture length is truncated down to a whole number of windows
/// before reshaping; any trailing partial window is dropped. At least
/// one full window is required.
pub fn reshape_avg_matrix(raw: &[u32], nfft: Nfft) -> Result<Vec<Vec<i64>>, SparSdrError> {
    let width = nfft.get();
    let windows = raw.len() / width;
    if windows == 0 {
        return Err(SparSdrError::InvalidStructure(format!(
            "need at least one full window of {} samples, got {}",
            width,
            raw.len()
        )));
    }
    let mut matrix = Vec::with_capacity(windows);
    for w in 0..windows {
        let row = raw[w * width..(w + 1) * width]
            .iter()
            .map(|&v| v as i64 - 1)
            .collect();
        matrix.push(row);
    }
    Ok(matrix)
}
