//! Mel-frequency cepstral coefficients from log-mel frames.

use std::f64::consts::PI;

use ndarray::Array2;

/// Orthonormal DCT-II basis, `[n_out x n_in]`.
fn dct_basis(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}

/// Convert log10 mel power to decibels with a `top_db` floor below the
/// clip's loudest bin, then take the first `n_mfcc` cepstral coefficients.
///
/// Output is `[n_mfcc x frame]`.
pub fn mfcc(log_mel: &Array2<f64>, n_mfcc: usize, top_db: f32) -> Array2<f32> {
    let mut db = log_mel.mapv(|v| 10.0 * v);
    let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if peak.is_finite() {
        let floor = peak - f64::from(top_db);
        db.mapv_inplace(|v| v.max(floor));
    }

    dct_basis(n_mfcc, db.nrows()).dot(&db).mapv(|v| v as f32)
}
