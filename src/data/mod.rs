//! Input preparation helpers: corruption for the denoising objective and
//! range normalization.
//!
//! The engine itself never corrupts anything — callers pair each clean
//! vector with a corrupted copy. [`mask_noise`] provides the classic
//! masking corruption used by denoising autoencoders.

use ndarray::Array1;
use rand::Rng;

/// Corrupt a vector by zeroing each element with probability
/// `corruption_rate` (masking noise). The clean vector is left untouched.
pub fn mask_noise<R: Rng>(input: &Array1<f64>, corruption_rate: f64, rng: &mut R) -> Array1<f64> {
    input.mapv(|v| if rng.gen::<f64>() < corruption_rate { 0.0 } else { v })
}

/// Normalize data to a target range.
pub fn normalize(data: &mut [f64], min: f64, max: f64) {
    let data_min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let data_max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let range = data_max - data_min;

    if range == 0.0 {
        return;
    }

    for v in data {
        *v = min + ((*v - data_min) / range) * (max - min);
    }
}
