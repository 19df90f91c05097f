//! Pitch-class (chroma) energy from a power spectrogram.

use ndarray::{Array2, Axis};

use super::spectrum::bin_frequencies;

pub const N_CHROMA: usize = 12;

/// Spread of each bin's energy around its pitch class, in semitones
const SOFT_MAPPING_SIGMA: f64 = 0.5;

/// Lowest frequency mapped to a pitch class (just under C1)
const MIN_FREQUENCY_HZ: f64 = 30.0;

/// Filterbank mapping STFT bins onto 12 pitch classes, `[12 x n_bins]`.
///
/// Row 0 is C. Each bin contributes to the classes near its fractional MIDI
/// pitch with a Gaussian weight over circular semitone distance.
pub fn chroma_filterbank(sample_rate: u32, fft_size: usize, tuning_hz: f32) -> Array2<f64> {
    let freqs = bin_frequencies(sample_rate, fft_size);
    let mut bank = Array2::zeros((N_CHROMA, freqs.len()));

    for (k, &freq) in freqs.iter().enumerate() {
        if freq < MIN_FREQUENCY_HZ {
            continue;
        }
        let midi = 69.0 + 12.0 * (freq / f64::from(tuning_hz)).log2();
        for class in 0..N_CHROMA {
            let mut distance = (midi - class as f64).rem_euclid(12.0);
            if distance > 6.0 {
                distance -= 12.0;
            }
            bank[[class, k]] = (-0.5 * (distance / SOFT_MAPPING_SIGMA).powi(2)).exp();
        }
    }

    bank
}

/// Chromagram `[12 x frame]`, each frame scaled so its loudest class is 1.
///
/// Frames without energy stay all-zero.
pub fn chroma(power: &Array2<f64>, sample_rate: u32, fft_size: usize, tuning_hz: f32) -> Array2<f32> {
    let bank = chroma_filterbank(sample_rate, fft_size, tuning_hz);
    let mut raw = bank.dot(power);

    for mut frame in raw.axis_iter_mut(Axis(1)) {
        let peak = frame.iter().copied().fold(0.0, f64::max);
        if peak > 0.0 {
            frame.mapv_inplace(|v| v / peak);
        }
    }

    raw.mapv(|v| v as f32)
}
