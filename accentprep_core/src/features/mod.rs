//! Descriptor extraction and `.npy` persistence.
//!
//! The standard extractor computes, from a single STFT pass:
//!
//! - **MFCC**: orthonormal DCT-II of the dB log-mel spectrum
//! - **Chroma**: 12 pitch classes, peak-normalized per frame
//! - **Rolloff**: frequency below which `roll_percent` of the magnitude lies
//! - **Zero crossings**: sign changes of the raw waveform
//!
//! Only MFCC and chroma are persisted.

pub mod cepstrum;
pub mod chroma;
pub mod spectrum;

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use ndarray_npy::write_npy;

use crate::config::FeatureConfig;
use crate::dataset::PartitionId;
use crate::error::FeatureError;
use crate::layout::OutputLayout;

/// Magnitudes at or below this count as zero for crossing detection
const ZERO_CROSSING_THRESHOLD: f32 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// `[n_mfcc x frame]`
    pub mfcc: Array2<f32>,
    /// `[12 x frame]`
    pub chroma: Array2<f32>,
    /// One flag per input sample
    pub zero_crossings: Vec<bool>,
    /// Hz per frame
    pub rolloff: Array1<f32>,
}

/// Computes a [`FeatureSet`] from a mono waveform.
pub trait Extractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureSet, FeatureError>;
}

#[derive(Debug, Clone, Default)]
pub struct StandardExtractor {
    config: FeatureConfig,
}

impl StandardExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }
}

impl Extractor for StandardExtractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureSet, FeatureError> {
        let config = &self.config;
        let spectra = spectrum::analyze(samples, sample_rate, config)?;

        Ok(FeatureSet {
            mfcc: cepstrum::mfcc(&spectra.log_mel, config.n_mfcc, config.top_db),
            chroma: chroma::chroma(&spectra.power, sample_rate, config.fft_size, config.tuning_hz),
            zero_crossings: zero_crossings(samples),
            rolloff: rolloff(&spectra.power, sample_rate, config.fft_size, config.roll_percent),
        })
    }
}

/// Sign changes between consecutive samples, without padding: the first
/// flag is always `false`.
pub fn zero_crossings(samples: &[f32]) -> Vec<bool> {
    let negative = |x: f32| x.abs() > ZERO_CROSSING_THRESHOLD && x.is_sign_negative();

    let mut flags = Vec::with_capacity(samples.len());
    if let Some(&first) = samples.first() {
        flags.push(false);
        let mut prev = negative(first);
        for &s in &samples[1..] {
            let cur = negative(s);
            flags.push(cur != prev);
            prev = cur;
        }
    }
    flags
}

/// Spectral rolloff per frame, in Hz. Silent frames roll off at 0 Hz.
pub fn rolloff(power: &Array2<f64>, sample_rate: u32, fft_size: usize, roll_percent: f32) -> Array1<f32> {
    let freqs = spectrum::bin_frequencies(sample_rate, fft_size);

    power
        .axis_iter(Axis(1))
        .map(|frame| {
            let magnitude: Vec<f64> = frame.iter().map(|p| p.sqrt()).collect();
            let threshold = f64::from(roll_percent) * magnitude.iter().sum::<f64>();
            if threshold <= 0.0 {
                return 0.0;
            }

            let mut cumulative = 0.0;
            for (k, m) in magnitude.iter().enumerate() {
                cumulative += m;
                if cumulative >= threshold {
                    return freqs.get(k).copied().unwrap_or_default() as f32;
                }
            }
            freqs.last().copied().unwrap_or_default() as f32
        })
        .collect()
}

/// Write a sample's MFCC and chroma arrays under its partition directory.
///
/// Existing files are replaced; callers decide whether to skip.
pub fn persist(
    features: &FeatureSet,
    sample_id: usize,
    partition: &PartitionId,
    layout: &OutputLayout,
) -> Result<(), FeatureError> {
    for dir in [layout.mfcc_dir(partition), layout.chroma_dir(partition)] {
        fs::create_dir_all(&dir).map_err(|source| FeatureError::Io { path: dir.clone(), source })?;
    }

    write_array(&features.mfcc, &layout.mfcc_path(partition, sample_id))?;
    write_array(&features.chroma, &layout.chroma_path(partition, sample_id))?;
    Ok(())
}

fn write_array(array: &Array2<f32>, path: &Path) -> Result<(), FeatureError> {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    let tmp = path.with_file_name(name);

    write_npy(&tmp, array).map_err(|e| FeatureError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::rename(&tmp, path).map_err(|source| FeatureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::read_npy;

    fn chirp(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 16_000.0;
                (2.0 * std::f32::consts::PI * (200.0 + 400.0 * t) * t).sin() * 0.8
            })
            .collect()
    }

    #[test]
    fn zero_crossings_flag_sign_changes() {
        let flags = zero_crossings(&[0.5, -0.5, -0.2, 0.0, 0.3, -1e-12]);
        assert_eq!(flags, vec![false, true, false, true, false, false]);
        assert!(zero_crossings(&[]).is_empty());
    }

    #[test]
    fn rolloff_of_single_bin_is_that_bin() {
        let mut power = Array2::zeros((1025, 2));
        power[[100, 0]] = 9.0;
        let out = rolloff(&power, 16_000, 2048, 0.85);
        assert!((out[0] - 781.25).abs() < 1e-3);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn extract_shapes_and_determinism() {
        let extractor = StandardExtractor::default();
        let wave = chirp(16_000);

        let first = extractor.extract(&wave, 16_000).unwrap();
        let second = extractor.extract(&wave, 16_000).unwrap();

        assert_eq!(first.mfcc.nrows(), 20);
        assert_eq!(first.chroma.nrows(), 12);
        assert_eq!(first.mfcc.ncols(), first.chroma.ncols());
        assert_eq!(first.rolloff.len(), first.mfcc.ncols());
        assert_eq!(first.zero_crossings.len(), wave.len());
        assert_eq!(first.mfcc, second.mfcc);
        assert_eq!(first.chroma, second.chroma);
    }

    #[test]
    fn six_db_gain_moves_c0_by_sqrt_n_mels_times_six_db() {
        let extractor = StandardExtractor::default();
        let tone = |amplitude: f32| -> Vec<f32> {
            (0..16_000)
                .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin() * amplitude)
                .collect()
        };

        let quiet = extractor.extract(&tone(0.25), 16_000).unwrap();
        let loud = extractor.extract(&tone(0.5), 16_000).unwrap();

        let mid = quiet.mfcc.ncols() / 2;
        let delta = loud.mfcc[[0, mid]] - quiet.mfcc[[0, mid]];
        let expected = (128f32).sqrt() * 20.0 * 2f32.log10();
        assert!((delta - expected).abs() < 0.5, "c0 moved by {delta}, expected {expected}");
    }

    #[test]
    fn empty_waveform_fails() {
        assert!(matches!(
            StandardExtractor::default().extract(&[], 16_000),
            Err(FeatureError::EmptyWaveform)
        ));
    }

    #[test]
    fn persist_writes_both_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let partition = PartitionId::new("test_0");
        let features = FeatureSet {
            mfcc: Array2::from_elem((20, 3), 1.5),
            chroma: Array2::from_elem((12, 3), 0.25),
            zero_crossings: vec![],
            rolloff: Array1::zeros(3),
        };

        persist(&features, 4, &partition, &layout).unwrap();

        let mfcc: Array2<f32> = read_npy(layout.mfcc_path(&partition, 4)).unwrap();
        let chroma: Array2<f32> = read_npy(layout.chroma_path(&partition, 4)).unwrap();
        assert_eq!(mfcc, features.mfcc);
        assert_eq!(chroma, features.chroma);
        assert!(layout.mfcc_path(&partition, 4).ends_with("test_0/mfccs/mfccs_4.npy"));
        assert!(layout.chroma_path(&partition, 4).ends_with("test_0/chromas/chroma_4.npy"));
    }
}
