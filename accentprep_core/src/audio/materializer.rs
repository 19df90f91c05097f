//! Turning stored feature vectors into wav files and reading them back.

use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;

use super::decoder::decode_to_f32_mono;
use crate::error::AudioError;

/// Mono audio at a known rate, samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn is_silent(&self) -> bool {
        is_silent(&self.samples)
    }
}

pub fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|&s| s == 0.0)
}

/// Linearly map `values` from their own `[min, max]` onto `[-1, 1]`.
///
/// Constant or empty input maps to silence of the same length.
pub fn normalize(values: &[f32]) -> Vec<f32> {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|&v| (2.0 * (v - min) / range - 1.0).clamp(-1.0, 1.0))
        .collect()
}

/// Writes reconstructed audio as 16-bit PCM and reloads it at one fixed rate.
#[derive(Debug, Clone)]
pub struct AudioMaterializer {
    sample_rate: u32,
}

impl AudioMaterializer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Normalize `values` and write them to `target`, unless `target` exists.
    ///
    /// Returns `true` when a file was written. The data goes to a sibling
    /// `.tmp` file first and is renamed into place once complete.
    pub fn materialize(&self, values: &[f32], target: &Path) -> Result<bool, AudioError> {
        if target.exists() {
            debug!("WAV file already exists: {}", target.display());
            return Ok(false);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AudioError::NonFinite);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let tmp = temp_path(target);
        self.write_pcm16(&normalize(values), &tmp)?;
        fs::rename(&tmp, target).map_err(io_err(target))?;

        debug!("WAV file created: {}", target.display());
        Ok(true)
    }

    fn write_pcm16(&self, samples: &[f32], path: &Path) -> Result<(), AudioError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)?;
        for &sample in samples {
            writer.write_sample((sample * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Decode `path` back into a waveform at the configured rate.
    ///
    /// A missing file is `Ok(None)`, not an error.
    pub fn reload(&self, path: &Path) -> Result<Option<Waveform>, AudioError> {
        if !path.exists() {
            return Ok(None);
        }

        let samples =
            decode_to_f32_mono(path, self.sample_rate).map_err(|e| AudioError::Decode {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            })?;

        Ok(Some(Waveform {
            samples,
            sample_rate: self.sample_rate,
        }))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> AudioError + '_ {
    move |source| AudioError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spans_unit_range() {
        let out = normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(out, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn constant_input_becomes_silence() {
        assert_eq!(normalize(&[0.3; 4]), vec![0.0; 4]);
        assert!(normalize(&[]).is_empty());
        assert!(is_silent(&normalize(&[7.0, 7.0])));
    }

    #[test]
    fn materialize_then_reload_is_within_pcm16_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wav_files").join("clip.wav");
        let values: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.01).sin() * 3.0 + 1.0).collect();

        let audio = AudioMaterializer::new(16_000);
        assert!(audio.materialize(&values, &path).unwrap());

        let wave = audio.reload(&path).unwrap().expect("file was written");
        let expected = normalize(&values);
        assert_eq!(wave.sample_rate, 16_000);
        assert_eq!(wave.samples.len(), expected.len());
        for (got, want) in wave.samples.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-3, "{got} vs {want}");
        }
    }

    #[test]
    fn second_materialize_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let audio = AudioMaterializer::new(16_000);

        assert!(audio.materialize(&[0.0, 1.0, -1.0, 0.5], &path).unwrap());
        let first = fs::read(&path).unwrap();

        assert!(!audio.materialize(&[9.0, -9.0, 3.0], &path).unwrap());
        assert_eq!(fs::read(&path).unwrap(), first);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn reload_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let audio = AudioMaterializer::new(16_000);
        assert_eq!(audio.reload(&dir.path().join("absent.wav")).unwrap(), None);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.wav");
        let err = AudioMaterializer::new(16_000)
            .materialize(&[0.0, f32::NAN], &path)
            .unwrap_err();
        assert!(matches!(err, AudioError::NonFinite));
        assert!(!path.exists());
    }
}
