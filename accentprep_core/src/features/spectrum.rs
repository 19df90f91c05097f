//! Short-time spectra and log-mel frames from mono PCM.

use mel_spec::mel::{log_mel_spectrogram, mel};
use mel_spec::prelude::*;
use ndarray::Array2;

use crate::config::FeatureConfig;
use crate::error::FeatureError;

/// Per-frame spectra of one clip, both laid out as `[bin x frame]`.
#[derive(Debug, Clone)]
pub struct Spectra {
    /// log10 mel power, floored at 1e-10 and otherwise unscaled
    pub log_mel: Array2<f64>,
    /// |X|^2 for bins `0..=fft_size/2`
    pub power: Array2<f64>,
}

impl Spectra {
    pub fn n_frames(&self) -> usize {
        self.power.ncols()
    }
}

/// Frame `pcm` with centred zero padding and compute power and log-mel
/// spectra for every hop.
pub fn analyze(pcm: &[f32], sample_rate: u32, config: &FeatureConfig) -> Result<Spectra, FeatureError> {
    let FeatureConfig {
        fft_size,
        hop_size,
        n_mels,
        ..
    } = *config;

    if pcm.is_empty() {
        return Err(FeatureError::EmptyWaveform);
    }
    if fft_size == 0 || hop_size == 0 || hop_size > fft_size || n_mels == 0 || sample_rate == 0 {
        return Err(FeatureError::InvalidParameters(format!(
            "fft_size={fft_size} hop_size={hop_size} n_mels={n_mels} sample_rate={sample_rate}"
        )));
    }

    let n_bins = fft_size / 2 + 1;
    let pad = fft_size / 2;
    let mut padded = vec![0.0f32; pad];
    padded.extend_from_slice(pcm);
    padded.resize(padded.len() + pad, 0.0);

    let mut stft = Spectrogram::new(fft_size, hop_size);
    // Slaney-normalized filterbank, applied without any per-frame rescaling
    let filters = mel(f64::from(sample_rate), fft_size, n_mels, None, None, false, true);

    let mut mel_cols: Vec<f64> = Vec::new();
    let mut power_cols: Vec<f64> = Vec::new();
    let mut frames = 0usize;

    for chunk in padded.chunks(hop_size) {
        // pad last hop
        let mut hop = vec![0.0f32; hop_size];
        hop[..chunk.len()].copy_from_slice(chunk);

        if let Some(fft_frame) = stft.add(&hop) {
            let mel_frame = log_mel_spectrogram(&fft_frame, &filters);

            let mut mel_values = mel_frame.iter().copied();
            mel_cols.extend((0..n_mels).map(|_| mel_values.next().unwrap_or(f64::MIN)));

            let mut bins = fft_frame.iter().map(|c| c.norm_sqr());
            power_cols.extend((0..n_bins).map(|_| bins.next().unwrap_or(0.0)));

            frames += 1;
        }
    }

    if frames == 0 {
        return Err(FeatureError::TooShort {
            samples: pcm.len(),
            fft_size,
        });
    }

    // Columns were pushed frame by frame, so build [frame x bin] and transpose.
    let log_mel = Array2::from_shape_vec((frames, n_mels), mel_cols)
        .map_err(|e| FeatureError::InvalidParameters(e.to_string()))?
        .reversed_axes();
    let power = Array2::from_shape_vec((frames, n_bins), power_cols)
        .map_err(|e| FeatureError::InvalidParameters(e.to_string()))?
        .reversed_axes();

    Ok(Spectra { log_mel, power })
}

/// Centre frequency in Hz of every STFT bin.
pub fn bin_frequencies(sample_rate: u32, fft_size: usize) -> Vec<f64> {
    (0..=fft_size / 2)
        .map(|k| k as f64 * f64::from(sample_rate) / fft_size as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn shapes_follow_config() {
        let config = FeatureConfig::default();
        let spectra = analyze(&tone(440.0, 16_000, 16_000), 16_000, &config).unwrap();
        assert_eq!(spectra.log_mel.nrows(), config.n_mels);
        assert_eq!(spectra.power.nrows(), config.fft_size / 2 + 1);
        assert_eq!(spectra.log_mel.ncols(), spectra.n_frames());
        assert!(spectra.n_frames() > 20);
    }

    #[test]
    fn tone_energy_peaks_near_its_bin() {
        let config = FeatureConfig::default();
        let spectra = analyze(&tone(1000.0, 16_000, 16_000), 16_000, &config).unwrap();
        let mid = spectra.n_frames() / 2;
        let column = spectra.power.column(mid);
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        let freqs = bin_frequencies(16_000, config.fft_size);
        assert!((freqs[peak] - 1000.0).abs() < 20.0, "peak at {} Hz", freqs[peak]);
    }

    #[test]
    fn doubling_amplitude_adds_log10_4_to_the_peak_band() {
        let config = FeatureConfig::default();
        let quiet = analyze(&tone(440.0, 16_000, 16_000), 16_000, &config).unwrap();
        let loud_pcm: Vec<f32> = tone(440.0, 16_000, 16_000).iter().map(|v| v * 2.0).collect();
        let loud = analyze(&loud_pcm, 16_000, &config).unwrap();

        let mid = quiet.n_frames() / 2;
        let peak = |s: &Spectra| s.log_mel.column(mid).fold(f64::MIN, |a, &b| a.max(b));
        let shift = peak(&loud) - peak(&quiet);
        assert!((shift - 4f64.log10()).abs() < 1e-6, "shift {shift}");
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = analyze(&[], 16_000, &FeatureConfig::default()).unwrap_err();
        assert!(matches!(err, FeatureError::EmptyWaveform));
    }

    #[test]
    fn bad_hop_is_rejected() {
        let config = FeatureConfig {
            hop_size: 4096,
            ..FeatureConfig::default()
        };
        let err = analyze(&[0.1; 100], 16_000, &config).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidParameters(_)));
    }
}
