//! Run configuration for the preparation pipeline

use std::path::PathBuf;

use crate::dataset::PartitionId;

pub const DEFAULT_DATASET: &str = "willcai/wav2vec2_common_voice_accents_3";
pub const DEFAULT_HUB_ENDPOINT: &str = "https://datasets-server.huggingface.co";

/// Parameters of the standard feature extractor.
///
/// Defaults follow librosa's `mfcc` / `chroma_stft` / `spectral_rolloff`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    /// FFT frame size (default: 2048)
    pub fft_size: usize,

    /// Hop between frames in samples (default: 512)
    pub hop_size: usize,

    /// Mel bands feeding the cepstrum (default: 128)
    pub n_mels: usize,

    /// Cepstral coefficients kept per frame (default: 20)
    pub n_mfcc: usize,

    /// Dynamic range floor below the loudest mel bin, in dB (default: 80.0)
    pub top_db: f32,

    /// Energy fraction for spectral rolloff (default: 0.85)
    pub roll_percent: f32,

    /// Reference pitch for chroma bins (default: 440.0 Hz, A4)
    pub tuning_hz: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            n_mels: 128,
            n_mfcc: 20,
            top_db: 80.0,
            roll_percent: 0.85,
            tuning_hz: 440.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Hub identifier of the source dataset
    pub dataset_id: String,

    /// Partitions to process, in order
    pub partitions: Vec<PartitionId>,

    /// Rate used both for writing and for reloading wav files (default: 16000)
    pub sample_rate: u32,

    /// Root of the output tree (default: `output`)
    pub output_dir: PathBuf,

    /// Local parquet cache (default: `cache`)
    pub cache_dir: PathBuf,

    /// Base URL of the datasets-server used to list parquet shards
    pub hub_endpoint: String,

    pub features: FeatureConfig,

    /// Draw progress bars on stderr
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_id: DEFAULT_DATASET.to_string(),
            partitions: vec![PartitionId::new("train_0"), PartitionId::new("test_0")],
            sample_rate: 16_000,
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from("cache"),
            hub_endpoint: DEFAULT_HUB_ENDPOINT.to_string(),
            features: FeatureConfig::default(),
            show_progress: true,
        }
    }
}
