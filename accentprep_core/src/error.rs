//! Error types for dataset loading, audio I/O, feature extraction and the
//! batch driver.

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::PartitionId;

/// Failures while listing, downloading or reading the dataset.
///
/// All of these are fatal for a run; nothing is retried.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("dataset {dataset} has no parquet shards for split {split}")]
    MissingSplit { dataset: String, split: String },

    #[error("cache I/O error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed shard listing: {0}")]
    Listing(#[from] serde_json::Error),

    #[error("failed to read parquet shard {path}: {message}")]
    Parquet { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to write WAV file: {0}")]
    WavWrite(#[from] hound::Error),

    #[error("audio I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input contains non-finite values")]
    NonFinite,

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("waveform is empty")]
    EmptyWaveform,

    #[error("waveform of {samples} samples is too short for a {fft_size}-point frame")]
    TooShort { samples: usize, fft_size: usize },

    #[error("invalid feature parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to write feature array {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("feature I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort [`crate::pipeline::Pipeline::run`].
///
/// Per-sample failures never surface here; they are logged and counted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("partition {0} is not present in the dataset")]
    UnknownPartition(PartitionId),

    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write completion marker {path}: {source}")]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
