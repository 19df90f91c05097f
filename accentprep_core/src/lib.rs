//! # accentprep
//!
//! Batch preparation of the accented-speech dataset: rebuild each sample's
//! waveform from its stored `input_values`, persist it as a wav, reload it,
//! and save MFCC and chroma arrays per partition.
//!
//! ```no_run
//! use accentprep_core::{DatasetSource, HubSource, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let dataset = HubSource::from_config(&config).load()?;
//! let summary = Pipeline::from_config(&config).run(&dataset, &config.partitions)?;
//! println!("{summary:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Reruns are incremental: marker files under `output/markers` and the
//! presence of per-sample feature files decide what is left to do.

pub mod audio;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inspect;
pub mod layout;
pub mod markers;
pub mod pipeline;

pub use audio::{AudioMaterializer, Waveform};
pub use config::{FeatureConfig, PipelineConfig};
pub use dataset::{Dataset, DatasetSource, HubSource, Partition, PartitionId, Sample};
pub use error::{AudioError, DatasetError, FeatureError, PipelineError};
pub use features::{Extractor, FeatureSet, StandardExtractor};
pub use layout::OutputLayout;
pub use markers::{CompletionTracker, MarkerScope};
pub use pipeline::{Pipeline, RunSummary};
