//! The batch driver: walks partitions in order, reconstructs each sample's
//! audio, extracts features and records completion.
//!
//! Work is skipped at three levels:
//!
//! - the dataset marker skips the whole run; it is only written once every
//!   partition of the dataset carries its own marker
//! - a partition marker skips that partition (and only that partition)
//! - existing `mfccs_{i}.npy` + `chroma_{i}.npy` skip a single sample
//!
//! Per-sample failures are logged and counted; they never abort the run.

use std::fs;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use crate::audio::{AudioMaterializer, is_silent, normalize};
use crate::config::PipelineConfig;
use crate::dataset::{Dataset, Partition, PartitionId, Sample};
use crate::error::{AudioError, PipelineError};
use crate::features::{Extractor, StandardExtractor, persist};
use crate::layout::OutputLayout;
use crate::markers::{CompletionTracker, MarkerScope};

/// Counters for one call to [`Pipeline::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub partitions_processed: usize,
    pub partitions_skipped: usize,
    pub extracted: usize,
    pub already_present: usize,
    pub silent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleOutcome {
    Extracted,
    AlreadyPresent,
    Silent,
}

pub struct Pipeline<E> {
    layout: OutputLayout,
    audio: AudioMaterializer,
    extractor: E,
    tracker: CompletionTracker,
    show_progress: bool,
}

impl Pipeline<StandardExtractor> {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            OutputLayout::new(config.output_dir.clone()),
            AudioMaterializer::new(config.sample_rate),
            StandardExtractor::new(config.features.clone()),
        )
        .with_progress(config.show_progress)
    }
}

impl<E: Extractor> Pipeline<E> {
    pub fn new(layout: OutputLayout, audio: AudioMaterializer, extractor: E) -> Self {
        Self {
            tracker: CompletionTracker::new(layout.clone()),
            layout,
            audio,
            extractor,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn audio(&self) -> &AudioMaterializer {
        &self.audio
    }

    /// Process `partitions` of `dataset` in the given order.
    pub fn run(&self, dataset: &Dataset, partitions: &[PartitionId]) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();

        if self.tracker.is_complete(&MarkerScope::Dataset) {
            info!("Dataset has already been processed, nothing to do");
            return Ok(summary);
        }

        let resolved = partitions
            .iter()
            .map(|id| {
                dataset
                    .partition(id)
                    .ok_or_else(|| PipelineError::UnknownPartition(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for partition in resolved {
            let scope = MarkerScope::Partition(partition.id.clone());
            if self.tracker.is_complete(&scope) {
                info!("Partition {} has already been processed, skipping", partition.id);
                summary.partitions_skipped += 1;
                continue;
            }

            self.process_partition(partition, &mut summary)?;
            self.tracker.mark_complete(&scope)?;
            summary.partitions_processed += 1;
        }

        let all_done = dataset
            .partitions()
            .iter()
            .all(|p| self.tracker.is_complete(&MarkerScope::Partition(p.id.clone())));
        if all_done {
            self.tracker.mark_complete(&MarkerScope::Dataset)?;
        }
        info!(
            "Run finished: {} extracted, {} already present, {} silent, {} failed",
            summary.extracted, summary.already_present, summary.silent, summary.failed
        );
        Ok(summary)
    }

    fn process_partition(&self, partition: &Partition, summary: &mut RunSummary) -> Result<(), PipelineError> {
        let wav_dir = self.layout.wav_dir(&partition.id);
        fs::create_dir_all(&wav_dir).map_err(|source| PipelineError::OutputDir {
            path: wav_dir.clone(),
            source,
        })?;

        info!("Processing partition {} ({} samples)", partition.id, partition.len());
        let progress = self.progress_bar(partition);

        for sample in &partition.samples {
            match self.process_sample(sample) {
                Ok(SampleOutcome::Extracted) => summary.extracted += 1,
                Ok(SampleOutcome::AlreadyPresent) => summary.already_present += 1,
                Ok(SampleOutcome::Silent) => {
                    info!(
                        "Sample {} of {} is silent after normalization, skipping",
                        sample.id, sample.partition
                    );
                    summary.silent += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to process sample {} of partition {}: {e:#}",
                        sample.id, sample.partition
                    );
                    summary.failed += 1;
                }
            }
            progress.inc(1);
        }

        progress.finish_with_message(format!("{} done", partition.id));
        Ok(())
    }

    fn process_sample(&self, sample: &Sample) -> Result<SampleOutcome> {
        if sample.input_values.iter().any(|v| !v.is_finite()) {
            return Err(AudioError::NonFinite.into());
        }
        if is_silent(&normalize(&sample.input_values)) {
            return Ok(SampleOutcome::Silent);
        }

        let partition = &sample.partition;
        if self.layout.mfcc_path(partition, sample.id).exists()
            && self.layout.chroma_path(partition, sample.id).exists()
        {
            return Ok(SampleOutcome::AlreadyPresent);
        }

        let wav_path = self.layout.wav_path(partition, sample.id);
        self.audio
            .materialize(&sample.input_values, &wav_path)
            .with_context(|| format!("writing {}", wav_path.display()))?;

        let waveform = self
            .audio
            .reload(&wav_path)?
            .ok_or_else(|| anyhow!("{} disappeared before reload", wav_path.display()))?;

        let features = self
            .extractor
            .extract(&waveform.samples, waveform.sample_rate)
            .context("extracting features")?;

        persist(&features, sample.id, partition, &self.layout).context("saving features")?;
        Ok(SampleOutcome::Extracted)
    }

    fn progress_bar(&self, partition: &Partition) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(partition.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{prefix:10.bold.dim} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_prefix(partition.id.to_string());
        pb
    }
}
