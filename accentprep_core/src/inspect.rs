//! Optional pre-run hook: reconstruct one random sample so it can be
//! listened to before the batch starts.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use log::info;
use rand::Rng;

use crate::audio::AudioMaterializer;
use crate::dataset::{Dataset, PartitionId};
use crate::layout::OutputLayout;

/// Pick a uniformly random sample of `partition` and make sure its wav exists.
///
/// Returns the sample id and the wav path.
pub fn reconstruct_random_sample<R: Rng>(
    dataset: &Dataset,
    partition: &PartitionId,
    audio: &AudioMaterializer,
    layout: &OutputLayout,
    rng: &mut R,
) -> Result<(usize, PathBuf)> {
    let samples = &dataset
        .partition(partition)
        .ok_or_else(|| anyhow!("partition {partition} is not present in the dataset"))?
        .samples;
    if samples.is_empty() {
        return Err(anyhow!("partition {partition} has no samples"));
    }

    let sample = &samples[rng.random_range(0..samples.len())];
    let path = layout.wav_path(partition, sample.id);

    if audio.materialize(&sample.input_values, &path)? {
        info!("Reconstructed sample {}: {}", sample.id, path.display());
    } else {
        info!("WAV file already exists for sample {}: {}", sample.id, path.display());
    }

    Ok((sample.id, path))
}
