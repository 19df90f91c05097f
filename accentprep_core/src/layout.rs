//! Paths of everything the pipeline writes under the output root.
//!
//! ```text
//! output/wav_files/<partition>/reconstructed_audio_{i}.wav
//! output/<partition>/mfccs/mfccs_{i}.npy
//! output/<partition>/chromas/chroma_{i}.npy
//! output/markers/{dataset_processed.txt | <partition>_processed.txt}
//! ```

use std::path::{Path, PathBuf};

use crate::dataset::PartitionId;
use crate::markers::MarkerScope;

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wav_dir(&self, partition: &PartitionId) -> PathBuf {
        self.root.join("wav_files").join(partition.as_str())
    }

    pub fn wav_path(&self, partition: &PartitionId, sample_id: usize) -> PathBuf {
        self.wav_dir(partition)
            .join(format!("reconstructed_audio_{sample_id}.wav"))
    }

    pub fn mfcc_dir(&self, partition: &PartitionId) -> PathBuf {
        self.root.join(partition.as_str()).join("mfccs")
    }

    pub fn mfcc_path(&self, partition: &PartitionId, sample_id: usize) -> PathBuf {
        self.mfcc_dir(partition).join(format!("mfccs_{sample_id}.npy"))
    }

    pub fn chroma_dir(&self, partition: &PartitionId) -> PathBuf {
        self.root.join(partition.as_str()).join("chromas")
    }

    pub fn chroma_path(&self, partition: &PartitionId, sample_id: usize) -> PathBuf {
        self.chroma_dir(partition).join(format!("chroma_{sample_id}.npy"))
    }

    pub fn markers_dir(&self) -> PathBuf {
        self.root.join("markers")
    }

    pub fn marker_path(&self, scope: &MarkerScope) -> PathBuf {
        let name = match scope {
            MarkerScope::Dataset => "dataset_processed.txt".to_string(),
            MarkerScope::Partition(p) => format!("{p}_processed.txt"),
        };
        self.markers_dir().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_output_contract() {
        let layout = OutputLayout::new("output");
        let p = PartitionId::new("train_0");
        assert_eq!(
            layout.wav_path(&p, 7),
            Path::new("output/wav_files/train_0/reconstructed_audio_7.wav")
        );
        assert_eq!(layout.mfcc_path(&p, 7), Path::new("output/train_0/mfccs/mfccs_7.npy"));
        assert_eq!(layout.chroma_path(&p, 7), Path::new("output/train_0/chromas/chroma_7.npy"));
        assert_eq!(
            layout.marker_path(&MarkerScope::Partition(p)),
            Path::new("output/markers/train_0_processed.txt")
        );
        assert_eq!(
            layout.marker_path(&MarkerScope::Dataset),
            Path::new("output/markers/dataset_processed.txt")
        );
    }
}
