//! Sentinel files recording finished units of work.

use std::fmt;
use std::fs;

use chrono::Utc;
use log::info;

use crate::dataset::PartitionId;
use crate::error::PipelineError;
use crate::layout::OutputLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerScope {
    Dataset,
    Partition(PartitionId),
}

impl fmt::Display for MarkerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerScope::Dataset => f.write_str("dataset"),
            MarkerScope::Partition(p) => write!(f, "partition {p}"),
        }
    }
}

/// Marker presence is the whole contract; the body is just a timestamp.
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    layout: OutputLayout,
}

impl CompletionTracker {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn is_complete(&self, scope: &MarkerScope) -> bool {
        self.layout.marker_path(scope).exists()
    }

    pub fn mark_complete(&self, scope: &MarkerScope) -> Result<(), PipelineError> {
        let path = self.layout.marker_path(scope);
        let marker_err = |source| PipelineError::Marker {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(self.layout.markers_dir()).map_err(marker_err)?;
        fs::write(&path, format!("processed at {}\n", Utc::now().to_rfc3339())).map_err(marker_err)?;

        info!("Marked {scope} complete: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_per_scope() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CompletionTracker::new(OutputLayout::new(dir.path()));
        let train = MarkerScope::Partition(PartitionId::new("train_0"));
        let test = MarkerScope::Partition(PartitionId::new("test_0"));

        assert!(!tracker.is_complete(&train));
        tracker.mark_complete(&train).unwrap();
        assert!(tracker.is_complete(&train));
        assert!(!tracker.is_complete(&test));
        assert!(!tracker.is_complete(&MarkerScope::Dataset));
    }

    #[test]
    fn marking_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CompletionTracker::new(OutputLayout::new(dir.path()));
        tracker.mark_complete(&MarkerScope::Dataset).unwrap();
        tracker.mark_complete(&MarkerScope::Dataset).unwrap();
        assert!(tracker.is_complete(&MarkerScope::Dataset));
    }
}
