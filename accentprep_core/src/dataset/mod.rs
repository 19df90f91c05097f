//! Partitioned speech samples and the sources that provide them.

pub mod hub;
pub mod shard;

use std::fmt;

use crate::error::DatasetError;

pub use hub::HubSource;

/// Name of a dataset split, e.g. `train_0` or `test_0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One dataset record: the stored feature vector plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Row index within the partition
    pub id: usize,
    pub input_values: Vec<f32>,
    pub partition: PartitionId,
}

#[derive(Debug, Clone)]
pub struct Partition {
    pub id: PartitionId,
    /// Samples in row order; `samples[i].id == i`
    pub samples: Vec<Sample>,
}

impl Partition {
    /// Build a partition from raw vectors, assigning ids by position.
    pub fn from_values(id: PartitionId, values: Vec<Vec<f32>>) -> Self {
        let samples = values
            .into_iter()
            .enumerate()
            .map(|(i, input_values)| Sample {
                id: i,
                input_values,
                partition: id.clone(),
            })
            .collect();
        Self { id, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    partitions: Vec<Partition>,
}

impl Dataset {
    pub fn new(partitions: Vec<Partition>) -> Self {
        Self { partitions }
    }

    pub fn partition(&self, id: &PartitionId) -> Option<&Partition> {
        self.partitions.iter().find(|p| &p.id == id)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }
}

/// Anything that can produce the dataset for a run.
pub trait DatasetSource {
    fn load(&self) -> Result<Dataset, DatasetError>;
}

impl DatasetSource for Dataset {
    fn load(&self) -> Result<Dataset, DatasetError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_values_assigns_row_ids() {
        let id = PartitionId::new("test_0");
        let partition = Partition::from_values(id.clone(), vec![vec![0.1], vec![0.2, 0.3]]);
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.samples[1].id, 1);
        assert_eq!(partition.samples[1].partition, id);
        assert_eq!(partition.samples[1].input_values, vec![0.2, 0.3]);
    }

    #[test]
    fn lookup_by_partition_id() {
        let dataset = Dataset::new(vec![
            Partition::from_values(PartitionId::new("train_0"), vec![]),
            Partition::from_values(PartitionId::new("test_0"), vec![vec![1.0]]),
        ]);
        assert_eq!(dataset.partition(&PartitionId::new("test_0")).map(Partition::len), Some(1));
        assert!(dataset.partition(&PartitionId::new("validation")).is_none());
    }
}
