//! Dataset source backed by the Hugging Face parquet conversion, with a local
//! shard cache.

use std::cell::OnceCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::shard::read_input_values;
use super::{Dataset, DatasetSource, Partition, PartitionId};
use crate::config::PipelineConfig;
use crate::error::DatasetError;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Deserialize)]
struct ShardListing {
    parquet_files: Vec<ShardEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ShardEntry {
    split: String,
    url: String,
    filename: String,
}

/// Shard file names of one cached split, in read order.
#[derive(Debug, Serialize, Deserialize)]
struct SplitManifest {
    files: Vec<String>,
}

pub struct HubSource {
    dataset_id: String,
    partitions: Vec<PartitionId>,
    cache_dir: PathBuf,
    endpoint: String,
    client: OnceCell<Client>,
}

impl HubSource {
    pub fn new(
        dataset_id: impl Into<String>,
        partitions: Vec<PartitionId>,
        cache_dir: impl Into<PathBuf>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            partitions,
            cache_dir: cache_dir.into(),
            endpoint: endpoint.into(),
            client: OnceCell::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.dataset_id.clone(),
            config.partitions.clone(),
            config.cache_dir.clone(),
            config.hub_endpoint.clone(),
        )
    }

    /// Cache directory of one split: `{cache}/{owner}__{name}/{split}`.
    pub fn split_dir(&self, split: &PartitionId) -> PathBuf {
        self.cache_dir
            .join(self.dataset_id.replace('/', "__"))
            .join(split.as_str())
    }

    fn client(&self) -> Result<&Client, DatasetError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|source| DatasetError::Fetch {
                url: self.endpoint.clone(),
                source,
            })?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Shard paths of a fully cached split, or `None` on a cache miss.
    fn cached_shards(&self, dir: &Path) -> Option<Vec<PathBuf>> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&manifest_path).ok()?;
        let manifest: SplitManifest = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                warn!("ignoring unreadable cache manifest {}: {e}", manifest_path.display());
                return None;
            }
        };

        let paths: Vec<PathBuf> = manifest.files.iter().map(|f| dir.join(f)).collect();
        paths.iter().all(|p| p.is_file()).then_some(paths)
    }

    fn fetch_listing(&self) -> Result<Vec<ShardEntry>, DatasetError> {
        let url = format!("{}/parquet", self.endpoint.trim_end_matches('/'));
        info!("Listing parquet shards of {} from {url}", self.dataset_id);

        let fetch_err = |source| DatasetError::Fetch {
            url: url.clone(),
            source,
        };
        let body = self
            .client()?
            .get(&url)
            .query(&[("dataset", self.dataset_id.as_str())])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(fetch_err)?;

        let listing: ShardListing = serde_json::from_str(&body)?;
        Ok(listing.parquet_files)
    }

    fn download(&self, url: &str, target: &Path) -> Result<(), DatasetError> {
        let cache_err = |source| DatasetError::Cache {
            path: target.to_path_buf(),
            source,
        };
        let fetch_err = |source| DatasetError::Fetch {
            url: url.to_string(),
            source,
        };

        info!("Downloading {url}");
        let mut response = self
            .client()?
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;

        let partial = target.with_extension("part");
        let mut file = File::create(&partial).map_err(cache_err)?;
        response.copy_to(&mut file).map_err(fetch_err)?;
        drop(file);
        fs::rename(&partial, target).map_err(cache_err)?;
        Ok(())
    }

    /// Download the split's shards into `dir` and record them in its manifest.
    fn populate_split(
        &self,
        split: &PartitionId,
        dir: &Path,
        listing: &[ShardEntry],
    ) -> Result<Vec<PathBuf>, DatasetError> {
        let mut shards: Vec<&ShardEntry> =
            listing.iter().filter(|e| e.split == split.as_str()).collect();
        if shards.is_empty() {
            return Err(DatasetError::MissingSplit {
                dataset: self.dataset_id.clone(),
                split: split.to_string(),
            });
        }
        shards.sort_by(|a, b| a.filename.cmp(&b.filename));

        fs::create_dir_all(dir).map_err(|source| DatasetError::Cache {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::with_capacity(shards.len());
        for shard in &shards {
            let path = dir.join(&shard.filename);
            if path.is_file() {
                debug!("Shard already cached: {}", path.display());
            } else {
                self.download(&shard.url, &path)?;
            }
            paths.push(path);
        }

        let manifest = SplitManifest {
            files: shards.iter().map(|s| s.filename.clone()).collect(),
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).map_err(|source| {
            DatasetError::Cache {
                path: manifest_path.clone(),
                source,
            }
        })?;

        Ok(paths)
    }
}

impl DatasetSource for HubSource {
    fn load(&self) -> Result<Dataset, DatasetError> {
        let mut listing: Option<Vec<ShardEntry>> = None;
        let mut partitions = Vec::with_capacity(self.partitions.len());

        for split in &self.partitions {
            let dir = self.split_dir(split);
            let shards = match self.cached_shards(&dir) {
                Some(paths) => {
                    info!("Using cached split {split} ({} shards)", paths.len());
                    paths
                }
                None => {
                    if listing.is_none() {
                        listing = Some(self.fetch_listing()?);
                    }
                    let entries = listing.as_deref().unwrap_or(&[]);
                    self.populate_split(split, &dir, entries)?
                }
            };

            let mut values = Vec::new();
            for path in &shards {
                values.extend(read_input_values(path)?);
            }
            info!("Loaded {} samples from split {split}", values.len());
            partitions.push(Partition::from_values(split.clone(), values));
        }

        Ok(Dataset::new(partitions))
    }
}
