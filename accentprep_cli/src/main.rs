use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use accentprep_core::inspect::reconstruct_random_sample;
use accentprep_core::{DatasetSource, HubSource, PartitionId, Pipeline, PipelineConfig};
use anyhow::{Context, Result, bail};
use log::info;

const INSPECTION_PARTITION: &str = "test_0";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config_from_env()?;
    info!(
        "Preparing {} ({}) at {} Hz into {}",
        config.dataset_id,
        config
            .partitions
            .iter()
            .map(PartitionId::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        config.sample_rate,
        config.output_dir.display()
    );

    let dataset = HubSource::from_config(&config)
        .load()
        .with_context(|| format!("failed to load dataset {}", config.dataset_id))?;

    let pipeline = Pipeline::from_config(&config);

    if ask_yes_no("Reconstruct a random sample for inspection? [y/N] ")? {
        let partition = config
            .partitions
            .iter()
            .find(|p| p.as_str() == INSPECTION_PARTITION)
            .or_else(|| config.partitions.first())
            .context("no partitions configured")?;
        let (id, path) = reconstruct_random_sample(
            &dataset,
            partition,
            pipeline.audio(),
            pipeline.layout(),
            &mut rand::rng(),
        )?;
        println!("Sample {id} of {partition}: {}", path.display());
    }

    let summary = pipeline
        .run(&dataset, &config.partitions)
        .context("pipeline run failed")?;

    println!(
        "Done: {} partitions processed, {} skipped; {} samples extracted, {} already present, {} silent, {} failed",
        summary.partitions_processed,
        summary.partitions_skipped,
        summary.extracted,
        summary.already_present,
        summary.silent,
        summary.failed
    );
    Ok(())
}

/// Defaults, overridden by `ACCENTPREP_*` environment variables.
fn config_from_env() -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    if let Ok(id) = env::var("ACCENTPREP_DATASET") {
        config.dataset_id = id;
    }
    if let Ok(list) = env::var("ACCENTPREP_PARTITIONS") {
        config.partitions = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PartitionId::new)
            .collect();
        if config.partitions.is_empty() {
            bail!("ACCENTPREP_PARTITIONS names no partitions");
        }
    }
    if let Ok(rate) = env::var("ACCENTPREP_SAMPLE_RATE") {
        config.sample_rate = rate
            .parse()
            .with_context(|| format!("ACCENTPREP_SAMPLE_RATE is not a positive integer: {rate}"))?;
        if config.sample_rate == 0 {
            bail!("ACCENTPREP_SAMPLE_RATE must be positive");
        }
    }
    if let Ok(dir) = env::var("ACCENTPREP_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = env::var("ACCENTPREP_CACHE_DIR") {
        config.cache_dir = PathBuf::from(dir);
    }
    if let Ok(endpoint) = env::var("ACCENTPREP_HUB_ENDPOINT") {
        config.hub_endpoint = endpoint;
    }

    Ok(config)
}

fn ask_yes_no(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(question.as_bytes())?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
