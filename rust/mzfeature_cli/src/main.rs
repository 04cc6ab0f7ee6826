mod cli;
mod config;
mod errors;

use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

use mzfeature::{
    detect_features,
    extract_chromatograms,
};

use cli::Cli;
use config::{
    Config,
    InputConfig,
    OutputConfig,
    SnapshotFile,
};

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn write_json<T: Serialize>(data: &T, dir: &Path, name: &str) -> Result<(), errors::CliError> {
    let path = dir.join(name);
    let file = File::create(&path).map_err(|e| errors::CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })?;
    serde_json::to_writer(file, data)
        .map_err(|e| errors::CliError::ParseError { msg: e.to_string() })?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<SnapshotFile, errors::CliError> {
    let file = File::open(path).map_err(|e| errors::CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })?;
    serde_json::from_reader(file).map_err(|e| errors::CliError::ParseError { msg: e.to_string() })
}

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    // Parse command line arguments
    let args = Cli::parse();

    // Load and parse configuration
    let conf = match std::fs::File::open(args.config.clone()) {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::Io {
                source: e.to_string(),
                path: Some(args.config.to_string_lossy().to_string()),
            });
        }
    };
    let config: Result<Config, _> = serde_json::from_reader(conf);
    let mut config = match config {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::ParseError { msg: e.to_string() });
        }
    };

    // Override config with command line arguments if provided
    if let Some(snapshot_file) = args.snapshot_file {
        config.input = Some(InputConfig::Snapshot {
            path: snapshot_file,
        });
    }
    if !args.run_id.is_empty() {
        config.request.run_ids = args.run_id;
    }
    if let Some(output_dir) = args.output_dir {
        config.output = Some(OutputConfig {
            directory: output_dir,
        });
    }
    let input = config.input.ok_or_else(|| errors::CliError::Config {
        source: "No input provided, please provide one in either the config file or with the --snapshot-file flag"
            .to_string(),
    })?;
    let output = config.output.ok_or_else(|| errors::CliError::Config {
        source: "No output directory provided, please provide one in either the config file or with the --output-dir flag"
            .to_string(),
    })?;

    let InputConfig::Snapshot { path } = &input;
    info!("Loading snapshot from {}", path.display());
    let snapshot = load_snapshot(path)?;
    info!(
        "Loaded {} frames and {} signals",
        snapshot.frames.len(),
        snapshot.signals.len()
    );

    let result = detect_features(&snapshot.frames, &snapshot.signals, &config.request)?;
    for failure in &result.failures {
        error!(
            "Partition (run {:?}, mz_group {}) failed and was not committed: {}",
            failure.run_id, failure.mz_group, failure.error
        );
    }

    let chromatograms = extract_chromatograms(
        &snapshot.frames,
        &config.request.run_ids,
        config.request.ms_level,
    );

    std::fs::create_dir_all(&output.directory).map_err(|e| errors::CliError::Io {
        source: e.to_string(),
        path: Some(output.directory.to_string_lossy().to_string()),
    })?;
    write_json(&result.peaks, &output.directory, "peaks.json")?;
    write_json(
        &result.associations,
        &output.directory,
        "peak_signals.json",
    )?;
    write_json(&chromatograms, &output.directory, "chromatograms.json")?;

    info!(
        "Done: {} peaks, {} features, {} failed partitions",
        result.summary.num_peaks, result.summary.num_features, result.summary.failed_partitions
    );
    Ok(())
}
