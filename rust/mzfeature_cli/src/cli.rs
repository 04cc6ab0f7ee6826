use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the snapshot file (will over-write the config file)
    #[arg(short, long)]
    pub snapshot_file: Option<PathBuf>,

    /// Run ids to process (will over-write the config file)
    #[arg(short, long)]
    pub run_id: Vec<String>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
