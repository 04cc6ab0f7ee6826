use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;

use mzfeature::FeatureRequest;
use mzfeature::models::{
    FrameRecord,
    SignalRecord,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    pub request: FeatureRequest,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum InputConfig {
    #[serde(rename = "snapshot")]
    Snapshot { path: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// One run snapshot as exported from the signal store: the frame table
/// and the raw signal table, both filterable by run id downstream.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SnapshotFile {
    pub frames: Vec<FrameRecord>,
    pub signals: Vec<SignalRecord>,
}
