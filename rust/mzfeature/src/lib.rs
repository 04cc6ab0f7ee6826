#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::aggregate::Neighborhood;
pub use crate::detect::DetectionConfig;
pub use crate::discretize::MzDiscretizer;
pub use crate::indexing::{
    SignalIndex,
    SignalPartition,
};
pub use crate::models::{
    ChromatogramPoint,
    FrameRecord,
    Peak,
    PeakSignalAssociation,
    SignalKey,
    SignalRecord,
};
pub use crate::pipeline::{
    DetectionSummary,
    FeatureRequest,
    PartitionFailure,
    RunDetectionOutput,
    detect_features,
};

// Declare modules
pub mod aggregate;
pub mod chromatogram;
pub mod detect;
pub mod discretize;
pub mod errors;
pub mod features;
pub mod indexing;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export errors
pub use crate::errors::{
    ConfigError,
    MzFeatureError,
    PartitionError,
};
pub use crate::chromatogram::extract_chromatograms;
pub use crate::features::assign_features;
