use std::path::PathBuf;
use thiserror::Error;

/// A request that cannot be computed at all. Reported before any
/// partition work starts; no partial computation is attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no run ids provided in the request")]
    EmptyRunIds,
    #[error("run id {run_id:?} not present in the frame snapshot")]
    UnknownRunId { run_id: String },
    #[error("ms level {0} is not supported (expected 1 or 2)")]
    UnknownMsLevel(u8),
    #[error("option {option} must be positive, got {value}")]
    NonPositiveOption { option: &'static str, value: f64 },
    #[error("option {option} must be non-negative, got {value}")]
    NegativeOption { option: &'static str, value: f64 },
    #[error("option {option} is not a valid range: ({lo}, {hi})")]
    InvalidRange {
        option: &'static str,
        lo: f64,
        hi: f64,
    },
    #[error("signal references frame {frame_idx} which does not exist in run {run_id:?}")]
    DanglingFrameReference { run_id: String, frame_idx: u32 },
    #[error("frame {frame_idx} of run {run_id:?} has non-finite rt {rt}")]
    NonFiniteFrameRt {
        run_id: String,
        frame_idx: u32,
        rt: f64,
    },
}

/// Failure of a single (run, mz_group) detection task.
///
/// Isolated to its partition: other partitions proceed, nothing from the
/// failed partition is committed, and the partition can be retried from
/// the immutable input snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error("signal at (frame {frame_idx}, spectrum {spectrum}, tof {tof}) has non-finite intensity")]
    NonFiniteIntensity {
        frame_idx: u32,
        spectrum: u32,
        tof: u32,
    },
    #[error("signal at (frame {frame_idx}, spectrum {spectrum}, tof {tof}) has non-finite m/z")]
    NonFiniteMz {
        frame_idx: u32,
        spectrum: u32,
        tof: u32,
    },
}

#[derive(Debug)]
pub enum MzFeatureError {
    Config(ConfigError),
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    ParseError {
        msg: String,
    },
}

impl std::fmt::Display for MzFeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, MzFeatureError>;

impl From<ConfigError> for MzFeatureError {
    fn from(x: ConfigError) -> Self {
        Self::Config(x)
    }
}

impl From<serde_json::Error> for MzFeatureError {
    fn from(val: serde_json::Error) -> Self {
        MzFeatureError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<std::io::Error> for MzFeatureError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}
