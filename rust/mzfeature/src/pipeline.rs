//! End-to-end detection over an immutable frame/signal snapshot:
//! validate the request, build the signal index, run detection and
//! neighborhood reconstruction per (run, mz_group) partition in
//! parallel, then merge deterministically and group into features.

use indicatif::{
    ParallelProgressIterator,
    ProgressStyle,
};
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::aggregate::reconstruct_neighborhood;
use crate::detect::{
    DetectionConfig,
    detect_apexes,
};
use crate::discretize::MzDiscretizer;
use crate::errors::{
    ConfigError,
    PartitionError,
    Result,
};
use crate::features::assign_features;
use crate::indexing::{
    SignalIndex,
    SignalPartition,
};
use crate::models::{
    FrameRecord,
    Peak,
    PeakSignalAssociation,
    SignalKey,
    SignalRecord,
};

fn default_spectrum_window() -> u32 {
    5
}
fn default_tof_window() -> u32 {
    3
}
fn default_rt_window() -> f64 {
    10.0
}
fn default_min_ms1_intensity() -> f64 {
    10.0
}
fn default_max_contribution_ratio() -> f64 {
    500.0
}
fn default_mz_channel_width() -> f64 {
    0.01
}
fn default_feature_rt_gap() -> f64 {
    10.0
}
fn default_ms_level() -> u8 {
    1
}

/// One detection request: the run-id set plus every window and threshold
/// the engine recognizes. This is the whole configuration surface; the
/// values are threaded through each component call, never held in
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub run_ids: Vec<String>,
    /// Diameter of the scan-index window, in scans. May be 0 (degenerate
    /// strict maximum).
    #[serde(default = "default_spectrum_window")]
    pub spectrum_window: u32,
    /// Radius of the TOF window, in TOF bins. May be 0.
    #[serde(default = "default_tof_window")]
    pub tof_window: u32,
    /// Diameter of the retention-time window, in seconds.
    #[serde(default = "default_rt_window")]
    pub rt_window: f64,
    #[serde(default = "default_min_ms1_intensity")]
    pub min_ms1_intensity: f64,
    #[serde(default = "default_max_contribution_ratio")]
    pub max_contribution_ratio: f64,
    /// Width of one discretized mass channel, in Daltons.
    #[serde(default = "default_mz_channel_width")]
    pub mz_channel_width: f64,
    /// Largest rt gap between consecutive peaks of one feature, seconds.
    #[serde(default = "default_feature_rt_gap")]
    pub feature_rt_gap: f64,
    #[serde(default = "default_ms_level")]
    pub ms_level: u8,
    /// Keep only the peaks of this feature. A row filter: detection runs
    /// over the full snapshot and ids are not renumbered afterwards.
    #[serde(default)]
    pub feature_id: Option<u64>,
    /// Keep only peaks whose apex m/z lies in `[lo, hi]`.
    #[serde(default)]
    pub mz_range: Option<(f64, f64)>,
    /// Keep only peaks whose apex rt lies in `[lo, hi]`, seconds.
    #[serde(default)]
    pub rt_range: Option<(f64, f64)>,
}

impl FeatureRequest {
    pub fn new(run_ids: Vec<String>) -> Self {
        Self {
            run_ids,
            spectrum_window: default_spectrum_window(),
            tof_window: default_tof_window(),
            rt_window: default_rt_window(),
            min_ms1_intensity: default_min_ms1_intensity(),
            max_contribution_ratio: default_max_contribution_ratio(),
            mz_channel_width: default_mz_channel_width(),
            feature_rt_gap: default_feature_rt_gap(),
            ms_level: default_ms_level(),
            feature_id: None,
            mz_range: None,
            rt_range: None,
        }
    }

    /// Validates the request against the frame snapshot. Runs before any
    /// partition work; a configuration error means no partial
    /// computation is attempted.
    pub fn validate(&self, frames: &[FrameRecord]) -> std::result::Result<(), ConfigError> {
        if self.run_ids.is_empty() {
            return Err(ConfigError::EmptyRunIds);
        }
        for run_id in &self.run_ids {
            if !frames.iter().any(|f| &f.run_id == run_id) {
                return Err(ConfigError::UnknownRunId {
                    run_id: run_id.clone(),
                });
            }
        }
        if !matches!(self.ms_level, 1 | 2) {
            return Err(ConfigError::UnknownMsLevel(self.ms_level));
        }
        for (option, value) in [
            ("rt_window", self.rt_window),
            ("mz_channel_width", self.mz_channel_width),
            ("max_contribution_ratio", self.max_contribution_ratio),
            ("feature_rt_gap", self.feature_rt_gap),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveOption { option, value });
            }
        }
        if !(self.min_ms1_intensity >= 0.0) {
            return Err(ConfigError::NegativeOption {
                option: "min_ms1_intensity",
                value: self.min_ms1_intensity,
            });
        }
        for (option, range) in [("mz_range", self.mz_range), ("rt_range", self.rt_range)] {
            if let Some((lo, hi)) = range {
                if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                    return Err(ConfigError::InvalidRange { option, lo, hi });
                }
            }
        }
        Ok(())
    }

    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            spectrum_window: self.spectrum_window,
            tof_window: self.tof_window,
            rt_window: self.rt_window,
            min_ms1_intensity: self.min_ms1_intensity,
            max_contribution_ratio: self.max_contribution_ratio,
        }
    }
}

/// Failure of one detection task, surfaced per partition. The other
/// partitions proceed; nothing from this one is committed, and it can be
/// retried from the same snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionFailure {
    pub run_id: String,
    pub mz_group: i64,
    pub error: PartitionError,
}

/// Aggregated summary of one detection request, for logging.
#[derive(Debug, Clone)]
pub struct DetectionSummary {
    pub num_partitions: usize,
    pub failed_partitions: usize,
    pub num_signals: usize,
    pub num_candidates: usize,
    pub num_peaks: usize,
    pub num_associations: usize,
    pub num_features: usize,
    pub elapsed: std::time::Duration,
}

impl std::fmt::Display for DetectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Detection Summary:")?;
        writeln!(
            f,
            "  Partitions processed: {} ({} failed)",
            self.num_partitions, self.failed_partitions
        )?;
        writeln!(f, "  Signals indexed: {}", self.num_signals)?;
        writeln!(f, "  Apex candidates: {}", self.num_candidates)?;
        writeln!(f, "  Peaks: {}", self.num_peaks)?;
        writeln!(f, "  Peak-signal associations: {}", self.num_associations)?;
        writeln!(f, "  Features: {}", self.num_features)?;
        writeln!(f, "  Elapsed (wall): {:.2?}", self.elapsed)?;
        Ok(())
    }
}

/// The relational output of one request: peaks with feature assignments,
/// the peak-to-signal association table, and the per-partition failures.
#[derive(Debug, Clone)]
pub struct RunDetectionOutput {
    pub peaks: Vec<Peak>,
    pub associations: Vec<PeakSignalAssociation>,
    pub failures: Vec<PartitionFailure>,
    pub summary: DetectionSummary,
}

struct PartitionOutput {
    // One entry per peak, association rows attached; peak ids are
    // assigned only after the deterministic cross-partition merge.
    peaks: Vec<(Peak, Vec<PeakSignalAssociation>)>,
    num_candidates: usize,
}

/// Detection + neighborhood reconstruction over one partition. Atomic:
/// either the full output or an error, nothing in between.
fn process_partition(
    partition: &SignalPartition,
    config: &DetectionConfig,
) -> std::result::Result<PartitionOutput, PartitionError> {
    let (apexes, summary) = detect_apexes(partition, config)?;

    let mut peaks = Vec::with_capacity(apexes.len());
    for apex_idx in apexes {
        let apex = &partition.signals[apex_idx];
        let hood = reconstruct_neighborhood(partition, apex_idx, config);
        let associations = hood
            .members
            .iter()
            .map(|&member_idx| {
                let member = &partition.signals[member_idx];
                PeakSignalAssociation {
                    run_id: partition.run_id.clone(),
                    peak_id: 0, // assigned after the merge
                    frame_idx: member.frame_idx,
                    spectrum: member.spectrum,
                    tof: member.tof,
                    mz: member.mz,
                    intensity: member.intensity,
                    rt: member.rt,
                }
            })
            .collect();
        peaks.push((
            Peak {
                peak_id: 0,
                feature_id: None,
                peak_num: None,
                mz_group: partition.mz_group,
                delta_mz: hood.delta_mz,
                summed_intensity: hood.summed_intensity,
                im_apex: hood.im_apex,
                frame_idx: apex.frame_idx,
                rt: apex.rt,
                spectrum: apex.spectrum,
                tof: apex.tof,
                mz: apex.mz,
                intensity: apex.intensity,
                center: SignalKey {
                    frame_idx: apex.frame_idx,
                    spectrum: apex.spectrum,
                    tof: apex.tof,
                },
                n_signals: hood.n_signals,
                run_id: partition.run_id.clone(),
            },
            associations,
        ));
    }

    // Documented ordering rule: within a partition, peaks by ascending
    // (rt, spectrum, tof, frame).
    peaks.sort_unstable_by(|(a, _), (b, _)| {
        a.rt.total_cmp(&b.rt)
            .then(a.spectrum.cmp(&b.spectrum))
            .then(a.tof.cmp(&b.tof))
            .then(a.frame_idx.cmp(&b.frame_idx))
    });

    Ok(PartitionOutput {
        peaks,
        num_candidates: summary.num_candidates,
    })
}

/// Narrows the result to the requested feature id / m/z range / rt
/// range. Runs after feature assignment so the filters see final ids and
/// cannot change detection or grouping; filtering a request is exactly a
/// row subset of the unfiltered one.
fn apply_row_filters(
    peaks: &mut Vec<Peak>,
    associations: &mut Vec<PeakSignalAssociation>,
    request: &FeatureRequest,
) {
    if request.feature_id.is_none() && request.mz_range.is_none() && request.rt_range.is_none() {
        return;
    }
    peaks.retain(|p| {
        if let Some(feature_id) = request.feature_id {
            if p.feature_id != Some(feature_id) {
                return false;
            }
        }
        if let Some((lo, hi)) = request.mz_range {
            if p.mz < lo || p.mz > hi {
                return false;
            }
        }
        if let Some((lo, hi)) = request.rt_range {
            if p.rt < lo || p.rt > hi {
                return false;
            }
        }
        true
    });
    // Peak ids are scoped per run, so the association lookup is too.
    let kept: std::collections::HashSet<(&str, u64)> = peaks
        .iter()
        .map(|p| (p.run_id.as_str(), p.peak_id))
        .collect();
    associations.retain(|a| kept.contains(&(a.run_id.as_str(), a.peak_id)));
}

/// Runs the whole detection pipeline for one request.
///
/// Re-running with identical input and request reproduces the identical
/// peak set, ids, and feature groupings.
#[tracing::instrument(level = "debug", skip_all)]
pub fn detect_features(
    frames: &[FrameRecord],
    signals: &[SignalRecord],
    request: &FeatureRequest,
) -> Result<RunDetectionOutput> {
    let start = std::time::Instant::now();
    request.validate(frames)?;

    let discretizer = MzDiscretizer::new(request.mz_channel_width);
    let (index, index_stats) = SignalIndex::build(
        frames,
        signals,
        &request.run_ids,
        request.ms_level,
        &discretizer,
    )?;
    debug!("{}", index_stats);

    let config = request.detection_config();
    let partitions = index.partitions();
    let style = ProgressStyle::with_template(
        "{msg} {wide_bar} {pos}/{len} [{elapsed_precise}]",
    )
    .expect("hard-coded progress template is valid");

    // Fork-join over (run, mz_group) partitions. Results come back in
    // partition order, so the merge below is deterministic; failures are
    // kept alongside successes instead of aborting the batch.
    let results: Vec<std::result::Result<PartitionOutput, PartitionFailure>> = partitions
        .par_iter()
        .progress_count(partitions.len() as u64)
        .with_style(style)
        .with_message("detecting")
        .map(|partition| {
            process_partition(partition, &config).map_err(|error| PartitionFailure {
                run_id: partition.run_id.clone(),
                mz_group: partition.mz_group,
                error,
            })
        })
        .collect();

    let mut peaks = Vec::new();
    let mut associations = Vec::new();
    let mut failures = Vec::new();
    let mut num_candidates = 0;

    // Partitions are ordered by (run, mz_group), so a per-run peak id
    // counter only needs to reset on run boundaries.
    let mut next_peak_id = 0u64;
    let mut current_run: Option<String> = None;
    for (partition, result) in partitions.iter().zip(results) {
        match result {
            Err(failure) => {
                warn!(
                    "partition (run {:?}, mz_group {}) failed: {}",
                    failure.run_id, failure.mz_group, failure.error
                );
                failures.push(failure);
            }
            Ok(output) => {
                if current_run.as_deref() != Some(partition.run_id.as_str()) {
                    current_run = Some(partition.run_id.clone());
                    next_peak_id = 0;
                }
                num_candidates += output.num_candidates;
                for (mut peak, mut peak_associations) in output.peaks {
                    next_peak_id += 1;
                    peak.peak_id = next_peak_id;
                    for row in &mut peak_associations {
                        row.peak_id = next_peak_id;
                    }
                    peaks.push(peak);
                    associations.append(&mut peak_associations);
                }
            }
        }
    }

    assign_features(&mut peaks, request.feature_rt_gap);
    apply_row_filters(&mut peaks, &mut associations, request);
    let num_features: usize = {
        let mut seen = std::collections::HashSet::new();
        for peak in &peaks {
            seen.insert((peak.run_id.as_str(), peak.feature_id));
        }
        seen.len()
    };

    let summary = DetectionSummary {
        num_partitions: partitions.len(),
        failed_partitions: failures.len(),
        num_signals: index.num_signals(),
        num_candidates,
        num_peaks: peaks.len(),
        num_associations: associations.len(),
        num_features,
        elapsed: start.elapsed(),
    };
    info!("{}", summary);

    Ok(RunDetectionOutput {
        peaks,
        associations,
        failures,
        summary,
    })
}
