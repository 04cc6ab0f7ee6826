//! Record types of the relational model: frames, raw signals, peaks,
//! peak-signal associations and chromatogram points.
//!
//! These are the tabular shapes consumed from / produced to the columnar
//! store. The store itself (and calibration / MS2 linking, which read the
//! same records) lives outside this crate.

use serde::{
    Deserialize,
    Serialize,
};

/// One retention-time-resolved acquisition slice within a run.
///
/// Frames are uniquely keyed by (run, frame_idx, ms_level) and are
/// ordered by `rt` within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub run_id: String,
    pub frame_idx: u32,
    /// 1 = precursor scan, 2 = fragment scan.
    pub ms_level: u8,
    /// Retention time in seconds.
    pub rt: f64,
    /// Total ion current of the frame.
    pub tic: f64,
    /// Highest single-signal intensity in the frame (BPC).
    pub top_intensity: f64,
    pub num_signals: u64,
}

/// One raw MS1 intensity observation.
///
/// (run, frame, spectrum, tof) is unique; every signal belongs to exactly
/// one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub run_id: String,
    pub frame_idx: u32,
    /// Scan-within-frame ordinal.
    pub spectrum: u32,
    /// Time-of-flight bin.
    pub tof: u32,
    pub mz: f64,
    pub intensity: f64,
}

/// Weak back-reference from a peak to its center signal.
///
/// Lookup only. Scoped to the peak's run, so (frame, spectrum, tof)
/// identifies the signal uniquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKey {
    pub frame_idx: u32,
    pub spectrum: u32,
    pub tof: u32,
}

/// A detected local intensity maximum.
///
/// The apex coordinates (`frame_idx`, `rt`, `spectrum`, `tof`, `mz`,
/// `intensity`) always equal those of the center signal, and
/// `n_signals >= 1` since a peak is always a member of its own
/// neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Unique per run, assigned in ascending (mz_group, rt, spectrum, tof)
    /// order starting at 1.
    pub peak_id: u64,
    /// None until the feature builder has run.
    pub feature_id: Option<u64>,
    /// Rank within the feature by ascending rt, starting at 1.
    pub peak_num: Option<u32>,
    pub mz_group: i64,
    /// m/z spread (max - min) of the reconstructed neighborhood.
    pub delta_mz: f64,
    /// Sum of contributing-signal intensities (reconstructed intensity).
    pub summed_intensity: f64,
    /// Intensity-weighted mean spectrum index over the neighborhood,
    /// marking the mobility apex of the XIC.
    pub im_apex: f64,
    pub frame_idx: u32,
    pub rt: f64,
    pub spectrum: u32,
    pub tof: u32,
    pub mz: f64,
    /// Apex signal intensity.
    pub intensity: f64,
    pub center: SignalKey,
    pub n_signals: u64,
    pub run_id: String,
}

/// One row of the peak-to-signal association table: a raw signal that
/// contributes to the quantitation surface of a peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSignalAssociation {
    pub run_id: String,
    pub peak_id: u64,
    pub frame_idx: u32,
    pub spectrum: u32,
    pub tof: u32,
    pub mz: f64,
    pub intensity: f64,
    /// Retention time of the frame containing the signal, carried so
    /// downstream chromatographic reconstruction does not need a frame
    /// lookup per row.
    pub rt: f64,
}

/// One frame re-projected for chromatogram reporting (TIC / BPC traces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramPoint {
    pub run_id: String,
    pub rt: f64,
    pub tic: f64,
    pub top_intensity: f64,
    pub num_signals: u64,
}
