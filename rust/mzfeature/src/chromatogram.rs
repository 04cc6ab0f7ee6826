//! Chromatogram extraction: a lossless re-projection of the frame table
//! into per-run TIC / BPC traces. Pure read, no detection logic.

use crate::models::{
    ChromatogramPoint,
    FrameRecord,
};

/// Per run and MS level, the ordered (rt, tic, top_intensity,
/// num_signals) sequence of the matching frames, sorted by (run, rt)
/// ascending. Runs or levels with no frames contribute nothing.
pub fn extract_chromatograms(
    frames: &[FrameRecord],
    run_ids: &[String],
    ms_level: u8,
) -> Vec<ChromatogramPoint> {
    let mut points: Vec<ChromatogramPoint> = frames
        .iter()
        .filter(|f| f.ms_level == ms_level && run_ids.iter().any(|r| r == &f.run_id))
        .map(|f| ChromatogramPoint {
            run_id: f.run_id.clone(),
            rt: f.rt,
            tic: f.tic,
            top_intensity: f.top_intensity,
            num_signals: f.num_signals,
        })
        .collect();
    points.sort_unstable_by(|a, b| a.run_id.cmp(&b.run_id).then(a.rt.total_cmp(&b.rt)));
    points
}
