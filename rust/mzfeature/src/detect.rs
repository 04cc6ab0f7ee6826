//! Local-maximum peak picking within one (run, mz_group) partition.

use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::PartitionError;
use crate::indexing::SignalPartition;

/// Window and threshold options for detection and neighborhood
/// reconstruction, threaded explicitly through every call so partitioned
/// execution stays race-free.
///
/// Convention (inherited from the query surface this replaces):
/// `spectrum_window` and `rt_window` are *diameters* (the half-width is
/// `value / 2`, integer division for scans), `tof_window` is a *radius*.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Diameter of the scan-index window, in scans.
    pub spectrum_window: u32,
    /// Radius of the TOF window, in TOF bins.
    pub tof_window: u32,
    /// Diameter of the retention-time window, in seconds. Only applied
    /// during neighborhood reconstruction, not apex detection.
    pub rt_window: f64,
    /// Intensity floor for apex candidates and neighborhood members.
    pub min_ms1_intensity: f64,
    /// A signal is dropped from a neighborhood when the apex is more
    /// than this many times as intense (noise-floor heuristic).
    pub max_contribution_ratio: f64,
}

impl DetectionConfig {
    pub fn spectrum_half_width(&self) -> u32 {
        self.spectrum_window / 2
    }

    pub fn rt_half_width(&self) -> f64 {
        self.rt_window / 2.0
    }
}

/// Summary of detection over a single partition.
#[derive(Debug, Clone, Copy)]
pub struct PartitionDetectionSummary {
    pub num_signals: usize,
    pub num_candidates: usize,
    pub num_apexes: usize,
}

/// Finds the signals that are local intensity maxima over the
/// (spectrum, tof) windows of `config`.
///
/// A signal `s` at or above the intensity floor is an apex iff no other
/// signal in the partition within `spectrum_window / 2` scans and
/// `tof_window` TOF bins either has strictly greater intensity, or ties
/// on intensity with a lower (spectrum, tof, frame) triple. The triple
/// comparison is the fixed tie-break: exactly one apex survives a
/// contested neighborhood, the one at the lowest spectrum index, then
/// the lowest TOF bin.
///
/// Competitors are *not* floor-filtered, only candidates are; this keeps
/// the peak set monotone under a decreasing floor.
///
/// Zero-width windows degenerate to "strictly the maximum among signals
/// sharing the apex coordinates" and still produce valid output. A
/// partition where nothing clears the floor yields an empty apex set,
/// which is not an error.
///
/// Returns the apex positions as indices into `partition.signals`,
/// ascending. Fails the whole partition on the first malformed row
/// (non-finite m/z or intensity).
pub fn detect_apexes(
    partition: &SignalPartition,
    config: &DetectionConfig,
) -> Result<(Vec<usize>, PartitionDetectionSummary), PartitionError> {
    for s in &partition.signals {
        if !s.mz.is_finite() {
            return Err(PartitionError::NonFiniteMz {
                frame_idx: s.frame_idx,
                spectrum: s.spectrum,
                tof: s.tof,
            });
        }
        if !s.intensity.is_finite() {
            return Err(PartitionError::NonFiniteIntensity {
                frame_idx: s.frame_idx,
                spectrum: s.spectrum,
                tof: s.tof,
            });
        }
    }

    let spectrum_half = config.spectrum_half_width();
    let mut apexes = Vec::new();
    let mut num_candidates = 0;

    for (idx, s) in partition.signals.iter().enumerate() {
        if s.intensity < config.min_ms1_intensity {
            continue;
        }
        num_candidates += 1;

        let neighbor_range = partition.spectrum_range(s.spectrum, spectrum_half);
        let mut beaten = false;
        for (offset, t) in partition.signals[neighbor_range.clone()].iter().enumerate() {
            if neighbor_range.start + offset == idx {
                continue;
            }
            if t.tof.abs_diff(s.tof) > config.tof_window {
                continue;
            }
            let t_key = (t.spectrum, t.tof, t.frame_idx);
            let s_key = (s.spectrum, s.tof, s.frame_idx);
            if t.intensity > s.intensity || (t.intensity == s.intensity && t_key < s_key) {
                beaten = true;
                break;
            }
        }
        if !beaten {
            apexes.push(idx);
        }
    }

    let summary = PartitionDetectionSummary {
        num_signals: partition.signals.len(),
        num_candidates,
        num_apexes: apexes.len(),
    };
    Ok((apexes, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::IndexedSignal;

    fn partition(points: &[(u32, u32, f64)]) -> SignalPartition {
        // (spectrum, tof, intensity) on a single frame at rt 10.0
        let mut signals: Vec<_> = points
            .iter()
            .map(|&(spectrum, tof, intensity)| IndexedSignal {
                frame_idx: 1,
                spectrum,
                tof,
                mz: 500.0,
                intensity,
                rt: 10.0,
            })
            .collect();
        signals.sort_unstable_by(|a, b| {
            a.spectrum
                .cmp(&b.spectrum)
                .then(a.tof.cmp(&b.tof))
                .then(a.frame_idx.cmp(&b.frame_idx))
        });
        SignalPartition {
            run_id: "run_a".to_string(),
            mz_group: 49999,
            signals,
        }
    }

    fn config() -> DetectionConfig {
        DetectionConfig {
            spectrum_window: 2,
            tof_window: 2,
            rt_window: 10.0,
            min_ms1_intensity: 10.0,
            max_contribution_ratio: 500.0,
        }
    }

    #[test]
    fn test_single_dominant_apex() {
        // The worked example: the 500-intensity signal dominates both
        // neighbors within the window.
        let p = partition(&[(10, 100, 50.0), (10, 101, 500.0), (11, 100, 40.0)]);
        let (apexes, summary) = detect_apexes(&p, &config()).unwrap();
        assert_eq!(apexes.len(), 1);
        let apex = &p.signals[apexes[0]];
        assert_eq!((apex.spectrum, apex.tof), (10, 101));
        assert_eq!(summary.num_candidates, 3);
    }

    #[test]
    fn test_floor_excludes_candidates_not_competitors() {
        // The 5.0 signal is below the floor so it cannot be an apex, but
        // it still beats the 4.0 one... which is also below the floor.
        // Only the 80.0 signal survives.
        let p = partition(&[(10, 100, 5.0), (10, 101, 4.0), (10, 104, 80.0)]);
        let (apexes, _) = detect_apexes(&p, &config()).unwrap();
        assert_eq!(apexes.len(), 1);
        assert_eq!(p.signals[apexes[0]].intensity, 80.0);
    }

    #[test]
    fn test_tie_broken_by_lowest_spectrum_then_tof() {
        let p = partition(&[(10, 101, 50.0), (10, 100, 50.0), (11, 100, 50.0)]);
        let (apexes, _) = detect_apexes(&p, &config()).unwrap();
        assert_eq!(apexes.len(), 1);
        let apex = &p.signals[apexes[0]];
        assert_eq!((apex.spectrum, apex.tof), (10, 100));
    }

    #[test]
    fn test_distant_maxima_both_survive() {
        let p = partition(&[(10, 100, 50.0), (10, 200, 60.0)]);
        let (apexes, _) = detect_apexes(&p, &config()).unwrap();
        assert_eq!(apexes.len(), 2);
    }

    #[test]
    fn test_zero_width_windows_degenerate() {
        let mut cfg = config();
        cfg.spectrum_window = 0;
        cfg.tof_window = 0;
        // Every signal above the floor is alone in its degenerate
        // neighborhood, so each is its own apex.
        let p = partition(&[(10, 100, 50.0), (10, 101, 500.0), (11, 100, 40.0)]);
        let (apexes, _) = detect_apexes(&p, &cfg).unwrap();
        assert_eq!(apexes.len(), 3);
    }

    #[test]
    fn test_empty_above_floor_yields_no_peaks() {
        let p = partition(&[(10, 100, 1.0), (11, 101, 2.0)]);
        let (apexes, summary) = detect_apexes(&p, &config()).unwrap();
        assert!(apexes.is_empty());
        assert_eq!(summary.num_candidates, 0);
    }

    #[test]
    fn test_non_finite_intensity_fails_partition() {
        let p = partition(&[(10, 100, 50.0), (10, 101, f64::NAN)]);
        let err = detect_apexes(&p, &config()).err().unwrap();
        assert!(matches!(err, PartitionError::NonFiniteIntensity { .. }));
    }
}
