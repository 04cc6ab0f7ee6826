//! Neighborhood reconstruction: for each detected apex, the bounded set
//! of raw signals that plausibly belong to it. This is the quantitation
//! surface of the peak, and is allowed to be wider than the apex
//! detection neighborhood (it adds the retention-time window).

use crate::detect::DetectionConfig;
use crate::indexing::{
    IndexedSignal,
    SignalPartition,
};

/// Accumulates the contributing signals of one apex.
///
/// Mobility position is kept as an intensity-weighted mean of the
/// spectrum indices, and the m/z width as the spread of the member m/z
/// values.
#[derive(Debug, Clone)]
struct NeighborhoodAccumulator {
    weighed_spectrum_sum: f64,
    total_intensity: f64,
    min_mz: f64,
    max_mz: f64,
    members: Vec<usize>,
}

impl NeighborhoodAccumulator {
    fn new() -> Self {
        Self {
            weighed_spectrum_sum: 0.0,
            total_intensity: 0.0,
            min_mz: f64::MAX,
            max_mz: f64::MIN,
            members: Vec::new(),
        }
    }

    fn add_signal(&mut self, idx: usize, signal: &IndexedSignal) {
        self.weighed_spectrum_sum += signal.spectrum as f64 * signal.intensity;
        self.total_intensity += signal.intensity;
        self.min_mz = self.min_mz.min(signal.mz);
        self.max_mz = self.max_mz.max(signal.mz);
        self.members.push(idx);
    }

    fn finalize(self, apex: &IndexedSignal) -> Neighborhood {
        let im_apex = if self.total_intensity > 0.0 {
            self.weighed_spectrum_sum / self.total_intensity
        } else {
            apex.spectrum as f64
        };
        Neighborhood {
            summed_intensity: self.total_intensity,
            im_apex,
            delta_mz: self.max_mz - self.min_mz,
            n_signals: self.members.len() as u64,
            members: self.members,
        }
    }
}

/// The reconstructed contributing-signal set of one peak.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    /// Indices into the partition's signal slice, ascending.
    pub members: Vec<usize>,
    /// Reconstructed intensity: sum over the members.
    pub summed_intensity: f64,
    /// Intensity-weighted mean spectrum index (XIC mobility apex).
    pub im_apex: f64,
    /// m/z spread of the members.
    pub delta_mz: f64,
    pub n_signals: u64,
}

/// Reconstructs the neighborhood of the apex at `apex_idx`.
///
/// A signal contributes iff it lies within `spectrum_window / 2` scans,
/// `tof_window` TOF bins and `rt_window / 2` seconds of the apex, clears
/// the intensity floor, and passes the contribution filter
/// `apex.intensity / signal.intensity <= max_contribution_ratio`. The
/// apex itself is always a member: membership is reflexive regardless of
/// the floor or the ratio.
pub fn reconstruct_neighborhood(
    partition: &SignalPartition,
    apex_idx: usize,
    config: &DetectionConfig,
) -> Neighborhood {
    let apex = &partition.signals[apex_idx];
    let spectrum_half = config.spectrum_half_width();
    let rt_half = config.rt_half_width();

    let mut acc = NeighborhoodAccumulator::new();
    let range = partition.spectrum_range(apex.spectrum, spectrum_half);
    for (offset, t) in partition.signals[range.clone()].iter().enumerate() {
        let idx = range.start + offset;
        if idx == apex_idx {
            // Reflexive by construction; skips the ratio filter, which
            // would reject a zero-intensity apex (0.0 / 0.0 is NaN).
            acc.add_signal(idx, t);
            continue;
        }
        if t.tof.abs_diff(apex.tof) > config.tof_window {
            continue;
        }
        if (t.rt - apex.rt).abs() > rt_half {
            continue;
        }
        if t.intensity < config.min_ms1_intensity {
            continue;
        }
        if apex.intensity / t.intensity > config.max_contribution_ratio {
            continue;
        }
        acc.add_signal(idx, t);
    }

    acc.finalize(apex)
}
