//! The signal arena: raw signals bucketed into per-(run, mass-channel)
//! partitions, each sorted along the spectrum axis.
//!
//! The detector and the aggregator only ever compare signals within one
//! partition, so this layout turns the windowed joins into binary-search
//! range scans instead of quadratic neighbor sweeps, and makes the
//! partitions the natural unit of parallel work.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::discretize::MzDiscretizer;
use crate::errors::ConfigError;
use crate::models::{
    FrameRecord,
    SignalRecord,
};
use crate::utils::binary_search_range_by_key;

/// One raw signal with its frame rt resolved and its mass channel
/// assigned. Compact on purpose: there can be ~10^8 of these per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedSignal {
    pub frame_idx: u32,
    pub spectrum: u32,
    pub tof: u32,
    pub mz: f64,
    pub intensity: f64,
    /// Retention time of the owning frame, in seconds.
    pub rt: f64,
}

/// All signals of one (run, mz_group), sorted by (spectrum, tof,
/// frame_idx).
#[derive(Debug, Clone)]
pub struct SignalPartition {
    pub run_id: String,
    pub mz_group: i64,
    pub signals: Vec<IndexedSignal>,
}

impl SignalPartition {
    /// Index range of signals whose spectrum lies in
    /// `[center - half, center + half]`, for slicing `self.signals`.
    pub fn spectrum_range(&self, center: u32, half: u32) -> std::ops::Range<usize> {
        let lo = center.saturating_sub(half);
        let hi = center.saturating_add(half);
        binary_search_range_by_key(&self.signals, lo..=hi, |s| s.spectrum)
    }
}

/// Statistics about an index build. Usually logged right after building.
#[derive(Debug, Clone)]
pub struct IndexBuildStats {
    pub num_runs: usize,
    pub num_frames: usize,
    pub num_signals: usize,
    pub num_partitions: usize,
    /// Signals attached to frames of a different MS level than requested.
    pub skipped_other_level: usize,
    pub sorting_time: std::time::Duration,
}

impl std::fmt::Display for IndexBuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Signal Index Build Stats:")?;
        writeln!(f, "  Runs: {}", self.num_runs)?;
        writeln!(f, "  Frames: {}", self.num_frames)?;
        writeln!(f, "  Indexed signals: {}", self.num_signals)?;
        writeln!(f, "  Partitions (run x mz_group): {}", self.num_partitions)?;
        writeln!(f, "  Skipped (other MS level): {}", self.skipped_other_level)?;
        writeln!(f, "  Sorting time: {:.2?}", self.sorting_time)?;
        Ok(())
    }
}

/// Immutable snapshot of the signals of a run-id set, partitioned and
/// sorted, plus the frame table needed by downstream consumers.
///
/// The main flow is:
/// 1. Build from tabular frame/signal records ([SignalIndex::build]).
/// 2. Hand each [SignalPartition] to the detector and aggregator.
#[derive(Debug, Clone)]
pub struct SignalIndex {
    partitions: Vec<SignalPartition>,
}

impl SignalIndex {
    /// Build the index for the given run-id set and MS level.
    ///
    /// Frames of other runs or MS levels are ignored; signals belonging
    /// to ignored frames are skipped. A signal referencing a frame that
    /// exists in no MS level of its run, or a selected frame with a
    /// non-finite rt, is an input error (the snapshot is inconsistent,
    /// not just noisy), reported before any detection. The rt check
    /// happens here because the frame rt is copied onto every indexed
    /// signal and a NaN would slip through the downstream rt-window and
    /// rt-gap comparisons unnoticed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(
        frames: &[FrameRecord],
        signals: &[SignalRecord],
        run_ids: &[String],
        ms_level: u8,
        discretizer: &MzDiscretizer,
    ) -> Result<(Self, IndexBuildStats), ConfigError> {
        let mut frame_rt: HashMap<(&str, u32), f64> = HashMap::new();
        let mut known_frames: HashMap<&str, Vec<u32>> = HashMap::new();
        let mut num_frames = 0;
        for frame in frames {
            if !run_ids.iter().any(|r| r == &frame.run_id) {
                continue;
            }
            known_frames
                .entry(frame.run_id.as_str())
                .or_default()
                .push(frame.frame_idx);
            if frame.ms_level == ms_level {
                if !frame.rt.is_finite() {
                    return Err(ConfigError::NonFiniteFrameRt {
                        run_id: frame.run_id.clone(),
                        frame_idx: frame.frame_idx,
                        rt: frame.rt,
                    });
                }
                frame_rt.insert((frame.run_id.as_str(), frame.frame_idx), frame.rt);
                num_frames += 1;
            }
        }

        let mut buckets: HashMap<(&str, i64), Vec<IndexedSignal>> = HashMap::new();
        let mut skipped_other_level = 0;
        let mut num_signals = 0;
        for signal in signals {
            if !run_ids.iter().any(|r| r == &signal.run_id) {
                continue;
            }
            let rt = match frame_rt.get(&(signal.run_id.as_str(), signal.frame_idx)) {
                Some(rt) => *rt,
                None => {
                    let exists = known_frames
                        .get(signal.run_id.as_str())
                        .is_some_and(|fs| fs.contains(&signal.frame_idx));
                    if exists {
                        skipped_other_level += 1;
                        continue;
                    }
                    return Err(ConfigError::DanglingFrameReference {
                        run_id: signal.run_id.clone(),
                        frame_idx: signal.frame_idx,
                    });
                }
            };
            let mz_group = discretizer.channel(signal.mz);
            buckets
                .entry((signal.run_id.as_str(), mz_group))
                .or_default()
                .push(IndexedSignal {
                    frame_idx: signal.frame_idx,
                    spectrum: signal.spectrum,
                    tof: signal.tof,
                    mz: signal.mz,
                    intensity: signal.intensity,
                    rt,
                });
            num_signals += 1;
        }

        let mut partitions: Vec<SignalPartition> = buckets
            .into_iter()
            .map(|((run_id, mz_group), signals)| SignalPartition {
                run_id: run_id.to_string(),
                mz_group,
                signals,
            })
            .collect();
        // Cross-partition order is normalized here so downstream id
        // assignment never depends on hash-map iteration order.
        partitions.sort_unstable_by(|a, b| {
            a.run_id
                .cmp(&b.run_id)
                .then(a.mz_group.cmp(&b.mz_group))
        });

        let st = std::time::Instant::now();
        partitions.par_iter_mut().for_each(|partition| {
            partition.signals.sort_unstable_by(|a, b| {
                a.spectrum
                    .cmp(&b.spectrum)
                    .then(a.tof.cmp(&b.tof))
                    .then(a.frame_idx.cmp(&b.frame_idx))
            });
        });
        let sorting_time = st.elapsed();

        let stats = IndexBuildStats {
            num_runs: run_ids.len(),
            num_frames,
            num_signals,
            num_partitions: partitions.len(),
            skipped_other_level,
            sorting_time,
        };
        Ok((Self { partitions }, stats))
    }

    pub fn partitions(&self) -> &[SignalPartition] {
        &self.partitions
    }

    pub fn num_signals(&self) -> usize {
        self.partitions.iter().map(|p| p.signals.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(run: &str, idx: u32, ms_level: u8, rt: f64) -> FrameRecord {
        FrameRecord {
            run_id: run.to_string(),
            frame_idx: idx,
            ms_level,
            rt,
            tic: 0.0,
            top_intensity: 0.0,
            num_signals: 0,
        }
    }

    fn signal(run: &str, frame_idx: u32, spectrum: u32, tof: u32, mz: f64) -> SignalRecord {
        SignalRecord {
            run_id: run.to_string(),
            frame_idx,
            spectrum,
            tof,
            mz,
            intensity: 100.0,
        }
    }

    #[test]
    fn test_partitions_sorted_and_rt_resolved() {
        let frames = vec![frame("run_a", 1, 1, 12.5), frame("run_a", 2, 1, 13.0)];
        let signals = vec![
            signal("run_a", 2, 8, 300, 500.004),
            signal("run_a", 1, 5, 100, 500.002),
            signal("run_a", 1, 5, 99, 500.003),
        ];
        let disc = MzDiscretizer::new(0.01);
        let (index, stats) =
            SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc).unwrap();

        assert_eq!(stats.num_partitions, 1);
        let partition = &index.partitions()[0];
        let key: Vec<_> = partition.signals.iter().map(|s| (s.spectrum, s.tof)).collect();
        assert_eq!(key, vec![(5, 99), (5, 100), (8, 300)]);
        assert_eq!(partition.signals[0].rt, 12.5);
        assert_eq!(partition.signals[2].rt, 13.0);
    }

    #[test]
    fn test_other_ms_level_signals_skipped() {
        let frames = vec![frame("run_a", 1, 1, 10.0), frame("run_a", 2, 2, 10.5)];
        let signals = vec![
            signal("run_a", 1, 5, 100, 500.0),
            signal("run_a", 2, 5, 100, 500.0),
        ];
        let disc = MzDiscretizer::new(0.01);
        let (index, stats) =
            SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc).unwrap();
        assert_eq!(index.num_signals(), 1);
        assert_eq!(stats.skipped_other_level, 1);
    }

    #[test]
    fn test_dangling_frame_reference_is_error() {
        let frames = vec![frame("run_a", 1, 1, 10.0)];
        let signals = vec![signal("run_a", 99, 5, 100, 500.0)];
        let disc = MzDiscretizer::new(0.01);
        let err = SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::DanglingFrameReference {
                run_id: "run_a".to_string(),
                frame_idx: 99,
            }
        );
    }

    #[test]
    fn test_non_finite_frame_rt_is_error() {
        let frames = vec![frame("run_a", 1, 1, 10.0), frame("run_a", 2, 1, f64::NAN)];
        let signals = vec![signal("run_a", 1, 5, 100, 500.0)];
        let disc = MzDiscretizer::new(0.01);
        let err = SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigError::NonFiniteFrameRt {
                frame_idx: 2,
                ..
            }
        ));

        // A NaN-rt frame of a different MS level never lends its rt to
        // anything and does not block the build.
        let frames = vec![frame("run_a", 1, 1, 10.0), frame("run_a", 2, 2, f64::NAN)];
        assert!(SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc).is_ok());
    }

    #[test]
    fn test_spectrum_range_lookup() {
        let frames = vec![frame("run_a", 1, 1, 10.0)];
        let signals: Vec<_> = [1u32, 4, 5, 5, 9, 14]
            .iter()
            .enumerate()
            .map(|(i, &spec)| signal("run_a", 1, spec, 100 + i as u32, 500.0))
            .collect();
        let disc = MzDiscretizer::new(0.01);
        let (index, _) =
            SignalIndex::build(&frames, &signals, &["run_a".to_string()], 1, &disc).unwrap();
        let partition = &index.partitions()[0];

        let range = partition.spectrum_range(5, 2);
        let specs: Vec<_> = partition.signals[range].iter().map(|s| s.spectrum).collect();
        assert_eq!(specs, vec![4, 5, 5]);

        // Saturating at zero instead of wrapping below it.
        let range = partition.spectrum_range(1, 3);
        assert_eq!(partition.signals[range][0].spectrum, 1);
    }
}
