//! Grouping of peaks across retention time into features: one feature is
//! the trajectory of a single analyte through consecutive frames within
//! one (run, mz_group).

use crate::models::Peak;

/// Assigns `feature_id` and `peak_num` to every peak.
///
/// Within one (run, mz_group), peaks sorted by ascending apex rt are
/// connected into one feature while consecutive rt values differ by at
/// most `rt_gap` seconds; a new feature starts whenever the gap is
/// exceeded. Feature ids are numbered from 1 per run in ascending
/// (mz_group, first-rt) order, and `peak_num` ranks the members of a
/// feature from 1 by ascending rt.
///
/// The result depends only on the sorted rt order (ties broken by
/// peak_id), so re-running on an unchanged peak set reproduces the same
/// grouping; peaks can be re-grouped without re-detection.
pub fn assign_features(peaks: &mut [Peak], rt_gap: f64) {
    peaks.sort_unstable_by(|a, b| {
        a.run_id
            .cmp(&b.run_id)
            .then(a.mz_group.cmp(&b.mz_group))
            .then(a.rt.total_cmp(&b.rt))
            .then(a.peak_id.cmp(&b.peak_id))
    });

    let mut feature_id = 0u64;
    let mut peak_num = 0u32;

    for i in 0..peaks.len() {
        let new_feature = if i == 0 {
            true
        } else {
            let (prev, curr) = (&peaks[i - 1], &peaks[i]);
            if prev.run_id != curr.run_id {
                // Feature ids restart per run.
                feature_id = 0;
                true
            } else {
                prev.mz_group != curr.mz_group || curr.rt - prev.rt > rt_gap
            }
        };
        if new_feature {
            feature_id += 1;
            peak_num = 0;
        }
        peak_num += 1;
        peaks[i].feature_id = Some(feature_id);
        peaks[i].peak_num = Some(peak_num);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignalKey;

    fn peak(run: &str, mz_group: i64, rt: f64, peak_id: u64) -> Peak {
        Peak {
            peak_id,
            feature_id: None,
            peak_num: None,
            mz_group,
            delta_mz: 0.0,
            summed_intensity: 100.0,
            im_apex: 10.0,
            frame_idx: 1,
            rt,
            spectrum: 10,
            tof: 100,
            mz: 500.0,
            intensity: 100.0,
            center: SignalKey {
                frame_idx: 1,
                spectrum: 10,
                tof: 100,
            },
            n_signals: 1,
            run_id: run.to_string(),
        }
    }

    #[test]
    fn test_gap_splits_features() {
        let mut peaks = vec![
            peak("run_a", 7, 10.0, 1),
            peak("run_a", 7, 15.0, 2),
            peak("run_a", 7, 40.0, 3), // 25 s gap, new feature
            peak("run_a", 7, 45.0, 4),
        ];
        assign_features(&mut peaks, 10.0);
        let ids: Vec<_> = peaks.iter().map(|p| p.feature_id.unwrap()).collect();
        assert_eq!(ids, vec![1, 1, 2, 2]);
        let nums: Vec<_> = peaks.iter().map(|p| p.peak_num.unwrap()).collect();
        assert_eq!(nums, vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_channel_and_run_boundaries() {
        let mut peaks = vec![
            peak("run_b", 7, 10.0, 1),
            peak("run_a", 7, 10.0, 1),
            peak("run_a", 9, 11.0, 2),
        ];
        assign_features(&mut peaks, 10.0);
        // Sorted: (run_a, 7), (run_a, 9), (run_b, 7). Different channels
        // never share a feature; ids restart at 1 per run.
        assert_eq!(peaks[0].run_id, "run_a");
        assert_eq!(peaks[0].feature_id, Some(1));
        assert_eq!(peaks[1].feature_id, Some(2));
        assert_eq!(peaks[2].run_id, "run_b");
        assert_eq!(peaks[2].feature_id, Some(1));
    }

    #[test]
    fn test_peak_num_contiguous_ascending_rt() {
        let mut peaks = vec![
            peak("run_a", 7, 30.0, 3),
            peak("run_a", 7, 10.0, 1),
            peak("run_a", 7, 21.0, 2),
        ];
        assign_features(&mut peaks, 15.0);
        let rts: Vec<_> = peaks.iter().map(|p| p.rt).collect();
        assert_eq!(rts, vec![10.0, 21.0, 30.0]);
        let nums: Vec<_> = peaks.iter().map(|p| p.peak_num.unwrap()).collect();
        assert_eq!(nums, vec![1, 2, 3]);
        assert!(peaks.iter().all(|p| p.feature_id == Some(1)));
    }

    #[test]
    fn test_regrouping_is_stable() {
        let mut peaks = vec![
            peak("run_a", 7, 10.0, 1),
            peak("run_a", 7, 35.0, 2),
        ];
        assign_features(&mut peaks, 10.0);
        let first: Vec<_> = peaks
            .iter()
            .map(|p| (p.peak_id, p.feature_id, p.peak_num))
            .collect();
        assign_features(&mut peaks, 10.0);
        let second: Vec<_> = peaks
            .iter()
            .map(|p| (p.peak_id, p.feature_id, p.peak_num))
            .collect();
        assert_eq!(first, second);
    }
}
