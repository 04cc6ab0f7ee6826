use serde::{
    Deserialize,
    Serialize,
};

/// Assigns continuous m/z values to integer mass channels (`mz_group`).
///
/// Signals whose m/z differ by less than one channel width collapse to
/// the same channel, so "the same" analyte compares across scans by
/// integer equality instead of floating-point proximity. Channel ids are
/// total-ordered by increasing m/z.
///
/// Channel `c` covers the half-open interval `(c*w, (c+1)*w]`: a value
/// exactly on a channel boundary is assigned to the **lower** channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MzDiscretizer {
    channel_width: f64,
}

impl MzDiscretizer {
    /// Width must be positive; validated upstream by the request.
    pub fn new(channel_width: f64) -> Self {
        debug_assert!(channel_width > 0.0);
        Self { channel_width }
    }

    pub fn channel_width(&self) -> f64 {
        self.channel_width
    }

    /// Pure function over the input m/z; no side effects.
    pub fn channel(&self, mz: f64) -> i64 {
        // ceil-minus-one instead of floor so exact multiples of the
        // width land in the lower channel.
        (mz / self.channel_width).ceil() as i64 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearby_values_collapse() {
        let disc = MzDiscretizer::new(0.01);
        assert_eq!(disc.channel(500.0021), disc.channel(500.0089));
        assert_ne!(disc.channel(500.0021), disc.channel(500.0121));
    }

    #[test]
    fn test_boundary_goes_to_lower_channel() {
        let disc = MzDiscretizer::new(0.5);
        // 100.0 is exactly on the boundary between channels 199 and 200.
        assert_eq!(disc.channel(100.0), 199);
        assert_eq!(disc.channel(100.0001), 200);
        assert_eq!(disc.channel(99.9999), 199);
    }

    #[test]
    fn test_channels_ordered_with_mz() {
        let disc = MzDiscretizer::new(0.02);
        let mzs = [100.0, 250.33, 250.34, 251.0, 799.99, 1200.5];
        let channels: Vec<_> = mzs.iter().map(|&mz| disc.channel(mz)).collect();
        let mut sorted = channels.clone();
        sorted.sort_unstable();
        assert_eq!(channels, sorted);
    }
}
