//! Gain pyramid construction.

use crate::format::SoundHandle;

/// Number of zoom levels held by a pyramid.
pub const NUM_LEVELS: usize = 5;

/// Normalized waveform heights at five zoom levels.
///
/// Level 1 holds one height per indexed frame, level 0 doubles it with
/// interpolated midpoints, and levels 2 through 4 each halve the level
/// above by averaging adjacent pairs. Every height lies in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct WaveformPyramid {
    levels: [Vec<f64>; NUM_LEVELS],
    factors: [f64; NUM_LEVELS],
}

impl WaveformPyramid {
    /// Build the pyramid from a handle's frame gains.
    pub fn build(handle: &SoundHandle) -> Self {
        Self::from_gains(handle.frame_gains())
    }

    /// Build the pyramid from a raw gain sequence.
    pub fn from_gains(gains: &[i32]) -> Self {
        let heights = normalized_heights(gains);
        let num_frames = heights.len();

        // Level 0 doubles the frame count with interpolated midpoints.
        let mut level0 = vec![0.0; num_frames * 2];
        if num_frames > 0 {
            level0[0] = 0.5 * heights[0];
            level0[1] = heights[0];
        }
        for i in 1..num_frames {
            level0[2 * i] = 0.5 * (heights[i - 1] + heights[i]);
            level0[2 * i + 1] = heights[i];
        }

        let level1 = heights;
        let level2 = halve(&level1);
        let level3 = halve(&level2);
        let level4 = halve(&level3);

        WaveformPyramid {
            levels: [level0, level1, level2, level3, level4],
            factors: [2.0, 1.0, 0.5, 0.25, 0.125],
        }
    }

    /// Heights at the given zoom level.
    ///
    /// # Panics
    ///
    /// Panics if `level` is `NUM_LEVELS` or more.
    pub fn level(&self, level: usize) -> &[f64] {
        &self.levels[level]
    }

    /// Samples per frame gain at the given level, relative to level 1.
    ///
    /// # Panics
    ///
    /// Panics if `level` is `NUM_LEVELS` or more.
    pub fn zoom_factor(&self, level: usize) -> f64 {
        self.factors[level]
    }

    /// Default zoom level for a clip of this length. Longer clips start
    /// more zoomed out so the whole clip fits on screen.
    pub fn initial_level(&self) -> usize {
        let num_frames = self.levels[1].len();
        if num_frames > 5000 {
            3
        } else if num_frames > 1000 {
            2
        } else if num_frames > 300 {
            1
        } else {
            0
        }
    }
}

/// Smooth the gains, rescale into 0..=255, then map through a
/// histogram-derived window so outliers do not flatten the display.
/// The window floor sits at the 5th percentile and the ceiling drops
/// from the top until 1% of frames lie above it.
fn normalized_heights(gains: &[i32]) -> Vec<f64> {
    let num_frames = gains.len();
    let smoothed = smooth(gains);

    let mut max_gain = 1.0f64;
    for &g in &smoothed {
        if g > max_gain {
            max_gain = g;
        }
    }
    let scale = if max_gain > 255.0 { 255.0 / max_gain } else { 1.0 };

    let mut hist = [0u32; 256];
    let mut max_bin = 0usize;
    for &g in &smoothed {
        let bin = ((g * scale) as i64).clamp(0, 255) as usize;
        if bin > max_bin {
            max_bin = bin;
        }
        hist[bin] += 1;
    }

    let mut min_gain = 0usize;
    let mut sum = 0u32;
    while min_gain < 255 && sum < num_frames as u32 / 20 {
        sum += hist[min_gain];
        min_gain += 1;
    }

    let mut max_gain = max_bin;
    sum = 0;
    while max_gain > 2 && sum < num_frames as u32 / 100 {
        sum += hist[max_gain];
        max_gain -= 1;
    }

    // A window collapsed to a point means the clip is flat; keep the
    // divisor at one so every height lands at zero instead of NaN.
    let range = (max_gain as f64 - min_gain as f64).max(1.0);
    smoothed
        .iter()
        .map(|&g| {
            let value = ((g * scale - min_gain as f64) / range).clamp(0.0, 1.0);
            value * value
        })
        .collect()
}

/// Three-tap smoothing pass. The end frames blend with their single
/// neighbor; sequences of one or two frames pass through unchanged.
fn smooth(gains: &[i32]) -> Vec<f64> {
    let n = gains.len();
    let mut out = vec![0.0; n];
    match n {
        0 => {}
        1 => out[0] = gains[0] as f64,
        2 => {
            out[0] = gains[0] as f64;
            out[1] = gains[1] as f64;
        }
        _ => {
            out[0] = gains[0] as f64 / 2.0 + gains[1] as f64 / 2.0;
            for i in 1..n - 1 {
                out[i] = gains[i - 1] as f64 / 3.0
                    + gains[i] as f64 / 3.0
                    + gains[i + 1] as f64 / 3.0;
            }
            out[n - 1] = gains[n - 2] as f64 / 2.0 + gains[n - 1] as f64 / 2.0;
        }
    }
    out
}

/// Average adjacent pairs into half as many values.
fn halve(level: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; level.len() / 2];
    for (i, value) in out.iter_mut().enumerate() {
        *value = 0.5 * (level[2 * i] + level[2 * i + 1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_lengths() {
        let gains: Vec<i32> = (0..40).map(|i| (i % 7) * 30).collect();
        let pyramid = WaveformPyramid::from_gains(&gains);
        assert_eq!(pyramid.level(0).len(), 80);
        assert_eq!(pyramid.level(1).len(), 40);
        assert_eq!(pyramid.level(2).len(), 20);
        assert_eq!(pyramid.level(3).len(), 10);
        assert_eq!(pyramid.level(4).len(), 5);
    }

    #[test]
    fn test_heights_normalized() {
        let gains: Vec<i32> = (0..200).map(|i| (i * 13) % 250).collect();
        let pyramid = WaveformPyramid::from_gains(&gains);
        for level in 0..NUM_LEVELS {
            for &h in pyramid.level(level) {
                assert!((0.0..=1.0).contains(&h), "height {h} out of range");
            }
        }
    }

    #[test]
    fn test_silent_clip_is_flat() {
        let pyramid = WaveformPyramid::from_gains(&[0; 64]);
        for level in 0..NUM_LEVELS {
            assert!(pyramid.level(level).iter().all(|&h| h == 0.0));
        }
    }

    #[test]
    fn test_level0_interpolates() {
        // Constant loud gains normalize to a plateau of ones, so the
        // doubled level starts with the half-height lead-in sample.
        let mut gains = vec![200; 32];
        gains[0] = 0;
        let pyramid = WaveformPyramid::from_gains(&gains);
        let level0 = pyramid.level(0);
        let level1 = pyramid.level(1);
        assert_eq!(level0[0], 0.5 * level1[0]);
        assert_eq!(level0[1], level1[0]);
        assert_eq!(level0[6], 0.5 * (level1[2] + level1[3]));
        assert_eq!(level0[7], level1[3]);
    }

    #[test]
    fn test_zoom_factors_halve() {
        let pyramid = WaveformPyramid::from_gains(&[10; 16]);
        assert_eq!(pyramid.zoom_factor(0), 2.0);
        assert_eq!(pyramid.zoom_factor(1), 1.0);
        assert_eq!(pyramid.zoom_factor(4), 0.125);
    }

    #[test]
    fn test_initial_level_thresholds() {
        assert_eq!(WaveformPyramid::from_gains(&[1; 100]).initial_level(), 0);
        assert_eq!(WaveformPyramid::from_gains(&[1; 500]).initial_level(), 1);
        assert_eq!(WaveformPyramid::from_gains(&[1; 2000]).initial_level(), 2);
        assert_eq!(WaveformPyramid::from_gains(&[1; 6000]).initial_level(), 3);
    }

    #[test]
    #[should_panic]
    fn test_level_out_of_range_panics() {
        WaveformPyramid::from_gains(&[1; 8]).level(NUM_LEVELS);
    }

    #[test]
    fn test_empty_gains() {
        let pyramid = WaveformPyramid::from_gains(&[]);
        for level in 0..NUM_LEVELS {
            assert!(pyramid.level(level).is_empty());
        }
        assert_eq!(pyramid.initial_level(), 0);
    }
}
