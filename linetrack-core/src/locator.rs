//! Dark line detection on a conditioned scan line.
//!
//! The line is split into a bright and a dark cluster around its mean, and a
//! threshold is mixed between the two cluster means with a ratio that depends
//! on how bright the scene is. Runs below the threshold are only considered
//! when they start on a falling edge and end on a rising edge, and the best
//! one is picked by a score that prefers dark, sharp-edged, flat, centered
//! runs.

use crate::config::LocatorConfig;
use crate::scan::{ConditionedScanLine, SCAN_CENTER, SCAN_LEN};

/// Where the line is, and the statistics it was found with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineLocation {
    /// Chosen center pixel. Kept from the last detection while `width == 0`.
    pub median: u8,
    /// First dark pixel after the confirmed falling edge.
    pub left_edge: u8,
    /// One past the last dark pixel.
    pub right_edge: u8,
    /// Zero when no line was found this frame.
    pub width: u8,
    /// Threshold computed for the latest frame, refreshed even when lost.
    pub threshold: u16,
    /// Bright cluster mean of the last frame with a line.
    pub max_value: u16,
    /// Dark cluster mean of the last frame with a line.
    pub min_value: u16,
}

impl LineLocation {
    /// True when the latest frame had no acceptable run.
    pub fn is_lost(&self) -> bool {
        self.width == 0
    }

    /// The line center, or `None` when this frame found nothing.
    pub fn center(&self) -> Option<u8> {
        (!self.is_lost()).then_some(self.median)
    }
}

impl Default for LineLocation {
    fn default() -> Self {
        Self {
            median: SCAN_CENTER,
            left_edge: 0,
            right_edge: 0,
            width: 0,
            threshold: 128,
            max_value: 0,
            min_value: 0,
        }
    }
}

/// Threshold derived from the two-cluster split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clusters {
    pub low_mean: u16,
    pub high_mean: u16,
    pub threshold: u16,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    start: usize,
    width: usize,
}

/// Stateful wrapper that remembers the last detection across lost frames.
pub struct LineLocator {
    config: LocatorConfig,
    last: LineLocation,
}

impl LineLocator {
    /// Create a locator with no previous detection, centered at pixel 64.
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            config,
            last: LineLocation::default(),
        }
    }

    /// Result of the most recent [`locate`](Self::locate).
    pub fn last(&self) -> LineLocation {
        self.last
    }

    /// Find the best dark run on a conditioned line.
    ///
    /// # Arguments
    /// * `line` - smoothed scan line from the conditioner
    ///
    /// # Returns
    /// The updated location. When nothing qualifies `width` is zero, the
    /// threshold is refreshed and every other field keeps its last value.
    pub fn locate(&mut self, line: &ConditionedScanLine) -> LineLocation {
        let clusters = self.clusters(line);
        let derivative = derivative(line);
        let best = self.best_run(line, &derivative, &clusters);

        let loc = &mut self.last;
        loc.threshold = clusters.threshold;
        match best {
            Some(run) => {
                loc.left_edge = run.start as u8;
                loc.right_edge = (run.start + run.width) as u8;
                loc.width = run.width as u8;
                loc.median = (run.start + run.width / 2) as u8;
                loc.max_value = clusters.high_mean;
                loc.min_value = clusters.low_mean;
            }
            None => loc.width = 0,
        }
        *loc
    }

    /// Split at the global mean and mix a threshold between the cluster means.
    pub fn clusters(&self, line: &ConditionedScanLine) -> Clusters {
        let total: u32 = line.iter().map(|&v| u32::from(v)).sum();
        let global_mean = total / SCAN_LEN as u32;

        let (mut low_sum, mut low_count) = (0u32, 0u32);
        let (mut high_sum, mut high_count) = (0u32, 0u32);
        for &v in line.iter() {
            if u32::from(v) < global_mean {
                low_sum += u32::from(v);
                low_count += 1;
            } else {
                high_sum += u32::from(v);
                high_count += 1;
            }
        }
        let low_mean = (low_sum / low_count.max(1)) as u16;
        let high_mean = (high_sum / high_count.max(1)) as u16;

        let cfg = &self.config;
        let ratio = if high_mean > cfg.bright_level {
            cfg.bright_ratio
        } else if high_mean < cfg.dim_level {
            cfg.dim_ratio
        } else {
            cfg.normal_ratio
        };
        let range = high_mean.saturating_sub(low_mean);
        let threshold = low_mean.saturating_add((f32::from(range) * ratio) as u16);

        Clusters {
            low_mean,
            high_mean,
            threshold,
        }
    }

    fn best_run(
        &self,
        line: &ConditionedScanLine,
        derivative: &[i32; SCAN_LEN - 1],
        clusters: &Clusters,
    ) -> Option<Candidate> {
        let cfg = &self.config;
        let edge = i32::from(cfg.edge_gradient);
        let mut best: Option<Candidate> = None;
        let mut best_score = 0i32;
        // First dark pixel of the current run, and the pixel its falling edge
        // was confirmed at.
        let mut dark_start: Option<usize> = None;
        let mut run_start: Option<usize> = None;

        for (i, &v) in line.iter().enumerate() {
            if v < clusters.threshold {
                dark_start.get_or_insert(i);
                if run_start.is_none() && i > 0 && derivative[i - 1] < -edge {
                    run_start = Some(i);
                }
                continue;
            }

            let Some(first_dark) = dark_start.take() else {
                continue;
            };
            let Some(start) = run_start.take() else {
                continue;
            };
            // The width window applies to the whole dark run.
            let run_width = i - first_dark;
            if run_width <= usize::from(cfg.min_run_width)
                || run_width >= usize::from(cfg.max_run_width)
            {
                continue;
            }
            // The closing derivative spans the last dark pixel and this one.
            if derivative[i - 1] <= edge {
                continue;
            }
            let width = i - start;
            if width <= usize::from(cfg.min_run_width) {
                continue;
            }

            let (mean, variance) = run_stats(&line[start..i]);
            if variance >= cfg.max_run_variance {
                continue;
            }
            let score = score(start, width, mean, variance, derivative, clusters);
            if score > best_score {
                best_score = score;
                best = Some(Candidate { start, width });
            }
        }

        best
    }
}

impl Default for LineLocator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}

/// `d[i] = v[i + 1] - v[i]`.
pub fn derivative(line: &ConditionedScanLine) -> [i32; SCAN_LEN - 1] {
    let mut out = [0i32; SCAN_LEN - 1];
    for (i, pair) in line.windows(2).enumerate() {
        out[i] = i32::from(pair[1]) - i32::from(pair[0]);
    }
    out
}

/// Integer mean and variance of a run.
fn run_stats(run: &[u16]) -> (u32, u32) {
    let n = run.len() as u64;
    let sum: u64 = run.iter().map(|&v| u64::from(v)).sum();
    let sq_sum: u64 = run.iter().map(|&v| u64::from(v) * u64::from(v)).sum();
    let mean = sum / n;
    let variance = (sq_sum / n).saturating_sub(mean * mean);
    (mean as u32, variance.min(u64::from(u32::MAX)) as u32)
}

fn score(
    start: usize,
    width: usize,
    mean: u32,
    variance: u32,
    derivative: &[i32; SCAN_LEN - 1],
    clusters: &Clusters,
) -> i32 {
    let mean_diff = (mean as i32 - i32::from(clusters.low_mean)).abs();
    let edge_strength = derivative[start - 1].abs() + derivative[start + width - 1].abs();
    let center = (start + width / 2) as i32;
    let center_dist = (center - i32::from(SCAN_CENTER)).abs();

    mean_diff * 2 + edge_strength / 2 - (variance / 100) as i32 - center_dist * 2
}
