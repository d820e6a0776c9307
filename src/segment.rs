use crate::error::Error;
use crate::trajectory::TrackedTrajectory;

use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Steps averaged on each side of a release candidate.
    pub release_window: usize,
    /// Steps after release before the landing scan begins.
    pub landing_offset: usize,
    /// Forward steps averaged when testing for a stop.
    pub landing_window: usize,
    /// Average displacement (px per nominal step) below which the implement
    /// is considered at rest.
    pub stopped_threshold: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            release_window: 5,
            landing_offset: 10,
            landing_window: 3,
            stopped_threshold: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Swing,
    Release,
    Airborne,
    Landed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmentation {
    pub release_index: usize,
    pub landing_index: usize,
}

impl Segmentation {
    pub fn phase(&self, index: usize) -> Phase {
        if index < self.release_index {
            Phase::Swing
        } else if index == self.release_index {
            Phase::Release
        } else if index < self.landing_index {
            Phase::Airborne
        } else {
            Phase::Landed
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub const MIN_POINTS: usize = 10;

    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Points needed for a release candidate to have a full window of steps
    /// on each side, and never fewer than [`MIN_POINTS`](Self::MIN_POINTS).
    pub fn min_points(&self) -> usize {
        Self::MIN_POINTS.max(2 * self.config.release_window.max(1) + 1)
    }

    /// Per-step speeds in px/s, using each step's own Δt so that tracking
    /// gaps don't read as bursts of speed.
    fn speeds(trajectory: &TrackedTrajectory) -> Vec<f64> {
        trajectory
            .points()
            .windows(2)
            .map(|w| w[0].distance(&w[1]) / (w[1].t - w[0].t))
            .collect()
    }

    #[inline]
    fn average(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Index with the largest jump between the average speed of the preceding
    /// and following windows. First maximum wins.
    pub fn find_release(&self, trajectory: &TrackedTrajectory) -> Result<usize, Error> {
        let n = trajectory.len();

        let needed = self.min_points();

        if n < needed {
            return Err(Error::InsufficientData {
                stage: "release detection",
                needed,
                got: n,
            });
        }

        let w = self.config.release_window.max(1);
        let speeds = Self::speeds(trajectory);

        let mut best: Option<(usize, f64)> = None;

        // speeds[i..i + w] must exist, i.e. i + w <= n - 1
        for i in w..n.saturating_sub(w) {
            let before = Self::average(&speeds[i - w..i]);
            let after = Self::average(&speeds[i..i + w]);
            let delta = after - before;

            match best {
                Some((_, d)) if delta <= d => (),
                _ => best = Some((i, delta)),
            }
        }

        best.map(|(i, _)| i)
            .ok_or(Error::MissingAnchor(crate::error::Anchor::Release))
    }

    /// First index from `release + landing_offset` where the implement comes
    /// to rest; the last index when it never does.
    pub fn find_landing(&self, trajectory: &TrackedTrajectory, release_index: usize) -> usize {
        let n = trajectory.len();
        let last = n.saturating_sub(1);
        let w = self.config.landing_window.max(1);
        let dt = trajectory.sampling().dt();

        let steps: Vec<f64> = Self::speeds(trajectory).iter().map(|v| v * dt).collect();

        let start = release_index + self.config.landing_offset;

        (start..n.saturating_sub(w))
            .find(|&j| Self::average(&steps[j..j + w]) < self.config.stopped_threshold)
            .unwrap_or(last)
    }

    pub fn segment(&self, trajectory: &TrackedTrajectory) -> Result<Segmentation, Error> {
        let release_index = self.find_release(trajectory)?;
        let landing_index = self.find_landing(trajectory, release_index);

        tracing::debug!(release_index, landing_index, "trajectory segmented");

        Ok(Segmentation {
            release_index,
            landing_index,
        })
    }
}
