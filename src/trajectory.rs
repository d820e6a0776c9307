use crate::error::Error;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Position with a capture timestamp. Pixels or meters depending on where it
/// came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimedPoint {
    pub x: f64,
    pub y: f64,
    pub t: f64, // in seconds
}

impl TimedPoint {
    #[inline]
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    #[inline(always)]
    pub fn point(&self) -> na::Point2<f64> {
        na::Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn distance(&self, other: &TimedPoint) -> f64 {
        na::distance(&self.point(), &other.point())
    }
}

/// Time axis of the tracker output: sample `i` was taken at
/// `i × frame_step / fps`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub fps: f64,
    pub frame_step: u32,
}

impl Sampling {
    pub fn new(fps: f64, frame_step: u32) -> Result<Self, Error> {
        if !(fps.is_finite() && fps > 0.0) || frame_step == 0 {
            return Err(Error::InvalidSampling);
        }

        Ok(Self { fps, frame_step })
    }

    /// Seconds between two consecutive samples.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.frame_step as f64 / self.fps
    }

    #[inline]
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.dt()
    }
}

/// Time-ordered tracker output for one throw. Timestamps strictly increase;
/// gaps in tracking show up as larger steps in `t`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackedTrajectory {
    points: Vec<TimedPoint>,
    sampling: Sampling,
}

impl TrackedTrajectory {
    pub fn new(points: Vec<TimedPoint>, sampling: Sampling) -> Result<Self, Error> {
        for (index, p) in points.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite() && p.t.is_finite()) {
                return Err(Error::NonFinitePoint { index });
            }
        }

        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].t <= w[0].t)
            .map(|i| i + 1)
        {
            return Err(Error::NonMonotonicTime { index });
        }

        Ok(Self { points, sampling })
    }

    /// Builds a trajectory from raw per-sample tracker positions, `None`
    /// marking samples where tracking was lost.
    pub fn from_samples(
        samples: &[Option<na::Point2<f64>>],
        sampling: Sampling,
    ) -> Result<Self, Error> {
        let points = samples
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| p.map(|p| TimedPoint::new(p.x, p.y, sampling.time_at(idx))))
            .collect();

        Self::new(points, sampling)
    }

    #[inline]
    pub fn points(&self) -> &[TimedPoint] {
        &self.points
    }

    #[inline]
    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&TimedPoint> {
        self.points.get(idx)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TimedPoint> {
        self.points.iter()
    }
}

impl std::ops::Index<usize> for TrackedTrajectory {
    type Output = TimedPoint;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}
