use crate::calibration::CalibrationFrame;
use crate::error::{Anchor, Error};
use crate::flight::vacuum_range;
use crate::math::round_to;
use crate::segment::Segmentation;
use crate::trajectory::TrackedTrajectory;

use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    /// Frames between the release point and the point used for the launch
    /// finite difference.
    pub displacement_frames: usize,
    /// Window (frames) over which the landing stabilization is tested.
    pub stabilization_frames: usize,
    /// Movement (px) over the stabilization window that counts as landed.
    pub stabilization_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            displacement_frames: 3,
            stabilization_frames: 3,
            stabilization_threshold: 5.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThrowResult {
    pub tracked_distance: f64,
    pub predicted_distance: f64,
    pub distance_confidence: f64,
    /// Degrees, within `[0, 90]`.
    pub release_angle: f64,
    /// m/s
    pub release_velocity: f64,
    pub flight_time: f64,
}

/// Agreement between two distance estimates in `[0, 1]`, two decimals.
/// Zero when either distance gives nothing to compare.
pub fn distance_confidence(tracked: f64, predicted: f64) -> f64 {
    if tracked <= 0.0 || predicted <= 0.0 {
        return 0.0;
    }

    let mean = 0.5 * (tracked + predicted);

    round_to((1.0 - (tracked - predicted).abs() / mean).clamp(0.0, 1.0), 2)
}

/// Folds a launch direction into the upward quadrant, `[0°, 90°]`.
#[inline]
fn fold_angle(dx: f64, dy: f64) -> f64 {
    let angle = dy.atan2(dx).to_degrees().abs();

    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

/// Cross-checks the observed landing against a drag-free prediction from a
/// short finite difference at release.
#[derive(Debug, Clone, Default)]
pub struct DistanceFusion {
    config: FusionConfig,
}

impl DistanceFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Seconds from release until the implement stops moving, or until the
    /// end of the trajectory.
    pub fn flight_time(&self, trajectory: &TrackedTrajectory, release_index: usize) -> f64 {
        let points = trajectory.points();
        let w = self.config.stabilization_frames.max(1);

        let (release, last) = match (points.get(release_index), points.last()) {
            (Some(r), Some(l)) => (r, l),
            _ => return 0.0,
        };

        (release_index..points.len().saturating_sub(w))
            .find(|&j| points[j].distance(&points[j + w]) < self.config.stabilization_threshold)
            .map(|j| points[j].t - release.t)
            .unwrap_or(last.t - release.t)
    }

    pub fn fuse(
        &self,
        trajectory: &TrackedTrajectory,
        segmentation: &Segmentation,
        calibration: &CalibrationFrame,
    ) -> Result<ThrowResult, Error> {
        let Segmentation {
            release_index,
            landing_index,
        } = *segmentation;

        let release = trajectory
            .get(release_index)
            .ok_or(Error::MissingAnchor(Anchor::Release))?;

        let landing = trajectory
            .get(landing_index)
            .filter(|_| landing_index > release_index)
            .ok_or(Error::MissingAnchor(Anchor::Landing))?;

        let later_index = (release_index + self.config.displacement_frames.max(1))
            .min(trajectory.len() - 1);

        if later_index == release_index {
            return Err(Error::InsufficientData {
                stage: "release velocity",
                needed: release_index + 2,
                got: trajectory.len(),
            });
        }

        let later = &trajectory[later_index];
        let dt = later.t - release.t;

        let from = calibration.to_meters(&release.point());
        let to = calibration.to_meters(&later.point());
        let (dx, dy) = (to.x - from.x, to.y - from.y);

        let release_velocity = dx.hypot(dy) / dt;
        let release_angle = fold_angle(dx, dy);

        let tracked_distance = calibration.distance_from_origin(&landing.point());
        let predicted_distance = vacuum_range(release_velocity, release_angle);
        let distance_confidence = distance_confidence(tracked_distance, predicted_distance);
        let flight_time = self.flight_time(trajectory, release_index);

        tracing::debug!(
            tracked_distance,
            predicted_distance,
            distance_confidence,
            "distances fused"
        );

        Ok(ThrowResult {
            tracked_distance,
            predicted_distance,
            distance_confidence,
            release_angle,
            release_velocity,
            flight_time,
        })
    }
}
