use crate::calibration::CalibrationFrame;
use crate::math::{mean, peak_abs, unwrap_angles};
use crate::trajectory::TrackedTrajectory;

use serde_derive::{Deserialize, Serialize};
use std::f64::consts::PI;

const FULL_TURN: f64 = 2.0 * PI;
const TURN_EPSILON: f64 = 1e-9;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TurnConfig {
    pub min_points: usize,
    pub min_release_index: usize,
    /// Radius floor (m) so points next to the center don't blow up v²/r.
    pub min_radius: f64,
    /// Smallest trailing partial rotation still reported, in degrees.
    pub min_partial_turn: f64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            min_points: 12,
            min_release_index: 8,
            min_radius: 0.1,
            min_partial_turn: 90.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TurnMetrics {
    pub turn_number: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub duration_sec: f64,

    // m/s
    pub avg_tangential_velocity: f64,
    pub peak_tangential_velocity: f64,

    // m/s²
    pub avg_tangential_acceleration: f64,
    pub peak_tangential_acceleration: f64,
    pub avg_centripetal_acceleration: f64,
    pub peak_centripetal_acceleration: f64,
}

/// Angular kinematics of the swing, sampled between consecutive points.
struct SwingSeries {
    tangential_velocity: Vec<f64>,
    tangential_acceleration: Vec<f64>,
    centripetal_acceleration: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TurnAnalyzer {
    config: TurnConfig,
}

impl TurnAnalyzer {
    pub fn new(config: TurnConfig) -> Self {
        Self { config }
    }

    /// Splits the swing before `release_index` into full rotations around the
    /// circle center. Empty when there is too little swing to analyze.
    pub fn analyze(
        &self,
        trajectory: &TrackedTrajectory,
        release_index: usize,
        calibration: &CalibrationFrame,
    ) -> Vec<TurnMetrics> {
        if trajectory.is_empty() || release_index < self.config.min_release_index {
            return Vec::new();
        }

        let end = release_index.min(trajectory.len() - 1);
        let points = &trajectory.points()[..=end];

        if points.len() < self.config.min_points.max(3) {
            return Vec::new();
        }

        let origin = calibration.origin();
        let raw: Vec<f64> = points
            .iter()
            .map(|p| (p.y - origin.y).atan2(p.x - origin.x))
            .collect();
        let angles = unwrap_angles(&raw);

        let net = angles[angles.len() - 1] - angles[0];
        let direction = if net < 0.0 { -1.0 } else { 1.0 };

        let radii: Vec<f64> = points
            .iter()
            .map(|p| calibration.distance_from_origin(&p.point()).max(self.config.min_radius))
            .collect();

        let m = points.len();
        let mut series = SwingSeries {
            tangential_velocity: Vec::with_capacity(m - 1),
            tangential_acceleration: Vec::with_capacity(m - 2),
            centripetal_acceleration: Vec::with_capacity(m - 1),
        };

        for k in 0..m - 1 {
            let dt = points[k + 1].t - points[k].t;
            let omega = (angles[k + 1] - angles[k]) * direction / dt;
            let r = 0.5 * (radii[k] + radii[k + 1]);
            let v = omega.abs() * r;

            series.tangential_velocity.push(v);
            series.centripetal_acceleration.push(v * v / r);
        }

        for k in 0..m - 2 {
            // velocities live at step midpoints
            let dt = 0.5 * (points[k + 2].t - points[k].t);
            let dv = series.tangential_velocity[k + 1] - series.tangential_velocity[k];

            series.tangential_acceleration.push(dv / dt);
        }

        let mut bounds = Vec::new();
        let mut start = 0;

        for k in 1..m {
            if (angles[k] - angles[start]) * direction >= FULL_TURN - TURN_EPSILON {
                bounds.push((start, k));
                start = k;
            }
        }

        let partial = (angles[m - 1] - angles[start]) * direction;
        if start < m - 1 && partial >= self.config.min_partial_turn.to_radians() {
            bounds.push((start, m - 1));
        }

        let turns: Vec<_> = bounds
            .into_iter()
            .enumerate()
            .map(|(idx, (s, e))| Self::metrics(idx + 1, s, e, points[e].t - points[s].t, &series))
            .collect();

        tracing::debug!(
            turns = turns.len(),
            rotation_deg = net.abs().to_degrees(),
            "swing analyzed"
        );

        turns
    }

    fn metrics(
        turn_number: usize,
        start: usize,
        end: usize,
        duration_sec: f64,
        series: &SwingSeries,
    ) -> TurnMetrics {
        let vel = &series.tangential_velocity[start..end];
        let cent = &series.centripetal_acceleration[start..end];

        let acc_end = end.min(series.tangential_acceleration.len());
        let acc = if start < acc_end {
            &series.tangential_acceleration[start..acc_end]
        } else {
            &[][..]
        };

        TurnMetrics {
            turn_number,
            start_index: start,
            end_index: end,
            duration_sec,
            avg_tangential_velocity: mean(vel).unwrap_or(0.0),
            peak_tangential_velocity: peak_abs(vel),
            avg_tangential_acceleration: mean(acc).unwrap_or(0.0),
            peak_tangential_acceleration: peak_abs(acc),
            avg_centripetal_acceleration: mean(cent).unwrap_or(0.0),
            peak_centripetal_acceleration: peak_abs(cent),
        }
    }
}
