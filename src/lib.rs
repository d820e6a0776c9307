pub mod calibration;
pub mod config;
pub mod error;
pub mod flight;
pub mod fusion;
pub mod math;
pub mod segment;
pub mod trajectory;
pub mod turns;
pub mod velocity;

pub use calibration::{CalibrationFrame, CameraView, CircleDetection};
pub use config::EstimatorConfig;
pub use flight::{Flight, FlightSimulator, Implement};
pub use fusion::ThrowResult;
pub use segment::Segmentation;
pub use trajectory::{Sampling, TimedPoint, TrackedTrajectory};
pub use turns::TurnMetrics;
pub use velocity::VelocityEstimate;

use calibration::HAMMER_CIRCLE_DIAMETER_M;
use error::Error;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// State handed from tracking to the flight simulation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ReleaseState {
    pub release_index: usize,
    // meters from the circle center, y up
    pub position: na::Point2<f64>,
    pub velocity: VelocityEstimate,
    pub release_height: f64,
}

/// Everything one analysis produces. Only `result` is the measurement; the
/// rest is kept for display and diagnostics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThrowReport {
    pub result: ThrowResult,
    pub segmentation: Segmentation,
    pub release: ReleaseState,
    pub turns: Vec<TurnMetrics>,
    pub simulation: Flight,
    /// Set when the calibration came from a detected circle.
    pub camera_view: Option<CameraView>,
}

pub struct ThrowEstimator {
    velocity: velocity::VelocityEstimator,
    segmenter: segment::Segmenter,
    turns: turns::TurnAnalyzer,
    simulator: flight::FlightSimulator,
    fusion: fusion::DistanceFusion,
    release_height: Option<f64>,
}

impl ThrowEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            velocity: velocity::VelocityEstimator::new(config.velocity),
            segmenter: segment::Segmenter::new(config.segmenter),
            turns: turns::TurnAnalyzer::new(config.turns),
            simulator: flight::FlightSimulator::new(config.simulation),
            fusion: fusion::DistanceFusion::new(config.fusion),
            release_height: config.release_height,
        }
    }

    /// Runs the whole estimation over raw tracker samples; `None` samples are
    /// frames where tracking was lost.
    pub fn analyze(
        &self,
        samples: &[Option<na::Point2<f64>>],
        sampling: Sampling,
        calibration: &CalibrationFrame,
        implement: &Implement,
    ) -> Result<ThrowReport, Error> {
        let sampling = Sampling::new(sampling.fps, sampling.frame_step)?;
        let trajectory = TrackedTrajectory::from_samples(samples, sampling)?;

        self.analyze_trajectory(&trajectory, calibration, implement)
    }

    /// Same as [`analyze`](Self::analyze), calibrated from the detected
    /// throwing circle. The report carries the camera view; an angled view is
    /// flagged but not corrected.
    pub fn analyze_with_circle(
        &self,
        samples: &[Option<na::Point2<f64>>],
        sampling: Sampling,
        circle: &CircleDetection,
        implement: &Implement,
    ) -> Result<ThrowReport, Error> {
        let camera_view = CameraView::classify(circle);
        if camera_view == CameraView::Angled {
            tracing::warn!(
                aspect_ratio = circle.aspect_ratio(),
                "circle seen at an angle, distances are not corrected"
            );
        }

        let calibration = CalibrationFrame::from_circle(circle, HAMMER_CIRCLE_DIAMETER_M)?;
        let report = self.analyze(samples, sampling, &calibration, implement)?;

        Ok(ThrowReport {
            camera_view: Some(camera_view),
            ..report
        })
    }

    pub fn analyze_trajectory(
        &self,
        trajectory: &TrackedTrajectory,
        calibration: &CalibrationFrame,
        implement: &Implement,
    ) -> Result<ThrowReport, Error> {
        implement.validate()?;

        let segmentation = self.segmenter.segment(trajectory)?;
        let release = self.release_state(trajectory, &segmentation, calibration)?;
        let turns = self
            .turns
            .analyze(trajectory, segmentation.release_index, calibration);

        // range does not depend on which side of the frame the throw goes to
        let simulation = self.simulator.simulate(
            release.velocity.vx.abs(),
            release.velocity.vy,
            release.release_height,
            implement,
        )?;

        let result = self.fusion.fuse(trajectory, &segmentation, calibration)?;

        tracing::info!(
            tracked = result.tracked_distance,
            predicted = result.predicted_distance,
            simulated = simulation.distance,
            confidence = result.distance_confidence,
            turns = turns.len(),
            "throw analyzed"
        );

        Ok(ThrowReport {
            result,
            segmentation,
            release,
            turns,
            simulation,
            camera_view: None,
        })
    }

    fn release_state(
        &self,
        trajectory: &TrackedTrajectory,
        segmentation: &Segmentation,
        calibration: &CalibrationFrame,
    ) -> Result<ReleaseState, Error> {
        let release_index = segmentation.release_index;
        let end = (release_index + self.velocity.config().window.max(2))
            .min(segmentation.landing_index + 1)
            .min(trajectory.len());

        let window: Vec<TimedPoint> = trajectory.points()[release_index.min(end)..end]
            .iter()
            .map(|p| {
                let m = calibration.to_meters(&p.point());
                TimedPoint::new(m.x, m.y, p.t)
            })
            .collect();

        let position = window
            .first()
            .map(TimedPoint::point)
            .ok_or(Error::MissingAnchor(error::Anchor::Release))?;

        let velocity = self.velocity.estimate(&window)?;
        let release_height = self.release_height.unwrap_or(position.y).max(0.0);

        Ok(ReleaseState {
            release_index,
            position,
            velocity,
            release_height,
        })
    }
}

impl Default for ThrowEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}
