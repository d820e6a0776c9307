use crate::error::Error;
use crate::math::{linear_ls, r_squared};
use crate::trajectory::TimedPoint;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Mean residual (m) at which the residual confidence reaches zero.
const ZERO_CONFIDENCE_RESIDUAL: f64 = 0.3;

/// How a fit's quality is turned into a confidence in `[0, 1]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceModel {
    /// `1 − meanResidual / 0.3 m`: how far the points sit from the line.
    Residual,
    /// Smaller of the per-axis R²: how much motion the line explains.
    RSquared,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct VelocityConfig {
    /// Points farther than this from the first fit (m) are dropped.
    pub max_residual: f64,
    pub confidence: ConfidenceModel,
    /// Number of points after release handed to the estimator.
    pub window: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            max_residual: 0.15,
            confidence: ConfidenceModel::Residual,
            window: 6,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VelocityEstimate {
    pub vx: f64,
    pub vy: f64,
    pub confidence: f64,
    pub used: usize,
    pub rejected: usize,
}

impl VelocityEstimate {
    #[inline]
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Launch angle above the horizontal, in degrees.
    #[inline]
    pub fn angle_deg(&self) -> f64 {
        self.vy.atan2(self.vx).to_degrees()
    }
}

#[derive(Debug, Clone, Copy)]
struct LinearFit {
    vx: f64,
    vy: f64,
    x0: f64,
    y0: f64,
    r2: f64,
}

impl LinearFit {
    #[inline]
    fn residual(&self, p: &TimedPoint) -> f64 {
        let dx = p.x - (self.x0 + self.vx * p.t);
        let dy = p.y - (self.y0 + self.vy * p.t);

        dx.hypot(dy)
    }

    fn mean_residual(&self, points: &[TimedPoint]) -> f64 {
        points.iter().map(|p| self.residual(p)).sum::<f64>() / points.len() as f64
    }
}

/// Constant-velocity least-squares fit with a single outlier rejection pass.
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    config: VelocityConfig,
}

impl VelocityEstimator {
    pub fn new(config: VelocityConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &VelocityConfig {
        &self.config
    }

    fn fit(points: &[TimedPoint]) -> Result<LinearFit, Error> {
        if points.len() < 2 {
            return Err(Error::InsufficientData {
                stage: "velocity fit",
                needed: 2,
                got: points.len(),
            });
        }

        let t: na::DVector<f64> = points.iter().map(|p| p.t).collect::<Vec<_>>().into();
        let x: na::DVector<f64> = points.iter().map(|p| p.x).collect::<Vec<_>>().into();
        let y: na::DVector<f64> = points.iter().map(|p| p.y).collect::<Vec<_>>().into();

        let px = linear_ls(&t, &x).ok_or(Error::DegenerateFit)?;
        let py = linear_ls(&t, &y).ok_or(Error::DegenerateFit)?;

        Ok(LinearFit {
            vx: px[0],
            vy: py[0],
            x0: px[1],
            y0: py[1],
            r2: r_squared(&t, &x, &px).min(r_squared(&t, &y, &py)),
        })
    }

    fn inliers_of(&self, fit: &LinearFit, points: &[TimedPoint]) -> Vec<TimedPoint> {
        points
            .iter()
            .filter(|p| fit.residual(p) <= self.config.max_residual)
            .copied()
            .collect()
    }

    /// Points surviving one rejection pass against the fit of `points`.
    pub fn inliers(&self, points: &[TimedPoint]) -> Result<Vec<TimedPoint>, Error> {
        let fit = Self::fit(points)?;

        Ok(self.inliers_of(&fit, points))
    }

    pub fn estimate(&self, points: &[TimedPoint]) -> Result<VelocityEstimate, Error> {
        let first = Self::fit(points)?;

        if points.len() < 3 {
            return Ok(VelocityEstimate {
                vx: first.vx,
                vy: first.vy,
                confidence: 0.0,
                used: points.len(),
                rejected: 0,
            });
        }

        let kept = self.inliers_of(&first, points);

        let (fit, kept) = if kept.len() == points.len() {
            (first, kept)
        } else if kept.len() < 2 {
            tracing::warn!(
                "outlier rejection left {} of {} points; keeping unfiltered fit",
                kept.len(),
                points.len()
            );

            (first, points.to_vec())
        } else {
            match Self::fit(&kept) {
                Ok(refit) => (refit, kept),
                Err(err) => {
                    tracing::warn!("refit failed ({}); keeping unfiltered fit", err);
                    (first, points.to_vec())
                }
            }
        };

        let confidence = match self.config.confidence {
            ConfidenceModel::Residual => {
                (1.0 - fit.mean_residual(&kept) / ZERO_CONFIDENCE_RESIDUAL).clamp(0.0, 1.0)
            }
            ConfidenceModel::RSquared => fit.r2.clamp(0.0, 1.0),
        };

        tracing::debug!(
            vx = fit.vx,
            vy = fit.vy,
            confidence,
            rejected = points.len() - kept.len(),
            "velocity estimate"
        );

        Ok(VelocityEstimate {
            vx: fit.vx,
            vy: fit.vy,
            confidence,
            used: kept.len(),
            rejected: points.len() - kept.len(),
        })
    }
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new(VelocityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, vx: f64, vy: f64, dt: f64) -> Vec<TimedPoint> {
        (0..n)
            .map(|i| {
                let t = 1.0 + i as f64 * dt;
                // small deterministic jitter, well under the rejection threshold
                let j = if i % 2 == 0 { 0.01 } else { -0.01 };

                TimedPoint::new(2.0 + vx * (t - 1.0) + j, 1.5 + vy * (t - 1.0) - j, t)
            })
            .collect()
    }

    #[test]
    fn recovers_constant_velocity() {
        let points = line(8, 22.0, 19.0, 1.0 / 30.0);
        let est = VelocityEstimator::default().estimate(&points).unwrap();

        assert!((est.vx - 22.0).abs() < 0.5);
        assert!((est.vy - 19.0).abs() < 0.5);
        assert_eq!(est.rejected, 0);
        assert!(est.confidence > 0.9);
    }

    #[test]
    fn rejects_single_outlier() {
        let mut points = line(8, 22.0, 19.0, 1.0 / 30.0);
        points[4].y += 0.6;

        let est = VelocityEstimator::default().estimate(&points).unwrap();

        assert_eq!(est.rejected, 1);
        assert_eq!(est.used, 7);
        assert!((est.vy - 19.0).abs() < 0.5);
    }

    #[test]
    fn filtering_is_a_fixed_point() {
        let estimator = VelocityEstimator::default();
        let mut points = line(10, 15.0, 12.0, 1.0 / 60.0);
        points[6].x -= 0.6;

        let filtered = estimator.inliers(&points).unwrap();
        assert_eq!(filtered.len(), 9);

        let once = estimator.estimate(&points).unwrap();
        let twice = estimator.estimate(&filtered).unwrap();
        let again = estimator.estimate(&filtered).unwrap();

        assert_eq!(estimator.inliers(&filtered).unwrap(), filtered);
        assert_eq!((once.vx, once.vy, once.confidence), (twice.vx, twice.vy, twice.confidence));
        assert_eq!(twice, again);
        assert_eq!(twice.rejected, 0);
    }

    #[test]
    fn r_squared_model_is_bounded() {
        let estimator = VelocityEstimator::new(VelocityConfig {
            confidence: ConfidenceModel::RSquared,
            ..Default::default()
        });

        let est = estimator.estimate(&line(8, 22.0, 19.0, 1.0 / 30.0)).unwrap();

        assert!(est.confidence > 0.95 && est.confidence <= 1.0);
    }

    #[test]
    fn edge_cases() {
        let estimator = VelocityEstimator::default();

        assert!(matches!(
            estimator.estimate(&[TimedPoint::new(0.0, 0.0, 0.0)]),
            Err(Error::InsufficientData { got: 1, .. })
        ));

        let same_time = [
            TimedPoint::new(0.0, 0.0, 0.5),
            TimedPoint::new(1.0, 1.0, 0.5),
            TimedPoint::new(2.0, 0.0, 0.5),
        ];
        assert!(matches!(estimator.estimate(&same_time), Err(Error::DegenerateFit)));

        let two = [TimedPoint::new(0.0, 0.0, 0.0), TimedPoint::new(1.0, 2.0, 0.1)];
        let est = estimator.estimate(&two).unwrap();
        assert!((est.vx - 10.0).abs() < 1e-9);
        assert!((est.vy - 20.0).abs() < 1e-9);
        assert_eq!(est.confidence, 0.0);
    }

    #[test]
    fn rejecting_too_much_keeps_the_first_fit() {
        let estimator = VelocityEstimator::default();

        // every point sits more than 0.15 m off the first fit
        let zigzag = [
            TimedPoint::new(0.0, 0.0, 0.0),
            TimedPoint::new(1.0, 0.0, 0.1),
            TimedPoint::new(0.0, 0.0, 0.2),
        ];
        let first = VelocityEstimator::fit(&zigzag).unwrap();
        assert!(estimator.inliers(&zigzag).unwrap().len() <= 1);

        let est = estimator.estimate(&zigzag).unwrap();
        assert_eq!((est.used, est.rejected), (3, 0));
        assert_eq!((est.vx, est.vy), (first.vx, first.vy));

        // the two survivors share a timestamp, so the refit is degenerate
        let split = [
            TimedPoint::new(0.0, 0.0, 0.0),
            TimedPoint::new(0.0, 0.0, 0.0),
            TimedPoint::new(10.0, 0.0, 1.0),
            TimedPoint::new(-10.0, 0.0, 1.0),
        ];
        let first = VelocityEstimator::fit(&split).unwrap();
        assert_eq!(estimator.inliers(&split).unwrap().len(), 2);

        let est = estimator.estimate(&split).unwrap();
        assert_eq!((est.used, est.rejected), (4, 0));
        assert_eq!((est.vx, est.vy), (first.vx, first.vy));
    }
}
