use crate::error::Error;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Inner diameter of a hammer throwing circle, in meters.
pub const HAMMER_CIRCLE_DIAMETER_M: f64 = 2.135;

/// Apparent ring flattening below which the camera is treated as angled.
const SIDE_VIEW_MIN_ASPECT: f64 = 0.8;

/// Throwing circle as reported by the ring detector, in video pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CircleDetection {
    pub center: na::Point2<f64>,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl CircleDetection {
    /// Minor over major axis, `1.0` for a ring seen head-on.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        let (minor, major) = if self.radius_x < self.radius_y {
            (self.radius_x, self.radius_y)
        } else {
            (self.radius_y, self.radius_x)
        };

        if major <= 0.0 {
            0.0
        } else {
            minor / major
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraView {
    Side,
    Angled,
}

impl CameraView {
    pub fn classify(circle: &CircleDetection) -> Self {
        if circle.aspect_ratio() < SIDE_VIEW_MIN_ASPECT {
            CameraView::Angled
        } else {
            CameraView::Side
        }
    }
}

/// Pixel origin (circle center) and scale shared by every measurement of one
/// video.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CalibrationFrame {
    origin: na::Point2<f64>,
    pixels_per_meter: f64,
}

impl CalibrationFrame {
    pub fn new(origin: na::Point2<f64>, pixels_per_meter: f64) -> Result<Self, Error> {
        if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
            return Err(Error::InvalidCalibration(pixels_per_meter));
        }

        Ok(Self {
            origin,
            pixels_per_meter,
        })
    }

    /// Scale from the ring's major axis, which stays undistorted when the
    /// camera looks at the circle from an angle.
    pub fn from_circle(circle: &CircleDetection, circle_diameter_m: f64) -> Result<Self, Error> {
        let major = circle.radius_x.max(circle.radius_y);

        Self::new(circle.center, 2.0 * major / circle_diameter_m)
    }

    #[inline]
    pub fn origin(&self) -> na::Point2<f64> {
        self.origin
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f64 {
        self.pixels_per_meter
    }

    #[inline]
    pub fn pixels_to_meters(&self, px: f64) -> f64 {
        px / self.pixels_per_meter
    }

    /// Meters from the circle center to `p`.
    #[inline]
    pub fn distance_from_origin(&self, p: &na::Point2<f64>) -> f64 {
        self.pixels_to_meters(na::distance(&self.origin, p))
    }

    /// Converts a pixel position to meters relative to the origin with the
    /// vertical axis pointing up.
    #[inline]
    pub fn to_meters(&self, p: &na::Point2<f64>) -> na::Point2<f64> {
        na::Point2::new(
            (p.x - self.origin.x) / self.pixels_per_meter,
            (self.origin.y - p.y) / self.pixels_per_meter,
        )
    }
}
