use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

/// Trajectory point that segmentation could not locate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Release,
    Landing,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Insufficient data for {stage}: needed {needed} points, got {got}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Degenerate fit: all points share one timestamp")]
    DegenerateFit,

    #[error("Missing anchor: {0:?} point not detected")]
    MissingAnchor(Anchor),

    #[error("Invalid calibration: pixels per meter must be positive, got {0}")]
    InvalidCalibration(f64),

    #[error("Invalid sampling: fps must be positive and frame step at least 1")]
    InvalidSampling,

    #[error("Invalid implement: mass and diameter must be positive")]
    InvalidImplement,

    #[error("Timestamps must strictly increase (at point {index})")]
    NonMonotonicTime { index: usize },

    #[error("Point {index} has non-finite coordinates")]
    NonFinitePoint { index: usize },

    #[error("Config Error: {0}")]
    Config(#[from] serde_json::Error),
}
