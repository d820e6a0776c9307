use crate::error::Error;
use crate::flight::SimulationConfig;
use crate::fusion::FusionConfig;
use crate::segment::SegmenterConfig;
use crate::turns::TurnConfig;
use crate::velocity::VelocityConfig;

use serde_derive::{Deserialize, Serialize};

/// Tunables for one analysis run. Every section falls back to its defaults
/// when missing from the JSON.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EstimatorConfig {
    pub velocity: VelocityConfig,
    pub segmenter: SegmenterConfig,
    pub turns: TurnConfig,
    pub simulation: SimulationConfig,
    pub fusion: FusionConfig,
    /// Fixed release height in meters; measured from the release point above
    /// the circle center when unset.
    pub release_height: Option<f64>,
}

impl EstimatorConfig {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(src)?)
    }
}
