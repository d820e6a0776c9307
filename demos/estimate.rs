use hammerthrow::{CircleDetection, EstimatorConfig, Implement, Sampling, ThrowEstimator};
use nalgebra as na;
use serde_derive::Deserialize;
use tracing_subscriber::EnvFilter;

/// Tracker dump for one throw: `samples` holds `[x, y]` per frame or `null`
/// where tracking was lost.
#[derive(Deserialize)]
struct ThrowFile {
    fps: f64,
    #[serde(default = "default_frame_step")]
    frame_step: u32,
    circle: CircleDetection,
    #[serde(default)]
    implement: Implement,
    #[serde(default)]
    config: EstimatorConfig,
    samples: Vec<Option<na::Point2<f64>>>,
}

fn default_frame_step() -> u32 {
    1
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: estimate <throw.json>"))?;

    let input: ThrowFile = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    let sampling = Sampling::new(input.fps, input.frame_step)?;

    let report = ThrowEstimator::new(input.config).analyze_with_circle(
        &input.samples,
        sampling,
        &input.circle,
        &input.implement,
    )?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
