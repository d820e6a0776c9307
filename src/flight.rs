use crate::error::Error;
use crate::trajectory::TimedPoint;

use serde_derive::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const GRAVITY: f64 = 9.81;

/// kg/m³ at sea level, 15 °C.
pub const AIR_DENSITY: f64 = 1.225;

/// Drag coefficient of a hammer in flight: ball plus wire and handle.
pub const HAMMER_DRAG_COEFFICIENT: f64 = 0.62;

/// Hard cap on simulated flight, in seconds.
pub const MAX_FLIGHT_TIME: f64 = 10.0;

pub const TIME_STEP: f64 = 0.001;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Implement {
    pub mass_kg: f64,
    pub diameter_mm: f64,
}

impl Implement {
    pub const MEN: Implement = Implement {
        mass_kg: 7.26,
        diameter_mm: 110.0,
    };

    pub const WOMEN: Implement = Implement {
        mass_kg: 4.0,
        diameter_mm: 95.0,
    };

    pub fn new(mass_kg: f64, diameter_mm: f64) -> Result<Self, Error> {
        let implement = Self {
            mass_kg,
            diameter_mm,
        };

        implement.validate()?;

        Ok(implement)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let ok = |v: f64| v.is_finite() && v > 0.0;

        if ok(self.mass_kg) && ok(self.diameter_mm) {
            Ok(())
        } else {
            Err(Error::InvalidImplement)
        }
    }

    /// Frontal area in m².
    #[inline]
    pub fn cross_section(&self) -> f64 {
        let r = self.diameter_mm / 2000.0;

        PI * r * r
    }

    /// Drag deceleration per unit of squared speed, `ρ·Cd·A / 2m`.
    #[inline]
    pub fn drag_factor(&self, drag_coefficient: f64) -> f64 {
        0.5 * AIR_DENSITY * drag_coefficient * self.cross_section() / self.mass_kg
    }
}

impl Default for Implement {
    fn default() -> Self {
        Implement::MEN
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub time_step: f64,
    pub max_time: f64,
    pub drag_coefficient: f64,
    /// Keep one trajectory sample every this many integration steps.
    pub sample_every: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: TIME_STEP,
            max_time: MAX_FLIGHT_TIME,
            drag_coefficient: HAMMER_DRAG_COEFFICIENT,
            sample_every: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Ground,
    /// Hit the time cap while still airborne; the result is clamped.
    TimeCap,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Flight {
    pub distance: f64,
    pub flight_time: f64,
    pub max_height: f64,
    pub landing_velocity: f64,
    pub trajectory: Vec<TimedPoint>,
    pub termination: Termination,
}

impl Flight {
    #[inline]
    pub fn diverged(&self) -> bool {
        self.termination == Termination::TimeCap
    }
}

/// Launch read off two tracked positions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct TwoPointEstimate {
    pub velocity: f64,
    pub angle: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

/// Semi-implicit Euler integration of a point mass under gravity and
/// quadratic drag.
#[derive(Debug, Clone, Default)]
pub struct FlightSimulator {
    config: SimulationConfig,
}

impl FlightSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn simulate(
        &self,
        vx: f64,
        vy: f64,
        release_height: f64,
        implement: &Implement,
    ) -> Result<Flight, Error> {
        implement.validate()?;

        let k = implement.drag_factor(self.config.drag_coefficient);
        let dt = self.config.time_step;
        let every = self.config.sample_every.max(1);

        let mut s = State {
            x: 0.0,
            y: release_height.max(0.0),
            vx,
            vy,
        };
        let mut t = 0.0;
        let mut step = 0usize;
        let mut max_height = s.y;
        let mut trajectory = vec![TimedPoint::new(s.x, s.y, t)];

        let termination = loop {
            let prev = s;
            let speed = s.vx.hypot(s.vy);

            s.vx -= k * speed * s.vx * dt;
            s.vy -= (GRAVITY + k * speed * s.vy) * dt;
            s.x += s.vx * dt;
            s.y += s.vy * dt;
            t += dt;
            step += 1;

            if s.y <= 0.0 {
                // back up to the exact ground crossing
                let f = if prev.y > s.y { prev.y / (prev.y - s.y) } else { 0.0 };

                s = State {
                    x: prev.x + f * (s.x - prev.x),
                    y: 0.0,
                    vx: prev.vx + f * (s.vx - prev.vx),
                    vy: prev.vy + f * (s.vy - prev.vy),
                };
                t -= (1.0 - f) * dt;

                break Termination::Ground;
            }

            max_height = max_height.max(s.y);

            if t >= self.config.max_time {
                break Termination::TimeCap;
            }

            if step % every == 0 {
                trajectory.push(TimedPoint::new(s.x, s.y, t));
            }
        };

        if let Some(last) = trajectory.last() {
            if last.t >= t {
                trajectory.pop();
            }
        }
        trajectory.push(TimedPoint::new(s.x, s.y, t));

        if termination == Termination::TimeCap {
            tracing::warn!(
                vx,
                vy,
                release_height,
                "flight did not reach the ground within {} s",
                self.config.max_time
            );
        }

        Ok(Flight {
            distance: s.x,
            flight_time: t,
            max_height,
            landing_velocity: s.vx.hypot(s.vy),
            trajectory,
            termination,
        })
    }

    /// Simulates from speed and launch angle in degrees.
    pub fn simulate_launch(
        &self,
        speed: f64,
        angle_deg: f64,
        release_height: f64,
        implement: &Implement,
    ) -> Result<Flight, Error> {
        let a = angle_deg.to_radians();

        self.simulate(speed * a.cos(), speed * a.sin(), release_height, implement)
    }

    /// Launch from a plain finite difference of two tracked pixel positions.
    /// Identical timestamps give an all-zero estimate.
    pub fn from_two_points(
        &self,
        first: &TimedPoint,
        second: &TimedPoint,
        pixels_per_meter: f64,
        release_height: f64,
        implement: &Implement,
    ) -> Result<TwoPointEstimate, Error> {
        if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
            return Err(Error::InvalidCalibration(pixels_per_meter));
        }

        let dt = second.t - first.t;

        if dt == 0.0 {
            return Ok(TwoPointEstimate::default());
        }

        // image y grows downwards
        let vx = (second.x - first.x) / pixels_per_meter / dt;
        let vy = (first.y - second.y) / pixels_per_meter / dt;

        let flight = self.simulate(vx, vy, release_height, implement)?;

        Ok(TwoPointEstimate {
            velocity: vx.hypot(vy),
            angle: vy.atan2(vx).to_degrees(),
            distance: flight.distance,
        })
    }
}

/// Range of a drag-free projectile launched and landing at the same height.
#[inline]
pub fn vacuum_range(speed: f64, angle_deg: f64) -> f64 {
    speed * speed * (2.0 * angle_deg.to_radians()).sin() / GRAVITY
}
