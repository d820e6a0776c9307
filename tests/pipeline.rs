use hammerthrow::error::Error;
use hammerthrow::flight::{Termination, GRAVITY};
use hammerthrow::calibration::HAMMER_CIRCLE_DIAMETER_M;
use hammerthrow::{
    CalibrationFrame, CameraView, CircleDetection, EstimatorConfig, Implement, Sampling,
    ThrowEstimator, TrackedTrajectory,
};
use nalgebra as na;

const PPM: f64 = 10.0;
const FPS: f64 = 30.0;
const SWING_RADIUS: f64 = 1.8;
const RELEASE_INDEX: usize = 108;

fn calibration() -> CalibrationFrame {
    CalibrationFrame::new(na::Point2::new(400.0, 700.0), PPM).unwrap()
}

/// Three turns around the circle center at 10° per frame, then a drag-free
/// flight leaving from ground level, then the implement at rest.
/// Returns the samples and the flight time.
fn synthetic_throw(speed: f64, angle_deg: f64) -> (Vec<Option<na::Point2<f64>>>, f64) {
    let o = calibration().origin();
    let r = SWING_RADIUS * PPM;
    let dt = 1.0 / FPS;

    let mut samples: Vec<_> = (0..=RELEASE_INDEX)
        .map(|i| {
            let a = (i as f64 * 10.0).to_radians();
            Some(na::Point2::new(o.x + r * a.cos(), o.y - r * a.sin()))
        })
        .collect();

    let (vx, vy) = (
        speed * angle_deg.to_radians().cos(),
        speed * angle_deg.to_radians().sin(),
    );
    let t_ground = 2.0 * vy / GRAVITY;
    let frames = (t_ground / dt).ceil() as usize;

    for k in 1..=frames + 15 {
        let t = (k as f64 * dt).min(t_ground);
        let x = vx * t;
        let y = (vy * t - 0.5 * GRAVITY * t * t).max(0.0);

        samples.push(Some(na::Point2::new(o.x + r + x * PPM, o.y - y * PPM)));
    }

    (samples, t_ground)
}

#[test]
fn estimates_a_full_throw() {
    let (samples, t_ground) = synthetic_throw(25.0, 40.0);
    let sampling = Sampling::new(FPS, 1).unwrap();

    let report = ThrowEstimator::default()
        .analyze(&samples, sampling, &calibration(), &Implement::MEN)
        .unwrap();

    let landing_frame = RELEASE_INDEX + (t_ground * FPS).ceil() as usize;
    let expected_range = SWING_RADIUS + 25.0 * 25.0 * (80.0f64).to_radians().sin() / GRAVITY;

    assert_eq!(report.segmentation.release_index, RELEASE_INDEX);
    assert!(
        report.segmentation.landing_index + 1 >= landing_frame
            && report.segmentation.landing_index <= landing_frame
    );

    let result = report.result;
    assert!((result.tracked_distance - expected_range).abs() < 1.0);
    assert!((result.release_velocity - 25.0).abs() < 1.0);
    assert!((result.release_angle - 40.0).abs() < 2.0);
    assert!(result.distance_confidence > 0.85 && result.distance_confidence <= 1.0);
    assert!((result.flight_time - t_ground).abs() < 0.1);

    assert_eq!(report.turns.len(), 3);
    assert!((report.turns[0].avg_tangential_velocity - 9.42).abs() < 0.1);

    assert!(report.release.release_height < 1e-9);
    assert!(report.release.velocity.confidence > 0.8);
    assert_eq!(report.simulation.termination, Termination::Ground);
    assert!(report.simulation.distance > 50.0);
    assert!(report.simulation.distance < expected_range);
    assert_eq!(report.camera_view, None);
}

#[test]
fn circle_calibration_reports_camera_view() {
    let (samples, _) = synthetic_throw(25.0, 40.0);
    let sampling = Sampling::new(FPS, 1).unwrap();
    let estimator = ThrowEstimator::default();

    // ring radius matching PPM, seen head-on
    let radius = 0.5 * HAMMER_CIRCLE_DIAMETER_M * PPM;
    let side = CircleDetection {
        center: calibration().origin(),
        radius_x: radius,
        radius_y: radius,
    };
    let angled = CircleDetection {
        radius_y: 0.5 * radius,
        ..side
    };

    let reference = estimator
        .analyze(&samples, sampling, &calibration(), &Implement::MEN)
        .unwrap();
    let from_side = estimator
        .analyze_with_circle(&samples, sampling, &side, &Implement::MEN)
        .unwrap();
    let from_angled = estimator
        .analyze_with_circle(&samples, sampling, &angled, &Implement::MEN)
        .unwrap();

    assert_eq!(from_side.camera_view, Some(CameraView::Side));
    assert_eq!(from_angled.camera_view, Some(CameraView::Angled));

    // the major axis sets the scale, so both views measure the same throw
    for report in [&from_side, &from_angled] {
        assert_eq!(report.segmentation, reference.segmentation);
        assert!((report.result.tracked_distance - reference.result.tracked_distance).abs() < 1e-6);
    }
}

#[test]
fn analysis_is_deterministic() {
    let (samples, _) = synthetic_throw(22.0, 38.0);
    let sampling = Sampling::new(FPS, 1).unwrap();
    let estimator = ThrowEstimator::default();

    let a = estimator.analyze(&samples, sampling, &calibration(), &Implement::WOMEN).unwrap();
    let b = estimator.analyze(&samples, sampling, &calibration(), &Implement::WOMEN).unwrap();

    assert_eq!(a, b);
}

#[test]
fn tracking_gaps_are_tolerated() {
    let (mut samples, _) = synthetic_throw(25.0, 40.0);
    samples[20] = None;
    samples[55] = None;

    let sampling = Sampling::new(FPS, 1).unwrap();
    let report = ThrowEstimator::default()
        .analyze(&samples, sampling, &calibration(), &Implement::MEN)
        .unwrap();

    // two swing samples are gone, so release moves two indices earlier
    assert_eq!(report.segmentation.release_index, RELEASE_INDEX - 2);
    assert_eq!(report.turns.len(), 3);
    assert!(report.result.distance_confidence > 0.85);
}

#[test]
fn fixed_release_height_flies_farther() {
    let (samples, _) = synthetic_throw(25.0, 40.0);
    let sampling = Sampling::new(FPS, 1).unwrap();

    let measured = ThrowEstimator::default()
        .analyze(&samples, sampling, &calibration(), &Implement::MEN)
        .unwrap();

    let raised = ThrowEstimator::new(EstimatorConfig {
        release_height: Some(1.8),
        ..Default::default()
    })
    .analyze(&samples, sampling, &calibration(), &Implement::MEN)
    .unwrap();

    assert!(raised.simulation.distance > measured.simulation.distance);
    assert_eq!(raised.result, measured.result);
}

#[test]
fn short_tracks_are_rejected() {
    let sampling = Sampling::new(FPS, 1).unwrap();
    let samples: Vec<_> = (0..9)
        .map(|i| Some(na::Point2::new(i as f64 * 10.0, 100.0)))
        .collect();

    let err = ThrowEstimator::default()
        .analyze(&samples, sampling, &calibration(), &Implement::MEN)
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientData { needed: 11, got: 9, .. }));

    let traj = TrackedTrajectory::from_samples(&samples, sampling).unwrap();
    assert!(ThrowEstimator::default()
        .analyze_trajectory(&traj, &calibration(), &Implement { mass_kg: -1.0, diameter_mm: 110.0 })
        .is_err());
}
