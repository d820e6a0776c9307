use nalgebra as na;
use num_traits::{Float, NumCast};

/// Closed-form least squares fit of `y = a·x + b` from the normal equations.
///
/// Returns `(a, b)` as a column, or `None` when `x` has no variance
/// (`n·Σx² − (Σx)² == 0`).
pub fn linear_ls<T: na::RealField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
) -> Option<na::Matrix2x1<T>> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }

    let n = <T as NumCast>::from(x.len())?;

    let s_x = x.sum();
    let s_x2 = x.map(|x| x * x).sum();
    let s_xy = x.zip_map(y, |x, y| x * y).sum();
    let s_y = y.sum();

    let det = n * s_x2 - s_x * s_x;

    // relative test, equal timestamps rarely cancel to an exact zero
    if Float::abs(det) <= <T as Float>::epsilon() * n * s_x2 {
        return None;
    }

    let a = (n * s_xy - s_x * s_y) / det;
    let b = (s_y - a * s_x) / n;

    Some(na::Matrix2x1::new(a, b))
}

/// Coefficient of determination of `y ≈ a·x + b`, clamped to `[0, 1]`.
pub fn r_squared<T: na::RealField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
    params: &na::Matrix2x1<T>,
) -> T {
    let n = match <T as NumCast>::from(y.len()) {
        Some(n) if !y.is_empty() => n,
        _ => return T::zero(),
    };

    let mean = y.sum() / n;
    let ss_tot = y.map(|y| (y - mean) * (y - mean)).sum();
    let ss_res = x
        .zip_map(y, |x, y| {
            let e = y - (params[0] * x + params[1]);
            e * e
        })
        .sum();

    let tiny = <T as Float>::epsilon() * (T::one() + ss_tot);

    if ss_tot <= tiny {
        // a constant axis is explained perfectly only by a flat line
        return if ss_res <= tiny { T::one() } else { T::zero() };
    }

    Float::max(T::zero(), Float::min(T::one(), T::one() - ss_res / ss_tot))
}

/// Unwraps a sequence of angles (radians) so that each value is the
/// continuation closest to the previous unwrapped one.
pub fn unwrap_angles<T: na::RealField + Float>(angles: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(angles.len());
    let two_pi = T::two_pi();

    let mut iter = angles.iter().copied();
    let mut prev = match iter.next() {
        Some(a) => a,
        None => return out,
    };

    out.push(prev);

    for a in iter {
        let k = Float::round((prev - a) / two_pi);
        let next = a + k * two_pi;

        out.push(next);
        prev = next;
    }

    out
}

#[inline]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Largest magnitude in the series, `0` when empty.
#[inline]
pub fn peak_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);

    (value * m).round() / m
}
