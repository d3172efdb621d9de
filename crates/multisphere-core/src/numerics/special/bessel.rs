use num_complex::Complex64;

const SERIES_CUTOFF: f64 = 1.0;
const MID_RANGE_CUTOFF: f64 = 7.51;
const SERIES_MAX_ITER: usize = 160;
const SERIES_REL_TOL: f64 = 1.0e-15;
const MILLER_PADDING: usize = 32;
const MILLER_RESCALE_THRESHOLD: f64 = 1.0e200;
const I: Complex64 = Complex64::new(0.0, 1.0);

/// Radial function family of a spherical wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadialKind {
    /// Bounded at the origin, `j_n`.
    Regular,
    /// Outgoing, singular at the origin, `h_n^(1)`.
    Singular,
}

pub fn radial_sequence(kind: RadialKind, max_order: usize, argument: Complex64) -> Vec<Complex64> {
    match kind {
        RadialKind::Regular => spherical_j_sequence(max_order, argument),
        RadialKind::Singular => spherical_h1_sequence(max_order, argument),
    }
}

pub fn spherical_j(order: usize, argument: Complex64) -> Complex64 {
    spherical_j_sequence(order, argument)[order]
}

pub fn spherical_y(order: usize, argument: Complex64) -> Complex64 {
    spherical_y_sequence(order, argument)[order]
}

pub fn spherical_h1(order: usize, argument: Complex64) -> Complex64 {
    spherical_h1_sequence(order, argument)[order]
}

/// `j_0 ..= j_max_order`.
///
/// Power series near the origin, series-seeded downward recurrence in the
/// mid range, normalized Miller recurrence beyond it.
pub fn spherical_j_sequence(max_order: usize, argument: Complex64) -> Vec<Complex64> {
    assert_supported_argument(argument, "spherical_j");

    let mut values = vec![Complex64::new(0.0, 0.0); max_order + 1];
    if in_series_range(argument) {
        for (order, value) in values.iter_mut().enumerate() {
            *value = series_j(argument, order);
        }
        return values;
    }

    if in_mid_range(argument) {
        if max_order == 0 {
            values[0] = series_j(argument, 0);
            return values;
        }

        values[max_order] = series_j(argument, max_order);
        values[max_order - 1] = series_j(argument, max_order - 1);
        for order in (0..max_order.saturating_sub(1)).rev() {
            let coefficient = (2 * order + 3) as f64;
            values[order] = coefficient * values[order + 1] / argument - values[order + 2];
        }
        return values;
    }

    miller_j(max_order, argument)
}

/// `y_0 ..= y_max_order` (spherical Neumann functions), upward recurrence.
pub fn spherical_y_sequence(max_order: usize, argument: Complex64) -> Vec<Complex64> {
    assert_supported_argument(argument, "spherical_y");

    let mut values = vec![Complex64::new(0.0, 0.0); max_order + 1];
    if in_series_range(argument) {
        for (order, value) in values.iter_mut().enumerate() {
            *value = series_y(argument, order);
        }
        return values;
    }

    let inverse = Complex64::new(1.0, 0.0) / argument;
    let (sin_argument, cos_argument) = (argument.sin(), argument.cos());
    values[0] = -cos_argument * inverse;
    if max_order >= 1 {
        values[1] = -cos_argument * inverse * inverse - sin_argument * inverse;
    }
    upward_recurrence(&mut values, argument);
    values
}

/// `h_0^(1) ..= h_max_order^(1)` with `h^(1) = j + i y`.
pub fn spherical_h1_sequence(max_order: usize, argument: Complex64) -> Vec<Complex64> {
    assert_supported_argument(argument, "spherical_h1");

    let mut values = vec![Complex64::new(0.0, 0.0); max_order + 1];
    if in_series_range(argument) {
        for (order, value) in values.iter_mut().enumerate() {
            *value = series_j(argument, order) + I * series_y(argument, order);
        }
        return values;
    }

    let phase = (I * argument).exp();
    values[0] = -I * phase / argument;
    if max_order >= 1 {
        values[1] = -phase * (argument + I) / (argument * argument);
    }
    upward_recurrence(&mut values, argument);
    values
}

/// Riccati derivatives `[z f_n(z)]' = z f_{n-1}(z) - n f_n(z)` for orders
/// `1..values.len()` of a precomputed sequence.
pub fn riccati_derivatives(values: &[Complex64], argument: Complex64) -> Vec<Complex64> {
    values
        .iter()
        .enumerate()
        .skip(1)
        .map(|(order, value)| argument * values[order - 1] - (order as f64) * *value)
        .collect()
}

fn upward_recurrence(values: &mut [Complex64], argument: Complex64) {
    for order in 2..values.len() {
        let coefficient = (2 * order - 1) as f64;
        values[order] = coefficient * values[order - 1] / argument - values[order - 2];
    }
}

fn miller_j(max_order: usize, argument: Complex64) -> Vec<Complex64> {
    let start = max_order + argument.norm().ceil() as usize + MILLER_PADDING;
    let mut values = vec![Complex64::new(0.0, 0.0); max_order + 1];

    let mut upper = Complex64::new(0.0, 0.0);
    let mut current = Complex64::new(1.0e-30, 0.0);
    let mut first_order = Complex64::new(0.0, 0.0);
    for order in (1..=start).rev() {
        let lower = ((2 * order + 1) as f64) * current / argument - upper;
        upper = current;
        current = lower;

        let reached = order - 1;
        if reached <= max_order {
            values[reached] = current;
        }
        if reached == 1 {
            first_order = current;
        }

        if current.norm() > MILLER_RESCALE_THRESHOLD {
            let scale = 1.0 / MILLER_RESCALE_THRESHOLD;
            current *= scale;
            upper *= scale;
            first_order *= scale;
            for value in values.iter_mut() {
                *value *= scale;
            }
        }
    }

    let (sin_argument, cos_argument) = (argument.sin(), argument.cos());
    let exact_zero = sin_argument / argument;
    let exact_one = sin_argument / (argument * argument) - cos_argument / argument;
    let normalization = if exact_zero.norm() >= exact_one.norm() {
        exact_zero / current
    } else {
        exact_one / first_order
    };

    for value in values.iter_mut() {
        *value *= normalization;
    }
    values
}

fn in_series_range(argument: Complex64) -> bool {
    argument.re < SERIES_CUTOFF && argument.im.abs() < SERIES_CUTOFF
}

fn in_mid_range(argument: Complex64) -> bool {
    argument.re < MID_RANGE_CUTOFF && argument.im.abs() < MID_RANGE_CUTOFF
}

fn assert_supported_argument(argument: Complex64, function: &str) {
    assert!(
        argument.re >= 0.0,
        "{function} requires Re(z) >= 0 (got {argument})"
    );
}

fn double_factorial_odd(order: usize) -> f64 {
    (0..=order).fold(1.0, |product, k| product * (2 * k + 1) as f64)
}

fn series_j(argument: Complex64, order: usize) -> Complex64 {
    let normalization = double_factorial_odd(order);
    let u = argument * argument * 0.5;
    let mut sum = Complex64::new(1.0, 0.0);
    let mut term = Complex64::new(1.0, 0.0);

    for k in 1..=SERIES_MAX_ITER {
        term *= -u / ((k * (2 * order + 2 * k + 1)) as f64);
        sum += term;
        let scale = sum.norm();
        let rel_delta = if scale == 0.0 {
            term.norm()
        } else {
            term.norm() / scale
        };
        if rel_delta <= SERIES_REL_TOL {
            return sum * argument.powu(order as u32) / normalization;
        }
    }

    panic!("spherical_j series failed to converge for order {order} and argument {argument}");
}

fn series_y(argument: Complex64, order: usize) -> Complex64 {
    let normalization = double_factorial_odd(order) / (2 * order + 1) as f64;
    let u = argument * argument * 0.5;
    let mut sum = Complex64::new(1.0, 0.0);
    let mut term = Complex64::new(1.0, 0.0);
    let mut odd = 1.0 - 2.0 * order as f64;

    for k in 1..=SERIES_MAX_ITER {
        term *= -u / ((k as f64) * odd);
        odd += 2.0;
        sum += term;
        let scale = sum.norm();
        let rel_delta = if scale == 0.0 {
            term.norm()
        } else {
            term.norm() / scale
        };
        if rel_delta <= SERIES_REL_TOL {
            return -sum * normalization / argument.powu((order + 1) as u32);
        }
    }

    panic!("spherical_y series failed to converge for order {order} and argument {argument}");
}
