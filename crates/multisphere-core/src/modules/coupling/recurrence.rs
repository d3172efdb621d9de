//! Coaxial scalar translation coefficients `T(n, m, l)`.
//!
//! A wave of degree `n` and order `m` about one center, translated by `t`
//! along the common z axis, re-expands as `Σ_l T(n, m, l) · regular_{l,m}`
//! about the new center. Entries are built from the `n = 0` seeds through a
//! three-term recurrence in `n` and a companion recurrence in `m`, and are
//! memoized per table.

use crate::numerics::special::{RadialKind, radial_sequence};
use num_complex::Complex64;
use std::collections::HashMap;

type TableKey = (i32, i32, i32);

const DEFAULT_DEGREE_CAPACITY: usize = 8;

/// `a(n, m)` of the degree recurrence; zero when `n < 0` or `|m| > n`.
pub fn coefficient_a(degree: i32, order: i32) -> f64 {
    let order = order.abs();
    if degree < 0 || order > degree {
        return 0.0;
    }
    let n = f64::from(degree);
    let m = f64::from(order);
    ((n + 1.0 + m) * (n + 1.0 - m) / ((2.0 * n + 1.0) * (2.0 * n + 3.0))).sqrt()
}

/// `b(n, m)` of the order recurrence; zero when `n < 0` or `|m| > n`.
pub fn coefficient_b(degree: i32, order: i32) -> f64 {
    if degree < 0 || order.abs() > degree {
        return 0.0;
    }
    let sign = if order >= 0 { 1.0 } else { -1.0 };
    let n = f64::from(degree);
    let m = f64::from(order);
    sign * ((n - m - 1.0) * (n - m) / ((2.0 * n - 1.0) * (2.0 * n + 1.0))).sqrt()
}

#[derive(Debug, Clone)]
pub struct CoaxialRecurrence {
    distance: f64,
    wavenumber: Complex64,
    kind: RadialKind,
    seeds: Vec<Complex64>,
    table: HashMap<TableKey, Complex64>,
}

impl CoaxialRecurrence {
    /// Table for the signed axial `distance`. A singular table at zero
    /// distance is undefined; callers special-case coincident centers.
    pub fn new(distance: f64, wavenumber: Complex64, kind: RadialKind) -> Self {
        Self::with_capacity(distance, wavenumber, kind, DEFAULT_DEGREE_CAPACITY)
    }

    /// Pre-sizes the seed sequence for degrees up to `max_degree`.
    pub fn with_capacity(
        distance: f64,
        wavenumber: Complex64,
        kind: RadialKind,
        max_degree: usize,
    ) -> Self {
        let mut recurrence = Self {
            distance,
            wavenumber,
            kind,
            seeds: Vec::new(),
            table: HashMap::new(),
        };
        recurrence.grow_seeds(2 * max_degree + 2);
        recurrence
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn wavenumber(&self) -> Complex64 {
        self.wavenumber
    }

    pub fn kind(&self) -> RadialKind {
        self.kind
    }

    /// Number of memoized entries with `n >= 1`.
    pub fn cached_len(&self) -> usize {
        self.table.len()
    }

    pub fn get(&mut self, degree: i32, order: i32, target_degree: i32) -> Complex64 {
        if is_outside(degree, order, target_degree) {
            return Complex64::new(0.0, 0.0);
        }

        let order = order.abs();
        if degree > target_degree {
            parity(degree + target_degree) * self.canonical(target_degree, order, degree)
        } else {
            self.canonical(degree, order, target_degree)
        }
    }

    /// Entry with `0 <= m <= n <= l`, evaluating missing dependencies
    /// bottom-up from an explicit work stack.
    fn canonical(&mut self, degree: i32, order: i32, target_degree: i32) -> Complex64 {
        let root = (degree, order, target_degree);
        if degree > 0 && !self.table.contains_key(&root) {
            let mut pending = vec![root];
            while let Some(&key) = pending.last() {
                if self.table.contains_key(&key) {
                    pending.pop();
                    continue;
                }

                let waiting = pending.len();
                for dependency in dependencies(key).into_iter().flatten() {
                    if dependency.0 > 0 && !self.table.contains_key(&dependency) {
                        pending.push(dependency);
                    }
                }
                if pending.len() == waiting {
                    let value = self.evaluate(key);
                    self.table.insert(key, value);
                    pending.pop();
                }
            }
        }
        self.lookup(degree, order, target_degree)
    }

    fn evaluate(&mut self, (n, m, l): TableKey) -> Complex64 {
        if m < n {
            let numerator = coefficient_a(n - 2, m) * self.lookup(n - 2, m, l)
                - coefficient_a(l, m) * self.lookup(n - 1, m, l + 1)
                + coefficient_a(l - 1, m) * self.lookup(n - 1, m, l - 1);
            numerator / coefficient_a(n - 1, m)
        } else {
            let numerator = coefficient_b(n - 1, m - 1) * self.lookup(n - 2, m, l)
                - coefficient_b(l + 1, m - 1) * self.lookup(n - 1, m - 1, l + 1)
                + coefficient_b(l, -m) * self.lookup(n - 1, m - 1, l - 1);
            numerator / coefficient_b(n, -m)
        }
    }

    fn lookup(&mut self, degree: i32, order: i32, target_degree: i32) -> Complex64 {
        if is_outside(degree, order, target_degree) {
            return Complex64::new(0.0, 0.0);
        }
        if degree == 0 {
            return self.seed(target_degree as usize);
        }
        self.table
            .get(&(degree, order.abs(), target_degree))
            .copied()
            .unwrap_or_default()
    }

    fn seed(&mut self, target_degree: usize) -> Complex64 {
        if target_degree >= self.seeds.len() {
            self.grow_seeds(2 * target_degree + 2);
        }
        self.seeds[target_degree]
    }

    fn grow_seeds(&mut self, len: usize) {
        let argument = self.wavenumber * self.distance.abs();
        let radial = radial_sequence(self.kind, len.saturating_sub(1), argument);
        self.seeds = radial
            .into_iter()
            .enumerate()
            .map(|(l, value)| {
                let sign = if self.distance >= 0.0 { parity(l as i32) } else { 1.0 };
                sign * ((2 * l + 1) as f64).sqrt() * value
            })
            .collect();
    }
}

fn is_outside(degree: i32, order: i32, target_degree: i32) -> bool {
    degree < 0 || target_degree < 0 || order.abs() > degree || order.abs() > target_degree
}

/// Canonical entries a canonical `(n, m, l)` is built from.
fn dependencies((n, m, l): TableKey) -> [Option<TableKey>; 3] {
    let valid = |key: TableKey| (!is_outside(key.0, key.1, key.2)).then_some(key);
    if m < n {
        [
            valid((n - 2, m, l)),
            valid((n - 1, m, l + 1)),
            valid((n - 1, m, l - 1)),
        ]
    } else {
        [
            None,
            valid((n - 1, m - 1, l + 1)),
            valid((n - 1, m - 1, l - 1)),
        ]
    }
}

fn parity(value: i32) -> f64 {
    if value.rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}

#[cfg(test)]
mod tests {
    use super::{CoaxialRecurrence, coefficient_a, coefficient_b};
    use crate::domain::Spherical;
    use crate::modules::wave_fields::scalar_wave;
    use crate::numerics::special::{RadialKind, WignerMatrix};
    use num_complex::Complex64;

    const ABS_TOL: f64 = 1.0e-12;

    fn sample_wavenumber() -> Complex64 {
        Complex64::new(1.0, 1.5)
    }

    #[test]
    fn reference_values_match_regular_table() {
        let mut table = CoaxialRecurrence::new(1.0, sample_wavenumber(), RadialKind::Regular);
        let cases = [
            ((0, 0, 0), Complex64::new(1.140_051_179_922_579_2, -0.559_622_170_458_482_06)),
            ((0, 0, 4), Complex64::new(-0.028_191_522_402_192_234, -0.021_628_859_055_930_49)),
            ((1, 0, 1), Complex64::new(1.227_481_968_788_066_5, -1.027_175_675_880_046_3)),
            ((1, 1, 3), Complex64::new(-0.085_169_586_217_943_016, 0.363_315_680_093_550_53)),
        ];
        for ((n, m, l), expected) in cases {
            assert_complex_close(
                &format!("T({n},{m},{l})"),
                expected,
                table.get(n, m, l),
                ABS_TOL,
                1.0e-12,
            );
        }
    }

    #[test]
    fn order_sign_and_degree_exchange_symmetries_hold() {
        for kind in [RadialKind::Regular, RadialKind::Singular] {
            let mut table = CoaxialRecurrence::new(1.3, sample_wavenumber(), kind);
            for n in 0..7 {
                for l in 0..7 {
                    for m in -n.min(l)..=n.min(l) {
                        let value = table.get(n, m, l);
                        assert_eq!(value, table.get(n, -m, l), "m-symmetry n={n} m={m} l={l}");

                        let sign = if (n + l) % 2 == 0 { 1.0 } else { -1.0 };
                        let exchanged = sign * table.get(l, m, n);
                        assert_complex_close("exchange", value, exchanged, ABS_TOL, 1.0e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn zero_distance_regular_table_is_identity() {
        let mut table = CoaxialRecurrence::new(0.0, sample_wavenumber(), RadialKind::Regular);
        for n in 0..6 {
            for l in 0..6 {
                for m in -n.min(l)..=n.min(l) {
                    let expected = if n == l { 1.0 } else { 0.0 };
                    assert_complex_close(
                        &format!("T({n},{m},{l})"),
                        Complex64::new(expected, 0.0),
                        table.get(n, m, l),
                        1.0e-13,
                        0.0,
                    );
                }
            }
        }
    }

    #[test]
    fn out_of_range_requests_are_exactly_zero() {
        let mut table = CoaxialRecurrence::new(2.0, sample_wavenumber(), RadialKind::Singular);
        let zero = Complex64::new(0.0, 0.0);
        assert_eq!(table.get(2, 3, 5), zero);
        assert_eq!(table.get(4, 2, 1), zero);
        assert_eq!(table.get(3, 0, -1), zero);
        assert_eq!(table.get(-1, 0, 2), zero);
        assert_eq!(table.cached_len(), 0);
    }

    #[test]
    fn degree_and_order_recurrences_hold_for_both_kinds() {
        let a = coefficient_a;
        let b = coefficient_b;
        for kind in [RadialKind::Regular, RadialKind::Singular] {
            let mut t = CoaxialRecurrence::new(-1.7, Complex64::new(0.8, 0.3), kind);
            for n in 0..6 {
                for l in 0..6 {
                    for m in -n..=n {
                        assert_balanced(
                            &format!("degree recurrence n={n} m={m} l={l}"),
                            [
                                a(n - 1, m) * t.get(n - 1, m, l),
                                -a(n, m) * t.get(n + 1, m, l),
                                -a(l, m) * t.get(n, m, l + 1),
                                a(l - 1, m) * t.get(n, m, l - 1),
                            ],
                        );
                        assert_balanced(
                            &format!("order recurrence n={n} m={m} l={l}"),
                            [
                                b(n, m) * t.get(n - 1, m + 1, l),
                                -b(n + 1, -m - 1) * t.get(n + 1, m + 1, l),
                                -b(l + 1, m) * t.get(n, m, l + 1),
                                b(l, -m - 1) * t.get(n, m, l - 1),
                            ],
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn repeated_requests_reuse_cached_entries() {
        let mut table = CoaxialRecurrence::new(0.9, sample_wavenumber(), RadialKind::Singular);
        let first = table.get(5, 3, 7);
        let cached = table.cached_len();
        assert!(cached > 0);
        assert_eq!(table.get(5, 3, 7), first);
        assert_eq!(table.get(5, -3, 7), first);
        assert_eq!(table.cached_len(), cached);
    }

    #[test]
    fn coaxial_series_reexpands_scalar_waves_for_both_directions() {
        let wavenumber = Complex64::new(0.7, 0.05);
        let local = [0.8, -0.5, 0.9];
        for distance in [5.0, -5.0] {
            let shifted = [local[0], local[1], local[2] + distance];
            for (n, m) in [(0, 0), (1, 1), (2, -1), (3, 2)] {
                for kind in [RadialKind::Singular, RadialKind::Regular] {
                    let mut table = CoaxialRecurrence::new(distance, wavenumber, kind);
                    let exact = scalar_wave(kind, n, m, wavenumber, shifted);
                    let series: Complex64 = (m.abs()..40)
                        .map(|l| {
                            table.get(n, m, l)
                                * scalar_wave(RadialKind::Regular, l, m, wavenumber, local)
                        })
                        .sum();
                    assert_complex_close(
                        &format!("t={distance} n={n} m={m} {kind:?}"),
                        exact,
                        series,
                        1.0e-12,
                        1.0e-11,
                    );
                }
            }
        }
    }

    #[test]
    fn rotated_series_reexpands_off_axis_and_converges_with_truncation() {
        let wavenumber = Complex64::new(0.7, 0.05);
        let displacement = [1.2, -2.0, 2.5];
        let local = [0.3, 0.4, -0.2];
        let shifted = [
            local[0] + displacement[0],
            local[1] + displacement[1],
            local[2] + displacement[2],
        ];
        let axis = Spherical::from_cartesian(displacement);

        for kind in [RadialKind::Singular, RadialKind::Regular] {
            let mut table = CoaxialRecurrence::new(axis.radius, wavenumber, kind);
            for (n, m) in [(0, 0), (2, 1), (3, -2)] {
                let exact = scalar_wave(kind, n, m, wavenumber, shifted);
                let source_rotation = WignerMatrix::new(n, axis.theta);
                let mut truncated = Complex64::new(0.0, 0.0);
                let mut series = Complex64::new(0.0, 0.0);
                for l in 0..30 {
                    let target_rotation = WignerMatrix::new(l, axis.theta);
                    for k in -l..=l {
                        let coaxial: Complex64 = (-n.min(l)..=n.min(l))
                            .map(|mu| {
                                source_rotation.get(m, mu)
                                    * target_rotation.get(k, mu)
                                    * table.get(n, mu, l)
                            })
                            .sum();
                        let term = Complex64::from_polar(1.0, f64::from(m - k) * axis.phi)
                            * coaxial
                            * scalar_wave(RadialKind::Regular, l, k, wavenumber, local);
                        series += term;
                        if l < 6 {
                            truncated += term;
                        }
                    }
                }
                assert_complex_close("off-axis", exact, series, 1.0e-12, 1.0e-11);
                assert!((exact - truncated).norm() > (exact - series).norm());
            }
        }
    }

    /// Terms of a recurrence moved to one side must cancel.
    fn assert_balanced(label: &str, terms: [Complex64; 4]) {
        let scale = terms.iter().map(|term| term.norm()).fold(1.0, f64::max);
        let residual: Complex64 = terms.iter().sum();
        assert!(
            residual.norm() <= 1.0e-12 * scale,
            "{label} residual={:.3e} scale={scale:.3e}",
            residual.norm()
        );
    }

    fn assert_complex_close(
        label: &str,
        expected: Complex64,
        actual: Complex64,
        abs_tol: f64,
        rel_tol: f64,
    ) {
        let abs_diff = (actual - expected).norm();
        let rel_diff = abs_diff / expected.norm().max(1.0e-300);
        assert!(
            abs_diff <= abs_tol || rel_diff <= rel_tol,
            "{label} expected=({:.15e},{:.15e}) actual=({:.15e},{:.15e}) abs_diff={:.3e} rel_diff={:.3e}",
            expected.re,
            expected.im,
            actual.re,
            actual.im,
            abs_diff,
            rel_diff
        );
    }
}
