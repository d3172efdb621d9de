use std::sync::OnceLock;

const LOG_FACTORIAL_TABLE_LEN: usize = 256;
static LOG_FACTORIALS: OnceLock<[f64; LOG_FACTORIAL_TABLE_LEN]> = OnceLock::new();

/// Wigner small-d element `d^j_{m' m}(β)`.
///
/// Explicit factorial sum evaluated in log space. Out-of-range orders give
/// zero.
pub fn wigner_small_d(j: i32, m_prime: i32, m: i32, beta: f64) -> f64 {
    if j < 0 || m_prime.abs() > j || m.abs() > j {
        return 0.0;
    }

    let cos_half = (beta / 2.0).cos();
    let sin_half = (beta / 2.0).sin();
    let prefactor = 0.5
        * (log_factorial(j + m_prime)
            + log_factorial(j - m_prime)
            + log_factorial(j + m)
            + log_factorial(j - m));

    let first = (m - m_prime).max(0);
    let last = (j + m).min(j - m_prime);
    let mut total = 0.0;
    for s in first..=last {
        let log_magnitude = prefactor
            - log_factorial(j + m - s)
            - log_factorial(s)
            - log_factorial(m_prime - m + s)
            - log_factorial(j - m_prime - s);
        let sign = if (m_prime - m + s).rem_euclid(2) == 0 {
            1.0
        } else {
            -1.0
        };
        total += sign
            * log_magnitude.exp()
            * cos_half.powi(2 * j + m - m_prime - 2 * s)
            * sin_half.powi(m_prime - m + 2 * s);
    }
    total
}

/// Dense `d^j(β)` laid out row-major over `(m' + j, m + j)`.
#[derive(Debug, Clone, PartialEq)]
pub struct WignerMatrix {
    degree: i32,
    values: Vec<f64>,
}

impl WignerMatrix {
    pub fn new(degree: i32, beta: f64) -> Self {
        let width = (2 * degree + 1).max(0) as usize;
        let mut values = Vec::with_capacity(width * width);
        for m_prime in -degree..=degree {
            for m in -degree..=degree {
                values.push(wigner_small_d(degree, m_prime, m, beta));
            }
        }
        Self { degree, values }
    }

    pub fn degree(&self) -> i32 {
        self.degree
    }

    pub fn get(&self, m_prime: i32, m: i32) -> f64 {
        if m_prime.abs() > self.degree || m.abs() > self.degree {
            return 0.0;
        }
        let width = 2 * self.degree + 1;
        self.values[((m_prime + self.degree) * width + (m + self.degree)) as usize]
    }
}

fn log_factorial(value: i32) -> f64 {
    debug_assert!(value >= 0, "log factorial of negative argument {value}");
    let index = value.max(0) as usize;
    let table = log_factorials();
    if index < LOG_FACTORIAL_TABLE_LEN {
        return table[index];
    }
    ((LOG_FACTORIAL_TABLE_LEN)..=index).fold(table[LOG_FACTORIAL_TABLE_LEN - 1], |acc, k| {
        acc + (k as f64).ln()
    })
}

fn log_factorials() -> &'static [f64; LOG_FACTORIAL_TABLE_LEN] {
    LOG_FACTORIALS.get_or_init(|| {
        let mut values = [0.0f64; LOG_FACTORIAL_TABLE_LEN];
        for index in 1..LOG_FACTORIAL_TABLE_LEN {
            values[index] = values[index - 1] + (index as f64).ln();
        }
        values
    })
}

#[cfg(test)]
mod tests {
    use super::{WignerMatrix, log_factorial, wigner_small_d};
    use crate::common::constants::PI;
    use crate::numerics::special::y_lm;

    #[test]
    fn degree_one_matches_closed_forms() {
        let beta: f64 = 0.83;
        let cases = [
            ((1, 1), (1.0 + beta.cos()) / 2.0),
            ((1, 0), -beta.sin() / 2.0_f64.sqrt()),
            ((1, -1), (1.0 - beta.cos()) / 2.0),
            ((0, 0), beta.cos()),
            ((0, 1), beta.sin() / 2.0_f64.sqrt()),
            ((-1, 1), (1.0 - beta.cos()) / 2.0),
        ];
        for ((m_prime, m), expected) in cases {
            let actual = wigner_small_d(1, m_prime, m, beta);
            assert!(
                (actual - expected).abs() <= 1.0e-14,
                "d^1_{m_prime}{m}: {actual} vs {expected}"
            );
        }
    }

    #[test]
    fn zero_angle_is_identity_and_pi_flips_orders() {
        for j in 0..=6 {
            for m_prime in -j..=j {
                for m in -j..=j {
                    let expected = if m_prime == m { 1.0 } else { 0.0 };
                    assert!((wigner_small_d(j, m_prime, m, 0.0) - expected).abs() <= 1.0e-14);

                    let flipped = if m_prime == -m {
                        if (j + m_prime).rem_euclid(2) == 0 { 1.0 } else { -1.0 }
                    } else {
                        0.0
                    };
                    assert!(
                        (wigner_small_d(j, m_prime, m, PI) - flipped).abs() <= 1.0e-12,
                        "j={j} m'={m_prime} m={m}"
                    );
                }
            }
        }
    }

    #[test]
    fn rows_are_orthonormal_for_higher_degrees() {
        let j = 12;
        let matrix = WignerMatrix::new(j, 1.37);
        for a in -j..=j {
            for b in -j..=j {
                let dot: f64 = (-j..=j).map(|k| matrix.get(a, k) * matrix.get(b, k)).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() <= 1.0e-10, "rows {a},{b}: {dot}");
            }
        }
    }

    #[test]
    fn zero_order_column_matches_spherical_harmonics() {
        let beta = 0.61;
        for degree in 0..=5 {
            let scale = (4.0 * PI / (2 * degree + 1) as f64).sqrt();
            for order in -degree..=degree {
                let expected = scale * y_lm(degree, order, beta, 0.0).re;
                let actual = wigner_small_d(degree, order, 0, beta);
                assert!((actual - expected).abs() <= 1.0e-13, "n={degree} m={order}");
            }
        }
    }

    #[test]
    fn out_of_range_orders_are_zero_and_large_factorials_extend_table() {
        assert_eq!(wigner_small_d(2, 3, 0, 0.4), 0.0);
        assert_eq!(WignerMatrix::new(1, 0.2).get(2, 0), 0.0);

        let direct: f64 = (1..=300).map(|k| (k as f64).ln()).sum();
        assert!((log_factorial(300) - direct).abs() <= 1.0e-9);
    }
}
