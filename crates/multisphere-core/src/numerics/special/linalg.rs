use super::DenseComplexMatrix;
use num_complex::Complex64;

pub(crate) const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-15;
const RANK_TOLERANCE_SCALE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU factorization requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QrError {
    #[error("QR factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuDecomposition {
    lu: DenseComplexMatrix,
    pivots: Vec<usize>,
}

impl LuDecomposition {
    pub(crate) fn from_parts(lu: DenseComplexMatrix, pivots: Vec<usize>) -> Self {
        Self { lu, pivots }
    }

    pub fn dimension(&self) -> usize {
        self.lu.nrows()
    }

    pub fn lu_matrix(&self) -> &DenseComplexMatrix {
        &self.lu
    }

    pub fn pivots(&self) -> &[usize] {
        &self.pivots
    }

    pub fn solve(&self, rhs: &[Complex64]) -> Result<Vec<Complex64>, LuError> {
        let dimension = self.dimension();
        if rhs.len() != dimension {
            return Err(LuError::RhsLengthMismatch {
                expected: dimension,
                actual: rhs.len(),
            });
        }

        let mut forward = vec![Complex64::new(0.0, 0.0); dimension];
        for row in 0..dimension {
            let mut value = rhs[self.pivots[row]];
            for col in 0..row {
                value -= self.lu[(row, col)] * forward[col];
            }
            forward[row] = value;
        }

        let mut solution = vec![Complex64::new(0.0, 0.0); dimension];
        for row in (0..dimension).rev() {
            let mut value = forward[row];
            for col in (row + 1)..dimension {
                value -= self.lu[(row, col)] * solution[col];
            }

            let diagonal = self.lu[(row, row)];
            if is_effectively_zero(diagonal) {
                return Err(LuError::SingularMatrix { pivot_index: row });
            }
            solution[row] = value / diagonal;
        }

        Ok(solution)
    }
}

/// Partial-pivot LU, `P A = L U` with unit lower `L` packed below the diagonal.
pub fn lu_factorize(matrix: &DenseComplexMatrix) -> Result<LuDecomposition, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }

    let dimension = rows;
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();

    for pivot_col in 0..dimension {
        let mut pivot_row = pivot_col;
        let mut best_norm_sq = lu[(pivot_col, pivot_col)].norm_sqr();
        for row in (pivot_col + 1)..dimension {
            let norm_sq = lu[(row, pivot_col)].norm_sqr();
            if norm_sq > best_norm_sq {
                best_norm_sq = norm_sq;
                pivot_row = row;
            }
        }
        if best_norm_sq <= SINGULAR_PIVOT_EPSILON * SINGULAR_PIVOT_EPSILON {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            swap_rows(&mut lu, pivot_col, pivot_row);
            pivots.swap(pivot_col, pivot_row);
        }

        let pivot = lu[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            lu[(row, pivot_col)] /= pivot;
            let multiplier = lu[(row, pivot_col)];
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    Ok(LuDecomposition { lu, pivots })
}

pub fn lu_solve(matrix: &DenseComplexMatrix, rhs: &[Complex64]) -> Result<Vec<Complex64>, LuError> {
    lu_factorize(matrix)?.solve(rhs)
}

/// Column-pivoted `A P = Q R`. Rank-deficient systems get the basic solution:
/// free unknowns past `rank` are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct QrDecomposition {
    q: DenseComplexMatrix,
    r: DenseComplexMatrix,
    permutation: Vec<usize>,
    rank: usize,
}

impl QrDecomposition {
    pub fn dimension(&self) -> usize {
        self.r.nrows()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.dimension()
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn r_matrix(&self) -> &DenseComplexMatrix {
        &self.r
    }

    pub fn q_matrix(&self) -> &DenseComplexMatrix {
        &self.q
    }

    pub fn solve(&self, rhs: &[Complex64]) -> Result<Vec<Complex64>, QrError> {
        let dimension = self.dimension();
        if rhs.len() != dimension {
            return Err(QrError::RhsLengthMismatch {
                expected: dimension,
                actual: rhs.len(),
            });
        }

        let projected: Vec<Complex64> = (0..self.rank)
            .map(|row| (0..dimension).map(|k| self.q[(k, row)].conj() * rhs[k]).sum())
            .collect();

        let mut reduced = vec![Complex64::new(0.0, 0.0); dimension];
        for row in (0..self.rank).rev() {
            let mut value = projected[row];
            for col in (row + 1)..self.rank {
                value -= self.r[(row, col)] * reduced[col];
            }
            reduced[row] = value / self.r[(row, row)];
        }

        let mut solution = vec![Complex64::new(0.0, 0.0); dimension];
        for (position, &column) in self.permutation.iter().enumerate() {
            solution[column] = reduced[position];
        }
        Ok(solution)
    }
}

pub fn qr_factorize(matrix: &DenseComplexMatrix) -> Result<QrDecomposition, QrError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows != cols {
        return Err(QrError::NonSquareMatrix { rows, cols });
    }
    let dimension = rows;
    if dimension == 0 {
        return Ok(QrDecomposition {
            q: DenseComplexMatrix::zeros(0, 0),
            r: DenseComplexMatrix::zeros(0, 0),
            permutation: Vec::new(),
            rank: 0,
        });
    }

    let factors = matrix.col_piv_qr();
    let packed = factors.R();
    let r = DenseComplexMatrix::from_fn(dimension, dimension, |row, col| {
        if row <= col {
            packed[(row, col)]
        } else {
            Complex64::new(0.0, 0.0)
        }
    });
    let permutation = factors.P().arrays().0.to_vec();

    let leading = r[(0, 0)].norm();
    let threshold = leading * f64::EPSILON * (RANK_TOLERANCE_SCALE * dimension) as f64;
    let rank = (0..dimension)
        .take_while(|&index| {
            let magnitude = r[(index, index)].norm();
            magnitude > threshold && magnitude > 0.0
        })
        .count();

    Ok(QrDecomposition {
        q: factors.compute_Q(),
        r,
        permutation,
        rank,
    })
}

pub fn qr_solve(matrix: &DenseComplexMatrix, rhs: &[Complex64]) -> Result<Vec<Complex64>, QrError> {
    qr_factorize(matrix)?.solve(rhs)
}

pub fn identity(size: usize) -> DenseComplexMatrix {
    let mut identity = DenseComplexMatrix::zeros(size, size);
    for index in 0..size {
        identity[(index, index)] = Complex64::new(1.0, 0.0);
    }
    identity
}

pub fn multiply(lhs: &DenseComplexMatrix, rhs: &DenseComplexMatrix) -> DenseComplexMatrix {
    lhs * rhs
}

pub fn matvec(matrix: &DenseComplexMatrix, vector: &[Complex64]) -> Vec<Complex64> {
    assert_eq!(
        vector.len(),
        matrix.ncols(),
        "vector length must match matrix columns"
    );

    let mut output = vec![Complex64::new(0.0, 0.0); matrix.nrows()];
    for (row, slot) in output.iter_mut().enumerate() {
        let mut sum = Complex64::new(0.0, 0.0);
        for (col, value) in vector.iter().enumerate() {
            sum += matrix[(row, col)] * value;
        }
        *slot = sum;
    }
    output
}

fn swap_rows(matrix: &mut DenseComplexMatrix, lhs: usize, rhs: usize) {
    for col in 0..matrix.ncols() {
        let value = matrix[(lhs, col)];
        matrix[(lhs, col)] = matrix[(rhs, col)];
        matrix[(rhs, col)] = value;
    }
}

fn is_effectively_zero(value: Complex64) -> bool {
    value.norm_sqr() <= SINGULAR_PIVOT_EPSILON * SINGULAR_PIVOT_EPSILON
}
