//! Flat ordering of spherical-harmonic indices.
//!
//! `(n, m)` pairs are ordered by increasing degree, then increasing order, so
//! `flat(n, m) = n² + n + m`. Vector waves start at degree 1, which shifts
//! their position inside a polarization block down by one.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HarmonicIndex {
    degree: i32,
    order: i32,
}

impl HarmonicIndex {
    pub fn new(degree: i32, order: i32) -> Option<Self> {
        if degree < 0 || order.abs() > degree {
            return None;
        }
        Some(Self { degree, order })
    }

    pub const fn degree(self) -> i32 {
        self.degree
    }

    pub const fn order(self) -> i32 {
        self.order
    }

    pub const fn flat(self) -> usize {
        (self.degree * self.degree + self.degree + self.order) as usize
    }

    pub fn from_flat(index: usize) -> Self {
        let degree = (index as f64).sqrt().floor() as i32;
        // floor(sqrt) can be off by one for large perfect squares
        let degree = if ((degree + 1) * (degree + 1)) as usize <= index {
            degree + 1
        } else if (degree * degree) as usize > index {
            degree - 1
        } else {
            degree
        };
        let order = index as i32 - degree * degree - degree;
        Self { degree, order }
    }

    /// Position inside a polarization block; `None` for the monopole.
    pub const fn vector_index(self) -> Option<usize> {
        if self.degree == 0 {
            None
        } else {
            Some(self.flat() - 1)
        }
    }

    /// Every index with degree `<= n_max`, in ascending flat order.
    pub fn iter(n_max: usize) -> impl Iterator<Item = Self> {
        (0..max_flat(n_max)).map(Self::from_flat)
    }

    /// Vector indices (degree 1 through `n_max`) in block order.
    pub fn vector_iter(n_max: usize) -> impl Iterator<Item = Self> {
        (1..max_flat(n_max)).map(Self::from_flat)
    }
}

/// Number of `(n, m)` pairs with `n <= n_max`.
pub const fn max_flat(n_max: usize) -> usize {
    n_max * (n_max + 2) + 1
}

/// Per-polarization block size `B`.
pub const fn vector_block_size(n_max: usize) -> usize {
    max_flat(n_max) - 1
}

/// Length of one scatterer's coefficient block (`M` then `N`).
pub const fn object_block_size(n_max: usize) -> usize {
    2 * vector_block_size(n_max)
}
