//! Worker groups and the two-dimensional block-cyclic matrix layout.
//!
//! A group of `size` workers exposes a `rows x cols` grid that may use only
//! a subset of them. Global block `(I, J)` of `mb x nb` entries lives on the
//! grid worker `(I mod rows, J mod cols)`; workers are ranked row-major on
//! the grid.

use super::krylov::LinearOperator;
use crate::domain::{SolverError, SolverResult};
use crate::numerics::special::{DenseComplexMatrix, LuDecomposition, LuError};
use crate::numerics::special::linalg::SINGULAR_PIVOT_EPSILON;
use num_complex::Complex64;
use rayon::prelude::*;
use std::ops::Range;

/// Fixed set of cooperating workers.
pub trait WorkerGroup: Sync {
    fn size(&self) -> usize;

    fn grid(&self) -> [usize; 2];

    /// Runs `task(rank)` for every rank in `0..ranks`; results come back in rank order.
    fn map_ranks<T, F>(&self, ranks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;

    /// Lets every grid worker update its own tile in place.
    fn for_each_tile<F>(&self, tiles: &mut [DenseComplexMatrix], task: F)
    where
        F: Fn(usize, &mut DenseComplexMatrix) + Send + Sync;

    /// More than one grid worker takes part in solves.
    fn is_engaged(&self) -> bool {
        let [rows, cols] = self.grid();
        rows * cols > 1
    }

    fn validate(&self, block_size: [usize; 2]) -> SolverResult<()> {
        let [rows, cols] = self.grid();
        if self.size() == 0 || rows == 0 || cols == 0 {
            return Err(SolverError::input_validation(
                "CONFIG.WORKER_GRID",
                format!(
                    "worker grid {rows}x{cols} over {} workers is empty",
                    self.size()
                ),
            ));
        }
        if rows * cols > self.size() {
            return Err(SolverError::input_validation(
                "CONFIG.WORKER_GRID",
                format!(
                    "worker grid {rows}x{cols} needs {} workers but the group has {}",
                    rows * cols,
                    self.size()
                ),
            ));
        }
        if block_size.contains(&0) {
            return Err(SolverError::input_validation(
                "CONFIG.WORKER_GRID",
                format!(
                    "block size must be positive, got {}x{}",
                    block_size[0], block_size[1]
                ),
            ));
        }
        Ok(())
    }

    /// Contiguous object ranges, one per active worker of the linear grid.
    fn partition(&self, objects: usize) -> Vec<Range<usize>> {
        partition_objects(objects, self.size())
    }

    fn redistribute(&self, slabs: &[ColumnSlab], layout: BlockCyclicLayout) -> BlockCyclicMatrix
    where
        Self: Sized,
    {
        let tiles = self.map_ranks(layout.workers(), |worker| {
            layout.build_tile(worker, |row, col| slab_entry(slabs, row, col))
        });
        BlockCyclicMatrix { layout, tiles }
    }

    fn collective_solve(
        &self,
        matrix: BlockCyclicMatrix,
        rhs: &[Complex64],
    ) -> Result<Vec<Complex64>, LuError>
    where
        Self: Sized,
    {
        block_cyclic_lu(self, matrix)?.solve(rhs)
    }

    fn broadcast(&self, values: &[Complex64]) -> Vec<Vec<Complex64>>
    where
        Self: Sized,
    {
        self.map_ranks(self.size(), |_| values.to_vec())
    }
}

/// The trivial group: one worker on a `1 x 1` grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialGroup;

impl WorkerGroup for SerialGroup {
    fn size(&self) -> usize {
        1
    }

    fn grid(&self) -> [usize; 2] {
        [1, 1]
    }

    fn map_ranks<T, F>(&self, ranks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..ranks).map(task).collect()
    }

    fn for_each_tile<F>(&self, tiles: &mut [DenseComplexMatrix], task: F)
    where
        F: Fn(usize, &mut DenseComplexMatrix) + Send + Sync,
    {
        for (worker, tile) in tiles.iter_mut().enumerate() {
            task(worker, tile);
        }
    }
}

/// In-process group whose workers run on the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalGroup {
    size: usize,
    grid: [usize; 2],
}

impl LocalGroup {
    /// All workers on the squarest grid they fill exactly.
    pub fn new(size: usize) -> Self {
        let rows = (1..=size)
            .take_while(|rows| rows * rows <= size)
            .filter(|rows| size % rows == 0)
            .last()
            .unwrap_or(0);
        let cols = if rows == 0 { 0 } else { size / rows };
        Self::with_grid(size, [rows, cols])
    }

    pub const fn with_grid(size: usize, grid: [usize; 2]) -> Self {
        Self { size, grid }
    }
}

impl WorkerGroup for LocalGroup {
    fn size(&self) -> usize {
        self.size
    }

    fn grid(&self) -> [usize; 2] {
        self.grid
    }

    fn map_ranks<T, F>(&self, ranks: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..ranks).into_par_iter().map(task).collect()
    }

    fn for_each_tile<F>(&self, tiles: &mut [DenseComplexMatrix], task: F)
    where
        F: Fn(usize, &mut DenseComplexMatrix) + Send + Sync,
    {
        tiles
            .par_iter_mut()
            .enumerate()
            .for_each(|(worker, tile)| task(worker, tile));
    }
}

/// Splits `objects` over `min(workers, objects)` ranks; the remainder goes one
/// each to the lowest ranks.
pub fn partition_objects(objects: usize, workers: usize) -> Vec<Range<usize>> {
    let active = workers.min(objects);
    if active == 0 {
        return Vec::new();
    }
    let share = objects / active;
    let remainder = objects % active;
    let mut start = 0;
    (0..active)
        .map(|rank| {
            let len = share + usize::from(rank < remainder);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Full-height columns `first_column..first_column + columns.ncols()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSlab {
    pub first_column: usize,
    pub columns: DenseComplexMatrix,
}

fn slab_entry(slabs: &[ColumnSlab], row: usize, col: usize) -> Complex64 {
    let index = slabs.partition_point(|slab| slab.first_column + slab.columns.ncols() <= col);
    slabs
        .get(index)
        .filter(|slab| slab.first_column <= col)
        .map(|slab| slab.columns[(row, col - slab.first_column)])
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCyclicLayout {
    pub rows: usize,
    pub cols: usize,
    pub grid: [usize; 2],
    pub block: [usize; 2],
}

impl BlockCyclicLayout {
    pub const fn new(rows: usize, cols: usize, grid: [usize; 2], block: [usize; 2]) -> Self {
        Self {
            rows,
            cols,
            grid,
            block,
        }
    }

    pub const fn workers(&self) -> usize {
        self.grid[0] * self.grid[1]
    }

    pub const fn coordinates(&self, worker: usize) -> [usize; 2] {
        [worker / self.grid[1], worker % self.grid[1]]
    }

    pub const fn owner(&self, row: usize, col: usize) -> usize {
        let grid_row = (row / self.block[0]) % self.grid[0];
        let grid_col = (col / self.block[1]) % self.grid[1];
        grid_row * self.grid[1] + grid_col
    }

    pub const fn local_index(&self, row: usize, col: usize) -> (usize, usize) {
        let [mb, nb] = self.block;
        (
            (row / (mb * self.grid[0])) * mb + row % mb,
            (col / (nb * self.grid[1])) * nb + col % nb,
        )
    }

    pub const fn global_row(&self, grid_row: usize, local_row: usize) -> usize {
        let mb = self.block[0];
        (local_row / mb) * mb * self.grid[0] + grid_row * mb + local_row % mb
    }

    pub const fn global_col(&self, grid_col: usize, local_col: usize) -> usize {
        let nb = self.block[1];
        (local_col / nb) * nb * self.grid[1] + grid_col * nb + local_col % nb
    }

    pub fn local_shape(&self, worker: usize) -> (usize, usize) {
        let [grid_row, grid_col] = self.coordinates(worker);
        (
            local_extent(self.rows, self.block[0], grid_row, self.grid[0]),
            local_extent(self.cols, self.block[1], grid_col, self.grid[1]),
        )
    }

    fn build_tile(
        &self,
        worker: usize,
        entry: impl Fn(usize, usize) -> Complex64,
    ) -> DenseComplexMatrix {
        let (local_rows, local_cols) = self.local_shape(worker);
        let [grid_row, grid_col] = self.coordinates(worker);
        DenseComplexMatrix::from_fn(local_rows, local_cols, |local_row, local_col| {
            entry(
                self.global_row(grid_row, local_row),
                self.global_col(grid_col, local_col),
            )
        })
    }
}

/// Entries of a dimension of length `global` owned by grid coordinate `coordinate`.
fn local_extent(global: usize, block: usize, coordinate: usize, grid: usize) -> usize {
    let full_blocks = global / block;
    let mut extent = (full_blocks / grid) * block;
    let extra = full_blocks % grid;
    if coordinate < extra {
        extent += block;
    } else if coordinate == extra {
        extent += global % block;
    }
    extent
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockCyclicMatrix {
    layout: BlockCyclicLayout,
    tiles: Vec<DenseComplexMatrix>,
}

impl BlockCyclicMatrix {
    pub fn from_dense(layout: BlockCyclicLayout, dense: &DenseComplexMatrix) -> Self {
        let tiles = (0..layout.workers())
            .map(|worker| layout.build_tile(worker, |row, col| dense[(row, col)]))
            .collect();
        Self { layout, tiles }
    }

    pub fn layout(&self) -> BlockCyclicLayout {
        self.layout
    }

    pub fn tile(&self, worker: usize) -> &DenseComplexMatrix {
        &self.tiles[worker]
    }

    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        let (local_row, local_col) = self.layout.local_index(row, col);
        self.tiles[self.layout.owner(row, col)][(local_row, local_col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        let (local_row, local_col) = self.layout.local_index(row, col);
        let owner = self.layout.owner(row, col);
        self.tiles[owner][(local_row, local_col)] = value;
    }

    pub fn swap_rows(&mut self, lhs: usize, rhs: usize) {
        for col in 0..self.layout.cols {
            let upper = self.get(lhs, col);
            let lower = self.get(rhs, col);
            self.set(lhs, col, lower);
            self.set(rhs, col, upper);
        }
    }

    pub fn to_dense(&self) -> DenseComplexMatrix {
        DenseComplexMatrix::from_fn(self.layout.rows, self.layout.cols, |row, col| {
            self.get(row, col)
        })
    }
}

impl LinearOperator for BlockCyclicMatrix {
    fn dimension(&self) -> usize {
        self.layout.rows
    }

    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        let layout = self.layout;
        let partials: Vec<Vec<Complex64>> = self
            .tiles
            .par_iter()
            .enumerate()
            .map(|(worker, tile)| {
                let grid_col = layout.coordinates(worker)[1];
                (0..tile.nrows())
                    .map(|local_row| {
                        (0..tile.ncols())
                            .map(|local_col| {
                                tile[(local_row, local_col)]
                                    * x[layout.global_col(grid_col, local_col)]
                            })
                            .sum()
                    })
                    .collect()
            })
            .collect();

        let mut output = vec![Complex64::new(0.0, 0.0); layout.rows];
        for (worker, partial) in partials.iter().enumerate() {
            let grid_row = layout.coordinates(worker)[0];
            for (local_row, value) in partial.iter().enumerate() {
                output[layout.global_row(grid_row, local_row)] += value;
            }
        }
        output
    }
}

/// Right-looking partial-pivot LU with the trailing update done tile by tile.
///
/// Pivot choice and update arithmetic follow the single-process
/// factorization, so the packed factors agree entry for entry.
pub fn block_cyclic_lu<W: WorkerGroup>(
    group: &W,
    mut matrix: BlockCyclicMatrix,
) -> Result<LuDecomposition, LuError> {
    let layout = matrix.layout;
    if layout.rows == 0 || layout.cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if layout.rows != layout.cols {
        return Err(LuError::NonSquareMatrix {
            rows: layout.rows,
            cols: layout.cols,
        });
    }

    let dimension = layout.rows;
    let mut pivots: Vec<usize> = (0..dimension).collect();
    for pivot_col in 0..dimension {
        let mut pivot_row = pivot_col;
        let mut best_norm_sq = matrix.get(pivot_col, pivot_col).norm_sqr();
        for row in (pivot_col + 1)..dimension {
            let norm_sq = matrix.get(row, pivot_col).norm_sqr();
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
            matrix.swap_rows(pivot_col, pivot_row);
            pivots.swap(pivot_col, pivot_row);
        }

        let pivot = matrix.get(pivot_col, pivot_col);
        let multipliers: Vec<Complex64> = ((pivot_col + 1)..dimension)
            .map(|row| {
                let multiplier = matrix.get(row, pivot_col) / pivot;
                matrix.set(row, pivot_col, multiplier);
                multiplier
            })
            .collect();
        let pivot_values: Vec<Complex64> = ((pivot_col + 1)..dimension)
            .map(|col| matrix.get(pivot_col, col))
            .collect();

        group.for_each_tile(&mut matrix.tiles, |worker, tile| {
            let [grid_row, grid_col] = layout.coordinates(worker);
            for local_col in 0..tile.ncols() {
                let col = layout.global_col(grid_col, local_col);
                if col <= pivot_col {
                    continue;
                }
                let upper = pivot_values[col - pivot_col - 1];
                for local_row in 0..tile.nrows() {
                    let row = layout.global_row(grid_row, local_row);
                    if row <= pivot_col {
                        continue;
                    }
                    let updated =
                        tile[(local_row, local_col)] - multipliers[row - pivot_col - 1] * upper;
                    tile[(local_row, local_col)] = updated;
                }
            }
        });
    }

    Ok(LuDecomposition::from_parts(matrix.to_dense(), pivots))
}
