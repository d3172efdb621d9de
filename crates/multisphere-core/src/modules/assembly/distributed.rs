//! Indirect matrix assembled in column slabs, one slab per worker.

use super::{common_degree, copy_block, negated, scattering_block};
use crate::domain::SolverResult;
use crate::modules::backend::{BlockCyclicLayout, BlockCyclicMatrix, ColumnSlab, WorkerGroup};
use crate::modules::indexing::object_block_size;
use crate::modules::traits::{Excitation, ScattererRegistry};
use crate::numerics::special::DenseComplexMatrix;
use std::ops::Range;
use tracing::debug;

/// Full-height columns of the indirect matrix for the scatterers in `columns`.
pub fn scattering_slab<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    columns: Range<usize>,
    n_max: usize,
) -> DenseComplexMatrix {
    let block = object_block_size(n_max);
    let count = registry.objects().len();
    let mut slab = DenseComplexMatrix::zeros(block * count, block * columns.len());
    for (offset, col) in columns.enumerate() {
        let negated_local = negated(&registry.local_operator(excitation.omega(), col, n_max));
        for row in 0..count {
            let entries = scattering_block(registry, excitation, row, col, &negated_local, n_max);
            copy_block(&mut slab, row * block, offset * block, &entries);
        }
    }
    slab
}

/// Each worker of the linear grid builds the columns of its scatterers; the
/// slabs are then moved onto the `block_size` block-cyclic layout of the
/// group's grid.
pub fn distributed_scattering_matrix<G, W>(
    group: &W,
    registry: &G,
    excitation: &dyn Excitation,
    n_max: usize,
    block_size: [usize; 2],
) -> SolverResult<BlockCyclicMatrix>
where
    G: ScattererRegistry + ?Sized,
    W: WorkerGroup,
{
    common_degree(registry, n_max)?;
    group.validate(block_size)?;

    let count = registry.objects().len();
    let block = object_block_size(n_max);
    let ranges = group.partition(count);
    let slabs = group.map_ranks(ranges.len(), |rank| {
        let objects = ranges[rank].clone();
        ColumnSlab {
            first_column: objects.start * block,
            columns: scattering_slab(registry, excitation, objects, n_max),
        }
    });

    let dimension = block * count;
    debug!(
        objects = count,
        slabs = slabs.len(),
        dimension,
        grid = ?group.grid(),
        "assembled column slabs"
    );
    let layout = BlockCyclicLayout::new(dimension, dimension, group.grid(), block_size);
    Ok(group.redistribute(&slabs, layout))
}
