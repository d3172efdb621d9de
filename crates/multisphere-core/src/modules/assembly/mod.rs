//! Global block system `S X = Q` over all scatterers.
//!
//! Block `(i, j)` couples scatterer `j` to scatterer `i`; each block is
//! `2B x 2B` with the `M` waves first. The direct formulation solves for
//! scattered coefficients, the indirect one for exciting fields.

pub mod distributed;

pub use distributed::{distributed_scattering_matrix, scattering_slab};

use crate::domain::{SolverError, SolverMethod, SolverResult, displacement};
use crate::modules::coupling::Coupling;
use crate::modules::indexing::object_block_size;
use crate::modules::registry::Scatterer;
use crate::modules::traits::{Excitation, ScattererRegistry};
use crate::numerics::special::{DenseComplexMatrix, identity, matvec, multiply};
use num_complex::Complex64;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSystem {
    pub matrix: DenseComplexMatrix,
    pub rhs: Vec<Complex64>,
    pub method: SolverMethod,
    pub n_max: usize,
}

impl GlobalSystem {
    pub fn dimension(&self) -> usize {
        self.rhs.len()
    }

    pub fn object_count(&self) -> usize {
        self.dimension() / object_block_size(self.n_max)
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// Checks that every scatterer carries `n_max`, the solver degree.
pub fn common_degree<G: ScattererRegistry + ?Sized>(registry: &G, n_max: usize) -> SolverResult<usize> {
    if n_max == 0 {
        return Err(SolverError::input_validation(
            "CONFIG.DEGREE",
            "solver nMax must be at least 1",
        ));
    }
    match registry
        .objects()
        .iter()
        .enumerate()
        .find(|(_, object)| object.n_max != n_max)
    {
        Some((index, object)) => Err(SolverError::input_validation(
            "CONFIG.MIXED_DEGREE",
            format!(
                "scatterer {index} has nMax={}, expected {n_max}",
                object.n_max
            ),
        )),
        None => Ok(n_max),
    }
}

/// Outgoing waves about `source` to regular waves about `target`.
pub fn translation_operator(
    target: &Scatterer,
    source: &Scatterer,
    wavenumber: Complex64,
    n_max: usize,
) -> DenseComplexMatrix {
    Coupling::new(displacement(target.center, source.center), wavenumber, n_max)
        .translation_operator()
}

/// Block `(row, col)` of the indirect matrix given `−T_col`.
pub fn scattering_block<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    row: usize,
    col: usize,
    negated_local: &DenseComplexMatrix,
    n_max: usize,
) -> DenseComplexMatrix {
    if row == col {
        return identity(object_block_size(n_max));
    }
    let objects = registry.objects();
    let translation =
        translation_operator(&objects[row], &objects[col], excitation.wavenumber(), n_max);
    multiply(&translation, negated_local)
}

/// Indirect system matrix: identity diagonal, `C(i, j) · (−T_j)` elsewhere.
pub fn preconditioned_scattering_matrix<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    n_max: usize,
) -> SolverResult<DenseComplexMatrix> {
    common_degree(registry, n_max)?;
    let count = registry.objects().len();
    Ok(scattering_slab(registry, excitation, 0..count, n_max))
}

/// Incident-field coefficients about every scatterer, concatenated.
pub fn source_vector<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    n_max: usize,
) -> SolverResult<Vec<Complex64>> {
    common_degree(registry, n_max)?;
    Ok(registry
        .objects()
        .iter()
        .flat_map(|object| excitation.incoming_local(object.center, n_max))
        .collect())
}

/// Source coefficients already staged on the registry, concatenated.
pub fn staged_source_vector<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    n_max: usize,
) -> SolverResult<Vec<Complex64>> {
    common_degree(registry, n_max)?;
    Ok((0..registry.objects().len())
        .flat_map(|index| registry.source_local(index, excitation, n_max))
        .collect())
}

/// Second-harmonic sources derived from first-harmonic internal
/// coefficients, on a copy of the registry.
pub fn local_source_vector<G: ScattererRegistry + Clone>(
    registry: &G,
    excitation: &dyn Excitation,
    first_harmonic_internal: &[Complex64],
    n_max: usize,
) -> SolverResult<Vec<Complex64>> {
    common_degree(registry, n_max)?;
    let mut staged = registry.clone();
    staged.set_sources(excitation, first_harmonic_internal, n_max);
    staged_source_vector(&staged, excitation, n_max)
}

/// `S_ii = I`, `S_ij = −T_i · C(i, j)`, `Q_i = T_i · incoming_i`.
pub fn direct_system<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    incoming: &[Complex64],
    n_max: usize,
) -> SolverResult<GlobalSystem> {
    common_degree(registry, n_max)?;
    let objects = registry.objects();
    let block = object_block_size(n_max);
    let dimension = block * objects.len();
    if incoming.len() != dimension {
        return Err(SolverError::internal(
            "ASSEMBLY.SOURCE_LENGTH",
            format!(
                "incoming coefficients have length {}, expected {dimension}",
                incoming.len()
            ),
        ));
    }
    let mut matrix = DenseComplexMatrix::zeros(dimension, dimension);
    let mut rhs = vec![Complex64::new(0.0, 0.0); dimension];
    let wavenumber = excitation.wavenumber();

    for row in 0..objects.len() {
        let local = registry.local_operator(excitation.omega(), row, n_max);
        let scattered = matvec(&local, &incoming[row * block..(row + 1) * block]);
        rhs[row * block..(row + 1) * block].copy_from_slice(&scattered);

        for col in 0..objects.len() {
            let entries = if row == col {
                identity(block)
            } else {
                let translation = translation_operator(&objects[row], &objects[col], wavenumber, n_max);
                negated(&multiply(&local, &translation))
            };
            copy_block(&mut matrix, row * block, col * block, &entries);
        }
    }

    debug!(objects = objects.len(), dimension, "assembled direct system");
    Ok(GlobalSystem {
        matrix,
        rhs,
        method: SolverMethod::Direct,
        n_max,
    })
}

/// `S` from [`preconditioned_scattering_matrix`], `Q` the incoming field.
pub fn indirect_system<G: ScattererRegistry + ?Sized>(
    registry: &G,
    excitation: &dyn Excitation,
    incoming: &[Complex64],
    n_max: usize,
) -> SolverResult<GlobalSystem> {
    let matrix = preconditioned_scattering_matrix(registry, excitation, n_max)?;
    debug!(
        objects = registry.objects().len(),
        dimension = incoming.len(),
        "assembled indirect system"
    );
    Ok(GlobalSystem {
        matrix,
        rhs: incoming.to_vec(),
        method: SolverMethod::Indirect,
        n_max,
    })
}

pub(crate) fn negated(matrix: &DenseComplexMatrix) -> DenseComplexMatrix {
    DenseComplexMatrix::from_fn(matrix.nrows(), matrix.ncols(), |row, col| -matrix[(row, col)])
}

pub(crate) fn copy_block(
    target: &mut DenseComplexMatrix,
    row_offset: usize,
    col_offset: usize,
    block: &DenseComplexMatrix,
) {
    for col in 0..block.ncols() {
        for row in 0..block.nrows() {
            target[(row_offset + row, col_offset + col)] = block[(row, col)];
        }
    }
}
