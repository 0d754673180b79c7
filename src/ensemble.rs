// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of calculations over ensembles of structures:
//! average structures, coordinate matrices, their singular value decomposition and
//! comparisons of subspaces.

use getset::Getters;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::errors::{EnsembleError, TrajError};
use crate::structures::{structure::Structure, vector3d::Vector3D};
use crate::trajectory::aligned::AlignedVirtualTrajectory;
use crate::trajectory::single::SingleTrajectory;
use crate::trajectory::virtual_traj::VirtualTrajectory;

/// Collection of structures which can be read one by one.
///
/// Implemented by all trajectories (frames are detached) and by collections of structures.
pub trait EnsembleRead {
    /// Number of structures in the ensemble.
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError>;

    /// Get a detached copy of the structure with the given index.
    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError>;

    /// Get the coordinates of the structure with the given index.
    fn ensemble_coordinates(&mut self, index: usize) -> Result<Vec<Vector3D>, EnsembleError> {
        Ok(self.ensemble_structure(index)?.get_coordinates().to_vec())
    }
}

impl EnsembleRead for SingleTrajectory {
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError> {
        Ok(self.n_frames())
    }

    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError> {
        Ok(self.load_frame(index)?.detach())
    }

    fn ensemble_coordinates(&mut self, index: usize) -> Result<Vec<Vector3D>, EnsembleError> {
        Ok(self.load_frame(index)?.coordinates())
    }
}

impl EnsembleRead for VirtualTrajectory {
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError> {
        Ok(self.n_frames()?)
    }

    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError> {
        Ok(self.load_frame(index)?.detach())
    }

    fn ensemble_coordinates(&mut self, index: usize) -> Result<Vec<Vector3D>, EnsembleError> {
        Ok(self.load_frame(index)?.coordinates())
    }
}

impl EnsembleRead for AlignedVirtualTrajectory {
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError> {
        Ok(self.n_frames()?)
    }

    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError> {
        Ok(self.load_frame(index)?.detach())
    }

    fn ensemble_coordinates(&mut self, index: usize) -> Result<Vec<Vector3D>, EnsembleError> {
        Ok(self.load_frame(index)?.coordinates())
    }
}

impl EnsembleRead for [Structure] {
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError> {
        Ok(self.len())
    }

    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError> {
        self.get(index)
            .cloned()
            .ok_or(EnsembleError::Traj(TrajError::IndexOutOfRange(
                index as isize,
                self.len(),
            )))
    }
}

impl EnsembleRead for Vec<Structure> {
    fn ensemble_len(&mut self) -> Result<usize, EnsembleError> {
        self.as_mut_slice().ensemble_len()
    }

    fn ensemble_structure(&mut self, index: usize) -> Result<Structure, EnsembleError> {
        self.as_mut_slice().ensemble_structure(index)
    }
}

/// Read the coordinates of all structures of the ensemble checking that they have the same size.
fn collect_coordinates<E: EnsembleRead + ?Sized>(
    ensemble: &mut E,
) -> Result<Vec<Vec<Vector3D>>, EnsembleError> {
    let n_structures = ensemble.ensemble_len()?;
    if n_structures == 0 {
        return Err(EnsembleError::EmptyEnsemble);
    }

    let mut collected: Vec<Vec<Vector3D>> = Vec::with_capacity(n_structures);
    for i in 0..n_structures {
        let coordinates = ensemble.ensemble_coordinates(i)?;
        if let Some(first) = collected.first() {
            if first.len() != coordinates.len() {
                return Err(EnsembleError::InconsistentAtoms(
                    i,
                    coordinates.len(),
                    first.len(),
                ));
            }
        }

        collected.push(coordinates);
    }

    Ok(collected)
}

/// Average position of each atom over the collected coordinates.
fn mean_coordinates(collected: &[Vec<Vector3D>]) -> Vec<Vector3D> {
    let n_atoms = collected.first().map(|c| c.len()).unwrap_or(0);
    let mut mean = vec![Vector3D::default(); n_atoms];
    for coordinates in collected {
        for (m, c) in mean.iter_mut().zip(coordinates.iter()) {
            *m += *c;
        }
    }

    let n_structures = collected.len() as f64;
    mean.iter_mut().for_each(|m| *m = *m / n_structures);
    mean
}

/// Calculate the average structure of an ensemble.
///
/// Atoms of the average structure are taken from the first structure of the ensemble.
///
/// ## Returns
/// - `Structure` with the average coordinates.
/// - `EnsembleError::EmptyEnsemble` if the ensemble contains no structures.
/// - `EnsembleError::InconsistentAtoms` if the structures have different numbers of atoms.
///
/// ## Example
/// ```no_run
/// # use vtraj_rs::prelude::*;
/// #
/// let model = Model::from_gro("system.gro").unwrap().into_shared();
/// let mut traj = SingleTrajectory::open_gro(
///     "run.gro",
///     model,
///     TrajectoryOptions::default().with_subset("@protein"),
/// )
/// .unwrap();
///
/// let average = average_structure(&mut traj).unwrap();
/// average.write_gro("average.gro").unwrap();
/// ```
///
/// ## Notes
/// - For trajectories, frames are loaded into their models.
/// - Average structure of an unaligned trajectory is rarely meaningful.
///   Use `AlignedVirtualTrajectory` to remove rigid-body motion first.
pub fn average_structure<E: EnsembleRead + ?Sized>(
    ensemble: &mut E,
) -> Result<Structure, EnsembleError> {
    let n_structures = ensemble.ensemble_len()?;
    if n_structures == 0 {
        return Err(EnsembleError::EmptyEnsemble);
    }

    let mut structure = ensemble.ensemble_structure(0)?;
    let mut sums = structure.get_coordinates().to_vec();

    for i in 1..n_structures {
        let coordinates = ensemble.ensemble_coordinates(i)?;
        if coordinates.len() != sums.len() {
            return Err(EnsembleError::InconsistentAtoms(
                i,
                coordinates.len(),
                sums.len(),
            ));
        }

        for (sum, c) in sums.iter_mut().zip(coordinates.iter()) {
            *sum += *c;
        }
    }

    let n_structures = n_structures as f64;
    for (position, sum) in structure.get_coordinates_mut().iter_mut().zip(sums) {
        *position = sum / n_structures;
    }

    Ok(structure)
}

/// Construct the coordinate matrix of an ensemble.
///
/// The matrix has `3 * n_atoms` rows and one column for each structure.
/// Each column contains the coordinates of the structure in the order `x0 y0 z0 x1 y1 z1 ...`.
///
/// ## Returns
/// - Coordinate matrix.
/// - `EnsembleError::EmptyEnsemble` if the ensemble contains no structures.
/// - `EnsembleError::InconsistentAtoms` if the structures have different numbers of atoms.
pub fn coordinate_matrix<E: EnsembleRead + ?Sized>(
    ensemble: &mut E,
) -> Result<Array2<f64>, EnsembleError> {
    let collected = collect_coordinates(ensemble)?;
    Ok(build_matrix(&collected))
}

fn build_matrix(collected: &[Vec<Vector3D>]) -> Array2<f64> {
    let n_rows = collected.first().map(|c| 3 * c.len()).unwrap_or(0);
    Array2::from_shape_fn((n_rows, collected.len()), |(row, col)| {
        collected[col][row / 3][row % 3]
    })
}

/// Singular value decomposition of the coordinate matrix of an ensemble.
#[derive(Debug, Clone, Getters)]
pub struct EnsembleSvd {
    /// Left singular vectors (columns). Shape `(3 * n_atoms, n_modes)`.
    #[getset(get = "pub")]
    left: Array2<f64>,
    /// Singular values in descending order.
    #[getset(get = "pub")]
    singular_values: Array1<f64>,
    /// Right singular vectors (rows). Shape `(n_modes, n_structures)`.
    #[getset(get = "pub")]
    right_t: Array2<f64>,
    /// Average position of each atom which has been subtracted before the decomposition.
    #[getset(get = "pub")]
    mean: Vec<Vector3D>,
}

/// Calculate the singular value decomposition of the mean-centered coordinate matrix of an ensemble.
///
/// The number of modes is the smaller of `3 * n_atoms` and the number of structures.
/// For an aligned ensemble, the left singular vectors are the principal components
/// and the squared singular values are proportional to their variances.
///
/// ## Returns
/// - `EnsembleSvd` structure.
/// - `EnsembleError::EmptyEnsemble` if the ensemble contains no structures.
/// - `EnsembleError::InconsistentAtoms` if the structures have different numbers of atoms.
/// - `EnsembleError::SvdFailed` if the decomposition could not be calculated.
pub fn svd<E: EnsembleRead + ?Sized>(ensemble: &mut E) -> Result<EnsembleSvd, EnsembleError> {
    let collected = collect_coordinates(ensemble)?;
    let mean = mean_coordinates(&collected);

    let matrix = build_matrix(&collected);
    let (n_rows, n_cols) = matrix.dim();
    let centered = DMatrix::from_fn(n_rows, n_cols, |row, col| {
        matrix[[row, col]] - mean[row / 3][row % 3]
    });

    let decomposition = centered.svd(true, true);
    let (u, v_t) = match (decomposition.u, decomposition.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(EnsembleError::SvdFailed),
    };

    let values = decomposition.singular_values;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    log::debug!(
        "Decomposed coordinate matrix of {} structures with {} rows.",
        n_cols,
        n_rows
    );

    Ok(EnsembleSvd {
        left: Array2::from_shape_fn((n_rows, order.len()), |(row, mode)| {
            u[(row, order[mode])]
        }),
        singular_values: order.iter().map(|&mode| values[mode]).collect(),
        right_t: Array2::from_shape_fn((order.len(), n_cols), |(mode, col)| {
            v_t[(order[mode], col)]
        }),
        mean,
    })
}

/// Calculate the subspace overlap of two sets of vectors (stored as columns).
///
/// The overlap is `sum_i sum_j (a_i . b_j)^2 / n` for the first `n_modes` columns of both matrices.
/// If `n_modes` is 0, all columns of `a` are used.
///
/// ## Returns
/// - Overlap between 0 (orthogonal subspaces) and 1 (identical subspaces) for orthonormal vectors.
/// - `EnsembleError::DimensionMismatch` if the matrices have different numbers of rows.
/// - `EnsembleError::TooManyModes` if any of the matrices has fewer than `n_modes` columns.
pub fn subspace_overlap(
    a: &Array2<f64>,
    b: &Array2<f64>,
    n_modes: usize,
) -> Result<f64, EnsembleError> {
    if a.nrows() != b.nrows() {
        return Err(EnsembleError::DimensionMismatch(a.nrows(), b.nrows()));
    }

    let n_modes = if n_modes == 0 { a.ncols() } else { n_modes };
    let available = a.ncols().min(b.ncols());
    if n_modes > available {
        return Err(EnsembleError::TooManyModes(n_modes, available));
    }

    if n_modes == 0 {
        return Ok(0.0);
    }

    let mut sum = 0.0;
    for i in 0..n_modes {
        for j in 0..n_modes {
            let dot = a.column(i).dot(&b.column(j));
            sum += dot * dot;
        }
    }

    Ok(sum / n_modes as f64)
}

/// Calculate the covariance overlap of two sets of eigenpairs.
///
/// Eigenvectors are stored as columns of `u_a` and `u_b`, the corresponding eigenvalues in
/// `lambda_a` and `lambda_b`. Only the first `lambda.len()` eigenvectors of each set are used.
///
/// Note that the eigenvalues must be scaled appropriately. When comparing ensembles
/// using [`svd`], use the squared singular values.
///
/// ## Returns
/// - Overlap between 0 (no overlap) and 1 (identical covariances).
/// - `EnsembleError::DimensionMismatch` if the eigenvectors have different lengths.
/// - `EnsembleError::TooManyModes` if there are more eigenvalues than eigenvectors.
pub fn covariance_overlap(
    lambda_a: &Array1<f64>,
    u_a: &Array2<f64>,
    lambda_b: &Array1<f64>,
    u_b: &Array2<f64>,
) -> Result<f64, EnsembleError> {
    if u_a.nrows() != u_b.nrows() {
        return Err(EnsembleError::DimensionMismatch(u_a.nrows(), u_b.nrows()));
    }

    if lambda_a.len() > u_a.ncols() {
        return Err(EnsembleError::TooManyModes(lambda_a.len(), u_a.ncols()));
    }

    if lambda_b.len() > u_b.ncols() {
        return Err(EnsembleError::TooManyModes(lambda_b.len(), u_b.ncols()));
    }

    let mut cross = 0.0;
    for (i, la) in lambda_a.iter().enumerate() {
        for (j, lb) in lambda_b.iter().enumerate() {
            let dot = u_a.column(i).dot(&u_b.column(j));
            cross += (la * lb).abs().sqrt() * dot * dot;
        }
    }

    let total = lambda_a.sum() + lambda_b.sum();
    if total == 0.0 {
        return Ok(1.0);
    }

    Ok(1.0 - ((total - 2.0 * cross).abs() / total).sqrt())
}

/******************************/
/*         UNIT TESTS         */
/******************************/
