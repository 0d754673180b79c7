// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of rigid-body superposition and iterative alignment of ensembles.

use getset::{CopyGetters, Getters};
use nalgebra::Matrix3;

use crate::errors::AlignmentError;
use crate::structures::{structure::Structure, transform::Transform, vector3d::Vector3D};

/// Calculate the optimal rigid-body transformation superposing `moving` onto `target`.
///
/// Uses the Kabsch algorithm without any weighting or scaling.
/// Improper rotations (reflections) are never returned.
///
/// ## Returns
/// - The transformation that, applied to `moving`, minimizes its RMSD from `target`,
///   and the RMSD of the superposed points.
/// - `AlignmentError::InconsistentPoints` if the sets have different sizes.
/// - `AlignmentError::NoPoints` if the sets are empty.
///
/// ## Example
/// ```
/// # use vtraj_rs::prelude::*;
/// #
/// let target = vec![
///     Vector3D::new(0.0, 0.0, 0.0),
///     Vector3D::new(1.0, 0.0, 0.0),
///     Vector3D::new(0.0, 1.0, 0.0),
/// ];
/// let moving: Vec<Vector3D> = target
///     .iter()
///     .map(|p| *p + Vector3D::new(2.0, -1.0, 0.5))
///     .collect();
///
/// let (transform, rmsd) = superpose(&moving, &target).unwrap();
/// assert!(rmsd < 1e-10);
/// assert!((transform.apply(&moving[1]) - target[1]).len() < 1e-10);
/// ```
pub fn superpose(
    moving: &[Vector3D],
    target: &[Vector3D],
) -> Result<(Transform, f64), AlignmentError> {
    if moving.len() != target.len() {
        return Err(AlignmentError::InconsistentPoints(moving.len(), target.len()));
    }

    let (center_moving, center_target) =
        match (Vector3D::mean(moving.iter()), Vector3D::mean(target.iter())) {
            (Some(m), Some(t)) => (m, t),
            _ => return Err(AlignmentError::NoPoints),
        };

    let mut h = Matrix3::<f64>::zeros();
    for (p, q) in moving.iter().zip(target.iter()) {
        let p_c = *p - center_moving;
        let q_c = *q - center_target;
        h += p_c.0 * q_c.0.transpose();
    }

    let svd = h.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => panic!("FATAL VTRAJ ERROR | alignment::superpose | SVD did not produce singular vectors."),
    };

    let mut d = Matrix3::<f64>::identity();
    if (u * v_t).determinant() < 0.0 {
        d[(2, 2)] = -1.0;
    }

    // rotation mapping centered `moving` onto centered `target`
    let rotation = (u * d * v_t).transpose();
    let translation = Vector3D(center_target.0 - rotation * center_moving.0);
    let transform = Transform::new(rotation, translation);

    let sum_sq: f64 = moving
        .iter()
        .zip(target.iter())
        .map(|(p, q)| (transform.apply(p) - *q).len_squared())
        .sum();

    Ok((transform, (sum_sq / moving.len() as f64).sqrt()))
}

/// Calculate the root mean square deviation between two sets of points.
/// No fitting is performed.
///
/// ## Returns
/// - RMSD of the two sets.
/// - `AlignmentError::InconsistentPoints` if the sets have different sizes.
/// - `AlignmentError::NoPoints` if the sets are empty.
pub fn rmsd(a: &[Vector3D], b: &[Vector3D]) -> Result<f64, AlignmentError> {
    if a.len() != b.len() {
        return Err(AlignmentError::InconsistentPoints(a.len(), b.len()));
    }

    if a.is_empty() {
        return Err(AlignmentError::NoPoints);
    }

    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| (*p - *q).len_squared())
        .sum();

    Ok((sum_sq / a.len() as f64).sqrt())
}

/// Result of an iterative alignment.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct IterativeAlignment {
    /// Accumulated transformation of each member of the ensemble.
    #[getset(get = "pub")]
    transforms: Vec<Transform>,
    /// RMSD between the last two average structures.
    #[getset(get_copy = "pub")]
    rmsd: f64,
    /// Number of performed alignment iterations.
    #[getset(get_copy = "pub")]
    iterations: usize,
    /// Whether the RMSD dropped to the requested threshold.
    #[getset(get_copy = "pub")]
    converged: bool,
}

impl IterativeAlignment {
    /// Consume the result and return the transformations.
    pub fn into_transforms(self) -> Vec<Transform> {
        self.transforms
    }
}

/// Average position of every point across the ensemble.
fn average_points(ensemble: &[Vec<Vector3D>]) -> Vec<Vector3D> {
    let n_points = ensemble.first().map(|m| m.len()).unwrap_or(0);
    let mut average = vec![Vector3D::default(); n_points];

    for member in ensemble {
        for (avg, point) in average.iter_mut().zip(member.iter()) {
            *avg += *point;
        }
    }

    let n_members = ensemble.len() as f64;
    average.iter_mut().for_each(|p| *p = *p / n_members);
    average
}

/// Iteratively superpose all members of an ensemble onto their average structure.
///
/// The first member, centered at the origin, is used as the initial target.
/// In every iteration, each member is superposed onto the target and the transformation
/// is applied to its coordinates. The average of the superposed members becomes the new target.
/// Iterating stops once the RMSD between two successive targets is at most `threshold`
/// or once `max_iterations` iterations have been performed.
///
/// ## Returns
/// - `IterativeAlignment` containing the accumulated transformation of each member
///   (mapping its original coordinates onto the aligned ones), the final RMSD and the number
///   of iterations performed.
/// - `AlignmentError::EmptyEnsemble` if there are no members.
/// - `AlignmentError::NoPoints` if the members contain no points.
/// - `AlignmentError::InconsistentPoints` if the members have different sizes.
///
/// ## Notes
/// - The coordinates of the members are modified in place.
/// - At least one iteration is always performed, even if `max_iterations` is 0.
/// - A warning is logged if the alignment stops without reaching the threshold.
pub fn iterative_alignment(
    ensemble: &mut [Vec<Vector3D>],
    threshold: f64,
    max_iterations: usize,
) -> Result<IterativeAlignment, AlignmentError> {
    let first = ensemble.first().ok_or(AlignmentError::EmptyEnsemble)?;
    let n_points = first.len();
    if n_points == 0 {
        return Err(AlignmentError::NoPoints);
    }

    if let Some(member) = ensemble.iter().find(|m| m.len() != n_points) {
        return Err(AlignmentError::InconsistentPoints(member.len(), n_points));
    }

    let mut target = first.clone();
    if let Some(center) = Vector3D::mean(target.iter()) {
        target.iter_mut().for_each(|p| *p -= center);
    }

    let mut transforms = vec![Transform::identity(); ensemble.len()];
    let mut iterations = 0;

    let rms = loop {
        for (member, accumulated) in ensemble.iter_mut().zip(transforms.iter_mut()) {
            let (fit, _) = superpose(member, &target)?;
            fit.apply_all(member);
            accumulated.premultiply(&fit);
        }

        let average = average_points(ensemble);
        let rms = rmsd(&target, &average)?;
        target = average;
        iterations += 1;

        if rms <= threshold || iterations >= max_iterations {
            break rms;
        }
    };

    let converged = rms <= threshold;
    if !converged {
        log::warn!(
            "Iterative alignment of {} structures stopped after {} iterations (rmsd {:e} > threshold {:e}).",
            ensemble.len(),
            iterations,
            rms,
            threshold
        );
    }

    Ok(IterativeAlignment {
        transforms,
        rmsd: rms,
        iterations,
        converged,
    })
}

/// Iteratively align an ensemble of detached structures.
/// All atoms of the structures are used for the alignment and all of them are transformed.
///
/// See [`iterative_alignment`] for more information.
pub fn iterative_alignment_structures(
    ensemble: &mut [Structure],
    threshold: f64,
    max_iterations: usize,
) -> Result<IterativeAlignment, AlignmentError> {
    let mut coordinates: Vec<Vec<Vector3D>> = ensemble
        .iter()
        .map(|s| s.get_coordinates().to_vec())
        .collect();

    let result = iterative_alignment(&mut coordinates, threshold, max_iterations)?;

    for (structure, aligned) in ensemble.iter_mut().zip(coordinates.into_iter()) {
        structure.get_coordinates_mut().copy_from_slice(&aligned);
    }

    Ok(result)
}

/******************************/
/*         UNIT TESTS         */
/******************************/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::utilities::*;
    use float_cmp::assert_approx_eq;
    use nalgebra::{Rotation3, Vector3};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn superpose_translated() {
        let target = small_model().get_coordinates().to_vec();
        let moving: Vec<Vector3D> = target
            .iter()
            .map(|p| *p + Vector3D::new(1.5, -0.3, 2.0))
            .collect();

        let (transform, rmsd) = superpose(&moving, &target).unwrap();
        assert_approx_eq!(f64, rmsd, 0.0, epsilon = 1e-10);
        assert!(transform.approx_eq(
            &Transform::translation(Vector3D::new(-1.5, 0.3, -2.0)),
            1e-10
        ));

        let mut fitted = moving.clone();
        transform.apply_all(&mut fitted);
        compare_coordinates(&fitted, &target, 1e-10);
    }

    #[test]
    fn superpose_rotated() {
        let target = small_model().get_coordinates().to_vec();
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), 1.1)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.4);
        let perturbation = Transform::new(*rotation.matrix(), Vector3D::new(-3.0, 0.5, 0.2));

        let mut moving = target.clone();
        perturbation.apply_all(&mut moving);

        let (transform, rmsd) = superpose(&moving, &target).unwrap();
        assert_approx_eq!(f64, rmsd, 0.0, epsilon = 1e-10);
        assert!(transform.approx_eq(&perturbation.inverse(), 1e-9));
    }

    #[test]
    fn superpose_is_proper_rotation() {
        let mut rng = StdRng::seed_from_u64(1234);
        let target = random_points(&mut rng, 20);
        let moving = random_points(&mut rng, 20);

        let (transform, rmsd) = superpose(&moving, &target).unwrap();
        assert_approx_eq!(f64, transform.get_rotation().determinant(), 1.0, epsilon = 1e-10);

        // the fit can never be worse than doing nothing after centering
        let center_m = Vector3D::mean(moving.iter()).unwrap();
        let center_t = Vector3D::mean(target.iter()).unwrap();
        let centered: Vec<Vector3D> = moving.iter().map(|p| *p - center_m + center_t).collect();
        assert!(rmsd <= super::rmsd(&centered, &target).unwrap() + 1e-12);
    }

    #[test]
    fn superpose_fails() {
        let a = vec![Vector3D::default(); 3];
        let b = vec![Vector3D::default(); 4];
        assert_eq!(
            superpose(&a, &b).unwrap_err(),
            AlignmentError::InconsistentPoints(3, 4)
        );
        assert_eq!(superpose(&[], &[]).unwrap_err(), AlignmentError::NoPoints);
    }

    #[test]
    fn rmsd_simple() {
        let a = vec![Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(1.0, 0.0, 0.0)];
        let b = vec![Vector3D::new(0.0, 0.0, 1.0), Vector3D::new(1.0, 0.0, 1.0)];
        assert_approx_eq!(f64, rmsd(&a, &b).unwrap(), 1.0);
        assert_approx_eq!(f64, rmsd(&a, &a).unwrap(), 0.0);

        assert_eq!(
            rmsd(&a, &b[..1]).unwrap_err(),
            AlignmentError::InconsistentPoints(2, 1)
        );
        assert_eq!(rmsd(&[], &[]).unwrap_err(), AlignmentError::NoPoints);
    }

    #[test]
    fn iterative_rigid_copies() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = small_model().get_coordinates().to_vec();

        let originals: Vec<Vec<Vector3D>> = (0..8)
            .map(|_| {
                let mut copy = base.clone();
                random_rigid_transform(&mut rng).apply_all(&mut copy);
                copy
            })
            .collect();

        let mut ensemble = originals.clone();
        let result = iterative_alignment(&mut ensemble, 1e-8, 1000).unwrap();

        assert!(result.converged());
        assert!(result.rmsd() <= 1e-8);
        assert!(result.iterations() >= 1);
        assert!(result.iterations() < 10);
        assert_eq!(result.transforms().len(), 8);

        // all members coincide after the alignment
        for member in ensemble.iter() {
            assert!(rmsd(member, &ensemble[0]).unwrap() < 1e-8);
        }

        // accumulated transforms reproduce the aligned coordinates
        for ((original, aligned), transform) in originals
            .iter()
            .zip(ensemble.iter())
            .zip(result.transforms().iter())
        {
            let mut copy = original.clone();
            transform.apply_all(&mut copy);
            compare_coordinates(&copy, aligned, 1e-9);
        }

        // the aligned ensemble is centered at the origin
        let center = Vector3D::mean(ensemble[0].iter()).unwrap();
        assert!(center.len() < 1e-9);
    }

    #[test]
    fn iterative_noisy_copies() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = random_points(&mut rng, 30);

        let mut ensemble: Vec<Vec<Vector3D>> = (0..10)
            .map(|_| {
                let mut copy = add_noise(&mut rng, &base, 0.05);
                random_rigid_transform(&mut rng).apply_all(&mut copy);
                copy
            })
            .collect();

        let result = iterative_alignment(&mut ensemble, 1e-6, 1000).unwrap();
        assert!(result.converged());
        assert!(result.rmsd() <= 1e-6);

        // noise remains but rigid-body motion is removed
        for member in ensemble.iter() {
            assert!(rmsd(member, &ensemble[0]).unwrap() < 0.25);
        }
    }

    #[test]
    fn iterative_max_iterations() {
        let mut rng = StdRng::seed_from_u64(99);
        let base = random_points(&mut rng, 10);

        let mut ensemble: Vec<Vec<Vector3D>> = (0..5)
            .map(|_| {
                let mut copy = add_noise(&mut rng, &base, 0.2);
                random_rigid_transform(&mut rng).apply_all(&mut copy);
                copy
            })
            .collect();

        let result = iterative_alignment(&mut ensemble, 0.0, 1).unwrap();
        assert_eq!(result.iterations(), 1);

        let mut ensemble2 = ensemble.clone();
        let result = iterative_alignment(&mut ensemble2, -1.0, 0).unwrap();
        assert_eq!(result.iterations(), 1);
        assert!(!result.converged());
    }

    #[test]
    fn iterative_single_member() {
        let mut ensemble = vec![small_model().get_coordinates().to_vec()];
        let result = iterative_alignment(&mut ensemble, 1e-8, 100).unwrap();

        assert_eq!(result.iterations(), 1);
        assert_approx_eq!(f64, result.rmsd(), 0.0, epsilon = 1e-12);

        let center = Vector3D::mean(ensemble[0].iter()).unwrap();
        assert!(center.len() < 1e-12);
    }

    #[test]
    fn iterative_fails() {
        let mut empty: Vec<Vec<Vector3D>> = vec![];
        assert_eq!(
            iterative_alignment(&mut empty, 1e-8, 10).unwrap_err(),
            AlignmentError::EmptyEnsemble
        );

        let mut no_points = vec![vec![], vec![]];
        assert_eq!(
            iterative_alignment(&mut no_points, 1e-8, 10).unwrap_err(),
            AlignmentError::NoPoints
        );

        let mut inconsistent = vec![
            vec![Vector3D::default(); 3],
            vec![Vector3D::default(); 3],
            vec![Vector3D::default(); 2],
        ];
        assert_eq!(
            iterative_alignment(&mut inconsistent, 1e-8, 10).unwrap_err(),
            AlignmentError::InconsistentPoints(2, 3)
        );
    }

    #[test]
    fn iterative_structures() {
        let mut rng = StdRng::seed_from_u64(2025);
        let base = small_model().into_shared().all().detach();

        let mut ensemble: Vec<Structure> = (0..4)
            .map(|_| {
                let mut copy = base.clone();
                copy.apply_transform(&random_rigid_transform(&mut rng));
                copy
            })
            .collect();

        let result = iterative_alignment_structures(&mut ensemble, 1e-8, 1000).unwrap();
        assert_eq!(result.transforms().len(), 4);

        for structure in ensemble.iter() {
            assert_eq!(structure.get_atoms(), base.get_atoms());
            assert!(rmsd(structure.get_coordinates(), ensemble[0].get_coordinates()).unwrap() < 1e-8);
            // shape of the structure is preserved
            let (_, fit) = superpose(structure.get_coordinates(), base.get_coordinates()).unwrap();
            assert!(fit < 1e-10);
        }
    }
}
