// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a virtual trajectory whose frames are superposed
//! either onto each other or onto a reference structure.

use hashbrown::HashMap;

use crate::alignment::{iterative_alignment, superpose};
use crate::auxiliary::{
    normalize_index, DEFAULT_ALIGNMENT_SELECTION, DEFAULT_ALIGNMENT_THRESHOLD,
    DEFAULT_MAX_ITERATIONS,
};
use crate::errors::{AlignmentError, SelectError, TrajError};
use crate::progress::{ProgressPrinter, ProgressStatus};
use crate::structures::{
    model::SharedModel,
    structure::Structure,
    subset::{Frame, Subset},
    transform::Transform,
    vector3d::Vector3D,
};
use crate::trajectory::selection::{FrameSelection, FrameSlice};
use crate::trajectory::single::SingleTrajectory;
use crate::trajectory::virtual_traj::{FrameLocation, VirtualTrajectory};
use crate::trajectory::{FrameIterator, FrameRead};

/// Options controlling the alignment of an `AlignedVirtualTrajectory`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOptions {
    selection: String,
    reference: Option<Structure>,
    threshold: f64,
    max_iterations: usize,
}

impl Default for AlignOptions {
    /// Iterative alignment of alpha carbons.
    fn default() -> Self {
        AlignOptions {
            selection: DEFAULT_ALIGNMENT_SELECTION.to_owned(),
            reference: None,
            threshold: DEFAULT_ALIGNMENT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AlignOptions {
    /// Selection query defining the atoms used for the alignment.
    pub fn with_selection(mut self, query: &str) -> Self {
        self.selection = query.to_owned();
        self
    }

    /// Superpose every frame onto the reference instead of aligning the frames iteratively.
    /// The reference must contain exactly the atoms matched by the alignment selection.
    pub fn with_reference(mut self, reference: Structure) -> Self {
        self.reference = Some(reference);
        self
    }

    /// RMSD between two successive average structures at which the iterative alignment stops.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Maximal number of iterations of the iterative alignment.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn get_selection(&self) -> &str {
        &self.selection
    }

    pub fn get_reference(&self) -> Option<&Structure> {
        self.reference.as_ref()
    }

    pub fn get_threshold(&self) -> f64 {
        self.threshold
    }

    pub fn get_max_iterations(&self) -> usize {
        self.max_iterations
    }
}

/// Results of the last successful alignment pass.
#[derive(Debug, Clone)]
struct AlignmentCache {
    transforms: Vec<Transform>,
    rmsd: f64,
    iterations: usize,
    /// RMSD of each frame from the reference after superposition. Only in reference mode.
    residuals: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
enum AlignmentState {
    Unaligned,
    Aligned(AlignmentCache),
}

/// Virtual trajectory with every frame superposed.
///
/// Without a reference structure, all frames are iteratively aligned onto their average
/// structure. With a reference structure, each frame is superposed onto the reference.
/// The alignment is calculated for the atoms matching the alignment selection
/// (evaluated on the whole model of each member trajectory) and the resulting transformation
/// is applied to the atoms of the returned frame.
///
/// The alignment is calculated lazily: once the frames are first accessed after construction
/// or after any change invalidating the alignment.
///
/// ## Example
/// ```no_run
/// # use vtraj_rs::prelude::*;
/// #
/// let model = Model::from_gro("system.gro").unwrap().into_shared();
/// let traj1 = SingleTrajectory::open_gro("run1.gro", model.clone(), TrajectoryOptions::default()).unwrap();
/// let traj2 = SingleTrajectory::open_gro("run2.gro", model, TrajectoryOptions::default()).unwrap();
///
/// let mut aligned = AlignedVirtualTrajectory::new(
///     vec![traj1, traj2],
///     FrameSelection::default(),
///     AlignOptions::default().with_selection("@backbone"),
/// );
///
/// println!("Final RMSD: {} nm", aligned.rmsd().unwrap());
/// let average = average_structure(&mut aligned).unwrap();
/// ```
pub struct AlignedVirtualTrajectory {
    trajectory: VirtualTrajectory,
    options: AlignOptions,
    state: AlignmentState,
    selections: HashMap<usize, Subset>,
    passes: usize,
    progress_printer: Option<ProgressPrinter>,
    /// `None` once the iteration has been stopped by a failed alignment.
    cursor: Option<usize>,
    current: Option<usize>,
}

impl AlignedVirtualTrajectory {
    /// Create a new aligned virtual trajectory.
    /// The alignment is not calculated until the frames are accessed.
    pub fn new(
        trajectories: Vec<SingleTrajectory>,
        frames: FrameSelection,
        options: AlignOptions,
    ) -> Self {
        AlignedVirtualTrajectory::from_virtual(VirtualTrajectory::new(trajectories, frames), options)
    }

    /// Create a new aligned virtual trajectory from a virtual trajectory.
    pub fn from_virtual(trajectory: VirtualTrajectory, options: AlignOptions) -> Self {
        AlignedVirtualTrajectory {
            trajectory,
            options,
            state: AlignmentState::Unaligned,
            selections: HashMap::new(),
            passes: 0,
            progress_printer: None,
            cursor: Some(0),
            current: None,
        }
    }

    /// Report the progress of the alignment using the provided printer.
    pub fn print_progress(mut self, printer: ProgressPrinter) -> Self {
        self.progress_printer = Some(printer);
        self
    }

    /// Add a trajectory to the end. Requires realignment.
    pub fn append(&mut self, trajectory: SingleTrajectory) {
        self.trajectory.append(trajectory);
        self.invalidate();
    }

    /// Add several trajectories to the end. Requires realignment.
    pub fn extend(&mut self, trajectories: impl IntoIterator<Item = SingleTrajectory>) {
        self.trajectory.extend(trajectories);
        self.invalidate();
    }

    /// Change the frame selection applied to the concatenated trajectories. Requires realignment.
    pub fn set_frames(&mut self, frames: FrameSelection) {
        self.trajectory.set_frames(frames);
        self.invalidate();
    }

    /// Change the atoms returned by every member trajectory.
    /// Does not affect the alignment which always uses the alignment selection.
    pub fn set_subset(&mut self, query: Option<&str>) -> Result<(), SelectError> {
        self.trajectory.set_subset(query)
    }

    /// Change the selection of atoms used for the alignment. Requires realignment.
    pub fn align_with(&mut self, query: &str) {
        self.options.selection = query.to_owned();
        self.selections.clear();
        self.invalidate();
    }

    /// Set a reference structure to superpose the frames onto.
    /// `None` switches back to the iterative alignment. Requires realignment.
    ///
    /// ## Returns
    /// - `Ok` if the reference has been set.
    /// - `AlignmentError::InconsistentSelection` if the alignment selection of any member
    ///   trajectory does not match the number of atoms of the reference.
    /// - `AlignmentError::EmptySelection` or `AlignmentError::Traj` if the alignment selection
    ///   selects no atoms or is invalid.
    ///
    /// ## Notes
    /// - On error, the previous reference is kept.
    pub fn set_reference(&mut self, reference: Option<Structure>) -> Result<(), AlignmentError> {
        if let Some(reference) = &reference {
            let members: Vec<(SharedModel, String)> = self
                .trajectory
                .trajectories()
                .iter()
                .map(|traj| (traj.model().clone(), traj.name().to_owned()))
                .collect();

            for (model, name) in members {
                let found = self.alignment_subset(&model)?.len();
                if found == 0 {
                    return Err(AlignmentError::EmptySelection(
                        self.options.selection.clone(),
                        name,
                    ));
                }

                if found != reference.get_n_atoms() {
                    return Err(AlignmentError::InconsistentSelection {
                        selection: self.options.selection.clone(),
                        trajectory: name,
                        expected: reference.get_n_atoms(),
                        found,
                    });
                }
            }
        }

        self.options.reference = reference;
        self.invalidate();
        Ok(())
    }

    /// Get the alignment options.
    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    /// Get the underlying virtual trajectory.
    pub fn virtual_trajectory(&self) -> &VirtualTrajectory {
        &self.trajectory
    }

    /// Get the member trajectories.
    pub fn trajectories(&self) -> &[SingleTrajectory] {
        self.trajectory.trajectories()
    }

    pub fn n_trajectories(&self) -> usize {
        self.trajectory.n_trajectories()
    }

    /// Get the number of frames. Does not require the alignment.
    pub fn n_frames(&mut self) -> Result<usize, TrajError> {
        self.trajectory.n_frames()
    }

    /// Check whether the current alignment is valid.
    pub fn is_aligned(&self) -> bool {
        matches!(self.state, AlignmentState::Aligned(_))
    }

    /// Get the number of completed alignment passes.
    pub fn alignment_passes(&self) -> usize {
        self.passes
    }

    /// Calculate the alignment if it is not valid.
    ///
    /// This is called implicitly by every method accessing the aligned frames or the alignment results.
    ///
    /// ## Returns
    /// - `Ok` if the alignment is valid.
    /// - `AlignmentError::EmptySelection` if the alignment selection matches no atoms in a model.
    /// - `AlignmentError::InconsistentSelection` if the alignment selection matches different
    ///   numbers of atoms in different frames or a different number of atoms than the reference contains.
    /// - `AlignmentError::Traj` if the frames could not be read.
    ///
    /// ## Notes
    /// - On failure, the trajectory stays unaligned and the alignment is attempted again on next access.
    /// - The alignment of a trajectory without frames is trivially valid.
    pub fn align(&mut self) -> Result<(), AlignmentError> {
        if self.is_aligned() {
            return Ok(());
        }

        let n_frames = self.trajectory.n_frames()?;
        self.report(ProgressStatus::Running, 0, n_frames);

        match self.calculate_alignment(n_frames) {
            Ok(cache) => {
                log::info!(
                    "Aligned {} frames of {} trajectories using '{}' ({}): rmsd = {:e} nm, iterations = {}.",
                    n_frames,
                    self.trajectory.n_trajectories(),
                    self.options.selection,
                    if self.options.reference.is_some() {
                        "reference"
                    } else {
                        "iterative"
                    },
                    cache.rmsd,
                    cache.iterations,
                );

                self.report(ProgressStatus::Completed, n_frames, n_frames);
                self.state = AlignmentState::Aligned(cache);
                self.passes += 1;
                Ok(())
            }
            Err(e) => {
                self.report(ProgressStatus::Failed, 0, n_frames);
                Err(e)
            }
        }
    }

    /// Get the transformation applied to each frame.
    pub fn transforms(&mut self) -> Result<&[Transform], AlignmentError> {
        Ok(&self.cache()?.transforms)
    }

    /// Get the RMSD between the last two average structures of the iterative alignment.
    /// Always 0 when aligning onto a reference structure.
    pub fn rmsd(&mut self) -> Result<f64, AlignmentError> {
        Ok(self.cache()?.rmsd)
    }

    /// Get the number of iterations of the iterative alignment.
    /// Always 0 when aligning onto a reference structure.
    pub fn iterations(&mut self) -> Result<usize, AlignmentError> {
        Ok(self.cache()?.iterations)
    }

    /// Get the RMSD of each superposed frame from the reference structure.
    /// `None` if no reference structure is used.
    pub fn reference_residuals(&mut self) -> Result<Option<&[f64]>, AlignmentError> {
        Ok(self.cache()?.residuals.as_deref())
    }

    /// Get the average RMSD of the superposed frames from the reference structure.
    /// `None` if no reference structure is used or if there are no frames.
    pub fn mean_reference_residual(&mut self) -> Result<Option<f64>, AlignmentError> {
        Ok(self
            .cache()?
            .residuals
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(|r| r.iter().sum::<f64>() / r.len() as f64))
    }

    /// Load the aligned frame with the given index.
    /// Negative indices are counted from the end of the trajectory.
    ///
    /// ## Returns
    /// - `Frame` aliasing the coordinates of the member model with the alignment applied in place.
    /// - `AlignmentError` if the trajectory could not be aligned or the frame does not exist.
    pub fn get(&mut self, index: isize) -> Result<Frame, AlignmentError> {
        self.align()?;
        let n_frames = self.trajectory.n_frames()?;
        let i = normalize_index(index, n_frames)
            .ok_or(TrajError::IndexOutOfRange(index, n_frames))?;
        self.load_frame(i)
    }

    /// Load the aligned frame with the given (non-negative) index.
    pub fn load_frame(&mut self, index: usize) -> Result<Frame, AlignmentError> {
        self.align()?;
        let frame = self.trajectory.load_frame(index)?;
        frame.apply_transform(&self.transform(index));
        Ok(frame)
    }

    /// Collect detached aligned copies of the frames covered by the slice.
    pub fn slice(&mut self, slice: FrameSlice) -> Result<Vec<Structure>, AlignmentError> {
        self.read_slice(slice)
    }

    /// Iterate over the aligned frames, always starting from the first frame.
    pub fn iter(&mut self) -> FrameIterator<'_, Self> {
        FrameIterator::new(self)
    }

    /// Get the index of the frame most recently returned by iteration.
    /// After the iteration is finished, this is the index of the last frame.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Load the aligned frame most recently returned by iteration again.
    pub fn current_frame(&mut self) -> Result<Option<Frame>, AlignmentError> {
        match self.current {
            Some(index) => self.load_frame(index).map(Some),
            None => Ok(None),
        }
    }

    /// Find out where the frame with the given index comes from.
    /// See [`VirtualTrajectory::frame_location`].
    pub fn frame_location(&mut self, index: isize) -> Result<FrameLocation<'_>, TrajError> {
        self.trajectory.frame_location(index)
    }

    /// See [`VirtualTrajectory::global_index`].
    pub fn global_index(
        &mut self,
        trajectory_index: usize,
        local_index: usize,
    ) -> Result<Option<usize>, TrajError> {
        self.trajectory.global_index(trajectory_index, local_index)
    }

    /// See [`VirtualTrajectory::frame_boundaries`].
    pub fn frame_boundaries(&mut self) -> Result<Vec<usize>, TrajError> {
        self.trajectory.frame_boundaries()
    }

    fn invalidate(&mut self) {
        self.state = AlignmentState::Unaligned;
        self.reset();
    }

    fn cache(&mut self) -> Result<&AlignmentCache, AlignmentError> {
        self.align()?;
        match &self.state {
            AlignmentState::Aligned(cache) => Ok(cache),
            AlignmentState::Unaligned => panic!(
                "FATAL VTRAJ ERROR | AlignedVirtualTrajectory::cache | Trajectory should be aligned."
            ),
        }
    }

    /// Transformation of the frame with the given index. The trajectory must be aligned.
    fn transform(&self, index: usize) -> Transform {
        match &self.state {
            AlignmentState::Aligned(cache) => cache.transforms[index],
            AlignmentState::Unaligned => panic!(
                "FATAL VTRAJ ERROR | AlignedVirtualTrajectory::transform | Trajectory should be aligned."
            ),
        }
    }

    fn report(&mut self, status: ProgressStatus, frame: usize, n_frames: usize) {
        if let Some(printer) = self.progress_printer.as_mut() {
            printer.set_status(status);
            printer.print(frame, n_frames);
        }
    }

    /// Get the alignment selection for the model, compiling it at most once per model.
    fn alignment_subset(&mut self, model: &SharedModel) -> Result<Subset, SelectError> {
        if let Some(subset) = self.selections.get(&model.id()) {
            return Ok(subset.clone());
        }

        let subset = model.select(&self.options.selection)?;
        self.selections.insert(model.id(), subset.clone());
        Ok(subset)
    }

    /// Read the coordinates of the alignment selection for all frames.
    fn collect_coordinates(&mut self, n_frames: usize) -> Result<Vec<Vec<Vector3D>>, AlignmentError> {
        let mut expected = self.options.reference.as_ref().map(|r| r.get_n_atoms());
        let mut ensemble = Vec::with_capacity(n_frames);

        for i in 0..n_frames {
            let (_, traj) = self.trajectory.entry(i)?;
            let frame = self.trajectory.load_frame(i)?;
            let subset = self.alignment_subset(frame.model())?;

            let found = subset.len();
            if found == 0 {
                return Err(AlignmentError::EmptySelection(
                    self.options.selection.clone(),
                    self.trajectory.trajectories()[traj].name().to_owned(),
                ));
            }

            match expected {
                None => expected = Some(found),
                Some(n) if n != found => {
                    return Err(AlignmentError::InconsistentSelection {
                        selection: self.options.selection.clone(),
                        trajectory: self.trajectory.trajectories()[traj].name().to_owned(),
                        expected: n,
                        found,
                    })
                }
                Some(_) => (),
            }

            ensemble.push(subset.coordinates());
            self.report(ProgressStatus::Running, i + 1, n_frames);
        }

        Ok(ensemble)
    }

    fn calculate_alignment(&mut self, n_frames: usize) -> Result<AlignmentCache, AlignmentError> {
        let mut ensemble = self.collect_coordinates(n_frames)?;
        self.report(ProgressStatus::Aligning, n_frames, n_frames);

        if let Some(reference) = &self.options.reference {
            let mut transforms = Vec::with_capacity(n_frames);
            let mut residuals = Vec::with_capacity(n_frames);
            for coordinates in ensemble.iter() {
                let (transform, residual) = superpose(coordinates, reference.get_coordinates())?;
                transforms.push(transform);
                residuals.push(residual);
            }

            return Ok(AlignmentCache {
                transforms,
                rmsd: 0.0,
                iterations: 0,
                residuals: Some(residuals),
            });
        }

        if ensemble.is_empty() {
            return Ok(AlignmentCache {
                transforms: Vec::new(),
                rmsd: 0.0,
                iterations: 0,
                residuals: None,
            });
        }

        let result = iterative_alignment(
            &mut ensemble,
            self.options.threshold,
            self.options.max_iterations,
        )?;

        Ok(AlignmentCache {
            rmsd: result.rmsd(),
            iterations: result.iterations(),
            transforms: result.into_transforms(),
            residuals: None,
        })
    }
}

impl FrameRead for AlignedVirtualTrajectory {
    type Error = AlignmentError;

    fn frame_count(&mut self) -> Result<usize, AlignmentError> {
        Ok(self.trajectory.n_frames()?)
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, AlignmentError> {
        self.load_frame(index)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, AlignmentError>> {
        let index = self.cursor?;
        let n_frames = match self.align().and_then(|_| self.frame_count()) {
            Ok(n) => n,
            Err(e) => {
                self.cursor = None;
                return Some(Err(e));
            }
        };

        if index >= n_frames {
            return None;
        }

        self.cursor = Some(index + 1);
        self.current = Some(index);
        Some(self.load_frame(index))
    }

    fn reset(&mut self) {
        self.cursor = Some(0);
        self.current = None;
    }

    /// Aligned copies are created without modifying the coordinates of the models.
    fn read_slice(&mut self, slice: FrameSlice) -> Result<Vec<Structure>, AlignmentError> {
        self.align()?;
        let n_frames = self.trajectory.n_frames()?;

        let mut structures = Vec::new();
        for i in slice.indices(n_frames)? {
            let mut copy = self.trajectory.load_frame(i)?.detach();
            copy.apply_transform(&self.transform(i));
            structures.push(copy);
        }

        Ok(structures)
    }
}

impl<'a> IntoIterator for &'a mut AlignedVirtualTrajectory {
    type Item = Result<Frame, AlignmentError>;
    type IntoIter = FrameIterator<'a, AlignedVirtualTrajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::rmsd;
    use crate::test_utilities::utilities::*;
    use crate::trajectory::single::TrajectoryOptions;
    use rand::{rngs::StdRng, SeedableRng};

    /// Two in-memory trajectories of rigidly moved copies of the peptide.
    fn rigid_aligned(options: AlignOptions) -> AlignedVirtualTrajectory {
        let mut rng = StdRng::seed_from_u64(11);
        let model = peptide_model();
        AlignedVirtualTrajectory::new(
            vec![
                rigid_trajectory("rigid1", &model, 6, &mut rng),
                rigid_trajectory("rigid2", &model, 4, &mut rng),
            ],
            FrameSelection::default(),
            options,
        )
    }

    fn gro_aligned(options: AlignOptions) -> AlignedVirtualTrajectory {
        let model = peptide_model();
        AlignedVirtualTrajectory::new(
            vec![
                open_gro("test_files/traj1.gro", &model),
                open_gro("test_files/traj2.gro", &model),
            ],
            FrameSelection::default(),
            options,
        )
    }

    fn calpha_coordinates(frame: &Frame) -> Vec<Vector3D> {
        frame.model().select("name CA").unwrap().coordinates()
    }

    #[test]
    fn default_options() {
        let options = AlignOptions::default();
        assert_eq!(options.get_selection(), "name CA");
        assert!(options.get_reference().is_none());
        assert_eq!(options.get_threshold(), 1e-8);
        assert_eq!(options.get_max_iterations(), 1000);

        let options = options
            .with_selection("@backbone")
            .with_threshold(1e-4)
            .with_max_iterations(5);
        assert_eq!(options.get_selection(), "@backbone");
        assert_eq!(options.get_threshold(), 1e-4);
        assert_eq!(options.get_max_iterations(), 5);
    }

    #[test]
    fn convergence_rigid_copies() {
        let mut aligned = rigid_aligned(AlignOptions::default());
        assert!(!aligned.is_aligned());
        assert_eq!(aligned.n_frames().unwrap(), 10);

        assert!(aligned.rmsd().unwrap() <= 1e-8);
        assert!(aligned.iterations().unwrap() >= 1);
        assert_eq!(aligned.transforms().unwrap().len(), 10);
        assert!(aligned.reference_residuals().unwrap().is_none());
        assert!(aligned.mean_reference_residual().unwrap().is_none());

        let first = aligned.get(0).unwrap().coordinates();
        for i in 1..10 {
            let frame = aligned.get(i).unwrap();
            // the whole peptide moves rigidly, so all atoms coincide
            assert!(rmsd(&frame.coordinates(), &first).unwrap() < 1e-6);
        }
    }

    #[test]
    fn noisy_gro_frames() {
        let mut aligned = gro_aligned(AlignOptions::default());
        assert_eq!(aligned.n_frames().unwrap(), 20);
        assert!(aligned.rmsd().unwrap() < 1e-6);

        let reference = calpha_coordinates(&aligned.get(0).unwrap());
        for i in 1..20 {
            let frame = aligned.get(i).unwrap();
            assert!(rmsd(&calpha_coordinates(&frame), &reference).unwrap() < 0.1);
        }
    }

    #[test]
    fn aligned_frames_match_transforms() {
        let mut aligned = gro_aligned(AlignOptions::default());
        let transform = aligned.transforms().unwrap()[12];

        let model = peptide_model();
        let mut direct = open_gro("test_files/traj2.gro", &model);
        let mut expected = direct.load_frame(2).unwrap().coordinates();
        transform.apply_all(&mut expected);

        let frame = aligned.get(12).unwrap();
        compare_coordinates(&frame.coordinates(), &expected, 1e-10);
    }

    #[test]
    fn subset_is_transformed() {
        let mut aligned = gro_aligned(AlignOptions::default());
        aligned.set_subset(Some("resname SOL")).unwrap();

        let frame = aligned.get(3).unwrap();
        assert_eq!(frame.len(), 3);
        let transform = aligned.transforms().unwrap()[3];

        let model = peptide_model();
        let mut direct = open_gro("test_files/traj1.gro", &model);
        let raw = direct.load_frame(3).unwrap();
        let mut expected = raw.model().select("resname SOL").unwrap().coordinates();
        transform.apply_all(&mut expected);

        compare_coordinates(&frame.coordinates(), &expected, 1e-10);
        assert_eq!(aligned.alignment_passes(), 1);
    }

    #[test]
    fn invalidation() {
        let mut aligned = gro_aligned(AlignOptions::default());
        assert_eq!(aligned.alignment_passes(), 0);

        aligned.align().unwrap();
        assert!(aligned.is_aligned());
        assert_eq!(aligned.alignment_passes(), 1);

        // reading does not realign
        aligned.get(5).unwrap();
        aligned.rmsd().unwrap();
        aligned.slice(FrameSlice::default()).unwrap();
        assert_eq!(aligned.iter().count(), 20);
        aligned.set_subset(Some("name CA")).unwrap();
        assert_eq!(aligned.alignment_passes(), 1);

        let model = peptide_model();
        aligned.append(open_gro("test_files/traj1.gro", &model));
        assert!(!aligned.is_aligned());
        assert_eq!(aligned.transforms().unwrap().len(), 30);
        assert_eq!(aligned.alignment_passes(), 2);

        aligned.set_frames(FrameSelection::default().with_stride(2));
        assert!(!aligned.is_aligned());
        assert_eq!(aligned.transforms().unwrap().len(), 15);
        assert_eq!(aligned.alignment_passes(), 3);

        aligned.align_with("@backbone");
        assert!(!aligned.is_aligned());
        aligned.get(0).unwrap();
        assert_eq!(aligned.alignment_passes(), 4);

        let reference = peptide_model().select("@backbone").unwrap().detach();
        aligned.set_reference(Some(reference)).unwrap();
        assert!(!aligned.is_aligned());
        aligned.iterations().unwrap();
        assert_eq!(aligned.alignment_passes(), 5);

        aligned.extend(vec![open_gro("test_files/traj2.gro", &model)]);
        assert!(!aligned.is_aligned());
        assert_eq!(aligned.n_frames().unwrap(), 20);
        assert_eq!(aligned.alignment_passes(), 5);
        aligned.align().unwrap();
        assert_eq!(aligned.alignment_passes(), 6);
    }

    #[test]
    fn reference_mode() {
        let reference = peptide_model().select("name CA").unwrap().detach();
        let mut aligned =
            gro_aligned(AlignOptions::default().with_reference(reference.clone()));

        assert_eq!(aligned.rmsd().unwrap(), 0.0);
        assert_eq!(aligned.iterations().unwrap(), 0);

        let residuals = aligned.reference_residuals().unwrap().unwrap().to_vec();
        assert_eq!(residuals.len(), 20);
        assert!(residuals.iter().all(|&r| (0.0..0.05).contains(&r)));
        let mean = aligned.mean_reference_residual().unwrap().unwrap();
        assert!((mean - residuals.iter().sum::<f64>() / 20.0).abs() < 1e-12);

        for i in 0..20 {
            let frame = aligned.get(i).unwrap();
            let (transform, residual) =
                superpose(&calpha_coordinates(&frame), reference.get_coordinates()).unwrap();

            // superposing an already superposed frame changes nothing
            assert!(transform.approx_eq(&Transform::identity(), 1e-6));
            assert!((residual - residuals[i as usize]).abs() < 1e-9);
        }
    }

    #[test]
    fn reference_mode_back_to_iterative() {
        let reference = peptide_model().select("name CA").unwrap().detach();
        let mut aligned = gro_aligned(AlignOptions::default().with_reference(reference));
        assert_eq!(aligned.iterations().unwrap(), 0);

        aligned.set_reference(None).unwrap();
        assert!(aligned.iterations().unwrap() > 0);
        assert!(aligned.reference_residuals().unwrap().is_none());
    }

    #[test]
    fn reference_size_mismatch() {
        let reference = peptide_model().select("resname SOL").unwrap().detach();
        let mut aligned = gro_aligned(AlignOptions::default().with_reference(reference));

        assert_eq!(
            aligned.align(),
            Err(AlignmentError::InconsistentSelection {
                selection: "name CA".to_owned(),
                trajectory: "traj1.gro".to_owned(),
                expected: 3,
                found: 4,
            })
        );
        assert!(!aligned.is_aligned());
        assert_eq!(aligned.alignment_passes(), 0);
    }

    #[test]
    fn set_reference_checks_size() {
        let mut aligned = gro_aligned(AlignOptions::default());
        aligned.align().unwrap();

        let water = peptide_model().select("resname SOL").unwrap().detach();
        assert_eq!(
            aligned.set_reference(Some(water)),
            Err(AlignmentError::InconsistentSelection {
                selection: "name CA".to_owned(),
                trajectory: "traj1.gro".to_owned(),
                expected: 3,
                found: 4,
            })
        );

        // failed call changes nothing
        assert!(aligned.is_aligned());
        assert!(aligned.options().get_reference().is_none());
        assert_eq!(aligned.alignment_passes(), 1);

        aligned.align_with("name XYZ");
        let calphas = peptide_model().select("name CA").unwrap().detach();
        assert_eq!(
            aligned.set_reference(Some(calphas.clone())),
            Err(AlignmentError::EmptySelection(
                "name XYZ".to_owned(),
                "traj1.gro".to_owned()
            ))
        );

        aligned.align_with("name CA");
        aligned.set_reference(Some(calphas)).unwrap();
        assert!(aligned.options().get_reference().is_some());
        assert_eq!(aligned.iterations().unwrap(), 0);
    }

    #[test]
    fn inconsistent_selection() {
        let peptide = peptide_model();
        let small = small_model().into_shared();

        let mut aligned = AlignedVirtualTrajectory::new(
            vec![
                open_gro("test_files/traj1.gro", &peptide),
                counting_trajectory("small", &small, 3, TrajectoryOptions::default()),
            ],
            FrameSelection::default(),
            AlignOptions::default(),
        );

        let expected = || AlignmentError::InconsistentSelection {
            selection: "name CA".to_owned(),
            trajectory: "small".to_owned(),
            expected: 4,
            found: 2,
        };

        assert_eq!(aligned.align(), Err(expected()));
        assert!(!aligned.is_aligned());

        // every later access attempts the alignment again and fails again
        assert_eq!(aligned.get(0).err(), Some(expected()));
        assert_eq!(aligned.rmsd().err(), Some(expected()));

        let mut iterator = aligned.iter();
        assert_eq!(iterator.next().unwrap().err(), Some(expected()));
        assert!(iterator.next().is_none());
        assert_eq!(aligned.alignment_passes(), 0);

        // removing the offending frames fixes the alignment
        aligned.set_frames(FrameSelection::default().with_indices(vec![0, 5, 9]));
        assert!(aligned.align().is_ok());
        assert_eq!(aligned.transforms().unwrap().len(), 3);
    }

    #[test]
    fn empty_selection() {
        let mut aligned = gro_aligned(AlignOptions::default().with_selection("name XYZ"));
        assert_eq!(
            aligned.align(),
            Err(AlignmentError::EmptySelection(
                "name XYZ".to_owned(),
                "traj1.gro".to_owned()
            ))
        );

        aligned.align_with("name CA or name OW");
        assert!(aligned.align().is_ok());
    }

    #[test]
    fn invalid_selection() {
        let mut aligned = gro_aligned(AlignOptions::default().with_selection("name CA and"));
        assert!(matches!(
            aligned.align(),
            Err(AlignmentError::Traj(TrajError::Select(_)))
        ));
    }

    #[test]
    fn no_frames() {
        let model = peptide_model();
        let mut aligned = AlignedVirtualTrajectory::new(
            vec![open_gro("test_files/traj1.gro", &model)],
            FrameSelection::default().with_skip(100),
            AlignOptions::default(),
        );

        assert_eq!(aligned.n_frames().unwrap(), 0);
        assert!(aligned.transforms().unwrap().is_empty());
        assert_eq!(aligned.rmsd().unwrap(), 0.0);
        assert_eq!(aligned.iter().count(), 0);
        assert_eq!(
            aligned.get(0).err(),
            Some(AlignmentError::Traj(TrajError::IndexOutOfRange(0, 0)))
        );
    }

    #[test]
    fn slice_matches_get() {
        let mut aligned = gro_aligned(AlignOptions::default());
        let slice = aligned.slice(FrameSlice::new(Some(-4), None, Some(2))).unwrap();
        assert_eq!(slice.len(), 2);

        // slices are detached
        aligned.get(0).unwrap();

        for (structure, index) in slice.iter().zip([16, 18]) {
            let frame = aligned.get(index).unwrap();
            compare_coordinates(structure.get_coordinates(), &frame.coordinates(), 1e-12);
        }
    }

    #[test]
    fn slice_elements_are_independent() {
        let mut aligned = gro_aligned(AlignOptions::default());
        let mut slice = aligned.slice(FrameSlice::new(Some(8), Some(12), None)).unwrap();
        let original = slice.clone();
        assert_eq!(slice.len(), 4);

        slice[0].apply_transform(&Transform::translation(Vector3D::new(3.0, -1.0, 2.0)));
        slice[1]
            .get_coordinates_mut()
            .iter_mut()
            .for_each(|c| *c = Vector3D::default());

        compare_coordinates(
            &slice[0].get_coordinates()[..1],
            &[original[0].get_coordinates()[0] + Vector3D::new(3.0, -1.0, 2.0)],
            1e-12,
        );
        assert!(slice[1].get_coordinates().iter().all(|c| c.is_zero()));
        compare_coordinates(slice[2].get_coordinates(), original[2].get_coordinates(), 1e-12);
        compare_coordinates(slice[3].get_coordinates(), original[3].get_coordinates(), 1e-12);

        // live frames are not affected
        for (i, index) in (8..12).enumerate() {
            let frame = aligned.get(index).unwrap();
            compare_coordinates(&frame.coordinates(), original[i].get_coordinates(), 1e-12);
        }

        // neither is a new slice
        let again = aligned.slice(FrameSlice::new(Some(8), Some(12), None)).unwrap();
        for (a, b) in again.iter().zip(original.iter()) {
            compare_coordinates(a.get_coordinates(), b.get_coordinates(), 1e-12);
        }

        assert_eq!(aligned.alignment_passes(), 1);
    }

    #[test]
    fn iterate_restartable() {
        let mut aligned = rigid_aligned(AlignOptions::default());
        assert_eq!(aligned.current_index(), None);

        let first: Vec<Vec<Vector3D>> = aligned
            .iter()
            .map(|frame| frame.unwrap().coordinates())
            .collect();
        assert_eq!(first.len(), 10);
        assert_eq!(aligned.current_index(), Some(9));

        let current = aligned.current_frame().unwrap().unwrap();
        compare_coordinates(&current.coordinates(), &first[9], 1e-12);

        let mut second = Vec::new();
        for frame in &mut aligned {
            second.push(frame.unwrap().coordinates());
        }

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            compare_coordinates(a, b, 1e-12);
        }

        assert_eq!(aligned.alignment_passes(), 1);
    }

    #[test]
    fn locations() {
        let mut aligned = gro_aligned(AlignOptions::default());
        assert_eq!(aligned.n_trajectories(), 2);
        assert_eq!(aligned.frame_boundaries().unwrap(), vec![0, 10]);
        assert_eq!(aligned.global_index(1, 3).unwrap(), Some(13));

        let location = aligned.frame_location(10).unwrap();
        assert_eq!(location.trajectory_index(), 1);
        assert_eq!(location.local_index(), 0);

        // location queries do not require the alignment
        assert!(!aligned.is_aligned());
    }

    #[test]
    fn progress_printing() {
        let output = tempfile::NamedTempFile::new().unwrap();
        let path = output.path().to_owned();

        let printer = ProgressPrinter::new()
            .with_output(Box::from(output.reopen().unwrap()))
            .with_colored(false)
            .with_print_freq(5)
            .with_terminating("\n");

        let mut aligned = gro_aligned(AlignOptions::default()).print_progress(printer);
        aligned.align().unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("[ RUNNING ]"));
        assert!(content.contains("[ALIGNING ]"));
        assert!(content.contains("[COMPLETED]   Frame         20 / 20"));
    }
}
