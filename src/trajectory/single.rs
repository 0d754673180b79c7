// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a trajectory reading frames from a single source.

use std::path::Path;

use serde::Deserialize;

use crate::auxiliary::normalize_index;
use crate::errors::{ReadTrajError, SelectError, TrajError};
use crate::io::{gro_io::GroTrajectory, traj_io::TrajSource};
use crate::structures::{
    model::SharedModel,
    structure::Structure,
    subset::{Frame, Subset},
};
use crate::trajectory::selection::{FrameSelection, FrameSlice};
use crate::trajectory::{FrameIterator, FrameRead};

/// Options for constructing a `SingleTrajectory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrajectoryOptions {
    /// Selection query defining the atoms of the returned frames. `None` means all atoms.
    subset: Option<String>,
    /// Frames of the source that are part of the trajectory.
    frames: FrameSelection,
}

impl TrajectoryOptions {
    /// Only return atoms matching the selection query.
    pub fn with_subset(mut self, query: &str) -> Self {
        self.subset = Some(query.to_owned());
        self
    }

    /// Only use the selected frames of the source.
    pub fn with_frames(mut self, frames: FrameSelection) -> Self {
        self.frames = frames;
        self
    }

    pub fn get_subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    pub fn get_frames(&self) -> &FrameSelection {
        &self.frames
    }
}

/// Trajectory reading selected frames of a single source into a shared model.
///
/// The list of selected frames is computed once upon construction and never changes.
///
/// ## Example
/// ```no_run
/// # use vtraj_rs::prelude::*;
/// #
/// let model = Model::from_gro("system.gro").unwrap().into_shared();
/// let options = TrajectoryOptions::default()
///     .with_subset("@protein")
///     .with_frames(FrameSelection::default().with_skip(10).with_stride(2));
///
/// let mut trajectory = SingleTrajectory::open_gro("trajectory.gro", model, options).unwrap();
/// for frame in trajectory.iter() {
///     let frame = frame.unwrap();
///     println!("{:?}", frame.centroid());
/// }
/// ```
pub struct SingleTrajectory {
    source: Box<dyn TrajSource>,
    model: SharedModel,
    subset: Subset,
    selection: FrameSelection,
    frames: Vec<usize>,
    cursor: usize,
    current: Option<usize>,
}

impl SingleTrajectory {
    /// Create a new trajectory reading frames from `source` into `model`.
    ///
    /// ## Returns
    /// - `SingleTrajectory` if successful.
    /// - `TrajError::ReadTraj` if the number of atoms in the source does not match the model.
    /// - `TrajError::Select` if the subset query is invalid.
    /// - `TrajError` describing the problem if the frame selection selects no valid frames.
    ///
    /// ## Notes
    /// - A subset query matching no atoms is not an error.
    pub fn new(
        source: Box<dyn TrajSource>,
        model: SharedModel,
        options: TrajectoryOptions,
    ) -> Result<Self, TrajError> {
        if source.n_atoms() != model.n_atoms() {
            return Err(ReadTrajError::AtomsNumberMismatch(
                source.name().to_owned(),
                source.n_atoms(),
                model.n_atoms(),
            )
            .into());
        }

        let subset = match options.subset.as_deref() {
            Some(query) => model.select(query)?,
            None => model.all(),
        };

        let frames = options.frames.resolve(source.n_frames(), false)?;

        Ok(SingleTrajectory {
            source,
            model,
            subset,
            selection: options.frames,
            frames,
            cursor: 0,
            current: None,
        })
    }

    /// Create a new trajectory reading frames from a multi-frame gro file.
    pub fn open_gro(
        filename: impl AsRef<Path>,
        model: SharedModel,
        options: TrajectoryOptions,
    ) -> Result<Self, TrajError> {
        let source = GroTrajectory::open(filename)?;
        SingleTrajectory::new(Box::new(source), model, options)
    }

    /// Get the name of the trajectory source.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Get the model into which the frames are loaded.
    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Get the subset of atoms returned for each frame.
    pub fn subset(&self) -> &Subset {
        &self.subset
    }

    /// Change the atoms returned for each frame. `None` selects all atoms of the model.
    /// Frames returned before the change keep their original atoms.
    pub fn set_subset(&mut self, query: Option<&str>) -> Result<(), SelectError> {
        self.subset = match query {
            Some(query) => self.model.select(query)?,
            None => self.model.all(),
        };

        Ok(())
    }

    /// Get the policy used to select the frames.
    pub fn frame_selection(&self) -> &FrameSelection {
        &self.selection
    }

    /// Get the indices of the selected frames in the source.
    pub fn frame_indices(&self) -> &[usize] {
        &self.frames
    }

    /// Get the total number of frames in the source, including the frames that are not selected.
    pub fn raw_frame_count(&self) -> usize {
        self.source.n_frames()
    }

    /// Get the number of selected frames.
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Check whether the trajectory contains no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load the selected frame with the given index into the model.
    ///
    /// ## Returns
    /// - `Frame` aliasing the coordinates of the model.
    /// - `TrajError::IndexOutOfRange` if there is no such frame.
    /// - `TrajError::ReadTraj` if the frame could not be read.
    pub fn load_frame(&mut self, index: usize) -> Result<Frame, TrajError> {
        let raw = *self
            .frames
            .get(index)
            .ok_or(TrajError::IndexOutOfRange(index as isize, self.frames.len()))?;

        let source = &mut self.source;
        let generation = self
            .model
            .borrow_mut()
            .load_with(|coordinates| source.read_frame(raw, coordinates))?;

        Ok(Frame::new(self.subset.clone(), generation))
    }

    /// Load the selected frame with the given index into the model.
    /// Negative indices are counted from the end of the trajectory.
    pub fn get(&mut self, index: isize) -> Result<Frame, TrajError> {
        let i = normalize_index(index, self.frames.len())
            .ok_or(TrajError::IndexOutOfRange(index, self.frames.len()))?;
        self.load_frame(i)
    }

    /// Get the index of the selected frame in the source.
    /// Negative indices are counted from the end of the trajectory.
    pub fn real_index(&self, index: isize) -> Result<usize, TrajError> {
        normalize_index(index, self.frames.len())
            .map(|i| self.frames[i])
            .ok_or(TrajError::IndexOutOfRange(index, self.frames.len()))
    }

    /// Get the indices of several selected frames in the source.
    pub fn frame_numbers(&self, indices: &[isize]) -> Result<Vec<usize>, TrajError> {
        indices.iter().map(|&i| self.real_index(i)).collect()
    }

    /// Iterate over the selected frames, always starting from the first frame.
    pub fn iter(&mut self) -> FrameIterator<'_, Self> {
        FrameIterator::new(self)
    }

    /// Get the index of the frame most recently returned by iteration.
    /// After the iteration is finished, this is the index of the last frame.
    /// `None` if no frame has been returned since the last reset.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Load the frame most recently returned by iteration again.
    /// `Ok(None)` if no frame has been returned since the last reset.
    pub fn current_frame(&mut self) -> Result<Option<Frame>, TrajError> {
        match self.current {
            Some(index) => self.load_frame(index).map(Some),
            None => Ok(None),
        }
    }

    /// Collect detached copies of the frames covered by the slice.
    pub fn slice(&mut self, slice: FrameSlice) -> Result<Vec<Structure>, TrajError> {
        self.read_slice(slice)
    }
}

impl FrameRead for SingleTrajectory {
    type Error = TrajError;

    fn frame_count(&mut self) -> Result<usize, TrajError> {
        Ok(self.n_frames())
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, TrajError> {
        self.load_frame(index)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, TrajError>> {
        if self.cursor >= self.frames.len() {
            return None;
        }

        let index = self.cursor;
        self.cursor += 1;
        self.current = Some(index);
        Some(self.load_frame(index))
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.current = None;
    }
}

impl<'a> IntoIterator for &'a mut SingleTrajectory {
    type Item = Result<Frame, TrajError>;
    type IntoIter = FrameIterator<'a, SingleTrajectory>;

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
    use crate::io::memory::MemoryTrajectory;
    use crate::structures::{model::Model, vector3d::Vector3D};
    use crate::test_utilities::utilities::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn open_full() {
        let model = peptide_model();
        let mut traj = open_gro("test_files/traj1.gro", &model);

        assert_eq!(traj.name(), "traj1.gro");
        assert_eq!(traj.n_frames(), 10);
        assert_eq!(traj.raw_frame_count(), 10);
        assert!(!traj.is_empty());
        assert_eq!(traj.frame_indices(), (0..10).collect::<Vec<usize>>());
        assert_eq!(traj.subset().len(), 19);
        assert!(traj.subset().query().is_none());
        assert!(traj.model().ptr_eq(&model));

        let frame = traj.load_frame(0).unwrap();
        assert_eq!(frame.len(), 19);
        let coordinates = frame.checked_coordinates().unwrap();
        assert_approx_eq!(f64, coordinates[0].x, 1.498);
        assert_approx_eq!(f64, coordinates[0].y, 1.605);
        assert_approx_eq!(f64, coordinates[0].z, 0.802);

        // topology is unchanged by loading frames
        assert_eq!(frame.atoms()[1].get_atom_name(), "CA");
        assert_eq!(frame.atoms()[17].get_atom_name(), "HW1");
    }

    #[test]
    fn skip_stride() {
        let model = peptide_model();
        let options = TrajectoryOptions::default()
            .with_frames(FrameSelection::default().with_skip(1).with_stride(3));
        let mut traj = SingleTrajectory::open_gro("test_files/traj1.gro", model, options).unwrap();

        assert_eq!(traj.n_frames(), 3);
        assert_eq!(traj.frame_indices(), [1, 4, 7]);
        assert_eq!(traj.raw_frame_count(), 10);
        assert_eq!(traj.frame_selection().get_stride(), 3);

        assert_eq!(traj.real_index(0).unwrap(), 1);
        assert_eq!(traj.real_index(-1).unwrap(), 7);
        assert_eq!(traj.frame_numbers(&[0, 1, -2]).unwrap(), vec![1, 4, 4]);
        assert_eq!(
            traj.real_index(3),
            Err(TrajError::IndexOutOfRange(3, 3))
        );

        // frame 1 of the file is returned first
        let frame = traj.load_frame(0).unwrap();
        let coordinates = frame.coordinates();
        assert_approx_eq!(f64, coordinates[0].x, 1.927);
        assert_approx_eq!(f64, coordinates[0].y, 1.120);
        assert_approx_eq!(f64, coordinates[0].z, 1.201);
    }

    #[test]
    fn explicit_indices() {
        let model = small_model().into_shared();
        let options =
            TrajectoryOptions::default().with_frames(FrameSelection::default().with_indices(vec![0, 2, 5]));
        let mut traj = counting_trajectory("counting", &model, 6, options);

        assert_eq!(traj.n_frames(), 3);
        let frame = traj.get(-1).unwrap();
        assert_eq!(frame.coordinates()[0], Vector3D::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn subset() {
        let model = peptide_model();
        let options = TrajectoryOptions::default().with_subset("name CA");
        let mut traj = SingleTrajectory::open_gro("test_files/traj1.gro", model, options).unwrap();

        assert_eq!(traj.subset().len(), 4);
        assert_eq!(traj.subset().indices(), [1, 5, 9, 13]);
        assert_eq!(traj.subset().query(), Some("name CA"));

        let frame = traj.load_frame(3).unwrap();
        assert_eq!(frame.len(), 4);
        assert!(frame.atoms().iter().all(|a| a.get_atom_name() == "CA"));

        traj.set_subset(Some("resname SOL")).unwrap();
        assert_eq!(traj.subset().len(), 3);
        // already returned frame keeps its atoms
        assert_eq!(frame.len(), 4);

        traj.set_subset(None).unwrap();
        assert_eq!(traj.subset().len(), 19);

        assert!(traj.set_subset(Some("name CA and")).is_err());
        assert_eq!(traj.subset().len(), 19);
    }

    #[test]
    fn empty_subset_is_allowed() {
        let model = peptide_model();
        let options = TrajectoryOptions::default().with_subset("resname LIG");
        let mut traj = SingleTrajectory::open_gro("test_files/traj2.gro", model, options).unwrap();

        assert!(traj.subset().is_empty());
        assert!(traj.load_frame(0).unwrap().is_empty());
    }

    #[test]
    fn construction_errors() {
        let model = peptide_model();

        let options = TrajectoryOptions::default()
            .with_frames(FrameSelection::default().with_skip(10));
        assert_eq!(
            SingleTrajectory::open_gro("test_files/traj1.gro", model.clone(), options).err(),
            Some(TrajError::InvalidRange {
                skip: 10,
                stride: 1,
                n_frames: 10
            })
        );

        let options =
            TrajectoryOptions::default().with_frames(FrameSelection::default().with_stride(0));
        assert_eq!(
            SingleTrajectory::open_gro("test_files/traj1.gro", model.clone(), options).err(),
            Some(TrajError::InvalidStride(0))
        );

        let options = TrajectoryOptions::default()
            .with_frames(FrameSelection::default().with_indices(vec![3, 10]));
        assert_eq!(
            SingleTrajectory::open_gro("test_files/traj1.gro", model.clone(), options).err(),
            Some(TrajError::IndexOutOfRange(10, 10))
        );

        let options = TrajectoryOptions::default().with_subset("name CA or");
        assert!(matches!(
            SingleTrajectory::open_gro("test_files/traj1.gro", model.clone(), options),
            Err(TrajError::Select(_))
        ));

        assert!(matches!(
            SingleTrajectory::open_gro(
                "test_files/nonexistent.gro",
                model,
                TrajectoryOptions::default()
            ),
            Err(TrajError::ReadTraj(ReadTrajError::FileNotFound(_)))
        ));
    }

    #[test]
    fn atoms_mismatch() {
        let model = Model::from_gro("test_files/water.gro").unwrap().into_shared();
        assert_eq!(
            SingleTrajectory::open_gro("test_files/traj1.gro", model, TrajectoryOptions::default())
                .err(),
            Some(TrajError::ReadTraj(ReadTrajError::AtomsNumberMismatch(
                "traj1.gro".to_owned(),
                19,
                3
            )))
        );
    }

    #[test]
    fn get_out_of_range() {
        let model = peptide_model();
        let mut traj = open_gro("test_files/traj1.gro", &model);

        assert!(traj.get(9).is_ok());
        assert!(traj.get(-10).is_ok());
        assert_eq!(traj.get(10).err(), Some(TrajError::IndexOutOfRange(10, 10)));
        assert_eq!(
            traj.get(-11).err(),
            Some(TrajError::IndexOutOfRange(-11, 10))
        );
        assert_eq!(
            traj.load_frame(10).err(),
            Some(TrajError::IndexOutOfRange(10, 10))
        );

        let last = traj.get(-1).unwrap().coordinates();
        let ninth = traj.get(9).unwrap().coordinates();
        assert_eq!(last, ninth);
    }

    #[test]
    fn corrupted_frame() {
        let model = peptide_model();
        let mut traj = open_gro("test_files/traj_corrupted.gro", &model);

        assert_eq!(traj.n_frames(), 3);
        assert!(traj.load_frame(0).is_ok());
        assert_eq!(
            traj.load_frame(1).err(),
            Some(TrajError::ReadTraj(ReadTrajError::CorruptedFrame(
                1,
                "traj_corrupted.gro".to_owned()
            )))
        );
        assert!(traj.load_frame(2).is_ok());
    }

    #[test]
    fn iterate() {
        let model = small_model().into_shared();
        let mut traj = counting_trajectory("counting", &model, 5, TrajectoryOptions::default());

        assert_eq!(traj.current_index(), None);
        assert!(traj.current_frame().unwrap().is_none());

        let mut n = 0;
        for (i, frame) in traj.iter().enumerate() {
            let frame = frame.unwrap();
            let value = i as f64;
            assert_eq!(frame.coordinates()[3], Vector3D::new(value, value, value));
            n += 1;
        }
        assert_eq!(n, 5);

        // past the end, the last returned frame is reported
        assert_eq!(traj.current_index(), Some(4));
        let current = traj.current_frame().unwrap().unwrap();
        assert_eq!(current.coordinates()[0], Vector3D::new(4.0, 4.0, 4.0));

        assert!(traj.next_frame().is_none());
        assert_eq!(traj.current_index(), Some(4));

        traj.reset();
        assert_eq!(traj.current_index(), None);
    }

    #[test]
    fn iterate_is_restartable() {
        let model = peptide_model();
        let mut traj = open_gro("test_files/traj2.gro", &model);

        let first: Vec<Vec<Vector3D>> = traj
            .iter()
            .map(|frame| frame.unwrap().coordinates())
            .collect();

        // partially consume, then restart
        let mut iterator = traj.iter();
        iterator.next().unwrap().unwrap();
        iterator.next().unwrap().unwrap();

        let mut second = Vec::new();
        for frame in &mut traj {
            second.push(frame.unwrap().coordinates());
        }

        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn aliasing() {
        let model = peptide_model();
        let mut traj = open_gro("test_files/traj1.gro", &model);

        let frame0 = traj.load_frame(0).unwrap();
        let copy = frame0.detach();
        assert!(!frame0.is_stale());

        let frame1 = traj.load_frame(1).unwrap();
        assert!(frame0.is_stale());
        assert!(!frame1.is_stale());

        // stale frame observes the newly loaded data
        assert_eq!(frame0.coordinates(), frame1.coordinates());
        assert_ne!(copy.get_coordinates(), frame1.coordinates().as_slice());
        assert_eq!(
            frame0.checked_coordinates(),
            Err(TrajError::StaleFrame(frame0.generation(), frame1.generation()))
        );

        assert_approx_eq!(f64, copy.get_coordinates()[0].x, 1.498);
    }

    #[test]
    fn slice_detached() {
        let model = small_model().into_shared();
        let mut traj = counting_trajectory("counting", &model, 6, TrajectoryOptions::default());

        let slice = traj.slice(FrameSlice::default().with_step(2)).unwrap();
        assert_eq!(slice.len(), 3);

        traj.load_frame(5).unwrap();

        for (structure, value) in slice.iter().zip([0.0, 2.0, 4.0]) {
            assert_eq!(structure.get_n_atoms(), 6);
            assert_eq!(structure.get_name(), "Small");
            assert!(structure
                .get_coordinates()
                .iter()
                .all(|c| *c == Vector3D::new(value, value, value)));
        }

        let reversed = traj.slice(FrameSlice::new(Some(-2), None, Some(-1))).unwrap();
        assert_eq!(reversed.len(), 5);
        assert_eq!(reversed[0].get_coordinates()[0], Vector3D::new(4.0, 4.0, 4.0));

        assert_eq!(
            traj.slice(FrameSlice::default().with_step(0)).err(),
            Some(TrajError::InvalidSliceStep)
        );
    }

    #[test]
    fn memory_source() {
        let model = small_model().into_shared();
        let frames = vec![model.borrow().get_coordinates().to_vec(); 2];
        let source = MemoryTrajectory::new("memory", frames).unwrap();
        let mut traj =
            SingleTrajectory::new(Box::new(source), model.clone(), TrajectoryOptions::default())
                .unwrap();

        assert_eq!(traj.name(), "memory");
        assert_eq!(model.generation(), 0);
        traj.load_frame(1).unwrap();
        assert_eq!(model.generation(), 1);
    }

    #[test]
    fn deserialize_options() {
        let options: TrajectoryOptions =
            serde_yaml::from_str("subset: \"name CA\"\nframes:\n  skip: 2\n  stride: 2").unwrap();

        assert_eq!(options.get_subset(), Some("name CA"));
        assert_eq!(
            options.get_frames(),
            &FrameSelection::default().with_skip(2).with_stride(2)
        );

        assert!(serde_yaml::from_str::<TrajectoryOptions>("selection: all").is_err());
    }
}
