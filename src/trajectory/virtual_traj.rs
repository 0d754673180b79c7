// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a virtual trajectory concatenating several trajectories.

use getset::{CopyGetters, Getters};

use crate::auxiliary::normalize_index;
use crate::errors::{SelectError, TrajError};
use crate::select::Select;
use crate::structures::{structure::Structure, subset::Frame};
use crate::trajectory::selection::{FrameSelection, FrameSlice};
use crate::trajectory::single::SingleTrajectory;
use crate::trajectory::{FrameIterator, FrameRead};

/// Mapping of global frame indices to positions in the member trajectories.
#[derive(Debug, Clone)]
enum FrameIndex {
    /// Must be rebuilt before use.
    Stale,
    /// Pairs of (index of frame in its trajectory, index of trajectory).
    Built(Vec<(usize, usize)>),
}

/// Origin of a frame of a virtual trajectory.
#[derive(Getters, CopyGetters)]
pub struct FrameLocation<'a> {
    /// Index of the frame in the member trajectory.
    #[getset(get_copy = "pub")]
    local_index: usize,
    /// Index of the member trajectory.
    #[getset(get_copy = "pub")]
    trajectory_index: usize,
    /// The member trajectory.
    #[getset(get = "pub")]
    trajectory: &'a SingleTrajectory,
    /// Index of the frame in the source of the member trajectory.
    #[getset(get_copy = "pub")]
    real_frame: usize,
}

/// Several trajectories presented as one continuous trajectory.
///
/// Frames of all member trajectories are concatenated in order and the frame selection
/// of the virtual trajectory is then applied to the concatenation.
/// Each member keeps its own model and subset.
///
/// ## Example
/// ```no_run
/// # use vtraj_rs::prelude::*;
/// #
/// let model = Model::from_gro("system.gro").unwrap().into_shared();
/// let traj1 = SingleTrajectory::open_gro("run1.gro", model.clone(), TrajectoryOptions::default()).unwrap();
/// let traj2 = SingleTrajectory::open_gro("run2.gro", model, TrajectoryOptions::default()).unwrap();
///
/// let mut vtraj = VirtualTrajectory::from_trajectories(vec![traj1, traj2]);
/// for frame in vtraj.iter() {
///     let frame = frame.unwrap();
///     println!("{:?}", frame.centroid());
/// }
/// ```
pub struct VirtualTrajectory {
    trajectories: Vec<SingleTrajectory>,
    selection: FrameSelection,
    index: FrameIndex,
    /// `None` once the iteration has been stopped by an invalid frame selection.
    cursor: Option<usize>,
    current: Option<usize>,
}

impl VirtualTrajectory {
    /// Create a virtual trajectory from member trajectories and a frame selection
    /// applied to their concatenation.
    ///
    /// ## Notes
    /// - The frame selection is validated lazily, once the frames are first accessed.
    pub fn new(trajectories: Vec<SingleTrajectory>, frames: FrameSelection) -> Self {
        VirtualTrajectory {
            trajectories,
            selection: frames,
            index: FrameIndex::Stale,
            cursor: Some(0),
            current: None,
        }
    }

    /// Create a virtual trajectory containing all frames of the member trajectories.
    pub fn from_trajectories(trajectories: Vec<SingleTrajectory>) -> Self {
        VirtualTrajectory::new(trajectories, FrameSelection::default())
    }

    /// Add a trajectory to the end of the virtual trajectory.
    pub fn append(&mut self, trajectory: SingleTrajectory) {
        self.trajectories.push(trajectory);
        self.invalidate();
    }

    /// Add several trajectories to the end of the virtual trajectory.
    pub fn extend(&mut self, trajectories: impl IntoIterator<Item = SingleTrajectory>) {
        self.trajectories.extend(trajectories);
        self.invalidate();
    }

    /// Change the frame selection applied to the concatenated trajectories.
    pub fn set_frames(&mut self, frames: FrameSelection) {
        self.selection = frames;
        self.invalidate();
    }

    /// Get the frame selection applied to the concatenated trajectories.
    pub fn frame_selection(&self) -> &FrameSelection {
        &self.selection
    }

    /// Change the atoms returned by every member trajectory.
    /// `None` selects all atoms of each model.
    pub fn set_subset(&mut self, query: Option<&str>) -> Result<(), SelectError> {
        if let Some(query) = query {
            Select::parse_query(query)?;
        }

        for trajectory in self.trajectories.iter_mut() {
            trajectory.set_subset(query)?;
        }

        Ok(())
    }

    /// Get the member trajectories.
    pub fn trajectories(&self) -> &[SingleTrajectory] {
        &self.trajectories
    }

    /// Get the number of member trajectories.
    pub fn n_trajectories(&self) -> usize {
        self.trajectories.len()
    }

    /// Get the number of frames of the virtual trajectory.
    ///
    /// ## Returns
    /// - Number of frames after applying the frame selection.
    /// - `TrajError` if the frame selection is not valid for the concatenated trajectories.
    pub fn n_frames(&mut self) -> Result<usize, TrajError> {
        Ok(self.entries()?.len())
    }

    /// Load the frame with the given index into the model of its member trajectory.
    /// Negative indices are counted from the end of the virtual trajectory.
    ///
    /// ## Returns
    /// - `Frame` aliasing the coordinates of the member model.
    /// - `TrajError::IndexOutOfRange` if there is no such frame.
    pub fn get(&mut self, index: isize) -> Result<Frame, TrajError> {
        let n_frames = self.n_frames()?;
        let i = normalize_index(index, n_frames)
            .ok_or(TrajError::IndexOutOfRange(index, n_frames))?;
        self.load_frame(i)
    }

    /// Load the frame with the given (non-negative) index.
    pub fn load_frame(&mut self, index: usize) -> Result<Frame, TrajError> {
        let (local, traj) = self.entry(index)?;
        self.trajectories[traj].load_frame(local)
    }

    /// Collect detached copies of the frames covered by the slice.
    pub fn slice(&mut self, slice: FrameSlice) -> Result<Vec<Structure>, TrajError> {
        self.read_slice(slice)
    }

    /// Iterate over the frames, always starting from the first frame.
    pub fn iter(&mut self) -> FrameIterator<'_, Self> {
        FrameIterator::new(self)
    }

    /// Get the index of the frame most recently returned by iteration.
    /// After the iteration is finished, this is the index of the last frame.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Load the frame most recently returned by iteration again.
    pub fn current_frame(&mut self) -> Result<Option<Frame>, TrajError> {
        match self.current {
            Some(index) => self.load_frame(index).map(Some),
            None => Ok(None),
        }
    }

    /// Find out where the frame with the given index comes from.
    /// Negative indices are counted from the end of the virtual trajectory.
    ///
    /// ## Example
    /// With `traj1` containing 10 frames, frame 12 of the virtual trajectory
    /// is frame 2 of `traj2`.
    /// ```no_run
    /// # use vtraj_rs::prelude::*;
    /// #
    /// # let model = Model::from_gro("system.gro").unwrap().into_shared();
    /// # let traj1 = SingleTrajectory::open_gro("run1.gro", model.clone(), TrajectoryOptions::default()).unwrap();
    /// # let traj2 = SingleTrajectory::open_gro("run2.gro", model, TrajectoryOptions::default()).unwrap();
    /// let mut vtraj = VirtualTrajectory::from_trajectories(vec![traj1, traj2]);
    /// let location = vtraj.frame_location(12).unwrap();
    /// assert_eq!(location.trajectory_index(), 1);
    /// assert_eq!(location.local_index(), 2);
    /// ```
    pub fn frame_location(&mut self, index: isize) -> Result<FrameLocation<'_>, TrajError> {
        let n_frames = self.n_frames()?;
        let i = normalize_index(index, n_frames)
            .ok_or(TrajError::IndexOutOfRange(index, n_frames))?;
        let (local, traj) = self.entry(i)?;

        let trajectory = &self.trajectories[traj];
        Ok(FrameLocation {
            local_index: local,
            trajectory_index: traj,
            trajectory,
            real_frame: trajectory.frame_indices()[local],
        })
    }

    /// Get the global index of the frame with index `local_index` in member trajectory `trajectory_index`.
    ///
    /// ## Returns
    /// - `Some(index)` if the frame is part of the virtual trajectory.
    /// - `None` if the frame exists but is not selected by the frame selection.
    /// - `TrajError::TrajectoryOutOfRange` or `TrajError::IndexOutOfRange` if there is no such frame.
    pub fn global_index(
        &mut self,
        trajectory_index: usize,
        local_index: usize,
    ) -> Result<Option<usize>, TrajError> {
        let n_trajectories = self.trajectories.len();
        let trajectory = self
            .trajectories
            .get(trajectory_index)
            .ok_or(TrajError::TrajectoryOutOfRange(trajectory_index, n_trajectories))?;

        if local_index >= trajectory.n_frames() {
            return Err(TrajError::IndexOutOfRange(
                local_index as isize,
                trajectory.n_frames(),
            ));
        }

        // entries are always ordered by trajectory and then by local index
        Ok(self
            .entries()?
            .binary_search_by(|&(local, traj)| (traj, local).cmp(&(trajectory_index, local_index)))
            .ok())
    }

    /// Get the global index of the first frame of every member trajectory.
    ///
    /// Frames of member `j` occupy the range `boundaries[j]..boundaries[j + 1]`.
    /// Members without any selected frame have the same boundary as the following member.
    pub fn frame_boundaries(&mut self) -> Result<Vec<usize>, TrajError> {
        let n_trajectories = self.trajectories.len();
        let entries = self.entries()?;

        Ok((0..n_trajectories)
            .map(|j| entries.partition_point(|&(_, traj)| traj < j))
            .collect())
    }

    /// Mark the frame index for rebuilding.
    fn invalidate(&mut self) {
        self.index = FrameIndex::Stale;
        self.reset();
    }

    /// Get the frame index, rebuilding it if needed.
    fn entries(&mut self) -> Result<&[(usize, usize)], TrajError> {
        if let FrameIndex::Stale = self.index {
            let all: Vec<(usize, usize)> = self
                .trajectories
                .iter()
                .enumerate()
                .flat_map(|(j, traj)| (0..traj.n_frames()).map(move |i| (i, j)))
                .collect();

            let selected = self.selection.resolve(all.len(), true)?;
            let entries: Vec<(usize, usize)> = selected.into_iter().map(|i| all[i]).collect();

            log::debug!(
                "Built frame index of a virtual trajectory: {} of {} frames from {} trajectories selected.",
                entries.len(),
                all.len(),
                self.trajectories.len()
            );

            self.index = FrameIndex::Built(entries);
        }

        match &self.index {
            FrameIndex::Built(entries) => Ok(entries),
            FrameIndex::Stale => {
                panic!("FATAL VTRAJ ERROR | VirtualTrajectory::entries | Frame index should be built.")
            }
        }
    }

    /// Get the position of the frame with the given index in the member trajectories.
    pub(crate) fn entry(&mut self, index: usize) -> Result<(usize, usize), TrajError> {
        let entries = self.entries()?;
        entries
            .get(index)
            .copied()
            .ok_or(TrajError::IndexOutOfRange(index as isize, entries.len()))
    }
}

impl FrameRead for VirtualTrajectory {
    type Error = TrajError;

    fn frame_count(&mut self) -> Result<usize, TrajError> {
        self.n_frames()
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, TrajError> {
        self.load_frame(index)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, TrajError>> {
        let index = self.cursor?;
        let n_frames = match self.n_frames() {
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
}

impl<'a> IntoIterator for &'a mut VirtualTrajectory {
    type Item = Result<Frame, TrajError>;
    type IntoIter = FrameIterator<'a, VirtualTrajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
