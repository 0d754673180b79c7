// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Trajectories built on top of trajectory sources: single trajectories,
//! virtual concatenations of trajectories and aligned virtual trajectories.

use crate::errors::TrajError;
use crate::structures::{structure::Structure, subset::Frame};
use crate::trajectory::selection::FrameSlice;

pub mod aligned;
pub mod selection;
pub mod single;
pub mod virtual_traj;

/// Random-access and cursor-based reading of frames.
///
/// Implemented by `SingleTrajectory`, `VirtualTrajectory` and `AlignedVirtualTrajectory`.
/// Every returned `Frame` aliases the coordinates of the model it was loaded into
/// and is only valid until the next frame is loaded into the same model.
pub trait FrameRead {
    type Error: From<TrajError>;

    /// Number of frames in the trajectory.
    fn frame_count(&mut self) -> Result<usize, Self::Error>;

    /// Load the frame with the given (non-negative) index.
    fn read_frame(&mut self, index: usize) -> Result<Frame, Self::Error>;

    /// Load the frame at the cursor and advance the cursor.
    /// Returns `None` once the cursor has passed the last frame.
    fn next_frame(&mut self) -> Option<Result<Frame, Self::Error>>;

    /// Move the cursor back to the first frame.
    fn reset(&mut self);

    /// Collect detached copies of the frames covered by the slice.
    fn read_slice(&mut self, slice: FrameSlice) -> Result<Vec<Structure>, Self::Error> {
        let n_frames = self.frame_count()?;
        slice
            .indices(n_frames)?
            .into_iter()
            .map(|i| self.read_frame(i).map(|frame| frame.detach()))
            .collect()
    }
}

/// Iterator over the frames of a trajectory.
/// Created by the `iter` methods of the trajectories which restart the iteration from the first frame.
pub struct FrameIterator<'a, T: FrameRead + ?Sized> {
    trajectory: &'a mut T,
}

impl<'a, T: FrameRead + ?Sized> FrameIterator<'a, T> {
    pub(crate) fn new(trajectory: &'a mut T) -> Self {
        trajectory.reset();
        FrameIterator { trajectory }
    }
}

impl<T: FrameRead + ?Sized> Iterator for FrameIterator<'_, T> {
    type Item = Result<Frame, T::Error>;

    /// Load the next frame of the trajectory into the model.
    ///
    /// ## Returns
    /// - `Some(Ok(Frame))` if the frame has been successfully loaded.
    /// - `Some(Err(_))` if the frame could not be loaded.
    /// - `None` if all frames have been read.
    fn next(&mut self) -> Option<Self::Item> {
        self.trajectory.next_frame()
    }
}
