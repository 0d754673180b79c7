// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Trait for random-access reading of trajectory sources.

use crate::errors::ReadTrajError;
use crate::structures::vector3d::Vector3D;

/// Any source of trajectory frames must implement this trait to be used by `SingleTrajectory`.
///
/// Sources provide random access to their frames: any frame can be loaded
/// in any order by seeking to it and overwriting the provided coordinate buffer.
pub trait TrajSource {
    /// Name describing the origin of the frames (e.g., the name of the file).
    fn name(&self) -> &str;

    /// Total number of frames available in the source.
    fn n_frames(&self) -> usize;

    /// Number of atoms in each frame of the source.
    fn n_atoms(&self) -> usize;

    /// Load coordinates of the frame with the given index into the buffer.
    /// The buffer always has exactly `n_atoms` elements.
    fn read_frame(&mut self, index: usize, coordinates: &mut [Vector3D])
        -> Result<(), ReadTrajError>;
}

impl<T: TrajSource + ?Sized> TrajSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn n_frames(&self) -> usize {
        (**self).n_frames()
    }

    fn n_atoms(&self) -> usize {
        (**self).n_atoms()
    }

    fn read_frame(
        &mut self,
        index: usize,
        coordinates: &mut [Vector3D],
    ) -> Result<(), ReadTrajError> {
        (**self).read_frame(index, coordinates)
    }
}

/// Check that a frame with the given index exists in the source.
pub(crate) fn check_frame_index(source: &impl TrajSource, index: usize) -> Result<(), ReadTrajError> {
    if index >= source.n_frames() {
        Err(ReadTrajError::FrameNotFound(index, source.name().to_owned()))
    } else {
        Ok(())
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
