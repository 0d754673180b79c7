// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a trajectory source holding all of its frames in memory.

use crate::errors::ReadTrajError;
use crate::io::traj_io::{check_frame_index, TrajSource};
use crate::structures::{structure::Structure, vector3d::Vector3D};

/// Trajectory whose frames are stored in memory.
#[derive(Debug, Clone)]
pub struct MemoryTrajectory {
    name: String,
    n_atoms: usize,
    frames: Vec<Vec<Vector3D>>,
}

impl MemoryTrajectory {
    /// Create a new in-memory trajectory.
    ///
    /// ## Returns
    /// `MemoryTrajectory` if all frames contain the same number of atoms.
    /// Otherwise `ReadTrajError::InconsistentFrames`.
    ///
    /// ## Notes
    /// - A trajectory created from no frames has no atoms.
    pub fn new(name: &str, frames: Vec<Vec<Vector3D>>) -> Result<Self, ReadTrajError> {
        let n_atoms = frames.first().map(|f| f.len()).unwrap_or(0);
        if frames.iter().any(|f| f.len() != n_atoms) {
            return Err(ReadTrajError::InconsistentFrames(name.to_owned()));
        }

        Ok(MemoryTrajectory {
            name: name.to_owned(),
            n_atoms,
            frames,
        })
    }

    /// Create a new in-memory trajectory from the coordinates of structures.
    pub fn from_structures(name: &str, structures: &[Structure]) -> Result<Self, ReadTrajError> {
        MemoryTrajectory::new(
            name,
            structures
                .iter()
                .map(|s| s.get_coordinates().to_vec())
                .collect(),
        )
    }

    /// Add a frame to the end of the trajectory.
    pub fn push_frame(&mut self, frame: Vec<Vector3D>) -> Result<(), ReadTrajError> {
        if self.frames.is_empty() {
            self.n_atoms = frame.len();
        } else if frame.len() != self.n_atoms {
            return Err(ReadTrajError::InconsistentFrames(self.name.clone()));
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Get all frames of the trajectory.
    pub fn get_frames(&self) -> &[Vec<Vector3D>] {
        &self.frames
    }
}

impl TrajSource for MemoryTrajectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_frames(&self) -> usize {
        self.frames.len()
    }

    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn read_frame(
        &mut self,
        index: usize,
        coordinates: &mut [Vector3D],
    ) -> Result<(), ReadTrajError> {
        check_frame_index(&*self, index)?;
        if coordinates.len() != self.n_atoms {
            return Err(ReadTrajError::AtomsNumberMismatch(
                self.name.clone(),
                self.n_atoms,
                coordinates.len(),
            ));
        }

        coordinates.copy_from_slice(&self.frames[index]);
        Ok(())
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
