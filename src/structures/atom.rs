// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of the Atom structure and its methods.

use std::io::Write;

use crate::auxiliary::{coordinates_in_range, GRO_MAX_COORDINATE, GRO_MIN_COORDINATE};
use crate::errors::WriteGroError;
use crate::structures::vector3d::Vector3D;

/// Topology information about a single atom.
/// Positions of atoms are not stored here but in the coordinate arena of the `Model`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    residue_number: usize,
    residue_name: String,
    atom_number: usize,
    atom_name: String,
}

impl Atom {
    /// Create new Atom structure with the specified properties.
    pub fn new(residue_number: usize, residue_name: &str, atom_number: usize, atom_name: &str) -> Self {
        Atom {
            residue_number,
            residue_name: residue_name.to_string(),
            atom_number,
            atom_name: atom_name.to_string(),
        }
    }

    /// Get the number of the residue to which the atom belongs.
    pub fn get_residue_number(&self) -> usize {
        self.residue_number
    }

    /// Set the number of the residue to which the atom belongs.
    pub fn set_residue_number(&mut self, resnum: usize) {
        self.residue_number = resnum;
    }

    /// Get the name of the residue to which the atom belongs.
    pub fn get_residue_name(&self) -> &str {
        &self.residue_name
    }

    /// Set the name of the residue to which the atom belongs.
    pub fn set_residue_name(&mut self, resname: &str) {
        self.residue_name = resname.to_string();
    }

    /// Get the number of the atom as presented in the structure file.
    pub fn get_atom_number(&self) -> usize {
        self.atom_number
    }

    /// Set the number of the atom as presented in the structure file.
    pub fn set_atom_number(&mut self, atomnum: usize) {
        self.atom_number = atomnum;
    }

    /// Get the name of the atom.
    pub fn get_atom_name(&self) -> &str {
        &self.atom_name
    }

    /// Set the name of the atom.
    pub fn set_atom_name(&mut self, atomname: &str) {
        self.atom_name = atomname.to_string();
    }

    /// Write information about the atom located at `position` in gro format.
    ///
    /// ## Notes
    /// - Allows for 0 to 5-letter atom names, 0 to 5-letter residue names, 1 to 5-digit atom numbers, and 1 to 5-digit residue numbers.
    /// - Longer names are shortened, longer numbers are wrapped to 0.
    /// - Coordinates that do not fit into the 8-character fields of the gro format are rejected.
    pub fn write_gro(
        &self,
        stream: &mut impl Write,
        position: &Vector3D,
    ) -> Result<(), WriteGroError> {
        if !coordinates_in_range(std::iter::once(position), GRO_MIN_COORDINATE, GRO_MAX_COORDINATE) {
            return Err(WriteGroError::CoordinateTooLarge);
        }

        let atomname: String = self.atom_name.chars().take(5).collect();
        let resname: String = self.residue_name.chars().take(5).collect();

        writeln!(
            stream,
            "{:>5}{:<5}{:>5}{:>5}{:>8.3}{:>8.3}{:>8.3}",
            self.residue_number % 100000,
            resname,
            atomname,
            self.atom_number % 100000,
            position.x,
            position.y,
            position.z
        )
        .map_err(|_| WriteGroError::CouldNotWrite)
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
