// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of `Structure`: a detached copy of atoms and their coordinates.

use crate::errors::SelectError;
use crate::select::Select;
use crate::structures::{atom::Atom, model::Model, transform::Transform, vector3d::Vector3D};

/// Detached set of atoms with their own coordinates.
/// Unlike frames, structures are not affected by loading new frames into a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    atoms: Vec<Atom>,
    coordinates: Vec<Vector3D>,
}

impl Structure {
    /// Create a new structure.
    ///
    /// ## Panics
    /// Panics if the number of atoms does not match the number of coordinates.
    pub fn new(name: &str, atoms: Vec<Atom>, coordinates: Vec<Vector3D>) -> Self {
        if atoms.len() != coordinates.len() {
            panic!(
                "FATAL VTRAJ ERROR | Structure::new | Number of atoms ({}) does not match the number of coordinates ({}).",
                atoms.len(),
                coordinates.len()
            );
        }

        Structure {
            name: name.to_string(),
            atoms,
            coordinates,
        }
    }

    /// Get the name of the structure.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Set the name of the structure.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the atoms of the structure.
    pub fn get_atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Get the coordinates of the structure.
    pub fn get_coordinates(&self) -> &[Vector3D] {
        &self.coordinates
    }

    /// Get mutable access to the coordinates of the structure.
    pub fn get_coordinates_mut(&mut self) -> &mut [Vector3D] {
        &mut self.coordinates
    }

    /// Get the number of atoms in the structure.
    pub fn get_n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Check whether the structure contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Calculate the center of geometry of the structure.
    /// Returns `None` for an empty structure.
    pub fn centroid(&self) -> Option<Vector3D> {
        Vector3D::mean(&self.coordinates)
    }

    /// Transform all coordinates of the structure in place.
    pub fn apply_transform(&mut self, transform: &Transform) {
        transform.apply_all(&mut self.coordinates);
    }

    /// Create a new structure containing the atoms matching the selection query.
    /// The order of atoms is preserved.
    pub fn select(&self, query: &str) -> Result<Structure, SelectError> {
        let indices = Select::parse_query(query)?.select_indices(&self.atoms);

        Ok(Structure {
            name: self.name.clone(),
            atoms: indices.iter().map(|&i| self.atoms[i].clone()).collect(),
            coordinates: indices.iter().map(|&i| self.coordinates[i]).collect(),
        })
    }

    /// Convert the structure into a model that can be used by trajectories.
    pub fn into_model(self) -> Model {
        Model::new(&self.name, self.atoms, self.coordinates)
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::utilities::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn select() {
        let structure = small_model().into_shared().all().detach();
        let calpha = structure.select("name CA").unwrap();

        assert_eq!(calpha.get_n_atoms(), 2);
        assert_eq!(calpha.get_atoms()[1].get_residue_name(), "GLY");
        assert_eq!(calpha.get_coordinates()[0], structure.get_coordinates()[1]);
        assert_eq!(calpha.get_coordinates()[1], structure.get_coordinates()[4]);

        assert!(structure.select("resname LYS").unwrap().is_empty());
        assert!(structure.select("").is_err());
    }

    #[test]
    fn transform_and_centroid() {
        let mut structure = small_model().into_shared().all().detach();
        let centroid = structure.centroid().unwrap();

        structure.apply_transform(&Transform::translation(-centroid));
        let moved = structure.centroid().unwrap();
        assert_approx_eq!(f64, moved.x, 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, moved.y, 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, moved.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn into_model() {
        let structure = small_model().into_shared().all().detach();
        let model = structure.clone().into_model();
        assert_eq!(model.get_atoms(), structure.get_atoms());
        assert_eq!(model.get_coordinates(), structure.get_coordinates());
    }

    #[test]
    #[should_panic(expected = "FATAL VTRAJ ERROR | Structure::new")]
    fn new_mismatch() {
        let _ = Structure::new("Bad", vec![], vec![Vector3D::default()]);
    }
}
