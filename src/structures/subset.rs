// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of subsets of atoms and trajectory frames.

use std::ops::Deref;
use std::rc::Rc;

use crate::errors::TrajError;
use crate::structures::{
    atom::Atom, model::SharedModel, structure::Structure, transform::Transform,
    vector3d::Vector3D,
};

/// Ordered set of atom indices into a shared model.
///
/// A subset does not own any coordinates: it always reads the coordinates
/// currently loaded in the model.
#[derive(Debug, Clone)]
pub struct Subset {
    model: SharedModel,
    indices: Rc<[usize]>,
    query: Option<String>,
}

impl Subset {
    pub(crate) fn new(model: SharedModel, indices: Vec<usize>, query: Option<String>) -> Self {
        Subset {
            model,
            indices: indices.into(),
            query,
        }
    }

    /// Get the model this subset refers to.
    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    /// Get the indices of atoms in the subset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Get the selection query used to create the subset.
    /// `None` if the subset covers the whole model.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Get the number of atoms in the subset.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check whether the subset contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Copy the current coordinates of the subset atoms.
    pub fn coordinates(&self) -> Vec<Vector3D> {
        let model = self.model.borrow();
        let coordinates = model.get_coordinates();
        self.indices.iter().map(|&i| coordinates[i]).collect()
    }

    /// Copy the topology of the subset atoms.
    pub fn atoms(&self) -> Vec<Atom> {
        let model = self.model.borrow();
        let atoms = model.get_atoms();
        self.indices.iter().map(|&i| atoms[i].clone()).collect()
    }

    /// Calculate the center of geometry of the subset.
    /// Returns `None` for an empty subset.
    pub fn centroid(&self) -> Option<Vector3D> {
        let model = self.model.borrow();
        let coordinates = model.get_coordinates();
        Vector3D::mean(self.indices.iter().map(|&i| &coordinates[i]))
    }

    /// Transform the coordinates of the subset atoms in place.
    /// Atoms of the model outside of the subset are not modified.
    pub fn apply_transform(&self, transform: &Transform) {
        let mut model = self.model.borrow_mut();
        let coordinates = model.coordinates_mut();
        for &i in self.indices.iter() {
            coordinates[i] = transform.apply(&coordinates[i]);
        }
    }

    /// Create a detached copy of the subset atoms and their current coordinates.
    pub fn detach(&self) -> Structure {
        let name = self.model.borrow().get_name().to_owned();
        Structure::new(&name, self.atoms(), self.coordinates())
    }
}

/// Frame of a trajectory: a subset of the model coordinates as loaded at a specific generation.
///
/// Frames alias the coordinate arena of the model. Once another frame is loaded into the same
/// model, the frame becomes stale and reading its coordinates returns the newly loaded data.
/// Use `Frame::checked_coordinates` to detect this or `Frame::detach` to keep the data.
#[derive(Debug, Clone)]
pub struct Frame {
    subset: Subset,
    generation: u64,
}

impl Frame {
    pub(crate) fn new(subset: Subset, generation: u64) -> Self {
        Frame { subset, generation }
    }

    /// Get the subset this frame is a view of.
    pub fn subset(&self) -> &Subset {
        &self.subset
    }

    /// Get the generation of the model at which this frame was loaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check whether a different frame has been loaded into the model since this one.
    pub fn is_stale(&self) -> bool {
        self.subset.model().generation() != self.generation
    }

    /// Copy the coordinates of the frame, failing if the frame is stale.
    pub fn checked_coordinates(&self) -> Result<Vec<Vector3D>, TrajError> {
        let current = self.subset.model().generation();
        if current != self.generation {
            return Err(TrajError::StaleFrame(self.generation, current));
        }

        Ok(self.subset.coordinates())
    }
}

impl Deref for Frame {
    type Target = Subset;

    fn deref(&self) -> &Self::Target {
        &self.subset
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
