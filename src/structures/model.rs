// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of the `Model`: the full atomic system whose coordinates are
//! overwritten in place whenever a trajectory frame is loaded.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::errors::SelectError;
use crate::select::Select;
use crate::structures::{atom::Atom, subset::Subset, vector3d::Vector3D};

/// Atomic system with a mutable coordinate arena.
///
/// Every time coordinates are loaded into the model, its generation counter is incremented.
/// Frames produced by trajectories remember the generation they were loaded at
/// which allows detecting frames whose coordinates have since been overwritten.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    atoms: Vec<Atom>,
    coordinates: Vec<Vector3D>,
    generation: u64,
}

impl Model {
    /// Create a new model from a list of atoms and their coordinates.
    ///
    /// ## Panics
    /// Panics if the number of atoms does not match the number of coordinates.
    pub fn new(name: &str, atoms: Vec<Atom>, coordinates: Vec<Vector3D>) -> Self {
        if atoms.len() != coordinates.len() {
            panic!(
                "FATAL VTRAJ ERROR | Model::new | Number of atoms ({}) does not match the number of coordinates ({}).",
                atoms.len(),
                coordinates.len()
            );
        }

        Model {
            name: name.to_string(),
            atoms,
            coordinates,
            generation: 0,
        }
    }

    /// Get the name of the model.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Get the topology of the model.
    pub fn get_atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Get the current coordinates of all atoms.
    pub fn get_coordinates(&self) -> &[Vector3D] {
        &self.coordinates
    }

    /// Get the number of atoms in the model.
    pub fn get_n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Get the number of coordinate loads performed on this model.
    pub fn get_generation(&self) -> u64 {
        self.generation
    }

    /// Overwrite the coordinates of the model using the provided loader.
    /// The generation counter is incremented even if the loader fails
    /// since the coordinates may have been partially overwritten.
    pub(crate) fn load_with<E>(
        &mut self,
        loader: impl FnOnce(&mut [Vector3D]) -> Result<(), E>,
    ) -> Result<u64, E> {
        self.generation += 1;
        loader(&mut self.coordinates)?;
        Ok(self.generation)
    }

    /// Mutable access to the coordinates without starting a new generation.
    /// Used to transform the currently loaded frame in place.
    pub(crate) fn coordinates_mut(&mut self) -> &mut [Vector3D] {
        &mut self.coordinates
    }

    /// Wrap the model so it can be shared by trajectories and subsets.
    pub fn into_shared(self) -> SharedModel {
        SharedModel(Rc::new(RefCell::new(self)))
    }
}

/// Handle to a `Model` shared between trajectories, subsets and frames.
#[derive(Debug, Clone)]
pub struct SharedModel(Rc<RefCell<Model>>);

impl From<Model> for SharedModel {
    fn from(model: Model) -> Self {
        model.into_shared()
    }
}

impl SharedModel {
    /// Immutable access to the underlying model.
    ///
    /// ## Panics
    /// Panics if the model is currently being modified, which cannot happen
    /// outside of the internal frame-loading routines.
    pub fn borrow(&self) -> Ref<'_, Model> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, Model> {
        self.0.borrow_mut()
    }

    /// Check whether two handles point to the same model.
    pub fn ptr_eq(&self, other: &SharedModel) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared model. Unique among all living models.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Get the number of atoms in the model.
    pub fn n_atoms(&self) -> usize {
        self.borrow().get_n_atoms()
    }

    /// Get the current generation of the model.
    pub fn generation(&self) -> u64 {
        self.borrow().get_generation()
    }

    /// Create a subset containing all atoms of the model.
    pub fn all(&self) -> Subset {
        let n_atoms = self.n_atoms();
        Subset::new(self.clone(), (0..n_atoms).collect(), None)
    }

    /// Create a subset of atoms matching the selection query.
    /// A query that matches no atoms produces an empty subset.
    ///
    /// ## Example
    /// ```no_run
    /// # use vtraj_rs::prelude::*;
    /// #
    /// let model = Model::from_gro("protein.gro").unwrap().into_shared();
    /// let calpha = model.select("name CA").unwrap();
    /// println!("{} alpha carbons", calpha.len());
    /// ```
    pub fn select(&self, query: &str) -> Result<Subset, SelectError> {
        let select = Select::parse_query(query)?;
        let indices = select.select_indices(self.borrow().get_atoms());
        Ok(Subset::new(self.clone(), indices, Some(query.to_string())))
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
