// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! # vtraj_rs: Virtual Trajectories for Molecular Dynamics Ensembles
//!
//! Rust library for treating several molecular dynamics trajectories as a single ensemble.
//! Trajectories can be concatenated into virtual trajectories, frames can be selected
//! by skipping, striding or explicit indices, and all frames can be aligned either onto
//! each other (iterative alignment) or onto a reference structure.
//!
//! ## Usage
//!
//! Run
//!
//! ```bash
//! $ cargo add vtraj_rs
//! ```
//!
//! Import the crate in your Rust code:
//! ```
//! use vtraj_rs::prelude::*;
//! ```
//!
//! ## Examples
//!
//! #### Reading a single trajectory
//!
//! Read a structure file, open a trajectory and calculate the center of geometry
//! of a protein in every other frame.
//!
//! ```no_run
//! use vtraj_rs::prelude::*;
//! use std::error::Error;
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     // the model defines the atoms and holds the coordinates of the currently loaded frame
//!     let model = Model::from_gro("system.gro")?.into_shared();
//!
//!     let options = TrajectoryOptions::default()
//!         .with_subset("@protein")
//!         .with_frames(FrameSelection::default().with_stride(2));
//!     let mut trajectory = SingleTrajectory::open_gro("trajectory.gro", model, options)?;
//!
//!     for frame in trajectory.iter() {
//!         let frame = frame?;
//!         println!("{:?}", frame.centroid());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! #### Concatenating trajectories
//!
//! Several trajectories can be presented as a single one.
//! Each trajectory can use its own model or the trajectories can share a single model.
//!
//! ```no_run
//! use vtraj_rs::prelude::*;
//! use std::error::Error;
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let model = Model::from_gro("system.gro")?.into_shared();
//!     let run1 = SingleTrajectory::open_gro("run1.gro", model.clone(), TrajectoryOptions::default())?;
//!     let run2 = SingleTrajectory::open_gro("run2.gro", model, TrajectoryOptions::default())?;
//!
//!     // skip the first 100 frames of the concatenated trajectories
//!     let mut vtraj = VirtualTrajectory::new(
//!         vec![run1, run2],
//!         FrameSelection::default().with_skip(100),
//!     );
//!
//!     println!("Number of frames: {}", vtraj.n_frames()?);
//!
//!     // find out where the 150th frame comes from
//!     let location = vtraj.frame_location(150)?;
//!     println!(
//!         "Frame {} of trajectory '{}'",
//!         location.real_frame(),
//!         location.trajectory().name()
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! #### Aligning an ensemble
//!
//! Align all frames of several trajectories and calculate the average structure
//! and the principal components of the ensemble.
//!
//! ```no_run
//! use vtraj_rs::prelude::*;
//! use std::error::Error;
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let model = Model::from_gro("system.gro")?.into_shared();
//!     let options = TrajectoryOptions::default().with_subset("@protein");
//!     let run1 = SingleTrajectory::open_gro("run1.gro", model.clone(), options.clone())?;
//!     let run2 = SingleTrajectory::open_gro("run2.gro", model, options)?;
//!
//!     let mut aligned = AlignedVirtualTrajectory::new(
//!         vec![run1, run2],
//!         FrameSelection::default(),
//!         AlignOptions::default().with_selection("@backbone"),
//!     )
//!     .print_progress(ProgressPrinter::default());
//!
//!     aligned.align()?;
//!     println!("Converged after {} iterations.", aligned.iterations()?);
//!
//!     let average = average_structure(&mut aligned)?;
//!     average.write_gro("average.gro")?;
//!
//!     let decomposition = svd(&mut aligned)?;
//!     println!("{:?}", decomposition.singular_values());
//!
//!     Ok(())
//! }
//! ```
//!
//! #### Describing an ensemble in a configuration file
//!
//! ```no_run
//! use vtraj_rs::prelude::*;
//! use std::error::Error;
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let config = EnsembleConfig::from_file("ensemble.yaml")?;
//!     let mut aligned = config.build_aligned()?;
//!
//!     for frame in aligned.iter() {
//!         let frame = frame?;
//!         println!("{:?}", frame.centroid());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Frames and models
//!
//! Frames returned by trajectories are **views** into the coordinates of their model.
//! Loading another frame into the same model overwrites the coordinates and all previously
//! returned frames of this model then show the new coordinates. Use `Frame::is_stale` to check
//! whether a frame is still current, `Frame::detach` to keep a copy of it, or read
//! a slice of the trajectory which always returns detached copies.
//!
//! ## Selection language
//!
//! Subsets of atoms are selected using a compact VMD-like query language.
//! For instance, `resname LYS ARG and name CA` selects alpha carbons of lysines and arginines,
//! `resid 1 to 10 or (name r'^C' and not @backbone)` selects all atoms of the first ten residues
//! and all non-backbone atoms with names starting with 'C'.
//! See the documentation of the `select` module for the full list of keywords.
//!
//! ## Error handling
//! The individual error types provided by `vtraj_rs` are not exported into the `prelude` module.
//!
//! If you want to use a specific error type, include it explicitly from the `errors` module:
//! ```
//! use vtraj_rs::errors::AlignmentError;
//! ```
//!
//! ## Features
//! - [x] reading gro files and multi-frame gro trajectories
//! - [x] in-memory trajectories
//! - [x] frame selection by skip, stride or explicit indices
//! - [x] virtual trajectories concatenating multiple trajectories
//! - [x] iterative alignment and alignment onto a reference structure
//! - [x] average structures, coordinate matrices and their singular value decomposition
//! - [x] subspace and covariance overlaps
//! - [ ] xtc and trr trajectories
//!
//! ## License
//! This library is released under the MIT License.

/// Current version of the `vtraj_rs` library.
pub const VTRAJ_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod alignment;
pub mod auxiliary;
pub mod config;
pub mod ensemble;
pub mod errors;
pub mod io;
pub mod progress;
pub mod select;
pub mod structures;
mod test_utilities;
pub mod trajectory;

/// Reexported basic `vtraj_rs` structures, traits and functions.
pub mod prelude {
    pub use crate::alignment::{
        iterative_alignment, iterative_alignment_structures, rmsd, superpose, IterativeAlignment,
    };
    pub use crate::config::EnsembleConfig;
    pub use crate::ensemble::{
        average_structure, coordinate_matrix, covariance_overlap, subspace_overlap, svd,
        EnsembleRead, EnsembleSvd,
    };
    pub use crate::io::gro_io::GroTrajectory;
    pub use crate::io::memory::MemoryTrajectory;
    pub use crate::io::traj_io::TrajSource;
    pub use crate::progress::{ProgressPrinter, ProgressStatus};
    pub use crate::structures::atom::Atom;
    pub use crate::structures::model::{Model, SharedModel};
    pub use crate::structures::structure::Structure;
    pub use crate::structures::subset::{Frame, Subset};
    pub use crate::structures::transform::Transform;
    pub use crate::structures::vector3d::Vector3D;
    pub use crate::trajectory::aligned::{AlignOptions, AlignedVirtualTrajectory};
    pub use crate::trajectory::selection::{FrameSelection, FrameSlice};
    pub use crate::trajectory::single::{SingleTrajectory, TrajectoryOptions};
    pub use crate::trajectory::virtual_traj::{FrameLocation, VirtualTrajectory};
    pub use crate::trajectory::{FrameIterator, FrameRead};
}
