// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of various structures used in the `vtraj_rs` library.

pub mod atom;
pub mod model;
pub mod structure;
pub mod subset;
pub mod transform;
pub mod vector3d;
