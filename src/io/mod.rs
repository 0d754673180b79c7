// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of functions for reading structure files and trajectory sources.

pub mod gro_io;
pub mod memory;
pub mod traj_io;
