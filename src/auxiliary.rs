// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Simple, auxiliary functions and constants used through the `vtraj_rs` library.

use std::path::Path;

/******************************/
/*         CONSTANTS          */
/******************************/

/// Smallest coordinate supported by GRO. The actual minimal supported coordinate is
/// -999.999 nm but due to floating point shenanigans, we are slightly more restrictive to be safe.
pub(crate) const GRO_MIN_COORDINATE: f64 = -999.0;
/// Largest coordinate supported by GRO. The actual maximal supported coordinate is
/// 9999.999 nm but due to floating point shenanigans, we are slightly more restrictive to be safe.
pub(crate) const GRO_MAX_COORDINATE: f64 = 9999.0;

/// Atoms used to align trajectories if no other selection is provided.
pub const DEFAULT_ALIGNMENT_SELECTION: &str = "name CA";
/// Iterative alignment stops once the average structure moves less than this (RMSD, in nm).
pub const DEFAULT_ALIGNMENT_THRESHOLD: f64 = 1e-8;
/// Iterative alignment stops after this many iterations even if it has not converged.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/******************************/
/*          INDEXING          */
/******************************/

/// Convert a possibly negative index into an index into a collection of length `len`.
/// Negative indices count from the end. Returns `None` if the index is out of range.
pub(crate) fn normalize_index(index: isize, len: usize) -> Option<usize> {
    let normalized = if index < 0 {
        len.checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };

    if normalized < len {
        Some(normalized)
    } else {
        None
    }
}

/// Get a printable name of a file from its path.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Check whether all coordinates fit into the range supported by the given file format.
pub(crate) fn coordinates_in_range<'a>(
    mut coordinates: impl Iterator<Item = &'a crate::structures::vector3d::Vector3D>,
    min: f64,
    max: f64,
) -> bool {
    coordinates.all(|c| {
        [c.x, c.y, c.z]
            .iter()
            .all(|&value| value.is_finite() && value >= min && value <= max)
    })
}

/******************************/
/*         UNIT TESTS         */
/******************************/
