// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of rigid-body transformations.

use nalgebra::Matrix3;

use crate::structures::vector3d::Vector3D;

/// Rigid-body transformation consisting of a rotation followed by a translation.
/// Point `p` is transformed as `R·p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    rotation: Matrix3<f64>,
    translation: Vector3D,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    /// Create a new transformation from a rotation matrix and a translation vector.
    /// The rotation matrix is not checked to be orthonormal.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3D) -> Self {
        Transform {
            rotation,
            translation,
        }
    }

    /// Transformation that leaves every point unchanged.
    pub fn identity() -> Self {
        Transform {
            rotation: Matrix3::identity(),
            translation: Vector3D::default(),
        }
    }

    /// Pure translation.
    pub fn translation(vector: Vector3D) -> Self {
        Transform {
            rotation: Matrix3::identity(),
            translation: vector,
        }
    }

    /// Pure rotation around the origin.
    pub fn rotation(matrix: Matrix3<f64>) -> Self {
        Transform {
            rotation: matrix,
            translation: Vector3D::default(),
        }
    }

    /// Get the rotation part of the transformation.
    pub fn get_rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Get the translation part of the transformation.
    pub fn get_translation(&self) -> &Vector3D {
        &self.translation
    }

    /// Transform a single point.
    #[inline]
    pub fn apply(&self, point: &Vector3D) -> Vector3D {
        Vector3D(self.rotation * point.0 + self.translation.0)
    }

    /// Transform all points in place.
    pub fn apply_all(&self, points: &mut [Vector3D]) {
        for point in points.iter_mut() {
            *point = self.apply(point);
        }
    }

    /// Create a transformation equivalent to applying `self` first and `next` second.
    ///
    /// ## Example
    /// ```
    /// # use vtraj_rs::prelude::*;
    /// #
    /// let shift = Transform::translation(Vector3D::new(1.0, 0.0, 0.0));
    /// let back = Transform::translation(Vector3D::new(-1.0, 0.0, 0.0));
    /// let combined = shift.then(&back);
    ///
    /// let point = Vector3D::new(0.5, 0.5, 0.5);
    /// assert_eq!(combined.apply(&point), point);
    /// ```
    pub fn then(&self, next: &Transform) -> Transform {
        Transform {
            rotation: next.rotation * self.rotation,
            translation: Vector3D(next.rotation * self.translation.0 + next.translation.0),
        }
    }

    /// Compose `next` into this transformation so that it is applied after the current one.
    pub fn premultiply(&mut self, next: &Transform) {
        *self = self.then(next);
    }

    /// Calculate the inverse transformation.
    /// Assumes that the rotation matrix is orthonormal.
    pub fn inverse(&self) -> Transform {
        let inv_rotation = self.rotation.transpose();
        Transform {
            rotation: inv_rotation,
            translation: Vector3D(-(inv_rotation * self.translation.0)),
        }
    }

    /// Check whether two transformations are equal within the given tolerance.
    pub fn approx_eq(&self, other: &Transform, tolerance: f64) -> bool {
        (self.rotation - other.rotation).amax() <= tolerance
            && (self.translation.0 - other.translation.0).amax() <= tolerance
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
