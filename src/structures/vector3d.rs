// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of a three-dimensional vector used for atom positions.

use std::ops::{
    Add, AddAssign, Deref, DerefMut, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign,
};

use nalgebra::base::Vector3;

/// Position of a point in space or a displacement between two points.
/// Implemented as a thin wrapper around `nalgebra`'s Vector3 with double precision.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Vector3D(pub(crate) Vector3<f64>);

impl From<[f64; 3]> for Vector3D {
    #[inline]
    fn from(arr: [f64; 3]) -> Self {
        Vector3D(Vector3::new(arr[0], arr[1], arr[2]))
    }
}

impl From<Vector3<f64>> for Vector3D {
    #[inline]
    fn from(vec: Vector3<f64>) -> Self {
        Vector3D(vec)
    }
}

impl From<Vector3D> for Vector3<f64> {
    #[inline]
    fn from(vec: Vector3D) -> Self {
        vec.0
    }
}

/// Allows accessing fields of `Vector3D` as `.x`, `.y`, and `.z`.
#[repr(C)]
pub struct Vector3Raw {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Deref for Vector3D {
    type Target = Vector3Raw;

    #[inline]
    fn deref(&self) -> &Self::Target {
        // nalgebra stores Vector3 as three contiguous f64 values
        unsafe { &*(self.0.as_ptr() as *const Vector3Raw) }
    }
}

impl DerefMut for Vector3D {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *(self.0.as_mut_ptr() as *mut Vector3Raw) }
    }
}

/// Access the coordinates by dimension: 0 is x, 1 is y, 2 is z.
impl Index<usize> for Vector3D {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vector3D {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Vector3D {
    /// Create a new `Vector3D` structure.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3D(Vector3::new(x, y, z))
    }

    /// Calculate length of the vector.
    ///
    /// ## Example
    /// ```
    /// # use vtraj_rs::prelude::*;
    /// # use float_cmp::assert_approx_eq;
    /// #
    /// let vector = Vector3D::new(1.0, 2.0, 3.0);
    /// assert_approx_eq!(f64, vector.len(), 3.7416573867739413);
    /// ```
    #[inline]
    pub fn len(&self) -> f64 {
        self.0.magnitude()
    }

    /// Calculate squared length of the vector.
    #[inline]
    pub fn len_squared(&self) -> f64 {
        self.0.magnitude_squared()
    }

    /// Calculate the dot product of two vectors.
    #[inline]
    pub fn dot(&self, vector: &Vector3D) -> f64 {
        self.0.dot(&vector.0)
    }

    /// Calculate the cross product of two vectors.
    #[inline]
    pub fn cross(&self, vector: &Vector3D) -> Vector3D {
        Vector3D(self.0.cross(&vector.0))
    }

    /// Calculate the Euclidean distance between two points.
    /// No periodic boundary conditions are taken into account.
    ///
    /// ## Example
    /// ```
    /// # use vtraj_rs::prelude::*;
    /// # use float_cmp::assert_approx_eq;
    /// #
    /// let point1 = Vector3D::new(1.0, 1.0, 1.0);
    /// let point2 = Vector3D::new(1.0, 4.0, 5.0);
    /// assert_approx_eq!(f64, point1.distance(&point2), 5.0);
    /// ```
    #[inline]
    pub fn distance(&self, point: &Vector3D) -> f64 {
        (self.0 - point.0).magnitude()
    }

    /// Check whether the vector is a null vector.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.x == 0.0 && self.0.y == 0.0 && self.0.z == 0.0
    }

    /// Calculate the arithmetic mean of a collection of points.
    /// Returns `None` if the collection is empty.
    pub fn mean<'a>(points: impl IntoIterator<Item = &'a Vector3D>) -> Option<Vector3D> {
        let mut sum = Vector3::zeros();
        let mut n = 0usize;
        for p in points {
            sum += p.0;
            n += 1;
        }

        if n == 0 {
            None
        } else {
            Some(Vector3D(sum / n as f64))
        }
    }
}

impl Default for Vector3D {
    /// Create a zero vector.
    fn default() -> Self {
        Vector3D(Vector3::zeros())
    }
}

impl Add for Vector3D {
    type Output = Vector3D;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Vector3D(self.0 + rhs.0)
    }
}

impl AddAssign for Vector3D {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Vector3D {
    type Output = Vector3D;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Vector3D(self.0 - rhs.0)
    }
}

impl SubAssign for Vector3D {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<f64> for Vector3D {
    type Output = Vector3D;

    #[inline]
    fn mul(self, rhs: f64) -> Self::Output {
        Vector3D(self.0 * rhs)
    }
}

impl Div<f64> for Vector3D {
    type Output = Vector3D;

    #[inline]
    fn div(self, rhs: f64) -> Self::Output {
        Vector3D(self.0 / rhs)
    }
}

impl Neg for Vector3D {
    type Output = Vector3D;

    #[inline]
    fn neg(self) -> Self::Output {
        Vector3D(-self.0)
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
