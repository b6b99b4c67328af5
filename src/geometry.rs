//! Points on the game map.
//!
//! `Point2D` and `Point3D` are plain `f32` value types with the usual arithmetic operators.
//! `Point2DI` is an integer grid coordinate.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

/// A point or vector on the map plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// A point or vector in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3D {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Height.
    pub z: f32,
}

/// A grid cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point2DI {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point2D {
    /// Creates a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Point2D { x, y }
    }

    /// Dot product.
    pub fn dot(self, other: Point2D) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance to `other`, cheaper when only comparing distances.
    pub fn distance_squared(self, other: Point2D) -> f32 {
        let diff = self - other;
        diff.dot(diff)
    }

    /// The vector scaled to length one. The zero vector yields NaN components.
    pub fn normalized(self) -> Point2D {
        self / self.dot(self).sqrt()
    }
}

impl Point3D {
    /// Creates a point.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Point3D { x, y, z }
    }

    /// Dot product.
    pub fn dot(self, other: Point3D) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point3D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance to `other`.
    pub fn distance_squared(self, other: Point3D) -> f32 {
        let diff = self - other;
        diff.dot(diff)
    }

    /// The vector scaled to length one. The zero vector yields NaN components.
    pub fn normalized(self) -> Point3D {
        self / self.dot(self).sqrt()
    }

    /// Drops the height.
    pub fn to_2d(self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl Point2DI {
    /// Creates a grid coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Point2DI { x, y }
    }
}

impl From<Point2DI> for Point2D {
    fn from(p: Point2DI) -> Self {
        Point2D::new(p.x as f32, p.y as f32)
    }
}

impl From<Point2D> for Point3D {
    fn from(p: Point2D) -> Self {
        Point3D::new(p.x, p.y, 0.0)
    }
}

macro_rules! impl_vector_ops {
    ($point:ident { $($field:ident),+ }) => {
        impl Add for $point {
            type Output = $point;
            fn add(self, rhs: $point) -> $point {
                $point { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl Sub for $point {
            type Output = $point;
            fn sub(self, rhs: $point) -> $point {
                $point { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl Mul<f32> for $point {
            type Output = $point;
            fn mul(self, rhs: f32) -> $point {
                $point { $($field: self.$field * rhs),+ }
            }
        }

        impl Mul<$point> for f32 {
            type Output = $point;
            fn mul(self, rhs: $point) -> $point {
                rhs * self
            }
        }

        impl Div<f32> for $point {
            type Output = $point;
            fn div(self, rhs: f32) -> $point {
                $point { $($field: self.$field / rhs),+ }
            }
        }

        impl AddAssign for $point {
            fn add_assign(&mut self, rhs: $point) {
                *self = *self + rhs;
            }
        }

        impl SubAssign for $point {
            fn sub_assign(&mut self, rhs: $point) {
                *self = *self - rhs;
            }
        }

        impl MulAssign<f32> for $point {
            fn mul_assign(&mut self, rhs: f32) {
                *self = *self * rhs;
            }
        }

        impl DivAssign<f32> for $point {
            fn div_assign(&mut self, rhs: f32) {
                *self = *self / rhs;
            }
        }
    };
}

impl_vector_ops!(Point2D { x, y });
impl_vector_ops!(Point3D { x, y, z });
