// 2D vector used for all module kinematics
// Every operation returns a new value; nothing mutates in place.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Magnitudes at or below this are treated as zero when normalizing
pub const EPSILON: f64 = 1e-12;

/// Returned when normalizing a vector with (near) zero length
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot normalize a zero-length vector")]
pub struct DegenerateVectorError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `radians` (counter-clockwise from +x)
    pub fn from_angle(radians: f64) -> Self {
        Self::new(radians.cos(), radians.sin())
    }

    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Euclidean length
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn normalize(self) -> Result<Vector2, DegenerateVectorError> {
        let norm = self.norm();
        if norm <= EPSILON || !norm.is_finite() {
            return Err(DegenerateVectorError);
        }
        Ok(self * (1.0 / norm))
    }

    /// Rotate 90° clockwise: (x, y) -> (y, -x)
    pub fn cw_perp(self) -> Vector2 {
        Self::new(self.y, -self.x)
    }

    /// Rotate counter-clockwise by `radians`
    pub fn rotated(self, radians: f64) -> Vector2 {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos * self.x - sin * self.y, sin * self.x + cos * self.y)
    }

    /// Direction in radians, (-pi, pi]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;

    fn mul(self, scale: f64) -> Vector2 {
        Vector2::new(self.x * scale, self.y * scale)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}
