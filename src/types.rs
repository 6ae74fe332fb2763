use nalgebra::{Point3, Vector3};

/// Scalar field value produced by evaluating a formula at a sample.
pub type Value = f64;

/// A 3D sample position with [`Value`] components. 2D samples carry `z = 0`.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// Render-side vertex attribute, as uploaded to the GPU.
pub type Position = [f32; 3];

/// Number of free variables in a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    /// `f(x, y)`, sampled on an `N × N` grid.
    Two,
    /// `f(x, y, z)`, sampled on an `N × N × N` grid.
    Three,
}

impl Dimension {
    /// Number of coordinates per sample.
    pub fn axes(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

/// Converts a sample position into a GPU vertex position.
#[inline]
pub fn to_position(p: &Point) -> Position {
    [p.x as f32, p.y as f32, p.z as f32]
}
