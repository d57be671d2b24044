//! Axis-aligned boxes and the 24 axis-aligned orientations.

use nalgebra::{Matrix3, Vector3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vector3<f64>,
    /// Maximum corner.
    pub max: Vector3<f64>,
}

impl Aabb {
    /// Creates a new AABB.
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Creates an AABB centered at `center` with the given half extents.
    pub fn from_center(center: Vector3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// An inverted box that acts as the identity for [`Aabb::union`].
    pub fn empty() -> Self {
        Self {
            min: Vector3::repeat(f64::INFINITY),
            max: Vector3::repeat(f64::NEG_INFINITY),
        }
    }

    /// Returns true if no point was ever added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() {
            Vector3::zeros()
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    pub fn volume(&self) -> f64 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Grows the box to include `point`.
    pub fn include(&mut self, point: &Vector3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Checks for a proper overlap. Boxes that only touch do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }
}

/// The 24 proper rotations that map the coordinate axes onto themselves.
///
/// Index 0 is always the identity, so an instance that may not rotate
/// simply stays at orientation 0.
pub fn axis_orientations() -> Vec<Matrix3<f64>> {
    const PERMUTATIONS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    const SIGNS: [f64; 2] = [1.0, -1.0];

    let mut rotations = Vec::with_capacity(24);
    for perm in PERMUTATIONS {
        for sx in SIGNS {
            for sy in SIGNS {
                for sz in SIGNS {
                    let signs = [sx, sy, sz];
                    let mut m = Matrix3::zeros();
                    for row in 0..3 {
                        m[(row, perm[row])] = signs[row];
                    }
                    if m.determinant() > 0.0 {
                        rotations.push(m);
                    }
                }
            }
        }
    }
    rotations
}

/// Half extents of a centered box after applying `rotation`.
pub fn rotated_half_extents(rotation: &Matrix3<f64>, half: &Vector3<f64>) -> Vector3<f64> {
    rotation.abs() * half
}
