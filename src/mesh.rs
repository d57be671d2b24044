//! Triangle meshes loaded from and written to STL.

use crate::error::{Error, Result};
use crate::geometry::Aabb;
use nalgebra::{Matrix3, Vector3};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// A single triangle in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Vector3<f64>; 3],
}

impl Triangle {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unit normal from the winding order, or zero for degenerate faces.
    pub fn normal(&self) -> Vector3<f64> {
        let [a, b, c] = self.vertices;
        (b - a).cross(&(c - a)).try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }
}

/// Triangle soup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Reads an ASCII or binary STL file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |source| Error::GeometryLoad {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(load_error)?;
        let mut reader = BufReader::new(file);
        let stl = stl_io::read_stl(&mut reader).map_err(load_error)?;

        let vertex = |index: usize| {
            let v = &stl.vertices[index];
            Vector3::new(v[0] as f64, v[1] as f64, v[2] as f64)
        };
        let triangles = stl
            .faces
            .iter()
            .map(|face| {
                Triangle::new(
                    vertex(face.vertices[0]),
                    vertex(face.vertices[1]),
                    vertex(face.vertices[2]),
                )
            })
            .collect();

        Ok(Self { triangles })
    }

    /// An axis-aligned box with its minimum corner at the origin.
    pub fn cuboid(size: Vector3<f64>) -> Self {
        let corner = |x: usize, y: usize, z: usize| {
            Vector3::new(x as f64 * size.x, y as f64 * size.y, z as f64 * size.z)
        };
        let quad = |a, b, c, d| [Triangle::new(a, b, c), Triangle::new(a, c, d)];

        let faces = [
            quad(corner(0, 0, 0), corner(0, 1, 0), corner(1, 1, 0), corner(1, 0, 0)),
            quad(corner(0, 0, 1), corner(1, 0, 1), corner(1, 1, 1), corner(0, 1, 1)),
            quad(corner(0, 0, 0), corner(1, 0, 0), corner(1, 0, 1), corner(0, 0, 1)),
            quad(corner(0, 1, 0), corner(0, 1, 1), corner(1, 1, 1), corner(1, 1, 0)),
            quad(corner(0, 0, 0), corner(0, 0, 1), corner(0, 1, 1), corner(0, 1, 0)),
            quad(corner(1, 0, 0), corner(1, 1, 0), corner(1, 1, 1), corner(1, 0, 1)),
        ];

        Self {
            triangles: faces.into_iter().flatten().collect(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounding_box(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for triangle in &self.triangles {
            for v in &triangle.vertices {
                bounds.include(v);
            }
        }
        bounds
    }

    /// Moves the mesh so its bounding box is centered on the origin.
    pub fn center(&mut self) {
        let bounds = self.bounding_box();
        if bounds.is_empty() {
            return;
        }
        self.translate(&-bounds.center());
    }

    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for triangle in &mut self.triangles {
            for v in &mut triangle.vertices {
                *v += offset;
            }
        }
    }

    /// Returns a copy rotated about the origin, then translated.
    pub fn transformed(&self, rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Mesh {
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|v| rotation * v + translation),
            })
            .collect();
        Mesh { triangles }
    }

    /// Appends all triangles of `other`.
    pub fn extend(&mut self, other: Mesh) {
        self.triangles.extend(other.triangles);
    }

    /// Writes the mesh as binary STL.
    pub fn write_stl<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let to_vertex = |v: &Vector3<f64>| stl_io::Vertex::new([v.x as f32, v.y as f32, v.z as f32]);
        let faces: Vec<stl_io::Triangle> = self
            .triangles
            .iter()
            .map(|t| {
                let n = t.normal();
                stl_io::Triangle {
                    normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                    vertices: [
                        to_vertex(&t.vertices[0]),
                        to_vertex(&t.vertices[1]),
                        to_vertex(&t.vertices[2]),
                    ],
                }
            })
            .collect();
        stl_io::write_stl(writer, faces.iter())
    }
}
