use std::collections::{HashMap, HashSet};

use bevy::prelude::Component;

use crate::types::{Point, Position, Value, Vector, to_position};

/// Normal given to loose points: facing a viewer looking down `-z`.
pub const VIEW_NORMAL: Position = [0.0, 0.0, 1.0];

/// Primitive type of a [`GeneratedMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// Every vertex is a point; no indices.
    #[default]
    Points,
    /// Index pairs form line segments.
    Lines,
    /// Index triples form triangles.
    Triangles,
}

/// Geometry buffer produced by one extraction pass.
///
/// `normals` is either empty or parallel to `vertices`; `indices` is empty for
/// [`Topology::Points`]. A new buffer is built for every pass, never patched.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct GeneratedMesh {
    pub topology: Topology,
    pub vertices: Vec<Position>,
    pub normals: Vec<Position>,
    pub indices: Vec<u32>,
}

impl GeneratedMesh {
    /// A buffer with no geometry.
    pub fn empty(topology: Topology) -> Self {
        Self {
            topology,
            ..Default::default()
        }
    }

    /// Loose points with view-facing normals.
    pub fn points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let vertices: Vec<Position> = points.into_iter().map(to_position).collect();
        Self {
            topology: Topology::Points,
            normals: vec![VIEW_NORMAL; vertices.len()],
            vertices,
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            _ => 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        match self.topology {
            Topology::Lines => self.indices.len() / 2,
            _ => 0,
        }
    }
}

/// Accumulates triangle soup into a welded, indexed mesh.
///
/// Vertices whose positions fall in the same `epsilon`-sized cell share one index; an
/// `epsilon` of zero (or less) only merges bit-identical positions.
///
/// ```
/// use bevy_implicit_plot::{mesh::MeshBuilder, types::Point};
///
/// let mut builder = MeshBuilder::new(1e-9);
/// let (a, b, c, d) = (
///     Point::new(0.0, 0.0, 0.0),
///     Point::new(1.0, 0.0, 0.0),
///     Point::new(0.0, 1.0, 0.0),
///     Point::new(1.0, 1.0, 0.0),
/// );
/// builder.push_triangle([a, b, c]);
/// builder.push_triangle([b, d, c]);
/// let mesh = builder.into_surface();
/// assert_eq!(mesh.vertices.len(), 4);
/// assert_eq!(mesh.triangle_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    epsilon: Value,
    lookup: HashMap<[i64; 3], u32>,
    /// Welded vertex positions.
    pub vertices: Vec<Point>,
    /// Triangle index triples into `vertices`.
    pub tris: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(epsilon: Value) -> Self {
        Self {
            epsilon,
            lookup: HashMap::new(),
            vertices: Vec::new(),
            tris: Vec::new(),
        }
    }

    /// Starts from an existing, already-unique vertex list (indexed input such as a
    /// triangulated point cloud).
    pub fn with_vertices(vertices: Vec<Point>) -> Self {
        Self {
            vertices,
            ..Self::new(0.0)
        }
    }

    fn key(&self, p: &Point) -> [i64; 3] {
        if self.epsilon > 0.0 {
            [p.x, p.y, p.z].map(|c| (c / self.epsilon).round() as i64)
        } else {
            // Normalise -0.0 so it welds with 0.0.
            [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits() as i64)
        }
    }

    /// Returns the index of `p`, adding it if no coincident vertex exists yet.
    pub fn weld(&mut self, p: Point) -> u32 {
        let key = self.key(&p);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(p);
        self.lookup.insert(key, index);
        index
    }

    /// Welds and adds a triangle. Returns `false` (and adds nothing) if welding collapsed it.
    pub fn push_triangle(&mut self, corners: [Point; 3]) -> bool {
        let [a, b, c] = corners.map(|p| self.weld(p));
        self.push_indexed([a, b, c])
    }

    /// Adds a triangle by vertex indices. Degenerate or out-of-range triples are skipped.
    pub fn push_indexed(&mut self, [a, b, c]: [u32; 3]) -> bool {
        let n = self.vertices.len() as u32;
        if a == b || b == c || a == c || a.max(b).max(c) >= n {
            return false;
        }
        self.tris.push([a, b, c]);
        true
    }

    /// Returns the unit face normal of triangle `tri`, or the zero vector if it is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        let [a, b, c] = self.tris[tri].map(|i| self.vertices[i as usize]);

        let v_a_b = b - a;
        let v_b_c = c - b;

        let cross = v_a_b.cross(&v_b_c);

        let nrm = cross.norm();
        if nrm == 0.0 {
            Vector::zeros()
        } else {
            cross / nrm
        }
    }

    /// Per-vertex normals: the normalised sum of the unit normals of adjacent faces.
    ///
    /// Vertices without a usable face normal get [`VIEW_NORMAL`].
    pub fn vertex_normals(&self) -> Vec<Position> {
        let mut sums = vec![Vector::zeros(); self.vertices.len()];
        for (tri, indices) in self.tris.iter().enumerate() {
            let normal = self.tri_normal(tri);
            for &i in indices {
                sums[i as usize] += normal;
            }
        }

        sums.into_iter()
            .map(|sum| {
                let nrm = sum.norm();
                if nrm > 0.0 && nrm.is_finite() {
                    let n = sum / nrm;
                    [n.x as f32, n.y as f32, n.z as f32]
                } else {
                    VIEW_NORMAL
                }
            })
            .collect()
    }

    /// Unique undirected triangle edges, in the order they are first seen.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for &[a, b, c] in &self.tris {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let key = (u.min(v), u.max(v));
                if seen.insert(key) {
                    edges.push([u, v]);
                }
            }
        }
        edges
    }

    fn positions(&self) -> Vec<Position> {
        self.vertices.iter().map(to_position).collect()
    }

    /// Filled triangles with averaged vertex normals.
    pub fn into_surface(self) -> GeneratedMesh {
        GeneratedMesh {
            topology: Topology::Triangles,
            vertices: self.positions(),
            normals: self.vertex_normals(),
            indices: self.tris.iter().flatten().copied().collect(),
        }
    }

    /// The triangle edges as a line list, keeping the averaged surface normals.
    pub fn into_wireframe(self) -> GeneratedMesh {
        GeneratedMesh {
            topology: Topology::Lines,
            vertices: self.positions(),
            normals: self.vertex_normals(),
            indices: self.edges().into_iter().flatten().collect(),
        }
    }

    /// The welded vertices alone, as view-facing points.
    pub fn into_points(self) -> GeneratedMesh {
        GeneratedMesh::points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshBuilder {
        let mut builder = MeshBuilder::new(1e-6);
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(1.0, 1.0, 0.0);
        let d = Point::new(0.0, 1.0, 0.0);
        assert!(builder.push_triangle([a, b, c]));
        assert!(builder.push_triangle([a, c, d]));
        builder
    }

    #[test]
    fn coincident_vertices_are_welded() {
        let mut builder = quad();
        assert_eq!(builder.vertices.len(), 4);
        // Rounds to the same cell as an existing vertex.
        let i = builder.weld(Point::new(1.0 + 1e-8, 1.0, 0.0));
        assert_eq!(i, 2);
        assert_eq!(builder.vertices.len(), 4);
    }

    #[test]
    fn welding_follows_cell_boundaries() {
        let mut builder = MeshBuilder::new(1e-6);
        let a = builder.weld(Point::new(0.49e-6, 0.0, 0.0));
        let b = builder.weld(Point::new(0.51e-6, 0.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(builder.weld(Point::new(0.1e-6, 0.0, 0.0)), a);
        assert_eq!(builder.weld(Point::new(1.4e-6, 0.0, 0.0)), b);
        assert_eq!(builder.vertices.len(), 2);
    }

    #[test]
    fn collapsed_triangles_are_dropped() {
        let mut builder = MeshBuilder::new(1e-3);
        let a = Point::new(0.0, 0.0, 0.0);
        let almost_a = Point::new(1e-5, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        assert!(!builder.push_triangle([a, almost_a, b]));
        assert!(builder.tris.is_empty());
        assert!(!builder.push_indexed([0, 1, 7]));
    }

    #[test]
    fn flat_quad_normals_point_up() {
        let mesh = quad().into_surface();
        assert_eq!(mesh.topology, Topology::Triangles);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        for n in &mesh.normals {
            assert_eq!(*n, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn shared_vertex_normals_are_averaged() {
        let mut builder = MeshBuilder::new(1e-6);
        let o = Point::new(0.0, 0.0, 0.0);
        // One face in the XY plane (normal +z), one in the XZ plane (normal -y).
        builder.push_triangle([o, Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)]);
        builder.push_triangle([o, Point::new(1.0, 0.0, 0.0), Point::new(0.0, 0.0, 1.0)]);
        let normals = builder.vertex_normals();
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let n = normals[0];
        assert!((n[0]).abs() < 1e-6);
        assert!((n[1] + s).abs() < 1e-6);
        assert!((n[2] - s).abs() < 1e-6);
    }

    #[test]
    fn wireframe_lists_each_edge_once() {
        let mesh = quad().into_wireframe();
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.segment_count(), 5);
    }

    #[test]
    fn points_face_the_viewer() {
        let mesh = GeneratedMesh::points(&[Point::new(1.0, 2.0, 3.0)]);
        assert_eq!(mesh.vertices, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(mesh.normals, vec![VIEW_NORMAL]);
        assert!(mesh.indices.is_empty());
    }
}
