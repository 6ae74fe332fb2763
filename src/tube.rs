//! Extrudes line segments into 8-sided tubes so curves can be drawn as lit geometry.
use std::f64::consts::TAU;

use crate::{
    mesh::{GeneratedMesh, Topology},
    types::{Point, Value, Vector, to_position},
};

/// Number of sides around each tube.
pub const TUBE_SIDES: usize = 8;

/// Builds a unit frame `(u, v)` perpendicular to the unit vector `dir`.
fn perpendicular_frame(dir: &Vector) -> (Vector, Vector) {
    // Any reference axis works as long as it isn't parallel to `dir`.
    let reference = if dir.z.abs() < 0.9 {
        Vector::z()
    } else {
        Vector::x()
    };
    let u = dir.cross(&reference).normalize();
    let v = dir.cross(&u);
    (u, v)
}

/// Extrudes every segment (consecutive point pairs of `segments`) into a tube of `radius`.
///
/// Each tube has [`TUBE_SIDES`] vertices around both ends and `2 * TUBE_SIDES` triangles,
/// wound outwards, with normals along the outward radial direction. Zero-length and
/// non-finite segments are skipped. A trailing unpaired point is ignored.
pub fn extrude_segments(segments: &[Point], radius: Value) -> GeneratedMesh {
    let mut mesh = GeneratedMesh::empty(Topology::Triangles);
    let mut skipped = 0usize;

    for pair in segments.chunks_exact(2) {
        let (start, end) = (pair[0], pair[1]);
        let axis = end - start;
        let length = axis.norm();
        if !(length > 0.0 && length.is_finite()) {
            skipped += 1;
            continue;
        }
        let dir = axis / length;
        let (u, v) = perpendicular_frame(&dir);

        let base = mesh.vertices.len() as u32;
        for j in 0..TUBE_SIDES {
            let angle = TAU * j as Value / TUBE_SIDES as Value;
            let radial = u * angle.cos() + v * angle.sin();
            let offset = radial * radius;
            let normal = [radial.x as f32, radial.y as f32, radial.z as f32];

            mesh.vertices.push(to_position(&(start + offset)));
            mesh.normals.push(normal);
            mesh.vertices.push(to_position(&(end + offset)));
            mesh.normals.push(normal);

            // Ring vertices interleave start/end: 2j is on the start ring, 2j + 1 on the end ring.
            let start_j = base + 2 * j as u32;
            let end_j = start_j + 1;
            let start_next = base + 2 * ((j + 1) % TUBE_SIDES) as u32;
            let end_next = start_next + 1;

            mesh.indices.extend([start_j, end_next, end_j]);
            mesh.indices.extend([start_j, start_next, end_next]);
        }
    }

    if skipped > 0 {
        tracing::trace!("skipped {skipped} degenerate segments during tube extrusion");
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance_to_axis(p: &[f32; 3], a: &Point, b: &Point) -> Value {
        let p = Point::new(p[0] as Value, p[1] as Value, p[2] as Value);
        let dir = (b - a).normalize();
        let rel = p - a;
        (rel - dir * rel.dot(&dir)).norm()
    }

    #[test]
    fn single_segment_tube() {
        let a = Point::new(-1.0, 0.5, 0.0);
        let b = Point::new(2.0, 1.5, 0.0);
        let radius = 0.25;
        let mesh = extrude_segments(&[a, b], radius);

        assert_eq!(mesh.vertices.len(), 2 * TUBE_SIDES);
        assert_eq!(mesh.normals.len(), 2 * TUBE_SIDES);
        assert_eq!(mesh.triangle_count(), 2 * TUBE_SIDES);
        for p in &mesh.vertices {
            assert!((distance_to_axis(p, &a, &b) - radius).abs() < 1e-5, "{p:?}");
        }
    }

    #[test]
    fn normals_point_away_from_the_axis() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(0.0, 0.0, 3.0);
        let mesh = extrude_segments(&[a, b], 0.5);
        for (p, n) in mesh.vertices.iter().zip(&mesh.normals) {
            let radial = [p[0] / 0.5, p[1] / 0.5];
            assert!((radial[0] - n[0]).abs() < 1e-5 && (radial[1] - n[1]).abs() < 1e-5);
            assert!(n[2].abs() < 1e-6);
        }
    }

    #[test]
    fn faces_are_wound_outwards() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let mesh = extrude_segments(&[a, b], 0.5);
        for tri in mesh.indices.chunks_exact(3) {
            let [p0, p1, p2] = [tri[0], tri[1], tri[2]].map(|i| {
                let v = mesh.vertices[i as usize];
                Vector::new(v[0] as Value, v[1] as Value, v[2] as Value)
            });
            let normal = (p1 - p0).cross(&(p2 - p0));
            let centroid = (p0 + p1 + p2) / 3.0;
            let radial = Vector::new(0.0, centroid.y, centroid.z);
            assert!(normal.dot(&radial) > 0.0);
        }
    }

    #[test]
    fn degenerate_segments_are_skipped() {
        let p = Point::new(1.0, 1.0, 0.0);
        let q = Point::new(2.0, 1.0, 0.0);
        let nan = Point::new(Value::NAN, 0.0, 0.0);
        let mesh = extrude_segments(&[p, p, p, q, nan, q], 0.1);
        assert_eq!(mesh.vertices.len(), 2 * TUBE_SIDES);
        assert!(mesh.vertices.iter().flatten().all(|c| c.is_finite()));
        assert!(mesh.normals.iter().flatten().all(|c| c.is_finite()));
    }

    #[test]
    fn empty_input_gives_empty_mesh() {
        assert!(extrude_segments(&[], 0.1).is_empty());
    }
}
