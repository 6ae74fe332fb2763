//! Surface reconstruction from a threshold-filtered point cloud.
//!
//! The cloud is flattened onto a plane, triangulated there with Delaunay, and the
//! resulting connectivity is applied to the original 3D points.
use nalgebra::Matrix3;

use crate::{
    mesh::{GeneratedMesh, MeshBuilder, Topology},
    settings::{Projection, ShapeKind},
    types::{Point, Value, Vector},
};

/// Orthonormal in-plane axes `(u, v)` of the best-fit plane through `points`.
///
/// These are the eigenvectors of the covariance matrix with the two largest eigenvalues.
fn principal_axes(points: &[Point]) -> (Vector, Vector) {
    let n = points.len() as Value;
    let centroid = points.iter().fold(Vector::zeros(), |acc, p| acc + p.coords) / n;

    let mut covariance = Matrix3::<Value>::zeros();
    for p in points {
        let d = p.coords - centroid;
        covariance += d * d.transpose();
    }

    let eigen = covariance.symmetric_eigen();
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let u: Vector = eigen.eigenvectors.column(order[0]).clone_owned();
    let v: Vector = eigen.eigenvectors.column(order[1]).clone_owned();
    (u, v)
}

/// Flattens `points` onto the plane selected by `projection`.
pub fn project(points: &[Point], projection: Projection) -> Vec<delaunator::Point> {
    let flatten = |x: Value, y: Value| delaunator::Point { x, y };
    match projection {
        Projection::Xy => points.iter().map(|p| flatten(p.x, p.y)).collect(),
        Projection::Xz => points.iter().map(|p| flatten(p.x, p.z)).collect(),
        Projection::Yz => points.iter().map(|p| flatten(p.y, p.z)).collect(),
        Projection::BestFit => {
            let (u, v) = principal_axes(points);
            points
                .iter()
                .map(|p| flatten(p.coords.dot(&u), p.coords.dot(&v)))
                .collect()
        }
    }
}

/// Signed doubled area of the planar triangle `a, b, c`; positive when counter-clockwise.
#[inline]
fn orientation(a: &delaunator::Point, b: &delaunator::Point, c: &delaunator::Point) -> Value {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Triangulates a point cloud through `projection`.
///
/// Every triangle is wound counter-clockwise in the projection plane. The output is a
/// filled surface for [`ShapeKind::Surface`] and a wireframe otherwise. Fewer than three
/// points, or a cloud that is collinear in the projection plane, gives an empty mesh.
pub fn triangulate_cloud(
    points: Vec<Point>,
    projection: Projection,
    shape: ShapeKind,
) -> GeneratedMesh {
    let topology = match shape {
        ShapeKind::Surface => Topology::Triangles,
        _ => Topology::Lines,
    };
    if points.len() < 3 {
        tracing::debug!("point cloud has {} points, nothing to triangulate", points.len());
        return GeneratedMesh::empty(topology);
    }

    let planar = project(&points, projection);
    let triangulation = delaunator::triangulate(&planar);

    let mut builder = MeshBuilder::with_vertices(points);
    for tri in triangulation.triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let indices = if orientation(&planar[a], &planar[b], &planar[c]) < 0.0 {
            [a, c, b]
        } else {
            [a, b, c]
        };
        builder.push_indexed(indices.map(|i| i as u32));
    }
    tracing::debug!(
        "triangulated {} cloud points into {} triangles",
        builder.vertices.len(),
        builder.tris.len()
    );
    if builder.tris.is_empty() {
        return GeneratedMesh::empty(topology);
    }

    match topology {
        Topology::Triangles => builder.into_surface(),
        _ => builder.into_wireframe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(n: usize, height: impl Fn(Value, Value) -> Value) -> Vec<Point> {
        let mut points = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let (x, y) = (i as Value, j as Value);
                points.push(Point::new(x, y, height(x, y)));
            }
        }
        points
    }

    #[test]
    fn tiny_clouds_are_empty() {
        for n in 0..3 {
            let points = vec![Point::origin(); n];
            let mesh = triangulate_cloud(points, Projection::Xy, ShapeKind::Surface);
            assert!(mesh.is_empty());
            assert_eq!(mesh.topology, Topology::Triangles);
        }
        let mesh = triangulate_cloud(Vec::new(), Projection::BestFit, ShapeKind::Mesh);
        assert!(mesh.is_empty());
        assert_eq!(mesh.topology, Topology::Lines);
    }

    #[test]
    fn collinear_cloud_has_no_triangles() {
        let points = (0..5).map(|i| Point::new(i as Value, 0.0, 1.0)).collect();
        let mesh = triangulate_cloud(points, Projection::Xy, ShapeKind::Surface);
        assert!(mesh.is_empty());
    }

    #[test]
    fn flat_grid_faces_up() {
        let points = grid_points(4, |_, _| 2.0);
        let mesh = triangulate_cloud(points, Projection::Xy, ShapeKind::Surface);
        // A 4x4 grid has 9 unit squares, two triangles each.
        assert_eq!(mesh.triangle_count(), 18);
        assert_eq!(mesh.vertices.len(), 16);
        for n in &mesh.normals {
            assert!((n[2] - 1.0).abs() < 1e-6, "{n:?}");
        }
    }

    #[test]
    fn projections_pick_their_axes() {
        let p = [Point::new(1.0, 2.0, 3.0)];
        let xz = project(&p, Projection::Xz);
        let yz = project(&p, Projection::Yz);
        assert_eq!((xz[0].x, xz[0].y), (1.0, 3.0));
        assert_eq!((yz[0].x, yz[0].y), (2.0, 3.0));
    }

    #[test]
    fn best_fit_handles_tilted_planes() {
        // A plane containing the z axis: degenerate under Xy, fine under BestFit.
        let points: Vec<Point> = grid_points(5, |_, _| 0.0)
            .into_iter()
            .map(|p| Point::new(p.x, p.x, p.y))
            .collect();
        let xy = triangulate_cloud(points.clone(), Projection::Xy, ShapeKind::Surface);
        assert_eq!(xy.triangle_count(), 0);

        let fit = triangulate_cloud(points, Projection::BestFit, ShapeKind::Surface);
        assert_eq!(fit.triangle_count(), 32);
    }

    #[test]
    fn wireframe_for_mesh_shape() {
        let points = grid_points(3, |x, y| x * y);
        let mesh = triangulate_cloud(points, Projection::Xy, ShapeKind::Mesh);
        assert_eq!(mesh.topology, Topology::Lines);
        assert!(mesh.segment_count() > 0);
        assert_eq!(mesh.triangle_count(), 0);
    }
}
