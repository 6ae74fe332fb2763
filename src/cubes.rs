//! Marching cubes over a 3D [`SampleGrid`].
use rayon::prelude::*;

use crate::{
    interp::{crossing_t, interpolate_points},
    sampler::SampleGrid,
    settings::{EdgePlacement, Slice},
    tables::{CORNER_OFFSETS, CORNER_POINT_INDICES, EDGE_TABLE, TRI_TABLE},
    types::{Point, Value},
};

/// Computes the marching cubes case bitmask for a cell.
///
/// Corner `i` sets bit `i` unless its value is negative:
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// case bits:    [_][_][_][_][_][_][_][_]
///                                     ^-- corner 0 non-negative (or NaN)?
/// ```
#[inline]
pub fn cube_case(corners: &[Value; 8]) -> usize {
    let mut case = 0;
    for (i, &v) in corners.iter().enumerate() {
        if !(v < 0.0) {
            case |= 1 << i;
        }
    }
    case
}

/// Crossing positions on the edges flagged in `edges_mask`, for the cell whose lowest
/// corner is node `origin`.
#[inline]
fn edge_points(
    grid: &SampleGrid,
    origin: [usize; 3],
    edges_mask: u16,
    corners: &[Value; 8],
    placement: EdgePlacement,
) -> [Option<Point>; 12] {
    let domain = &grid.domain;
    let mut points = [None; 12];

    for (edge, &[a, b]) in CORNER_POINT_INDICES.iter().enumerate() {
        if edges_mask & (1 << edge) == 0 {
            continue;
        }
        let (a, b) = (a as usize, b as usize);
        let (oa, ob) = (CORNER_OFFSETS[a], CORNER_OFFSETS[b]);

        points[edge] = Some(match placement {
            // The midpoint sits at an odd half-step along the edge axis, exactly what the
            // neighbouring cell computes for the same edge.
            EdgePlacement::Midpoint => domain.at_half_steps(std::array::from_fn(|axis| {
                2 * origin[axis] + oa[axis] + ob[axis]
            })),
            EdgePlacement::Interpolated => {
                let node = |o: [usize; 3]| {
                    domain.node(std::array::from_fn(|axis| origin[axis] + o[axis]))
                };
                let t = crossing_t(corners[a], corners[b], placement);
                interpolate_points(&node(oa), &node(ob), t)
            }
        });
    }
    points
}

/// Triangles of the cell at `origin`, appended to `out`.
fn march_cell(
    grid: &SampleGrid,
    origin: [usize; 3],
    placement: EdgePlacement,
    out: &mut Vec<[Point; 3]>,
) {
    let [x, y, z] = origin;
    let corners = CORNER_OFFSETS.map(|[dx, dy, dz]| grid.get(x + dx, y + dy, z + dz));
    let case = cube_case(&corners);
    let edges_mask = EDGE_TABLE[case];
    if edges_mask == 0 {
        return;
    }

    let points = edge_points(grid, origin, edges_mask, &corners, placement);
    let row = &TRI_TABLE[case];
    for tri in row.chunks_exact(3).take_while(|tri| tri[0] != -1) {
        // Every edge named by the triangle table is set in the edge mask.
        let corners = [tri[0], tri[1], tri[2]].map(|e| points[e as usize]);
        if let [Some(a), Some(b), Some(c)] = corners {
            out.push([a, b, c]);
        }
    }
}

/// Runs marching cubes over every cell of a 3D grid.
///
/// Returns triangle soup wound so that face normals point towards the non-negative
/// side of the field. Cells are visited `z` outer, then `y`, then `x`; `z` layers are
/// processed in parallel but concatenated in order, so the output is identical on every
/// run. With a `slice`, only cells lying entirely on its kept side are visited.
pub fn march_cubes(
    grid: &SampleGrid,
    placement: EdgePlacement,
    slice: Option<Slice>,
) -> Vec<[Point; 3]> {
    let domain = &grid.domain;
    let cells = domain.cells_per_axis();

    let layers: Vec<Vec<[Point; 3]>> = (0..cells)
        .into_par_iter()
        .map(|z| {
            let mut layer = Vec::new();
            if let Some(slice) = slice {
                let z_min = domain.half_coordinate(2 * z);
                let z_max = domain.half_coordinate(2 * z + 2);
                if !slice.keeps(z_min, z_max) {
                    return layer;
                }
            }
            for y in 0..cells {
                for x in 0..cells {
                    march_cell(grid, [x, y, z], placement, &mut layer);
                }
            }
            layer
        })
        .collect();

    let triangles: Vec<[Point; 3]> = layers.into_iter().flatten().collect();
    tracing::debug!("marching cubes emitted {} triangles", triangles.len());
    triangles
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        domain::Domain, error::Result, mesh::MeshBuilder, sampler::sample_grid,
        types::Dimension,
    };

    fn sphere_grid(radius: Value, half_extent: Value, resolution: usize) -> SampleGrid {
        let domain = Domain::new(Dimension::Three, half_extent, resolution).unwrap();
        let f = move |p: &[Value]| -> Result<Value> {
            Ok(p[0] * p[0] + p[1] * p[1] + p[2] * p[2] - radius * radius)
        };
        sample_grid(&f, &domain).unwrap()
    }

    /// Counts how many triangles use each undirected edge of the welded mesh.
    fn edge_uses(builder: &MeshBuilder) -> HashMap<(u32, u32), usize> {
        let mut uses = HashMap::new();
        for &[a, b, c] in &builder.tris {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *uses.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        uses
    }

    #[test]
    fn case_bits_follow_corner_signs() {
        assert_eq!(cube_case(&[-1.0; 8]), 0);
        assert_eq!(cube_case(&[1.0; 8]), 255);
        let mut corners = [-1.0; 8];
        corners[3] = 0.0;
        corners[6] = Value::NAN;
        assert_eq!(cube_case(&corners), (1 << 3) | (1 << 6));
    }

    #[test]
    fn uniform_fields_produce_nothing() {
        let domain = Domain::new(Dimension::Three, 1.0, 6).unwrap();
        let inside = |_: &[Value]| -> Result<Value> { Ok(-1.0) };
        let outside = |_: &[Value]| -> Result<Value> { Ok(1.0) };
        for grid in [
            sample_grid(&inside, &domain).unwrap(),
            sample_grid(&outside, &domain).unwrap(),
        ] {
            assert!(march_cubes(&grid, EdgePlacement::Midpoint, None).is_empty());
        }
    }

    #[test]
    fn sphere_is_closed_and_outward() {
        let grid = sphere_grid(5.0, 10.0, 30);
        let triangles = march_cubes(&grid, EdgePlacement::Midpoint, None);
        assert!(!triangles.is_empty());

        let mut builder = MeshBuilder::new(1e-9);
        for tri in &triangles {
            builder.push_triangle(*tri);
        }
        assert!(edge_uses(&builder).values().all(|&n| n == 2));

        let outward = (0..builder.tris.len())
            .filter(|&i| {
                let [a, b, c] = builder.tris[i].map(|v| builder.vertices[v as usize]);
                let centroid = (a.coords + b.coords + c.coords) / 3.0;
                builder.tri_normal(i).dot(&centroid) > 0.0
            })
            .count();
        assert_eq!(outward, builder.tris.len());
    }

    #[test]
    fn interpolated_vertices_lie_near_the_sphere() {
        let grid = sphere_grid(5.0, 10.0, 30);
        let step = grid.domain.step();
        for tri in march_cubes(&grid, EdgePlacement::Interpolated, None) {
            for p in tri {
                assert!((p.coords.norm() - 5.0).abs() < step, "{p:?}");
            }
        }
    }

    #[test]
    fn slice_keeps_only_whole_cells_on_one_side() {
        let grid = sphere_grid(5.0, 10.0, 30);
        let below = march_cubes(&grid, EdgePlacement::Midpoint, Some(Slice::below(0.0)));
        let above = march_cubes(&grid, EdgePlacement::Midpoint, Some(Slice::above(0.0)));
        assert!(!below.is_empty() && !above.is_empty());
        assert!(below.iter().flatten().all(|p| p.z <= 0.0));
        assert!(above.iter().flatten().all(|p| p.z >= 0.0));

        // 29 cells per axis: the middle layer straddles z = 0 and belongs to neither half.
        let full = march_cubes(&grid, EdgePlacement::Midpoint, None);
        assert!(below.len() + above.len() < full.len());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let grid = sphere_grid(3.3, 5.0, 21);
        let first = march_cubes(&grid, EdgePlacement::Midpoint, None);
        let second = march_cubes(&grid, EdgePlacement::Midpoint, None);
        assert_eq!(first, second);
    }
}
