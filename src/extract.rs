//! The extraction pipeline: formula and settings in, one fresh [`GeneratedMesh`] out.
use tracing::{debug, warn};

use crate::{
    cloud::triangulate_cloud,
    cubes::march_cubes,
    domain::Domain,
    error::Result,
    formula::{Compiler, Evaluator, MevalCompiler, detect_dimension},
    mesh::{GeneratedMesh, MeshBuilder, Topology},
    sampler::{sample_filtered, sample_grid},
    settings::{PlotSettings, PointSource, ShapeKind, SurfaceMethod},
    squares::march_squares,
    tube::extrude_segments,
    types::{Dimension, Value},
};

/// Caps `resolution` at `max_resolution`, warning when it had to be reduced.
pub fn clamp_resolution(resolution: usize, max_resolution: usize) -> usize {
    if resolution > max_resolution {
        warn!("resolution {resolution} exceeds the limit, using {max_resolution}");
        max_resolution
    } else {
        resolution
    }
}

/// Compiles `formula` with `compiler` and extracts its zero-set as configured by `settings`.
///
/// `settings.resolution` is capped at `settings.max_resolution`. Any compile or evaluation
/// failure aborts the whole pass; no partial geometry is returned.
pub fn try_extract<C: Compiler>(
    compiler: &C,
    formula: &str,
    settings: &PlotSettings,
) -> Result<GeneratedMesh> {
    let dimension = settings
        .dimension
        .unwrap_or_else(|| detect_dimension(formula));
    let resolution = clamp_resolution(settings.resolution, settings.max_resolution);
    let domain = Domain::new(dimension, settings.half_extent, resolution)?;
    let evaluator = compiler.compile(formula)?;
    extract_with(&evaluator, &domain, settings)
}

/// Extracts geometry for an already compiled evaluator over `domain`.
pub fn extract_with<E: Evaluator + ?Sized>(
    evaluator: &E,
    domain: &Domain,
    settings: &PlotSettings,
) -> Result<GeneratedMesh> {
    let shape = settings.effective_shape(domain.dimension);
    if shape != settings.shape {
        debug!(
            "{:?} is not supported for {:?} plots, drawing {shape:?} instead",
            settings.shape, domain.dimension
        );
    }

    let mesh = match (domain.dimension, shape) {
        (Dimension::Two, ShapeKind::Points) if settings.point_source == PointSource::Filtered => {
            let points = sample_filtered(evaluator, domain, settings.tolerance)?;
            GeneratedMesh::points(&points)
        }
        (Dimension::Two, ShapeKind::Points) => {
            let grid = sample_grid(evaluator, domain)?;
            let points = march_squares(&grid, settings.edge_placement, settings.saddle);
            let mut builder = MeshBuilder::new(settings.weld_epsilon);
            for p in points {
                builder.weld(p);
            }
            builder.into_points()
        }
        (Dimension::Two, _) => {
            let grid = sample_grid(evaluator, domain)?;
            let segments = march_squares(&grid, settings.edge_placement, settings.saddle);
            extrude_segments(&segments, settings.radius as Value)
        }
        (Dimension::Three, ShapeKind::Points) => {
            let points = sample_filtered(evaluator, domain, settings.tolerance)?;
            GeneratedMesh::points(&points)
        }
        (Dimension::Three, shape) => match settings.surface_method {
            SurfaceMethod::Cells => {
                let grid = sample_grid(evaluator, domain)?;
                let triangles = march_cubes(&grid, settings.edge_placement, settings.slice);
                let mut builder = MeshBuilder::new(settings.weld_epsilon);
                for tri in triangles {
                    builder.push_triangle(tri);
                }
                if shape == ShapeKind::Surface {
                    builder.into_surface()
                } else {
                    builder.into_wireframe()
                }
            }
            SurfaceMethod::PointCloud(projection) => {
                let points = sample_filtered(evaluator, domain, settings.tolerance)?;
                triangulate_cloud(points, projection, shape)
            }
        },
    };

    debug!(
        "extracted {:?}: {} vertices, {} indices",
        mesh.topology,
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

/// Extracts `formula` with the `meval` compiler.
///
/// Failures are logged and produce an empty buffer whose topology matches the requested
/// shape, so callers can always replace their previous geometry with the result.
pub fn extract(formula: &str, settings: &PlotSettings) -> GeneratedMesh {
    match try_extract(&MevalCompiler, formula, settings) {
        Ok(mesh) => mesh,
        Err(err) => {
            warn!("could not plot `{formula}`: {err}");
            GeneratedMesh::empty(empty_topology(formula, settings))
        }
    }
}

fn empty_topology(formula: &str, settings: &PlotSettings) -> Topology {
    let dimension = settings
        .dimension
        .unwrap_or_else(|| detect_dimension(formula));
    match settings.effective_shape(dimension) {
        ShapeKind::Points => Topology::Points,
        ShapeKind::Mesh => Topology::Lines,
        ShapeKind::Line | ShapeKind::Surface => Topology::Triangles,
    }
}
