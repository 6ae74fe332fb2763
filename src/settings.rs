use crate::types::{Dimension, Value};

/// How the zero-set is presented.
///
/// 2D formulas support [`Points`](ShapeKind::Points) and [`Line`](ShapeKind::Line);
/// 3D formulas support [`Points`](ShapeKind::Points), [`Mesh`](ShapeKind::Mesh) and
/// [`Surface`](ShapeKind::Surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeKind {
    /// Loose points, normals facing the viewer.
    Points,
    /// Curve segments extruded into lit tubes (2D).
    Line,
    /// Triangle edges as a line list (3D wireframe).
    Mesh,
    /// Filled triangles with averaged vertex normals (3D).
    #[default]
    Surface,
}

/// Plane used to triangulate a threshold-filtered point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    /// Drop `z`, triangulate in the XY plane.
    #[default]
    Xy,
    /// Drop `y`, triangulate in the XZ plane.
    Xz,
    /// Drop `x`, triangulate in the YZ plane.
    Yz,
    /// Project onto the plane spanned by the two principal axes of the cloud.
    BestFit,
}

/// How 3D `Mesh`/`Surface` geometry is reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurfaceMethod {
    /// Marching cubes over the full sample grid.
    #[default]
    Cells,
    /// Planar Delaunay triangulation of the near-zero samples.
    PointCloud(Projection),
}

/// Where 2D [`Points`](ShapeKind::Points) come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointSource {
    /// Welded marching-squares crossings, one point per curve vertex.
    #[default]
    Crossings,
    /// Grid samples whose value is within [`PlotSettings::tolerance`] of zero.
    Filtered,
}

/// Where a crossing is placed on a cell edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgePlacement {
    /// Halfway along the edge, regardless of the corner values.
    #[default]
    Midpoint,
    /// Linear interpolation of the corner values to the zero crossing.
    Interpolated,
}

/// Treatment of the two marching-squares saddle cases (5 and 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SaddleResolution {
    /// Fixed pairing from the case table.
    #[default]
    Split,
    /// Pick the pairing from the sign of the average of the four corners.
    CenterAverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceSide {
    /// Keep cells with `z <= position`.
    Below,
    /// Keep cells with `z >= position`.
    Above,
}

/// Cutaway plane `z = position` for 3D cell extraction.
///
/// Only cells lying entirely on the kept side emit geometry; cells crossing the plane are
/// dropped and no cap is generated along the cut.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slice {
    pub position: Value,
    pub keep: SliceSide,
}

impl Slice {
    pub fn below(position: Value) -> Self {
        Self {
            position,
            keep: SliceSide::Below,
        }
    }

    pub fn above(position: Value) -> Self {
        Self {
            position,
            keep: SliceSide::Above,
        }
    }

    /// Whether a cell spanning `z_min..=z_max` is kept.
    #[inline]
    pub fn keeps(&self, z_min: Value, z_max: Value) -> bool {
        match self.keep {
            SliceSide::Below => z_max <= self.position,
            SliceSide::Above => z_min >= self.position,
        }
    }
}

/// Default for [`PlotSettings::max_resolution`].
pub const DEFAULT_MAX_RESOLUTION: usize = 400;

/// Parameters of one extraction request.
///
/// ```
/// use bevy_implicit_plot::settings::{PlotSettings, ShapeKind, Slice};
///
/// let settings = PlotSettings::default()
///     .with_resolution(60)
///     .with_shape(ShapeKind::Mesh)
///     .with_slice(Slice::below(0.0));
/// assert_eq!(settings.resolution, 60);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlotSettings {
    /// Force 2D or 3D sampling; `None` detects it from the formula.
    pub dimension: Option<Dimension>,
    /// Half side length of the sampling box.
    pub half_extent: Value,
    /// Samples per axis.
    pub resolution: usize,
    /// Ceiling applied to `resolution` before sampling.
    pub max_resolution: usize,
    pub shape: ShapeKind,
    pub point_source: PointSource,
    /// Near-zero band for threshold-filtered samples.
    pub tolerance: Value,
    /// Tube radius for 2D lines.
    pub radius: f32,
    pub slice: Option<Slice>,
    pub surface_method: SurfaceMethod,
    pub edge_placement: EdgePlacement,
    pub saddle: SaddleResolution,
    /// Side of the quantisation cell used for welding: positions that round to the same
    /// cell share one vertex. Non-positive values weld exact duplicates only.
    pub weld_epsilon: Value,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            dimension: None,
            half_extent: 10.0,
            resolution: 100,
            max_resolution: DEFAULT_MAX_RESOLUTION,
            shape: ShapeKind::Surface,
            point_source: PointSource::Crossings,
            tolerance: 0.1,
            radius: 0.25,
            slice: None,
            surface_method: SurfaceMethod::Cells,
            edge_placement: EdgePlacement::Midpoint,
            saddle: SaddleResolution::Split,
            weld_epsilon: 1e-6,
        }
    }
}

impl PlotSettings {
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_half_extent(mut self, half_extent: Value) -> Self {
        self.half_extent = half_extent;
        self
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_max_resolution(mut self, max_resolution: usize) -> Self {
        self.max_resolution = max_resolution;
        self
    }

    pub fn with_point_source(mut self, source: PointSource) -> Self {
        self.point_source = source;
        self
    }

    pub fn with_shape(mut self, shape: ShapeKind) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Value) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slice = Some(slice);
        self
    }

    pub fn with_surface_method(mut self, method: SurfaceMethod) -> Self {
        self.surface_method = method;
        self
    }

    pub fn with_edge_placement(mut self, placement: EdgePlacement) -> Self {
        self.edge_placement = placement;
        self
    }

    pub fn with_saddle(mut self, saddle: SaddleResolution) -> Self {
        self.saddle = saddle;
        self
    }

    /// Maps the requested shape onto one the dimension supports.
    ///
    /// 2D has no surfaces, so `Mesh`/`Surface` become `Line`; 3D has no lines, so `Line`
    /// becomes `Mesh`.
    pub fn effective_shape(&self, dimension: Dimension) -> ShapeKind {
        match (dimension, self.shape) {
            (Dimension::Two, ShapeKind::Mesh | ShapeKind::Surface) => ShapeKind::Line,
            (Dimension::Three, ShapeKind::Line) => ShapeKind::Mesh,
            (_, shape) => shape,
        }
    }
}
