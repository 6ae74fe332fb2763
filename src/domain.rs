use crate::{
    error::{PlotError, Result},
    types::{Dimension, Point, Value},
};

/// Axis-aligned sampling box `[-R, R]^d` with `N` samples per axis.
///
/// Grid nodes sit at `-R + 2R * i / (N - 1)` for `i` in `0..N`, so the first node of every
/// axis is exactly `-R` and the last exactly `+R`.
///
/// Flat sample indices are row-major with `x` varying fastest:
/// ```text
///  idx = x + y * N            (2D)
///  idx = x + y * N + z * N^2  (3D)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub dimension: Dimension,
    /// Half the side length of the box (`drawRange`).
    pub half_extent: Value,
    /// Samples per axis.
    pub resolution: usize,
}

impl Domain {
    /// Creates a validated domain.
    ///
    /// Returns [`PlotError::InvalidResolution`] for fewer than 2 samples per axis (a single
    /// sample has no cells) and [`PlotError::InvalidExtent`] for a non-positive or
    /// non-finite half extent.
    pub fn new(dimension: Dimension, half_extent: Value, resolution: usize) -> Result<Self> {
        if resolution < 2 {
            return Err(PlotError::InvalidResolution { resolution });
        }
        if !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(PlotError::InvalidExtent { half_extent });
        }
        Ok(Self {
            dimension,
            half_extent,
            resolution,
        })
    }

    pub fn axis_min(&self) -> Value {
        -self.half_extent
    }

    pub fn axis_range(&self) -> Value {
        2.0 * self.half_extent
    }

    /// Distance between adjacent grid nodes.
    pub fn step(&self) -> Value {
        self.axis_range() / (self.resolution - 1) as Value
    }

    /// Total number of samples, `N^d`, saturating at `usize::MAX`.
    pub fn sample_count(&self) -> usize {
        self.resolution.saturating_pow(self.dimension.axes() as u32)
    }

    /// Number of cells along each axis, `N - 1`.
    pub fn cells_per_axis(&self) -> usize {
        self.resolution - 1
    }

    /// Coordinate of node `i` along any axis.
    #[inline]
    pub fn coordinate(&self, i: usize) -> Value {
        self.half_coordinate(2 * i)
    }

    /// Coordinate at `k` half-steps from the lower bound, `k` in `0..=2(N-1)`.
    ///
    /// Even `k` lands on nodes, odd `k` on cell-edge midpoints. Two cells that share an edge
    /// both address its midpoint as `half_coordinate(i + (i + 1))`, so they get the same bits.
    #[inline]
    pub fn half_coordinate(&self, k: usize) -> Value {
        let t = k as Value / (2 * (self.resolution - 1)) as Value;
        self.axis_min() + self.axis_range() * t
    }

    /// Position of the node at grid index `[x, y, z]` (`z` ignored in 2D).
    #[inline]
    pub fn node(&self, index: [usize; 3]) -> Point {
        self.at_half_steps([2 * index[0], 2 * index[1], 2 * index[2]])
    }

    /// Position at half-step offsets along each axis (`z` forced to 0 in 2D).
    #[inline]
    pub fn at_half_steps(&self, k: [usize; 3]) -> Point {
        let z = match self.dimension {
            Dimension::Two => 0.0,
            Dimension::Three => self.half_coordinate(k[2]),
        };
        Point::new(self.half_coordinate(k[0]), self.half_coordinate(k[1]), z)
    }

    /// Flat sample index of grid node `[x, y, z]`.
    #[inline]
    pub fn flat_index(&self, index: [usize; 3]) -> usize {
        let n = self.resolution;
        index[0] + index[1] * n + index[2] * n * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(
            Domain::new(Dimension::Two, 10.0, 1),
            Err(PlotError::InvalidResolution { resolution: 1 })
        ));
        assert!(matches!(
            Domain::new(Dimension::Three, 0.0, 10),
            Err(PlotError::InvalidExtent { .. })
        ));
        assert!(Domain::new(Dimension::Three, f64::NAN, 10).is_err());
    }

    #[test]
    fn endpoints_are_exact() {
        for n in 2..40 {
            for r in [0.3, 1.0, 7.0, 10.0, 12.345] {
                let d = Domain::new(Dimension::Two, r, n).unwrap();
                assert_eq!(d.coordinate(0), -r);
                assert_eq!(d.coordinate(n - 1), r);
            }
        }
    }

    #[test]
    fn half_steps_agree_with_nodes() {
        let d = Domain::new(Dimension::Three, 7.0, 13).unwrap();
        for i in 0..13 {
            let expected = d.axis_min() + d.axis_range() * (i as f64 / 12.0);
            assert_eq!(d.coordinate(i), expected);
        }
        let mid = d.half_coordinate(5);
        assert!(mid > d.coordinate(2) && mid < d.coordinate(3));
    }

    #[test]
    fn flat_index_is_row_major() {
        let d = Domain::new(Dimension::Three, 1.0, 4).unwrap();
        assert_eq!(d.flat_index([1, 0, 0]), 1);
        assert_eq!(d.flat_index([0, 1, 0]), 4);
        assert_eq!(d.flat_index([0, 0, 1]), 16);
        assert_eq!(d.sample_count(), 64);

        let huge = Domain::new(Dimension::Three, 1.0, 3_000_000).unwrap();
        assert_eq!(huge.sample_count(), usize::MAX);
    }
}
