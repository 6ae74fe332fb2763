//! Grid sampling: evaluates a formula at every node of a [`Domain`].
use ndarray::Array3;

use crate::{
    domain::Domain,
    error::Result,
    formula::Evaluator,
    types::{Dimension, Point, Value},
};

/// Scalar field values over a full grid, plus the matching sample positions.
///
/// `values` is indexed `[z][y][x]` (a single `z` layer in 2D), so its row-major layout is
/// exactly the flat index order `x + y*N + z*N*N`.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    pub domain: Domain,
    /// Sample positions in flat index order.
    pub points: Vec<Point>,
    pub values: Array3<Value>,
}

impl SampleGrid {
    /// Returns the scalar field value at node `(x, y, z)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[z, y, x]]
    }

    /// Values in flat index order.
    pub fn flat_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Calls `f(index, coords)` for every node in flat index order.
///
/// The outermost loop runs over the highest axis (`z`, then `y`, then `x`). Stops at the
/// first error.
fn for_each_node<F>(domain: &Domain, mut f: F) -> Result<()>
where
    F: FnMut([usize; 3], &[Value]) -> Result<()>,
{
    let n = domain.resolution;
    let layers = match domain.dimension {
        Dimension::Two => 1,
        Dimension::Three => n,
    };
    let axes = domain.dimension.axes();

    for z in 0..layers {
        for y in 0..n {
            for x in 0..n {
                let p = domain.node([x, y, z]);
                let coords = [p.x, p.y, p.z];
                f([x, y, z], &coords[..axes])?;
            }
        }
    }
    Ok(())
}

/// Evaluates `evaluator` at all `N^d` nodes of `domain`.
///
/// Non-finite results are kept as-is. The first evaluator failure aborts the pass and is
/// returned; a partial grid is never produced.
pub fn sample_grid<E: Evaluator + ?Sized>(evaluator: &E, domain: &Domain) -> Result<SampleGrid> {
    let n = domain.resolution;
    let layers = match domain.dimension {
        Dimension::Two => 1,
        Dimension::Three => n,
    };

    let mut points = Vec::with_capacity(domain.sample_count());
    let mut values = Array3::<Value>::zeros((layers, n, n));

    for_each_node(domain, |[x, y, z], coords| {
        values[[z, y, x]] = evaluator.evaluate(coords)?;
        points.push(domain.node([x, y, z]));
        Ok(())
    })?;

    tracing::debug!(
        "sampled {} nodes ({}^{})",
        points.len(),
        n,
        domain.dimension.axes()
    );

    Ok(SampleGrid {
        domain: *domain,
        points,
        values,
    })
}

/// Returns the nodes where the formula is finite and within `tolerance` of zero.
///
/// A sample is kept only if `|value| <= tolerance`. Evaluator failure aborts the pass, as in
/// [`sample_grid`].
pub fn sample_filtered<E: Evaluator + ?Sized>(
    evaluator: &E,
    domain: &Domain,
    tolerance: Value,
) -> Result<Vec<Point>> {
    let mut kept = Vec::new();

    for_each_node(domain, |index, coords| {
        let value = evaluator.evaluate(coords)?;
        if value.is_finite() && value.abs() <= tolerance {
            kept.push(domain.node(index));
        }
        Ok(())
    })?;

    tracing::debug!(
        "kept {} of {} samples within {tolerance}",
        kept.len(),
        domain.sample_count()
    );

    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlotError;

    fn circle(p: &[Value]) -> Result<Value> {
        Ok(p[0] * p[0] + p[1] * p[1] - 4.0)
    }

    #[test]
    fn grid_has_one_sample_per_node() {
        for n in [2, 3, 17] {
            let d2 = Domain::new(Dimension::Two, 3.0, n).unwrap();
            let grid = sample_grid(&circle, &d2).unwrap();
            assert_eq!(grid.len(), n * n);
            assert_eq!(grid.values.len(), n * n);

            let d3 = Domain::new(Dimension::Three, 3.0, n).unwrap();
            let sphere = |p: &[Value]| -> Result<Value> { Ok(p[0] + p[1] + p[2]) };
            let grid = sample_grid(&sphere, &d3).unwrap();
            assert_eq!(grid.len(), n * n * n);
        }
    }

    #[test]
    fn points_and_values_share_flat_order() {
        let d = Domain::new(Dimension::Three, 2.0, 5).unwrap();
        let f = |p: &[Value]| -> Result<Value> { Ok(p[0] + 10.0 * p[1] + 100.0 * p[2]) };
        let grid = sample_grid(&f, &d).unwrap();

        for (i, (p, v)) in grid.points.iter().zip(grid.flat_values()).enumerate() {
            assert_eq!(v, p.x + 10.0 * p.y + 100.0 * p.z, "sample {i}");
        }
        assert_eq!(grid.points[1].x, d.coordinate(1));
        assert_eq!(grid.points[5].y, d.coordinate(1));
        assert_eq!(grid.points[25].z, d.coordinate(1));
        assert_eq!(grid.points[0], Point::new(-2.0, -2.0, -2.0));
        assert_eq!(grid.points[124], Point::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn non_finite_values_are_retained() {
        let d = Domain::new(Dimension::Two, 1.0, 3).unwrap();
        let f = |p: &[Value]| -> Result<Value> { Ok(1.0 / p[0]) };
        let grid = sample_grid(&f, &d).unwrap();
        assert!(grid.get(1, 0, 0).is_infinite());
        assert_eq!(grid.len(), 9);
    }

    #[test]
    fn failure_aborts_the_whole_pass() {
        let d = Domain::new(Dimension::Two, 1.0, 4).unwrap();
        let f = |p: &[Value]| -> Result<Value> {
            if p[1] > 0.0 {
                Err(PlotError::evaluation(p, "unsupported"))
            } else {
                Ok(0.0)
            }
        };
        assert!(sample_grid(&f, &d).is_err());
        assert!(sample_filtered(&f, &d, 1.0).is_err());
    }

    #[test]
    fn filtered_points_satisfy_tolerance() {
        let d = Domain::new(Dimension::Two, 3.0, 61).unwrap();
        let kept = sample_filtered(&circle, &d, 0.3).unwrap();
        assert!(!kept.is_empty());
        for p in &kept {
            assert!(circle(&[p.x, p.y]).unwrap().abs() <= 0.3);
        }
    }

    #[test]
    fn filtered_skips_nan_and_infinity() {
        let d = Domain::new(Dimension::Two, 1.0, 5).unwrap();
        let f = |p: &[Value]| -> Result<Value> {
            Ok(if p[0] < 0.0 { Value::NAN } else { Value::INFINITY })
        };
        assert!(sample_filtered(&f, &d, Value::INFINITY).unwrap().is_empty());
    }
}
