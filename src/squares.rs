//! Marching squares over a 2D [`SampleGrid`].
use crate::{
    interp::{crossing_t, interpolate_points},
    sampler::SampleGrid,
    settings::{EdgePlacement, SaddleResolution},
    tables::{SADDLE_ALTERNATES, SQUARE_CORNER_OFFSETS, SQUARE_EDGE_CORNERS, SQUARE_SEGMENTS},
    types::{Point, Value},
};

/// Computes the marching-squares case for corner values ordered
/// `(x, y), (x+1, y), (x+1, y+1), (x, y+1)`.
///
/// A bit is set unless the corner is negative, so NaN corners count as outside.
#[inline]
pub fn square_case(corners: &[Value; 4]) -> usize {
    let mut case = 0;
    for (i, &v) in corners.iter().enumerate() {
        if !(v < 0.0) {
            case |= 1 << i;
        }
    }
    case
}

/// Edge pairs emitted for `case`, with `-1` terminating the list.
pub fn segment_edges(
    case: usize,
    corners: &[Value; 4],
    saddle: SaddleResolution,
) -> &'static [i8; 4] {
    let saddle_case = case == 5 || case == 10;
    if saddle_case && saddle == SaddleResolution::CenterAverage {
        let average = corners.iter().sum::<Value>() / 4.0;
        // The table joins the set corners; a negative center separates them instead.
        if average < 0.0 {
            return &SADDLE_ALTERNATES[(case == 10) as usize];
        }
    }
    &SQUARE_SEGMENTS[case]
}

/// Runs marching squares over every cell of a 2D grid.
///
/// Returns a flat list of points (`z = 0`), two per segment, in cell order `y` outer,
/// `x` inner. Segments are independent: consecutive segments are not guaranteed to connect
/// and the curve is never assembled into loops.
pub fn march_squares(
    grid: &SampleGrid,
    placement: EdgePlacement,
    saddle: SaddleResolution,
) -> Vec<Point> {
    let domain = &grid.domain;
    let cells = domain.cells_per_axis();
    let mut points = Vec::new();

    for y in 0..cells {
        for x in 0..cells {
            let corners = SQUARE_CORNER_OFFSETS.map(|[dx, dy]| grid.get(x + dx, y + dy, 0));
            let case = square_case(&corners);
            if case == 0 || case == 15 {
                continue;
            }

            for &edge in segment_edges(case, &corners, saddle)
                .iter()
                .take_while(|&&e| e != -1)
            {
                let [a, b] = SQUARE_EDGE_CORNERS[edge as usize];
                let [ax, ay] = SQUARE_CORNER_OFFSETS[a];
                let [bx, by] = SQUARE_CORNER_OFFSETS[b];

                let p = match placement {
                    // Half-step addressing keeps shared edges bit-identical between cells.
                    EdgePlacement::Midpoint => domain.at_half_steps([
                        2 * x + ax + bx,
                        2 * y + ay + by,
                        0,
                    ]),
                    EdgePlacement::Interpolated => {
                        let t = crossing_t(corners[a], corners[b], placement);
                        interpolate_points(
                            &domain.node([x + ax, y + ay, 0]),
                            &domain.node([x + bx, y + by, 0]),
                            t,
                        )
                    }
                };
                points.push(p);
            }
        }
    }

    tracing::debug!("marching squares emitted {} segments", points.len() / 2);
    points
}
