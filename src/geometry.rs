//! Per-range geometric fitting primitives used by the cut-point optimizer
//! (spec §4.G.1, §4.G.3): total-least-squares line fit, algebraic circle
//! fit, and the line/arc/circle intersection routines used for junction
//! snapping.

use crate::types::{ArcParams, CircleParams, LineParams, Point2};
use std::f64::consts::PI;

/// A total-least-squares line fit (principal axis of the point covariance)
/// plus the summed squared perpendicular residual.
pub struct LineFit {
    pub line: LineParams,
    pub sum_sq_error: f64,
}

/// Fit a line to `points` via PCA: the centroid plus the covariance matrix's
/// dominant eigenvector as direction. Returns `None` only when fewer than 2
/// points are given (degenerate covariance is still handled: a single
/// repeated point yields an arbitrary unit direction with zero error).
pub fn fit_line(points: &[Point2]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cxx = 0.0;
    let mut cxy = 0.0;
    let mut cyy = 0.0;
    for &(x, y) in points {
        let dx = x - cx;
        let dy = y - cy;
        cxx += dx * dx;
        cxy += dx * dy;
        cyy += dy * dy;
    }

    let direction = if cxx.abs() < 1e-12 && cxy.abs() < 1e-12 && cyy.abs() < 1e-12 {
        (1.0, 0.0)
    } else {
        let theta = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
        (theta.cos(), theta.sin())
    };

    let line = LineParams {
        point: (cx, cy),
        direction,
    };

    let sum_sq_error = points.iter().map(|&p| perpendicular_distance(p, &line).powi(2)).sum();

    Some(LineFit { line, sum_sq_error })
}

/// Perpendicular distance from `p` to the infinite line `line`.
pub fn perpendicular_distance(p: Point2, line: &LineParams) -> f64 {
    let vx = p.0 - line.point.0;
    let vy = p.1 - line.point.1;
    (vx * line.direction.1 - vy * line.direction.0).abs()
}

pub struct CircleFit {
    pub center: Point2,
    pub radius: f64,
    pub sum_sq_error: f64,
}

/// Algebraic (Kasa/Pratt-style) circle fit: solve the 3x3 normal-equations
/// system for `x^2 + y^2 + D*x + E*y + F = 0`. Returns `None` when the
/// system is singular (collinear points) or the implied radius-squared is
/// negative.
pub fn fit_circle(points: &[Point2]) -> Option<CircleFit> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    let mut sxz = 0.0;
    let mut syz = 0.0;
    let mut sz = 0.0;

    for &(x, y) in points {
        let z = x * x + y * y;
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        sxz += x * z;
        syz += y * z;
        sz += z;
    }

    // [sxx sxy sx] [D]   [-sxz]
    // [sxy syy sy] [E] = [-syz]
    // [sx  sy  n ] [F]   [-sz ]
    let m = [[sxx, sxy, sx], [sxy, syy, sy], [sx, sy, n]];
    let rhs = [-sxz, -syz, -sz];

    let (d, e, f) = solve_3x3(m, rhs)?;

    let center = (-d / 2.0, -e / 2.0);
    let radius_sq = center.0 * center.0 + center.1 * center.1 - f;
    if radius_sq <= 0.0 {
        return None;
    }
    let radius = radius_sq.sqrt();

    let sum_sq_error = points
        .iter()
        .map(|&p| {
            let dist = ((p.0 - center.0).powi(2) + (p.1 - center.1).powi(2)).sqrt();
            (dist - radius).powi(2)
        })
        .sum();

    Some(CircleFit {
        center,
        radius,
        sum_sq_error,
    })
}

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn solve_3x3(m: [[f64; 3]; 3], rhs: [f64; 3]) -> Option<(f64, f64, f64)> {
    let det = det3(m);
    if det.abs() < 1e-9 {
        return None;
    }
    let mut mx = m;
    let mut my = m;
    let mut mz = m;
    for row in 0..3 {
        mx[row][0] = rhs[row];
        my[row][1] = rhs[row];
        mz[row][2] = rhs[row];
    }
    Some((det3(mx) / det, det3(my) / det, det3(mz) / det))
}

fn normalize_to_pi(mut a: f64) -> f64 {
    while a <= -PI {
        a += 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Derive the arc's angular parameterization from a fitted circle and the
/// range's start/end/mid pixels, per spec §4.G.1 and §9's note on arc
/// orientation brittleness: the sign of `cross(mid-start, end-mid)` picks a
/// side, then the sweep is flipped to the long way around if that choice
/// doesn't place `mid` on the resulting short arc.
pub fn arc_angles(center: Point2, start: Point2, end: Point2, mid: Point2) -> (f64, f64, bool) {
    let angle_of = |p: Point2| (p.1 - center.1).atan2(p.0 - center.0);
    let a_start = angle_of(start);
    let a_end = angle_of(end);
    let a_mid = angle_of(mid);

    let mut sweep = normalize_to_pi(a_end - a_start);
    let mid_offset = normalize_to_pi(a_mid - a_start);
    let mid_on_short_arc = if sweep >= 0.0 {
        mid_offset >= 0.0 && mid_offset <= sweep
    } else {
        mid_offset <= 0.0 && mid_offset >= sweep
    };
    if !mid_on_short_arc {
        sweep = if sweep >= 0.0 {
            sweep - 2.0 * PI
        } else {
            sweep + 2.0 * PI
        };
    }

    let end_angle = a_start + sweep;
    let clockwise = sweep < 0.0;
    (a_start, end_angle, clockwise)
}

/// Whether `angle` lies within the arc's angular extent (inclusive),
/// accounting for the unwrapped (possibly > 2π magnitude) sweep.
pub fn angle_within_arc(arc: &ArcParams, angle: f64) -> bool {
    let sweep = arc.end_angle - arc.start_angle;
    let mut offset = angle - arc.start_angle;
    // Bring offset into the same winding direction as sweep, within one
    // full turn, then check containment.
    if sweep >= 0.0 {
        while offset < 0.0 {
            offset += 2.0 * PI;
        }
        offset <= sweep + 1e-9
    } else {
        while offset > 0.0 {
            offset -= 2.0 * PI;
        }
        offset >= sweep - 1e-9
    }
}

/// Intersection of two infinite parameterized lines. `None` if directions
/// are near-parallel (`|cross| < 1e-6`).
pub fn line_line_intersection(a: &LineParams, b: &LineParams) -> Option<Point2> {
    let cross = a.direction.0 * b.direction.1 - a.direction.1 * b.direction.0;
    if cross.abs() < 1e-6 {
        return None;
    }
    let dx = b.point.0 - a.point.0;
    let dy = b.point.1 - a.point.1;
    let t = (dx * b.direction.1 - dy * b.direction.0) / cross;
    Some((a.point.0 + t * a.direction.0, a.point.1 + t * a.direction.1))
}

/// Real intersections (0, 1, or 2) of an infinite line with a circle.
pub fn line_circle_intersections(line: &LineParams, circle: &CircleParams) -> Vec<Point2> {
    let ox = line.point.0 - circle.center.0;
    let oy = line.point.1 - circle.center.1;
    let b = ox * line.direction.0 + oy * line.direction.1;
    let c = ox * ox + oy * oy - circle.radius * circle.radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    if discriminant.abs() < 1e-12 {
        let t = -b;
        return vec![(line.point.0 + t * line.direction.0, line.point.1 + t * line.direction.1)];
    }
    let sq = discriminant.sqrt();
    let t1 = -b + sq;
    let t2 = -b - sq;
    vec![
        (line.point.0 + t1 * line.direction.0, line.point.1 + t1 * line.direction.1),
        (line.point.0 + t2 * line.direction.0, line.point.1 + t2 * line.direction.1),
    ]
}

/// Real intersections (0, 1, or 2) of two circles.
pub fn circle_circle_intersections(a: &CircleParams, b: &CircleParams) -> Vec<Point2> {
    let dx = b.center.0 - a.center.0;
    let dy = b.center.1 - a.center.1;
    let d = (dx * dx + dy * dy).sqrt();
    if d < 1e-12 || d > a.radius + b.radius || d < (a.radius - b.radius).abs() {
        return Vec::new();
    }
    let a_dist = (a.radius * a.radius - b.radius * b.radius + d * d) / (2.0 * d);
    let h_sq = a.radius * a.radius - a_dist * a_dist;
    let h = if h_sq < 0.0 { 0.0 } else { h_sq.sqrt() };

    let mx = a.center.0 + a_dist * dx / d;
    let my = a.center.1 + a_dist * dy / d;

    if h < 1e-9 {
        return vec![(mx, my)];
    }

    let rx = -dy * (h / d);
    let ry = dx * (h / d);
    vec![(mx + rx, my + ry), (mx - rx, my - ry)]
}

pub fn distance(a: Point2, b: Point2) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_line_recovers_horizontal_direction() {
        let points: Vec<Point2> = (0..10).map(|x| (x as f64, 3.0)).collect();
        let fit = fit_line(&points).unwrap();
        assert!(fit.sum_sq_error < 1e-6);
        assert!(fit.line.direction.1.abs() < 1e-6);
    }

    #[test]
    fn fit_circle_recovers_known_circle() {
        let center = (30.0, 30.0);
        let radius = 20.0;
        let points: Vec<Point2> = (0..16)
            .map(|i| {
                let theta = i as f64 / 16.0 * 2.0 * PI;
                (center.0 + radius * theta.cos(), center.1 + radius * theta.sin())
            })
            .collect();
        let fit = fit_circle(&points).unwrap();
        assert!((fit.center.0 - center.0).abs() < 1e-6);
        assert!((fit.center.1 - center.1).abs() < 1e-6);
        assert!((fit.radius - radius).abs() < 1e-6);
    }

    #[test]
    fn fit_circle_returns_none_for_collinear_points() {
        let points: Vec<Point2> = (0..5).map(|x| (x as f64, 0.0)).collect();
        assert!(fit_circle(&points).is_none());
    }

    #[test]
    fn line_line_intersection_finds_crossing_point() {
        let a = LineParams {
            point: (0.0, 0.0),
            direction: (1.0, 0.0),
        };
        let b = LineParams {
            point: (5.0, -5.0),
            direction: (0.0, 1.0),
        };
        let p = line_line_intersection(&a, &b).unwrap();
        assert!((p.0 - 5.0).abs() < 1e-9);
        assert!((p.1 - 0.0).abs() < 1e-9);
    }

    #[test]
    fn line_line_intersection_none_when_parallel() {
        let a = LineParams {
            point: (0.0, 0.0),
            direction: (1.0, 0.0),
        };
        let b = LineParams {
            point: (0.0, 1.0),
            direction: (1.0, 0.0),
        };
        assert!(line_line_intersection(&a, &b).is_none());
    }

    #[test]
    fn line_circle_intersections_tangent_has_one_point() {
        let line = LineParams {
            point: (0.0, 10.0),
            direction: (1.0, 0.0),
        };
        let circle = CircleParams {
            center: (0.0, 0.0),
            radius: 10.0,
        };
        let points = line_circle_intersections(&line, &circle);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn circle_circle_intersections_two_points() {
        let a = CircleParams {
            center: (0.0, 0.0),
            radius: 5.0,
        };
        let b = CircleParams {
            center: (6.0, 0.0),
            radius: 5.0,
        };
        let points = circle_circle_intersections(&a, &b);
        assert_eq!(points.len(), 2);
        for p in points {
            assert!((distance(p, a.center) - 5.0).abs() < 1e-6);
            assert!((distance(p, b.center) - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn arc_angles_semicircle_sweep_is_pi() {
        let center = (30.0, 20.0);
        let start = (30.0, 10.0);
        let end = (30.0, 30.0);
        let mid = (40.0, 20.0);
        let (start_angle, end_angle, _clockwise) = arc_angles(center, start, end, mid);
        assert!(((end_angle - start_angle).abs() - PI).abs() < 1e-6);
    }
}
