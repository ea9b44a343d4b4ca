//! §4.G Cut-point optimizer: partition an edge's pixel chain into lines and
//! arcs, refine the cut points, then snap junctions to analytic
//! intersections.
//!
//! Global optimality is not claimed (spec §9): the split/refine/merge/refine
//! heuristic converges close to the minimum of `sum(error) + k*segmentPenalty`
//! and is stable, not exact.

use std::cell::RefCell;
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::geometry;
use crate::types::{ArcParams, CircleParams, Edge, LineParams, PixelPoint, Point2, Segment, SimplifiedEdge};

const JUNCTION_MARGIN: usize = 2;

enum Primitive {
    Line(LineParams),
    Arc { center: Point2, radius: f64 },
}

struct RangeFit {
    primitive: Primitive,
    sum_sq_error: f64,
}

fn squared_error(primitive: &Primitive, p: Point2) -> f64 {
    match primitive {
        Primitive::Line(line) => geometry::perpendicular_distance(p, line).powi(2),
        Primitive::Arc { center, radius } => {
            let dist = geometry::distance(p, *center);
            (dist - radius).powi(2)
        }
    }
}

/// Fit a line and (for ranges of >= 3 points) an arc to `points`, keeping
/// whichever has lower summed squared error, subject to the "don't force a
/// near-straight range into a huge-radius arc" rejection rule (spec §4.G.1).
/// Falls back to a degenerate single-point line (`NoFitPossible`, spec §7)
/// when even the line fit is impossible.
fn fit_range(points: &[Point2]) -> RangeFit {
    let line_candidate = geometry::fit_line(points).map(|lf| RangeFit {
        primitive: Primitive::Line(lf.line),
        sum_sq_error: lf.sum_sq_error,
    });

    let arc_candidate = if points.len() >= 3 {
        geometry::fit_circle(points).and_then(|cf| {
            let start = points[0];
            let end = *points.last().unwrap();
            let mid = points[points.len() / 2];
            let (start_angle, end_angle, _clockwise) = geometry::arc_angles(cf.center, start, end, mid);
            let sweep = (end_angle - start_angle).abs();
            let chord = geometry::distance(start, end);
            if sweep < 1.0 && cf.radius > 1000.0 * chord {
                None
            } else {
                Some(RangeFit {
                    primitive: Primitive::Arc {
                        center: cf.center,
                        radius: cf.radius,
                    },
                    sum_sq_error: cf.sum_sq_error,
                })
            }
        })
    } else {
        None
    };

    match (line_candidate, arc_candidate) {
        (Some(line), Some(arc)) => {
            if arc.sum_sq_error < line.sum_sq_error {
                arc
            } else {
                line
            }
        }
        (Some(line), None) => line,
        (None, Some(arc)) => arc,
        (None, None) => RangeFit {
            primitive: Primitive::Line(LineParams {
                point: points.first().copied().unwrap_or((0.0, 0.0)),
                direction: (1.0, 0.0),
            }),
            sum_sq_error: 0.0,
        },
    }
}

/// Cumulative absolute angle traveled around `center` by consecutive points
/// in `points`, unwrapping each step to its shortest rotation. A genuine
/// single loop around `center` totals close to one full turn; a poor arc fit
/// over a non-loop-shaped range generally does not.
fn total_sweep_around(points: &[Point2], center: Point2) -> f64 {
    let angle_of = |p: Point2| (p.1 - center.1).atan2(p.0 - center.0);
    let mut total = 0.0;
    let mut prev = angle_of(points[0]);
    for &p in &points[1..] {
        let a = angle_of(p);
        let mut delta = a - prev;
        while delta > std::f64::consts::PI {
            delta -= 2.0 * std::f64::consts::PI;
        }
        while delta < -std::f64::consts::PI {
            delta += 2.0 * std::f64::consts::PI;
        }
        total += delta;
        prev = a;
    }
    total.abs()
}

fn range_len(i: usize, j: usize) -> usize {
    j - i + 1
}

fn perpendicular_distance_to_chord(a: Point2, b: Point2, p: Point2) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return geometry::distance(a, p);
    }
    ((p.0 - a.0) * dy - (p.1 - a.1) * dx).abs() / len
}

/// Phase 1: recursive Douglas-Peucker-style breakpoint discovery.
fn discover_breakpoints(points: &[Point2], config: &Config) -> Vec<usize> {
    let mut breakpoints = BTreeSet::new();
    let last = points.len() - 1;
    breakpoints.insert(0);
    breakpoints.insert(last);
    split_recursive(points, 0, last, config, &mut breakpoints);
    breakpoints.into_iter().collect()
}

fn split_recursive(points: &[Point2], i: usize, j: usize, config: &Config, breakpoints: &mut BTreeSet<usize>) {
    if j <= i || range_len(i, j) < config.min_segment_length {
        return;
    }

    let fit = fit_range(&points[i..=j]);
    let max_error = points[i..=j]
        .iter()
        .map(|&p| squared_error(&fit.primitive, p))
        .fold(f64::MIN, f64::max);
    if max_error <= config.max_segment_error {
        return;
    }

    let mut best_idx = i;
    let mut best_dist = -1.0;
    for k in (i + 1)..j {
        let dist = perpendicular_distance_to_chord(points[i], points[j], points[k]);
        if dist > best_dist {
            best_dist = dist;
            best_idx = k;
        }
    }
    if best_idx == i {
        return;
    }
    if range_len(i, best_idx) < config.min_segment_length || range_len(best_idx, j) < config.min_segment_length {
        return;
    }

    breakpoints.insert(best_idx);
    split_recursive(points, i, best_idx, config, breakpoints);
    split_recursive(points, best_idx, j, config, breakpoints);
}

struct FitCache<'a> {
    points: &'a [Point2],
    cache: RefCell<FxHashMap<(usize, usize), f64>>,
}

impl<'a> FitCache<'a> {
    fn new(points: &'a [Point2]) -> Self {
        Self {
            points,
            cache: RefCell::new(Default::default()),
        }
    }

    fn error(&self, i: usize, j: usize) -> f64 {
        if let Some(&cached) = self.cache.borrow().get(&(i, j)) {
            return cached;
        }
        let error = fit_range(&self.points[i..=j]).sum_sq_error;
        self.cache.borrow_mut().insert((i, j), error);
        error
    }
}

/// Phase 2 / Phase 4: positional refinement of interior breakpoints.
fn refine_positions(breakpoints: &mut [usize], config: &Config, cache: &FitCache, last_index: usize) {
    if breakpoints.len() < 3 {
        return;
    }
    for _ in 0..config.max_iterations {
        let mut changed = false;
        for b in 1..breakpoints.len() - 1 {
            let prev = breakpoints[b - 1];
            let next = breakpoints[b + 1];
            let current = breakpoints[b];
            let mut best = current;
            let mut best_cost = cache.error(prev, current) + cache.error(current, next);

            for delta in -config.refinement_window..=config.refinement_window {
                let candidate = current as i64 + delta as i64;
                if candidate <= prev as i64 || candidate >= next as i64 || candidate < 0 || candidate as usize > last_index
                {
                    continue;
                }
                let candidate = candidate as usize;
                if range_len(prev, candidate) < config.min_segment_length
                    || range_len(candidate, next) < config.min_segment_length
                {
                    continue;
                }
                let cost = cache.error(prev, candidate) + cache.error(candidate, next);
                if cost < best_cost {
                    best_cost = cost;
                    best = candidate;
                }
            }

            if best != current {
                breakpoints[b] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Phase 3: merge adjacent ranges when doing so lowers total cost.
fn merge_pass(breakpoints: &mut Vec<usize>, config: &Config, cache: &FitCache) {
    if breakpoints.len() < 3 {
        return;
    }
    let mut idx = 1;
    while idx < breakpoints.len() - 1 {
        let prev = breakpoints[idx - 1];
        let cur = breakpoints[idx];
        let next = breakpoints[idx + 1];
        let error_left = cache.error(prev, cur);
        let error_right = cache.error(cur, next);
        let error_merged = cache.error(prev, next);
        if error_merged < error_left + error_right + config.segment_penalty {
            breakpoints.remove(idx);
        } else {
            idx += 1;
        }
    }
}

fn as_circle_params(segment: &Segment) -> Option<CircleParams> {
    match segment {
        Segment::Arc { arc, .. } => Some(CircleParams {
            center: arc.center,
            radius: arc.radius,
        }),
        Segment::Circle { circle, .. } => Some(*circle),
        _ => None,
    }
}

fn angle_on_circle(center: Point2, p: Point2) -> f64 {
    (p.1 - center.1).atan2(p.0 - center.0)
}

fn pick_closest(candidates: Vec<Point2>, original: Point2) -> Option<Point2> {
    candidates
        .into_iter()
        .min_by(|a, b| geometry::distance(*a, original).partial_cmp(&geometry::distance(*b, original)).unwrap())
}

/// Closed-form/solved intersection of two adjacent segments, or `None` if no
/// valid intersection exists (near-parallel lines, out-of-arc solutions, or
/// either participant is a full-circle segment) — spec §4.G.3.
fn compute_intersection(a: &Segment, b: &Segment, original: Point2) -> Option<Point2> {
    if matches!(a, Segment::Circle { .. }) || matches!(b, Segment::Circle { .. }) {
        return None;
    }
    match (a, b) {
        (Segment::Line { line: la, .. }, Segment::Line { line: lb, .. }) => {
            geometry::line_line_intersection(la, lb)
        }
        (Segment::Line { line, .. }, Segment::Arc { arc, .. }) => {
            snap_line_arc(line, arc, original)
        }
        (Segment::Arc { arc, .. }, Segment::Line { line, .. }) => {
            snap_line_arc(line, arc, original)
        }
        (Segment::Arc { arc: arc_a, .. }, Segment::Arc { arc: arc_b, .. }) => {
            let ca = as_circle_params(a).unwrap();
            let cb = as_circle_params(b).unwrap();
            let candidates: Vec<Point2> = geometry::circle_circle_intersections(&ca, &cb)
                .into_iter()
                .filter(|&p| {
                    geometry::angle_within_arc(arc_a, angle_on_circle(arc_a.center, p))
                        && geometry::angle_within_arc(arc_b, angle_on_circle(arc_b.center, p))
                })
                .collect();
            pick_closest(candidates, original)
        }
        _ => None,
    }
}

fn snap_line_arc(line: &LineParams, arc: &ArcParams, original: Point2) -> Option<Point2> {
    let circle = CircleParams {
        center: arc.center,
        radius: arc.radius,
    };
    let candidates: Vec<Point2> = geometry::line_circle_intersections(line, &circle)
        .into_iter()
        .filter(|&p| geometry::angle_within_arc(arc, angle_on_circle(arc.center, p)))
        .collect();
    pick_closest(candidates, original)
}

fn snap_pair(segments: &mut [Segment], i: usize, j: usize, original: Point2) {
    let a = segments[i].clone();
    let b = segments[j].clone();
    if let Some(p) = compute_intersection(&a, &b, original) {
        segments[i].set_end(p);
        segments[j].set_start(p);
    }
}

fn build_segment(primitive: Primitive, start: Point2, end: Point2, full_mid: Point2, source_pixels: Vec<PixelPoint>) -> Segment {
    match primitive {
        Primitive::Line(line) => Segment::Line {
            start,
            end,
            line,
            source_pixels,
        },
        Primitive::Arc { center, radius } => {
            let (start_angle, end_angle, clockwise) = geometry::arc_angles(center, start, end, full_mid);
            Segment::Arc {
                start,
                end,
                arc: ArcParams {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    clockwise,
                },
                source_pixels,
            }
        }
    }
}

fn build_segments(
    points: &[Point2],
    pixels: &[PixelPoint],
    breakpoints: &[usize],
    is_closed_loop: bool,
    config: &Config,
) -> Vec<Segment> {
    let last = points.len() - 1;
    let n_segments = breakpoints.len() - 1;

    if is_closed_loop && n_segments == 1 {
        let fit = fit_range(points);
        if let Primitive::Arc { center, radius } = fit.primitive {
            // A closed loop's single-range arc fit only collapses to a full
            // Circle when it both fits tightly and actually sweeps close to
            // a full turn (spec §4.G.4) — a low-sweep or high-error fit is
            // still a single Arc segment, not a Circle. `points[0]` and
            // `points[last]` coincide by construction for a closed loop, so
            // the sweep has to come from the cumulative angle traveled by
            // the whole point chain around `center`, not from endpoints.
            let full_sweep = total_sweep_around(points, center) > 2.0 * std::f64::consts::PI - 0.35;
            let mean_sq_error = fit.sum_sq_error / points.len() as f64;
            if full_sweep && mean_sq_error <= config.max_segment_error {
                return vec![Segment::Circle {
                    circle: CircleParams { center, radius },
                    source_pixels: pixels.to_vec(),
                }];
            }
        }
    }

    let mut segments = Vec::with_capacity(n_segments);
    for m in 0..n_segments {
        let b0 = breakpoints[m];
        let b1 = breakpoints[m + 1];

        let shrink_start = is_closed_loop || b0 != 0;
        let shrink_end = is_closed_loop || b1 != last;
        let mut fit_start = if shrink_start { b0 + JUNCTION_MARGIN } else { b0 };
        let mut fit_end = if shrink_end {
            b1.saturating_sub(JUNCTION_MARGIN)
        } else {
            b1
        };
        if fit_end <= fit_start || range_len(fit_start, fit_end) < 2 {
            fit_start = b0;
            fit_end = b1;
        }

        let fit = fit_range(&points[fit_start..=fit_end]);
        let mid = points[(b0 + b1) / 2];
        let segment = build_segment(fit.primitive, points[b0], points[b1], mid, pixels[b0..=b1].to_vec());
        segments.push(segment);
    }
    segments
}

/// Run the full §4.G pipeline for one graph edge: breakpoint discovery,
/// refinement, merge, a second refinement, range (re-)fitting with
/// junction-margin shrinking, and junction snapping.
pub fn optimize_edge(edge: &Edge, config: &Config) -> SimplifiedEdge {
    let pixels = &edge.ordered_points;
    let is_closed_loop = edge.is_loop();

    if pixels.len() < 2 {
        return SimplifiedEdge {
            original: edge.clone(),
            segments: Vec::new(),
        };
    }

    if pixels.len() == 2 {
        let start = (pixels[0].0 as f64, pixels[0].1 as f64);
        let end = (pixels[1].0 as f64, pixels[1].1 as f64);
        let dx = end.0 - start.0;
        let dy = end.1 - start.1;
        let len = (dx * dx + dy * dy).sqrt();
        let direction = if len < 1e-12 { (1.0, 0.0) } else { (dx / len, dy / len) };
        return SimplifiedEdge {
            original: edge.clone(),
            segments: vec![Segment::Line {
                start,
                end,
                line: LineParams { point: start, direction },
                source_pixels: pixels.clone(),
            }],
        };
    }

    let points: Vec<Point2> = pixels.iter().map(|&(x, y)| (x as f64, y as f64)).collect();

    let mut breakpoints = discover_breakpoints(&points, config);
    let cache = FitCache::new(&points);
    let last_index = points.len() - 1;

    refine_positions(&mut breakpoints, config, &cache, last_index);
    merge_pass(&mut breakpoints, config, &cache);
    refine_positions(&mut breakpoints, config, &cache, last_index);

    let mut segments = build_segments(&points, pixels, &breakpoints, is_closed_loop, config);

    let n = segments.len();
    for i in 0..n.saturating_sub(1) {
        let original_junction = points[breakpoints[i + 1]];
        snap_pair(&mut segments, i, i + 1, original_junction);
    }
    if is_closed_loop && n >= 2 {
        let original_junction = points[0];
        snap_pair(&mut segments, n - 1, 0, original_junction);
    }

    SimplifiedEdge {
        original: edge.clone(),
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_edge(points: &[(i32, i32)]) -> Edge {
        Edge {
            id: 0,
            ordered_points: points.to_vec(),
            node_a: 0,
            node_b: 1,
        }
    }

    #[test]
    fn too_short_edge_yields_no_segments() {
        let edge = Edge {
            id: 0,
            ordered_points: vec![(1, 1)],
            node_a: 0,
            node_b: 0,
        };
        let result = optimize_edge(&edge, &Config::default());
        assert!(result.segments.is_empty());
    }

    #[test]
    fn two_pixel_edge_yields_one_line() {
        let edge = line_edge(&[(0, 0), (5, 5)]);
        let result = optimize_edge(&edge, &Config::default());
        assert_eq!(result.segments.len(), 1);
        assert!(matches!(result.segments[0], Segment::Line { .. }));
    }

    #[test]
    fn straight_line_fits_single_line_segment() {
        let points: Vec<(i32, i32)> = (2..18).map(|x| (x, 2)).collect();
        let edge = line_edge(&points);
        let result = optimize_edge(&edge, &Config::default());
        assert_eq!(result.segments.len(), 1);
        match &result.segments[0] {
            Segment::Line { start, end, .. } => {
                assert!((start.0 - 2.0).abs() < 1.0);
                assert!((end.0 - 17.0).abs() < 1.0);
            }
            other => panic!("expected a line segment, got {other:?}"),
        }
    }

    #[test]
    fn l_shape_fits_two_lines_snapped_near_corner() {
        let mut points: Vec<(i32, i32)> = (2..16).map(|y| (5, y)).collect();
        points.extend((6..16).map(|x| (x, 15)));
        let edge = line_edge(&points);
        let result = optimize_edge(&edge, &Config::default());
        assert_eq!(result.segments.len(), 2);
        assert!(matches!(result.segments[0], Segment::Line { .. }));
        assert!(matches!(result.segments[1], Segment::Line { .. }));

        let corner = result.segments[0].end_point();
        let dist = geometry::distance(corner, (5.0, 15.0));
        assert!(dist < 1.0, "corner should snap near (5,15), got {corner:?}");
        let joined = result.segments[1].start_point();
        assert!((joined.0 - corner.0).abs() < 1e-6);
        assert!((joined.1 - corner.1).abs() < 1e-6);
    }

    #[test]
    fn closed_ring_collapses_to_circle() {
        let center = (30.0, 30.0);
        let radius = 20.0;
        let n = 64;
        let mut points: Vec<(i32, i32)> = (0..n)
            .map(|i| {
                let theta = i as f64 / n as f64 * std::f64::consts::TAU;
                (
                    (center.0 + radius * theta.cos()).round() as i32,
                    (center.1 + radius * theta.sin()).round() as i32,
                )
            })
            .collect();
        points.push(points[0]); // a traced loop edge closes on its seed pixel
        let edge = Edge {
            id: 0,
            ordered_points: points,
            node_a: -1,
            node_b: -1,
        };
        let result = optimize_edge(&edge, &Config::default());
        assert_eq!(result.segments.len(), 1);
        match &result.segments[0] {
            Segment::Circle { circle, .. } => {
                assert!((circle.center.0 - center.0).abs() < 2.0);
                assert!((circle.radius - radius).abs() < 2.0);
            }
            Segment::Arc { .. } => {
                // Also acceptable per spec §4.G.4 when the arc fit doesn't
                // quite reach the full-sweep branch.
            }
            other => panic!("expected a circle or arc, got {other:?}"),
        }
    }
}
