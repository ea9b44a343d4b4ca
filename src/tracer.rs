//! §4.F Graph tracer: walk a thinned skeleton into a planar graph of
//! junction/endpoint nodes and pixel-chain edges.
//!
//! The neighbor rule here is, per spec §9, "the key correctness lever":
//! a diagonal neighbor counts only when neither of its two adjacent
//! cardinal neighbors is also foreground. Letting diagonals count whenever
//! foreground turns every thick stroke into a net of spurious triangle
//! junctions.

use rustc_hash::FxHashSet;

use crate::types::{Edge, Graph, Node, PixelPoint};

type Mask = crate::types::BinaryImage;

const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
// Each diagonal offset paired with the two cardinal offsets that would form
// a stair-step to it.
const DIAGONALS: [((i32, i32), [(i32, i32); 2]); 4] = [
    ((1, -1), [(0, -1), (1, 0)]),
    ((1, 1), [(1, 0), (0, 1)]),
    ((-1, 1), [(0, 1), (-1, 0)]),
    ((-1, -1), [(-1, 0), (0, -1)]),
];

/// Valid 8-neighborhood of `(x, y)` under the stair-step suppression rule.
pub fn valid_neighbors(mask: &Mask, x: i32, y: i32) -> Vec<PixelPoint> {
    let mut result = Vec::with_capacity(8);
    for &(dx, dy) in &CARDINALS {
        if mask.get_signed(x + dx, y + dy) {
            result.push((x + dx, y + dy));
        }
    }
    for &((dx, dy), cardinals) in &DIAGONALS {
        if !mask.get_signed(x + dx, y + dy) {
            continue;
        }
        let suppressed = cardinals
            .iter()
            .any(|&(cx, cy)| mask.get_signed(x + cx, y + cy));
        if !suppressed {
            result.push((x + dx, y + dy));
        }
    }
    result
}

fn mark_step(visited: &mut FxHashSet<(PixelPoint, PixelPoint)>, a: PixelPoint, b: PixelPoint) {
    visited.insert((a, b));
    visited.insert((b, a));
}

enum Termination {
    AtNode(PixelPoint),
    Abandoned,
}

fn walk_from_node(
    mask: &Mask,
    node_points: &rustc_hash::FxHashMap<PixelPoint, usize>,
    start: PixelPoint,
    first_step: PixelPoint,
    visited: &mut FxHashSet<(PixelPoint, PixelPoint)>,
) -> (Vec<PixelPoint>, Termination) {
    let mut path = vec![start, first_step];
    mark_step(visited, start, first_step);

    let mut prev = start;
    let mut cur = first_step;

    loop {
        if node_points.contains_key(&cur) {
            return (path, Termination::AtNode(cur));
        }
        let neighbors = valid_neighbors(mask, cur.0, cur.1);
        let next = neighbors.into_iter().find(|&p| p != prev);
        match next {
            None => return (path, Termination::Abandoned),
            Some(next) => {
                if visited.contains(&(cur, next)) {
                    return (path, Termination::Abandoned);
                }
                mark_step(visited, cur, next);
                path.push(next);
                prev = cur;
                cur = next;
            }
        }
    }
}

/// Trace `mask` (a thinned skeleton) into a [`Graph`]. Never fails:
/// pathological inputs (empty mask, malformed single pixels) produce an
/// empty or degenerate graph (spec §4.F failure semantics).
pub fn trace(mask: &Mask) -> Graph {
    let width = mask.width as i32;
    let height = mask.height as i32;

    // Degree-based node identification.
    let mut node_points: rustc_hash::FxHashMap<PixelPoint, usize> = Default::default();
    let mut nodes: Vec<Node> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if !mask.get(x as u32, y as u32) {
                continue;
            }
            let degree = valid_neighbors(mask, x, y).len();
            if degree != 2 {
                let id = nodes.len();
                node_points.insert((x, y), id);
                nodes.push(Node {
                    id,
                    point: (x, y),
                    incident_edges: Vec::new(),
                });
            }
        }
    }

    let mut edges: Vec<Edge> = Vec::new();
    let mut visited_steps: FxHashSet<(PixelPoint, PixelPoint)> = Default::default();
    let mut placed: FxHashSet<PixelPoint> = node_points.keys().copied().collect();

    // Node-originated edges, iterated in node id order for determinism.
    for node_idx in 0..nodes.len() {
        let start = nodes[node_idx].point;
        let neighbors = valid_neighbors(mask, start.0, start.1);
        for neighbor in neighbors {
            if visited_steps.contains(&(start, neighbor)) {
                continue;
            }
            let (path, termination) =
                walk_from_node(mask, &node_points, start, neighbor, &mut visited_steps);
            for &p in &path {
                placed.insert(p);
            }

            let edge_id = edges.len();
            let node_a = node_idx as i64;
            let node_b = match termination {
                Termination::AtNode(p) => node_points[&p] as i64,
                Termination::Abandoned => -1,
            };

            nodes[node_idx].incident_edges.push(edge_id);
            if let Termination::AtNode(_) = termination {
                if node_b == node_a {
                    // Self-loop at a single node: appears twice in its list.
                    nodes[node_idx].incident_edges.push(edge_id);
                } else {
                    nodes[node_b as usize].incident_edges.push(edge_id);
                }
            }

            edges.push(Edge {
                id: edge_id,
                ordered_points: path,
                node_a,
                node_b,
            });
        }
    }

    // Remaining foreground pixels belong to pure loops (no junctions).
    let mut loop_visited: FxHashSet<PixelPoint> = Default::default();
    for y in 0..height {
        for x in 0..width {
            let seed = (x, y);
            if !mask.get(x as u32, y as u32) || placed.contains(&seed) || loop_visited.contains(&seed) {
                continue;
            }
            let neighbors = valid_neighbors(mask, x, y);
            if neighbors.len() != 2 {
                // Malformed/isolated leftover; tolerate by skipping (should
                // not occur given the node pass already consumed degree != 2
                // pixels, but pathological skeletons are tolerated per spec).
                loop_visited.insert(seed);
                continue;
            }

            let mut path = vec![seed, neighbors[0]];
            loop_visited.insert(seed);
            loop_visited.insert(neighbors[0]);
            let mut prev = seed;
            let mut cur = neighbors[0];
            loop {
                if cur == seed {
                    break;
                }
                let nbrs = valid_neighbors(mask, cur.0, cur.1);
                match nbrs.into_iter().find(|&p| p != prev) {
                    None => break,
                    Some(next) => {
                        path.push(next);
                        loop_visited.insert(next);
                        prev = cur;
                        cur = next;
                    }
                }
            }

            edges.push(Edge {
                id: edges.len(),
                ordered_points: path,
                node_a: -1,
                node_b: -1,
            });
        }
    }

    Graph { nodes, edges }
}
