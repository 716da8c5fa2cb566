//! Graph Simplifier: degree-2 contraction, branch-point merging, smoothing.
//!
//! The three steps run to a common fixpoint, so `simplify` is idempotent:
//! - every degree-2 node whose two edge-ends belong to different edges is
//!   removed and its polylines are joined in point order (a cycle ends as one
//!   node with one self-loop);
//! - two branch nodes (degree >= 3) joined by an edge shorter than
//!   `merge_radius` collapse into one node at their midpoint;
//! - polylines are smoothed with Ramer–Douglas–Peucker; self-loops keep at
//!   least two interior points so they never degenerate to a point.
//!
//! Surviving nodes are relabeled densely in order of their input id.

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{KnotError, Result};
use crate::graph::{polyline_length, EdgeId, NodeId, SimplifiedGraph, SpatialGraph};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplifyCfg {
    /// Interior polyline points closer than this to the local chord are dropped.
    /// `0` removes only exactly collinear points.
    pub smooth_tolerance: f64,
    /// Branch nodes joined by an edge shorter than this are merged. `0` disables.
    pub merge_radius: f64,
}

impl Default for SimplifyCfg {
    fn default() -> Self {
        Self {
            smooth_tolerance: 0.0,
            merge_radius: 0.0,
        }
    }
}

impl SimplifyCfg {
    pub fn validate(&self) -> Result<()> {
        if !(self.smooth_tolerance.is_finite() && self.smooth_tolerance >= 0.0) {
            return Err(KnotError::invalid_config(
                "smooth_tolerance must be finite and >= 0",
            ));
        }
        if !(self.merge_radius.is_finite() && self.merge_radius >= 0.0) {
            return Err(KnotError::invalid_config(
                "merge_radius must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

pub fn simplify(graph: &SpatialGraph, cfg: SimplifyCfg) -> Result<SimplifiedGraph> {
    cfg.validate()?;
    let mut work = Work::from_graph(graph);
    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let mut changed = work.contract();
        changed |= work.merge_one(cfg.merge_radius);
        changed |= work.smooth(cfg.smooth_tolerance);
        if !changed {
            break;
        }
    }
    let out = work.into_graph();
    debug!(
        rounds,
        nodes_in = graph.num_nodes(),
        nodes_out = out.num_nodes(),
        edges_out = out.num_edges(),
        "graph simplified"
    );
    Ok(SimplifiedGraph::from_simplified(out))
}

type WorkEdge = (NodeId, NodeId, Vec<Vector3<f64>>);

/// Mutable scratch form: dead nodes and edges stay in place until the rebuild.
struct Work {
    coords: Vec<Vector3<f64>>,
    alive: Vec<bool>,
    edges: Vec<Option<WorkEdge>>,
    /// Incident edge-ends per node; a self-loop appears twice.
    ends: Vec<Vec<EdgeId>>,
}

impl Work {
    fn from_graph(g: &SpatialGraph) -> Self {
        let mut ends = vec![Vec::new(); g.num_nodes()];
        let mut edges = Vec::with_capacity(g.num_edges());
        for e in g.edges() {
            let (a, b) = e.endpoints;
            ends[a].push(e.id);
            ends[b].push(e.id);
            edges.push(Some((a, b, e.polyline.clone())));
        }
        Self {
            coords: g.nodes().iter().map(|n| n.coord).collect(),
            alive: vec![true; g.num_nodes()],
            edges,
            ends,
        }
    }

    fn push_edge(&mut self, a: NodeId, b: NodeId, poly: Vec<Vector3<f64>>) {
        let id = self.edges.len();
        self.edges.push(Some((a, b, poly)));
        self.ends[a].push(id);
        self.ends[b].push(id);
    }

    fn take_edge(&mut self, e: EdgeId) -> Option<WorkEdge> {
        let taken = self.edges[e].take()?;
        for n in [taken.0, taken.1] {
            if let Some(pos) = self.ends[n].iter().position(|&x| x == e) {
                self.ends[n].swap_remove(pos);
            }
        }
        Some(taken)
    }

    /// Remove every contractible degree-2 node.
    fn contract(&mut self) -> bool {
        let mut changed = false;
        for n in 0..self.coords.len() {
            if !self.alive[n] || self.ends[n].len() != 2 || self.ends[n][0] == self.ends[n][1] {
                continue;
            }
            let (e1, e2) = (self.ends[n][0], self.ends[n][1]);
            let (Some((a1, b1, p1)), Some((a2, b2, p2))) = (self.take_edge(e1), self.take_edge(e2))
            else {
                continue;
            };
            // first half ends at n, second half starts at n
            let (u, mut poly) = if b1 == n {
                (a1, p1)
            } else {
                (b1, p1.into_iter().rev().collect())
            };
            let (v, tail): (NodeId, Vec<_>) = if a2 == n {
                (b2, p2)
            } else {
                (a2, p2.into_iter().rev().collect())
            };
            poly.extend(tail.into_iter().skip(1));
            self.alive[n] = false;
            self.push_edge(u, v, poly);
            changed = true;
        }
        changed
    }

    /// Merge the first pair of branch nodes joined by a short edge.
    fn merge_one(&mut self, radius: f64) -> bool {
        if radius <= 0.0 {
            return false;
        }
        let found = self.edges.iter().enumerate().find_map(|(id, e)| {
            let (a, b, poly) = e.as_ref()?;
            let branch = |n: NodeId| self.ends[n].len() >= 3;
            (a != b && branch(*a) && branch(*b) && polyline_length(poly) < radius)
                .then_some((id, *a, *b))
        });
        let Some((id, a, b)) = found else {
            return false;
        };
        self.take_edge(id);
        let (keep, gone) = (a.min(b), a.max(b));
        self.coords[keep] = (self.coords[a] + self.coords[b]) * 0.5;
        for e in std::mem::take(&mut self.ends[gone]) {
            if let Some((x, y, _)) = self.edges[e].as_mut() {
                if *x == gone {
                    *x = keep;
                } else if *y == gone {
                    *y = keep;
                }
            }
            self.ends[keep].push(e);
        }
        self.alive[gone] = false;
        let at = self.coords[keep];
        for &e in &self.ends[keep] {
            if let Some((x, y, poly)) = self.edges[e].as_mut() {
                if *x == keep {
                    if let Some(p) = poly.first_mut() {
                        *p = at;
                    }
                }
                if *y == keep {
                    if let Some(p) = poly.last_mut() {
                        *p = at;
                    }
                }
            }
        }
        true
    }

    fn smooth(&mut self, tol: f64) -> bool {
        let mut changed = false;
        for (a, b, poly) in self.edges.iter_mut().flatten() {
            let smoothed = if a == b {
                smooth_loop(poly, tol)
            } else {
                rdp(poly, tol)
            };
            if smoothed.len() != poly.len() {
                *poly = smoothed;
                changed = true;
            }
        }
        changed
    }

    fn into_graph(self) -> SpatialGraph {
        let mut remap = vec![usize::MAX; self.coords.len()];
        let mut out = SpatialGraph::new();
        for (n, &c) in self.coords.iter().enumerate() {
            if self.alive[n] {
                remap[n] = out.add_node(c);
            }
        }
        for (a, b, poly) in self.edges.into_iter().flatten() {
            out.add_edge_polyline(remap[a], remap[b], poly);
        }
        out
    }
}

fn point_segment_distance(p: &Vector3<f64>, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Ramer–Douglas–Peucker: keep interior points farther than `tol` from the chord.
pub(crate) fn rdp(points: &[Vector3<f64>], tol: f64) -> Vec<Vector3<f64>> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let mut best = (s, -1.0f64);
        for i in s + 1..e {
            let d = point_segment_distance(&points[i], &points[s], &points[e]);
            if d > best.1 {
                best = (i, d);
            }
        }
        if best.1 > tol {
            keep[best.0] = true;
            stack.push((s, best.0));
            stack.push((best.0, e));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Smooth a closed polyline (first point == last point) split at its farthest point.
fn smooth_loop(points: &[Vector3<f64>], tol: f64) -> Vec<Vector3<f64>> {
    let n = points.len();
    if n <= 4 {
        return points.to_vec();
    }
    let anchor = points[0];
    let mut far = (0usize, 0.0f64);
    for (i, p) in points.iter().enumerate().take(n - 1).skip(1) {
        let d = (p - anchor).norm();
        if d > far.1 {
            far = (i, d);
        }
    }
    if far.0 == 0 {
        return points.to_vec();
    }
    let k = far.0;
    let mut out = rdp(&points[..=k], tol);
    out.extend(rdp(&points[k..], tol).into_iter().skip(1));
    if out.len() >= 4 {
        return out;
    }
    // restore the interior point farthest from its half's chord
    let mut extra = (0usize, -1.0f64);
    for i in (1..n - 1).filter(|&i| i != k) {
        let (s, e) = if i < k { (0, k) } else { (k, n - 1) };
        let d = point_segment_distance(&points[i], &points[s], &points[e]);
        if d > extra.1 {
            extra = (i, d);
        }
    }
    let pos = if extra.0 < k { 1 } else { 2 };
    out.insert(pos, points[extra.0]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use nalgebra::vector;
    use proptest::prelude::*;

    fn path_graph() -> SpatialGraph {
        // 0 - 1 - 2 - 3 with zigzag coordinates so smoothing keeps every point
        let mut g = SpatialGraph::new();
        let pts = [
            vector![0.0, 0.0, 0.0],
            vector![1.0, 1.0, 0.0],
            vector![2.0, 0.0, 0.0],
            vector![3.0, 1.0, 0.0],
        ];
        for p in pts {
            g.add_node(p);
        }
        g.add_edge(0, 1, vec![]);
        g.add_edge(2, 1, vec![]);
        g.add_edge(2, 3, vec![]);
        g
    }

    #[test]
    fn contracts_a_path_in_point_order() {
        let s = simplify(&path_graph(), SimplifyCfg::default()).unwrap();
        assert_eq!(s.num_nodes(), 2);
        assert_eq!(s.num_edges(), 1);
        // node 3 survives as id 1 and the merged edge runs from it back to node 0
        let e = s.edge(0);
        assert_eq!(e.endpoints, (1, 0));
        let xs: Vec<f64> = e.polyline.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 2.0, 1.0, 0.0]);
        assert!(s.validate(1e-12).is_ok());
    }

    #[test]
    fn cycle_contracts_to_one_anchor() {
        let mut g = SpatialGraph::new();
        for p in [
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.0, 0.0],
            vector![1.0, 1.0, 0.0],
            vector![0.0, 1.0, 0.0],
        ] {
            g.add_node(p);
        }
        for i in 0..4 {
            g.add_edge(i, (i + 1) % 4, vec![]);
        }
        let s = simplify(&g, SimplifyCfg::default()).unwrap();
        assert_eq!(s.num_nodes(), 1);
        assert_eq!(s.num_edges(), 1);
        assert_eq!(s.kind(0), NodeKind::LoopAnchor);
        // closed square polyline: anchor, three corners, anchor
        assert_eq!(s.edge(0).polyline.len(), 5);
    }

    #[test]
    fn subdivided_theta_keeps_two_branch_points() {
        let mut g = SpatialGraph::new();
        let a = g.add_node(vector![-1.0, 0.0, 0.0]);
        let b = g.add_node(vector![1.0, 0.0, 0.0]);
        for y in [-1.0, 0.0, 1.0] {
            let m = g.add_node(vector![0.0, y, 0.2]);
            g.add_edge(a, m, vec![]);
            g.add_edge(m, b, vec![]);
        }
        let s = simplify(&g, SimplifyCfg::default()).unwrap();
        assert_eq!(s.num_nodes(), 2);
        assert_eq!(s.num_edges(), 3);
        assert!(s.is_trivalent());
        assert!(s.nodes().iter().all(|n| n.degree == 3));
    }

    fn h_graph() -> SpatialGraph {
        let mut g = SpatialGraph::new();
        let a = g.add_node(vector![0.0, 0.0, 0.0]);
        let b = g.add_node(vector![0.1, 0.0, 0.0]);
        let leaves = [
            vector![-1.0, 1.0, 0.0],
            vector![-1.0, -1.0, 0.0],
            vector![1.0, 1.0, 0.0],
            vector![1.0, -1.0, 0.0],
        ];
        for (i, p) in leaves.into_iter().enumerate() {
            let l = g.add_node(p);
            g.add_edge(if i < 2 { a } else { b }, l, vec![]);
        }
        g.add_edge(a, b, vec![]);
        g
    }

    #[test]
    fn close_branch_points_merge_only_when_enabled() {
        let kept = simplify(&h_graph(), SimplifyCfg::default()).unwrap();
        assert_eq!(kept.num_edges(), 5);
        assert!(kept.is_trivalent());

        let cfg = SimplifyCfg {
            merge_radius: 0.5,
            ..SimplifyCfg::default()
        };
        let merged = simplify(&h_graph(), cfg).unwrap();
        assert_eq!(merged.num_nodes(), 5);
        assert_eq!(merged.num_edges(), 4);
        assert_eq!(merged.max_degree(), 4);
        assert!(!merged.is_trivalent());
        assert!((merged.node(0).coord - vector![0.05, 0.0, 0.0]).norm() < 1e-12);
        assert!(merged.validate(1e-12).is_ok());
    }

    #[test]
    fn smoothing_drops_near_collinear_points() {
        let pts = vec![
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.01, 0.0],
            vector![2.0, 0.0, 0.0],
            vector![3.0, 1.0, 0.0],
        ];
        let out = rdp(&pts, 0.05);
        assert_eq!(out.len(), 3);
        assert!((out[1] - vector![2.0, 0.0, 0.0]).norm() < 1e-12);
        assert_eq!(rdp(&pts, 0.0).len(), 4);
    }

    #[test]
    fn smoothed_loops_keep_two_interior_points() {
        let mut g = SpatialGraph::new();
        let a = g.add_node(vector![0.0, 0.0, 0.0]);
        let interior: Vec<_> = (1..40)
            .map(|k| {
                let t = k as f64 / 40.0 * std::f64::consts::TAU;
                vector![1.0 - t.cos(), t.sin(), 0.0]
            })
            .collect();
        g.add_edge(a, a, interior);
        let cfg = SimplifyCfg {
            smooth_tolerance: 10.0,
            ..SimplifyCfg::default()
        };
        let s = simplify(&g, cfg).unwrap();
        assert_eq!(s.edge(0).polyline.len(), 4);
    }

    #[test]
    fn rejects_negative_tolerances() {
        let cfg = SimplifyCfg {
            smooth_tolerance: -1.0,
            ..SimplifyCfg::default()
        };
        assert!(matches!(
            simplify(&path_graph(), cfg),
            Err(KnotError::InvalidConfig { .. })
        ));
    }

    fn arb_graph() -> impl Strategy<Value = SpatialGraph> {
        let coord = || (-3i32..=3, -3i32..=3, -3i32..=3);
        (
            prop::collection::vec(coord(), 1..8),
            prop::collection::vec(
                (0usize..8, 0usize..8, prop::collection::vec(coord(), 0..4)),
                0..12,
            ),
        )
            .prop_map(|(nodes, edges)| {
                let v = |(x, y, z): (i32, i32, i32)| vector![x as f64, y as f64, z as f64 * 0.5];
                let mut g = SpatialGraph::new();
                for c in &nodes {
                    g.add_node(v(*c));
                }
                let n = nodes.len();
                for (a, b, interior) in edges {
                    g.add_edge(a % n, b % n, interior.into_iter().map(v).collect());
                }
                g
            })
    }

    proptest! {
        #[test]
        fn simplify_is_idempotent(
            g in arb_graph(),
            tol in prop::sample::select(vec![0.0, 0.3, 1.0]),
            radius in prop::sample::select(vec![0.0, 1.5]),
        ) {
            let cfg = SimplifyCfg { smooth_tolerance: tol, merge_radius: radius };
            let once = simplify(&g, cfg).unwrap();
            let twice = simplify(once.graph(), cfg).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn no_contractible_degree_two_nodes_remain(g in arb_graph()) {
            let s = simplify(&g, SimplifyCfg::default()).unwrap();
            for n in s.nodes() {
                if n.degree == 2 {
                    prop_assert_eq!(s.kind(n.id), NodeKind::LoopAnchor);
                }
            }
            prop_assert!(s.validate(1e-9).is_ok());
        }
    }
}
