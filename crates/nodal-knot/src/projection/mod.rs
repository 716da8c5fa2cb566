//! Projector: spatial graph + view → arcs, crossings and a planar diagram code.
//!
//! Conventions
//! - After rotation `(x, y)` is the diagram plane and `z` the depth; the strand
//!   with the larger depth at a crossing is the over strand.
//! - Every edge is cut at each crossing it passes through (over or under); the
//!   pieces are the diagram arcs, numbered from 1 along the edges in edge order.
//! - `V` tokens are emitted for every node of positive degree in id order, then
//!   `X` tokens in the order the crossings were found.
//!
//! Any configuration the tolerances cannot resolve (collinear overlap, an
//! intersection on a polyline vertex or node, a depth tie, three arcs through
//! one point, two edge-ends leaving a node in the same direction) is reported
//! as `DegenerateView`.

mod diagram;
mod intersect;
mod rotation;

pub use diagram::{ArcId, PdToken, PlanarDiagramCode};
pub use rotation::{AxisOrder, View};

pub(crate) use intersect::point_segment_distance;

use nalgebra::{Vector2, Vector3};
use tracing::trace;

use crate::error::{KnotError, Result};
use crate::graph::{EdgeId, NodeId, SpatialGraph};

use intersect::{cross, intersect, SegHit};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionCfg {
    /// Two 2D points closer than this are the same point.
    pub point_tol: f64,
    /// Two depths closer than this at a crossing are a tie.
    pub depth_tol: f64,
    /// Sine threshold below which two edge-ends leave a node in the same direction.
    pub angle_tol: f64,
}

impl Default for ProjectionCfg {
    fn default() -> Self {
        Self {
            point_tol: 1e-7,
            depth_tol: 1e-7,
            angle_tol: 1e-9,
        }
    }
}

impl ProjectionCfg {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("point_tol", self.point_tol),
            ("depth_tol", self.depth_tol),
            ("angle_tol", self.angle_tol),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(KnotError::invalid_config(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }
}

/// An edge's rotated polyline: 2D points plus the depth of each point.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedEdge {
    pub edge: EdgeId,
    pub points: Vec<Vector2<f64>>,
    pub depth: Vec<f64>,
}

impl ProjectedEdge {
    pub fn segments(&self) -> impl Iterator<Item = (Vector2<f64>, Vector2<f64>)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Where a strand passes through a crossing. `position` is `segment index + t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrandPass {
    pub edge: EdgeId,
    pub position: f64,
    pub depth: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crossing {
    pub point: Vector2<f64>,
    pub under: StrandPass,
    pub over: StrandPass,
    /// Arc ids as written in the `X` token.
    pub arcs: [ArcId; 4],
}

/// A piece of an edge between consecutive crossings (or nodes).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc {
    pub id: ArcId,
    pub edge: EdgeId,
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub view: View,
    pub nodes: Vec<Vector2<f64>>,
    pub edges: Vec<ProjectedEdge>,
    pub arcs: Vec<Arc>,
    pub crossings: Vec<Crossing>,
    pub code: PlanarDiagramCode,
}

impl Projection {
    pub fn num_crossings(&self) -> usize {
        self.crossings.len()
    }
}

struct Seg {
    edge: EdgeId,
    index: usize,
    a: Vector2<f64>,
    b: Vector2<f64>,
    za: f64,
    zb: f64,
    /// Graph node at `a` / `b` when the point is a polyline end.
    node_a: Option<NodeId>,
    node_b: Option<NodeId>,
}

impl Seg {
    fn bbox_disjoint(&self, o: &Seg, tol: f64) -> bool {
        self.a.x.max(self.b.x) + tol < o.a.x.min(o.b.x)
            || o.a.x.max(o.b.x) + tol < self.a.x.min(self.b.x)
            || self.a.y.max(self.b.y) + tol < o.a.y.min(o.b.y)
            || o.a.y.max(o.b.y) + tol < self.a.y.min(self.b.y)
    }

    fn has_node(&self, n: NodeId) -> bool {
        self.node_a == Some(n) || self.node_b == Some(n)
    }
}

/// Point shared by construction: the common polyline vertex of consecutive
/// segments, or a graph node both segments end at.
fn shared_points(s: &Seg, o: &Seg, nodes: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    let mut out = Vec::new();
    if s.edge == o.edge && s.index.abs_diff(o.index) == 1 {
        out.push(if s.index < o.index { s.b } else { s.a });
    }
    for n in [s.node_a, s.node_b].into_iter().flatten() {
        if o.has_node(n) {
            out.push(nodes[n]);
        }
    }
    out
}

pub fn project(graph: &SpatialGraph, view: &View, cfg: &ProjectionCfg) -> Result<Projection> {
    cfg.validate()?;
    let rot = view.rotation();
    let tol = cfg.point_tol;

    let nodes: Vec<Vector2<f64>> = graph
        .nodes()
        .iter()
        .map(|n| (rot * n.coord).xy())
        .collect();
    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            if (nodes[i] - nodes[j]).norm() < tol {
                return Err(KnotError::degenerate(format!("nodes {i} and {j} coincide")));
            }
        }
    }

    let mut edges = Vec::with_capacity(graph.num_edges());
    let mut segs: Vec<Seg> = Vec::new();
    for e in graph.edges() {
        let mut pts: Vec<Vector3<f64>> = Vec::with_capacity(e.polyline.len());
        for p in &e.polyline {
            let q = rot * p;
            if pts.last().map_or(true, |l: &Vector3<f64>| (q - l).norm() > 1e-12) {
                pts.push(q);
            }
        }
        if pts.len() < 2 {
            return Err(KnotError::degenerate(format!("edge {} has no extent", e.id)));
        }
        let last = pts.len() - 2;
        for (i, w) in pts.windows(2).enumerate() {
            let (a, b) = (w[0].xy(), w[1].xy());
            if (b - a).norm() < tol {
                return Err(KnotError::degenerate(format!(
                    "segment {i} of edge {} projects to a point",
                    e.id
                )));
            }
            segs.push(Seg {
                edge: e.id,
                index: i,
                a,
                b,
                za: w[0].z,
                zb: w[1].z,
                node_a: (i == 0).then_some(e.endpoints.0),
                node_b: (i == last).then_some(e.endpoints.1),
            });
        }
        edges.push(ProjectedEdge {
            edge: e.id,
            points: pts.iter().map(|p| p.xy()).collect(),
            depth: pts.iter().map(|p| p.z).collect(),
        });
    }

    for (n, p) in nodes.iter().enumerate() {
        if let Some(s) = segs
            .iter()
            .find(|s| !s.has_node(n) && point_segment_distance(p, &s.a, &s.b) < tol)
        {
            return Err(KnotError::degenerate(format!(
                "edge {} passes through node {n}",
                s.edge
            )));
        }
    }

    let mut found: Vec<(Vector2<f64>, StrandPass, StrandPass, Vector2<f64>, Vector2<f64>)> =
        Vec::new();
    for i in 0..segs.len() {
        for j in i + 1..segs.len() {
            let (s, o) = (&segs[i], &segs[j]);
            if s.bbox_disjoint(o, tol) {
                continue;
            }
            let (t, u) = match intersect(&s.a, &s.b, &o.a, &o.b, tol) {
                SegHit::Disjoint => continue,
                SegHit::Overlap => {
                    return Err(KnotError::degenerate(format!(
                        "edges {} and {} overlap collinearly",
                        s.edge, o.edge
                    )))
                }
                SegHit::Point { t, u } => (t, u),
            };
            let x = s.a + (s.b - s.a) * t;
            if shared_points(s, o, &nodes)
                .iter()
                .any(|p| (p - x).norm() < tol)
            {
                continue;
            }
            if [s.a, s.b, o.a, o.b].iter().any(|p| (p - x).norm() < tol) {
                return Err(KnotError::degenerate(format!(
                    "edges {} and {} meet at a polyline vertex",
                    s.edge, o.edge
                )));
            }
            let zs = s.za + (s.zb - s.za) * t;
            let zo = o.za + (o.zb - o.za) * u;
            if (zs - zo).abs() < cfg.depth_tol {
                return Err(KnotError::degenerate(format!(
                    "depth tie between edges {} and {}",
                    s.edge, o.edge
                )));
            }
            let ps = StrandPass {
                edge: s.edge,
                position: s.index as f64 + t,
                depth: zs,
            };
            let po = StrandPass {
                edge: o.edge,
                position: o.index as f64 + u,
                depth: zo,
            };
            let (ds, dob) = (s.b - s.a, o.b - o.a);
            found.push(if zs < zo {
                (x, ps, po, ds, dob)
            } else {
                (x, po, ps, dob, ds)
            });
        }
    }
    for i in 0..found.len() {
        for j in i + 1..found.len() {
            if (found[i].0 - found[j].0).norm() < tol {
                return Err(KnotError::degenerate(
                    "three or more arcs meet at one point",
                ));
            }
        }
    }

    // events per edge: (position, crossing, is_under)
    let mut events: Vec<Vec<(f64, usize, bool)>> = vec![Vec::new(); graph.num_edges()];
    for (c, (_, under, over, _, _)) in found.iter().enumerate() {
        events[under.edge].push((under.position, c, true));
        events[over.edge].push((over.position, c, false));
    }
    let mut arcs = Vec::new();
    let mut first_arc = vec![0; graph.num_edges()];
    // (incoming, outgoing) arc per crossing for the under and over strand
    let mut under_arcs = vec![(0, 0); found.len()];
    let mut over_arcs = vec![(0, 0); found.len()];
    let mut next_id: ArcId = 1;
    for e in graph.edges() {
        let ev = &mut events[e.id];
        ev.sort_by(|a, b| a.0.total_cmp(&b.0));
        first_arc[e.id] = next_id;
        let end = (edges[e.id].points.len() - 1) as f64;
        let mut start = 0.0;
        for (k, &(pos, c, is_under)) in ev.iter().enumerate() {
            let (inc, out) = (next_id + k, next_id + k + 1);
            if is_under {
                under_arcs[c] = (inc, out);
            } else {
                over_arcs[c] = (inc, out);
            }
            arcs.push(Arc {
                id: inc,
                edge: e.id,
                start,
                end: pos,
            });
            start = pos;
        }
        arcs.push(Arc {
            id: next_id + ev.len(),
            edge: e.id,
            start,
            end,
        });
        next_id += ev.len() + 1;
    }

    let mut tokens = Vec::with_capacity(graph.num_nodes() + found.len());
    for n in graph.nodes() {
        if n.degree == 0 {
            continue;
        }
        let mut ends: Vec<(Vector2<f64>, ArcId)> = Vec::with_capacity(n.degree);
        for &eid in graph.incident(n.id) {
            let e = graph.edge(eid);
            let pts = &edges[eid].points;
            let m = pts.len();
            let last_arc = first_arc[eid] + events[eid].len();
            if e.endpoints.0 == n.id {
                ends.push(((pts[1] - pts[0]).normalize(), first_arc[eid]));
            }
            if e.endpoints.1 == n.id {
                ends.push(((pts[m - 2] - pts[m - 1]).normalize(), last_arc));
            }
        }
        for i in 0..ends.len() {
            for j in i + 1..ends.len() {
                let (u, v) = (&ends[i].0, &ends[j].0);
                if cross(u, v).abs() < cfg.angle_tol && u.dot(v) > 0.0 {
                    return Err(KnotError::degenerate(format!(
                        "two edge-ends leave node {} in the same direction",
                        n.id
                    )));
                }
            }
        }
        ends.sort_by(|a, b| a.0.y.atan2(a.0.x).total_cmp(&b.0.y.atan2(b.0.x)));
        tokens.push(PdToken::Vertex(ends.into_iter().map(|(_, a)| a).collect()));
    }

    let mut crossings = Vec::with_capacity(found.len());
    for (c, (point, under, over, du, dov)) in found.into_iter().enumerate() {
        let (u_in, u_out) = under_arcs[c];
        let (o_in, o_out) = over_arcs[c];
        let arcs4 = if cross(&du, &dov) > 0.0 {
            [u_in, o_in, u_out, o_out]
        } else {
            [u_in, o_out, u_out, o_in]
        };
        tokens.push(PdToken::Crossing(arcs4));
        crossings.push(Crossing {
            point,
            under,
            over,
            arcs: arcs4,
        });
    }

    let code = PlanarDiagramCode::new(tokens)?;
    trace!(view = %view, crossings = crossings.len(), arcs = arcs.len(), "projected");
    Ok(Projection {
        view: *view,
        nodes,
        edges,
        arcs,
        crossings,
        code,
    })
}

#[cfg(test)]
mod tests;
