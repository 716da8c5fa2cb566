//! Embedded spatial multigraph (arena of tagged node and edge records).
//!
//! Invariants
//! - `nodes[i].id == i` and `edges[k].id == k`.
//! - Every polyline starts at its first endpoint and ends at its second endpoint.
//! - `nodes[i].degree` counts incident edge-ends; a self-loop counts twice.
//! - `incident[i]` lists each incident edge once, in insertion order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use nalgebra::Vector3;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Role of a node in the skeleton, derived from its degree and incident edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Isolated,
    End,
    Pass,
    Branch,
    /// Synthetic node carrying a closed curve as a single self-loop.
    LoopAnchor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coord: Vector3<f64>,
    pub degree: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub endpoints: (NodeId, NodeId),
    /// Parallel index among edges joining the same unordered endpoint pair.
    pub key: usize,
    pub polyline: Vec<Vector3<f64>>,
    pub length: f64,
}

impl Edge {
    #[inline]
    pub fn is_loop(&self) -> bool {
        self.endpoints.0 == self.endpoints.1
    }

    /// The endpoint opposite to `n` (for a self-loop, `n` itself).
    #[inline]
    pub fn other(&self, n: NodeId) -> NodeId {
        if self.endpoints.0 == n {
            self.endpoints.1
        } else {
            self.endpoints.0
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    incident: Vec<Vec<EdgeId>>,
}

impl SpatialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, coord: Vector3<f64>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            coord,
            degree: 0,
        });
        self.incident.push(Vec::new());
        id
    }

    /// Add an edge whose polyline is `coord(a), interior..., coord(b)`.
    ///
    /// Panics if `a` or `b` is not a node of this graph.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, interior: Vec<Vector3<f64>>) -> EdgeId {
        let mut polyline = Vec::with_capacity(interior.len() + 2);
        polyline.push(self.nodes[a].coord);
        polyline.extend(interior);
        polyline.push(self.nodes[b].coord);
        self.push_edge(a, b, polyline)
    }

    /// Add an edge from a full polyline; its end points are snapped onto the node coordinates.
    pub fn add_edge_polyline(
        &mut self,
        a: NodeId,
        b: NodeId,
        mut polyline: Vec<Vector3<f64>>,
    ) -> EdgeId {
        if polyline.len() < 2 {
            return self.add_edge(a, b, Vec::new());
        }
        let last = polyline.len() - 1;
        polyline[0] = self.nodes[a].coord;
        polyline[last] = self.nodes[b].coord;
        self.push_edge(a, b, polyline)
    }

    fn push_edge(&mut self, a: NodeId, b: NodeId, polyline: Vec<Vector3<f64>>) -> EdgeId {
        let id = self.edges.len();
        let key = self.edges_between(a, b).count();
        let length = polyline_length(&polyline);
        self.edges.push(Edge {
            id,
            endpoints: (a, b),
            key,
            polyline,
            length,
        });
        self.nodes[a].degree += 1;
        self.nodes[b].degree += 1;
        self.incident[a].push(id);
        if a != b {
            self.incident[b].push(id);
        }
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn incident(&self, id: NodeId) -> &[EdgeId] {
        &self.incident[id]
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges joining the unordered pair `{a, b}`.
    pub fn edges_between(&self, a: NodeId, b: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.incident
            .get(a)
            .into_iter()
            .flatten()
            .map(move |&e| &self.edges[e])
            .filter(move |e| {
                (e.endpoints.0 == a && e.endpoints.1 == b)
                    || (e.endpoints.0 == b && e.endpoints.1 == a)
            })
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.nodes[id].degree {
            0 => NodeKind::Isolated,
            1 => NodeKind::End,
            2 => {
                let inc = &self.incident[id];
                if inc.len() == 1 && self.edges[inc[0]].is_loop() {
                    NodeKind::LoopAnchor
                } else {
                    NodeKind::Pass
                }
            }
            _ => NodeKind::Branch,
        }
    }

    pub fn max_degree(&self) -> usize {
        self.nodes.iter().map(|n| n.degree).max().unwrap_or(0)
    }

    /// Every node has degree at most 3.
    pub fn is_trivalent(&self) -> bool {
        self.max_degree() <= 3
    }

    /// Check the polyline-endpoint and degree invariants.
    pub fn validate(&self, tol: f64) -> Result<(), String> {
        let mut degree = vec![0usize; self.nodes.len()];
        for e in &self.edges {
            let (a, b) = e.endpoints;
            if a >= self.nodes.len() || b >= self.nodes.len() {
                return Err(format!("edge {} references a missing node", e.id));
            }
            let (Some(first), Some(last)) = (e.polyline.first(), e.polyline.last()) else {
                return Err(format!("edge {} has an empty polyline", e.id));
            };
            if (first - self.nodes[a].coord).norm() > tol {
                return Err(format!("edge {} does not start at node {a}", e.id));
            }
            if (last - self.nodes[b].coord).norm() > tol {
                return Err(format!("edge {} does not end at node {b}", e.id));
            }
            degree[a] += 1;
            degree[b] += 1;
        }
        for n in &self.nodes {
            if n.degree != degree[n.id] {
                return Err(format!(
                    "node {} stores degree {} but has {} edge-ends",
                    n.id, n.degree, degree[n.id]
                ));
            }
        }
        Ok(())
    }

    /// Copy of the graph with node `i` renamed to `perm[i]`.
    ///
    /// Edge order and polylines are kept; `perm` must be a permutation of `0..n`.
    pub fn permute_nodes(&self, perm: &[NodeId]) -> SpatialGraph {
        assert_eq!(perm.len(), self.nodes.len(), "permutation length");
        let mut coords = vec![Vector3::zeros(); self.nodes.len()];
        for n in &self.nodes {
            coords[perm[n.id]] = n.coord;
        }
        let mut out = SpatialGraph::new();
        for c in coords {
            out.add_node(c);
        }
        for e in &self.edges {
            let (a, b) = e.endpoints;
            out.add_edge_polyline(perm[a], perm[b], e.polyline.clone());
        }
        out
    }

    /// Rebuild keeping only edges for which `keep` holds; node ids are compacted in order.
    ///
    /// With `drop_isolated`, nodes left without edges are removed as well.
    pub fn retain_edges<F>(&self, keep: F, drop_isolated: bool) -> SpatialGraph
    where
        F: Fn(&Edge) -> bool,
    {
        let kept: Vec<&Edge> = self.edges.iter().filter(|e| keep(e)).collect();
        let mut used = vec![!drop_isolated; self.nodes.len()];
        for e in &kept {
            used[e.endpoints.0] = true;
            used[e.endpoints.1] = true;
        }
        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut out = SpatialGraph::new();
        for n in &self.nodes {
            if used[n.id] {
                remap[n.id] = out.add_node(n.coord);
            }
        }
        for e in kept {
            let (a, b) = e.endpoints;
            out.add_edge_polyline(remap[a], remap[b], e.polyline.clone());
        }
        out
    }

    /// Stable content hash of the geometry (used as a cache key).
    pub fn fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.nodes.len().hash(&mut h);
        for n in &self.nodes {
            hash_vec3(&n.coord, &mut h);
        }
        self.edges.len().hash(&mut h);
        for e in &self.edges {
            e.endpoints.hash(&mut h);
            e.polyline.len().hash(&mut h);
            for p in &e.polyline {
                hash_vec3(p, &mut h);
            }
        }
        h.finish()
    }
}

pub(crate) fn hash_vec3<H: Hasher>(v: &Vector3<f64>, h: &mut H) {
    v.x.to_bits().hash(h);
    v.y.to_bits().hash(h);
    v.z.to_bits().hash(h);
}

pub fn polyline_length(points: &[Vector3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}
