//! Graph data model: spatial multigraphs and their simple-adjacency views.
//!
//! - `SpatialGraph`: arena of `Node`/`Edge` records with 3D polylines.
//! - `SimplifiedGraph`: a `SpatialGraph` with degree-2 chains contracted and
//!   dense node ids (built by `crate::simplify`).
//! - `SimpleGraph`: loop-free, parallel-free adjacency for minors and reports.

mod simple;
mod spatial;

pub use simple::{GraphReport, SimpleGraph};
pub use spatial::{polyline_length, Edge, EdgeId, Node, NodeId, NodeKind, SpatialGraph};
pub(crate) use spatial::hash_vec3;

use std::ops::Deref;

/// Spatial graph after degree-2 contraction, smoothing and dense relabeling.
///
/// Only `crate::simplify` constructs values of this type.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplifiedGraph {
    graph: SpatialGraph,
}

impl SimplifiedGraph {
    pub(crate) fn from_simplified(graph: SpatialGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &SpatialGraph {
        &self.graph
    }

    pub fn simple_adjacency(&self) -> SimpleGraph {
        SimpleGraph::from_spatial(&self.graph)
    }
}

impl Deref for SimplifiedGraph {
    type Target = SpatialGraph;

    fn deref(&self) -> &SpatialGraph {
        &self.graph
    }
}
