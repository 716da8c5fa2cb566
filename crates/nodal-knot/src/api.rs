//! Curated surface for the CLI and integration tests (UNSTABLE).
//!
//! One flat import path per stage; breaking changes are allowed.

// Graphs
pub use crate::graph::{
    polyline_length, Edge, EdgeId, GraphReport, Node, NodeId, NodeKind, SimpleGraph,
    SimplifiedGraph, SpatialGraph,
};
// Skeleton and simplification
pub use crate::simplify::{simplify, SimplifyCfg};
pub use crate::skeleton::{
    build_skeleton, build_skeleton_from_points, prune, FieldThreshold, SkeletonCfg, Volume,
};
// Projection and view search
pub use crate::projection::{
    project, Arc, ArcId, AxisOrder, Crossing, PdToken, PlanarDiagramCode, Projection,
    ProjectionCfg, View,
};
pub use crate::search::{
    anneal_views, best_of_views, hemisphere_views, search_trivalent, view_cost, AnnealCfg,
    CostWeights, ScoredView, TrivalentCfg, ViewSearchOutcome,
};
// Invariants
pub use crate::minor::{find_minor, find_minor_in, MinorCfg, MinorEmbedding, MinorOutcome};
pub use crate::yamada::{Laurent, YamadaCfg, YamadaEvaluator, YamadaPolynomial};
// Caching and replay
pub use crate::pipeline::{KnotSummary, PipelineCache, PipelineCfg, ViewChoice};
pub use crate::rng::TrialSeed;
pub use crate::error::{KnotError, Result};
