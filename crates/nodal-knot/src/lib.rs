//! Topology of nodal knots: skeletons, diagrams and invariants.
//!
//! Stages, leaves first: `skeleton` (voxels → spatial graph), `simplify`
//! (degree-2 contraction), `projection` (view → planar diagram code), `search`
//! (choosing a view), `yamada` (diagram → Laurent polynomial) and `minor`
//! (chain embeddings). `pipeline` caches them for a calling context.
//!
//! API Policy
//! - The crate is consumed by the CLI in this workspace; there is no stable
//!   public API and breaking changes are fine when they improve the design.

pub mod api;
pub mod error;
pub mod graph;
pub mod minor;
pub mod pipeline;
pub mod projection;
pub mod rng;
pub mod search;
pub mod simplify;
pub mod skeleton;
pub mod yamada;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{KnotError, Result};
pub use graph::{SimpleGraph, SimplifiedGraph, SpatialGraph};
pub use pipeline::{PipelineCache, PipelineCfg};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::error::{KnotError, Result};
    pub use crate::graph::{GraphReport, SimpleGraph, SimplifiedGraph, SpatialGraph};
    pub use crate::projection::{project, AxisOrder, PlanarDiagramCode, ProjectionCfg, View};
    pub use crate::simplify::{simplify, SimplifyCfg};
    pub use crate::skeleton::{build_skeleton, SkeletonCfg, Volume};
    pub use crate::yamada::{Laurent, YamadaEvaluator, YamadaPolynomial};
    pub use nalgebra::{Vector2 as Vec2, Vector3 as Vec3};
}
