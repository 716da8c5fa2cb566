//! Skeleton Builder: binary volume → embedded spatial multigraph.
//!
//! Pipeline
//! - validate the volume (`MalformedVolume` on bad shape or empty occupancy);
//! - thin to a one-voxel medial curve (`thin`), preserving topology and curve ends;
//! - trace nodes and polyline edges (`trace`), converting to physical coordinates;
//! - prune short spurs and short junction self-loops.
//!
//! Deterministic for a fixed volume and configuration.

mod thin;
mod trace;
mod volume;

pub use volume::{FieldThreshold, Volume, MAX_VOXELS};

use nalgebra::Vector3;
use tracing::debug;

use crate::error::{KnotError, Result};
use crate::graph::SpatialGraph;

use thin::Grid;
use trace::Placement;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkeletonCfg {
    /// Spurs (edges with a degree-1 end) and junction self-loops shorter than
    /// this physical length are removed. `0` keeps everything.
    pub min_branch_length: f64,
    /// Remove every leaf chain, repeatedly, regardless of length.
    pub prune_leaves: bool,
    /// Upper bound on thinning passes.
    pub max_passes: usize,
}

impl Default for SkeletonCfg {
    fn default() -> Self {
        Self {
            min_branch_length: 0.0,
            prune_leaves: true,
            max_passes: 10_000,
        }
    }
}

/// Skeletonize an occupancy volume into a spatial graph.
pub fn build_skeleton(volume: &Volume, cfg: SkeletonCfg) -> Result<SpatialGraph> {
    volume.check_usable()?;
    if !(cfg.min_branch_length.is_finite() && cfg.min_branch_length >= 0.0) {
        return Err(KnotError::invalid_config(
            "min_branch_length must be finite and >= 0",
        ));
    }
    let mut grid = Grid::padded(volume.dims(), volume.data());
    let passes = thin::thin(&mut grid, cfg.max_passes);
    let place = Placement {
        origin: volume.origin(),
        spacing: volume.spacing(),
    };
    let raw = trace::trace_graph(&grid, &place);
    debug!(
        passes,
        voxels = volume.count_occupied(),
        nodes = raw.num_nodes(),
        edges = raw.num_edges(),
        "skeleton traced"
    );
    let graph = prune(raw, cfg);
    if graph.num_edges() == 0 {
        return Err(KnotError::malformed(
            "no skeleton branch survives the pruning threshold",
        ));
    }
    Ok(graph)
}

/// Rasterize a point cloud with cubic voxels of side `spacing`, then skeletonize.
pub fn build_skeleton_from_points(
    points: &[Vector3<f64>],
    spacing: f64,
    cfg: SkeletonCfg,
) -> Result<SpatialGraph> {
    let volume = Volume::from_points(points, spacing)?;
    build_skeleton(&volume, cfg)
}

/// Remove spurs and short junction self-loops until nothing changes.
pub fn prune(mut graph: SpatialGraph, cfg: SkeletonCfg) -> SpatialGraph {
    loop {
        let g = &graph;
        let doomed = |e: &crate::graph::Edge| -> bool {
            let (a, b) = e.endpoints;
            let (da, db) = (g.node(a).degree, g.node(b).degree);
            let short = e.length < cfg.min_branch_length;
            if e.is_loop() {
                short && da > 2
            } else {
                let spur = da == 1 || db == 1;
                let lone_segment = da == 1 && db == 1;
                spur && (short || (cfg.prune_leaves && !lone_segment))
            }
        };
        let removed = graph.edges().iter().filter(|e| doomed(e)).count();
        if removed == 0 {
            // drop isolated leftovers once the edge set is stable
            return graph.retain_edges(|_| true, true);
        }
        graph = graph.retain_edges(|e| !doomed(e), true);
    }
}
