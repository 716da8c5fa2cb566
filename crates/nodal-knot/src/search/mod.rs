//! View Search: choosing a rotation whose projection has few, clean crossings.
//!
//! - `anneal_views`: simulated annealing over the three view angles.
//! - `search_trivalent`: deterministic hemisphere sampling for trivalent graphs,
//!   accepting once the two best views agree on the Yamada polynomial.
//! - `best_of_views`: the manual path over caller-supplied views.
//!
//! Trials are pure functions of their view, so they run on rayon and are merged
//! by minimum cost with ties broken by trial index.

mod anneal;
mod sampled;

pub use anneal::{anneal_views, AnnealCfg, ScoredView};
pub use sampled::{hemisphere_views, search_trivalent, TrivalentCfg};

use rayon::prelude::*;

use crate::error::{KnotError, Result};
use crate::graph::SpatialGraph;
use crate::projection::{project, PlanarDiagramCode, Projection, ProjectionCfg, View};
use crate::yamada::YamadaPolynomial;

/// Penalty weights and radii of the view cost.
///
/// Radii are fractions of the diagonal of the projected bounding box, so
/// the cost does not depend on the graph's scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostWeights {
    pub w_close: f64,
    pub w_node: f64,
    pub w_short: f64,
    pub close_frac: f64,
    pub node_frac: f64,
    pub short_frac: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            w_close: 0.5,
            w_node: 0.5,
            w_short: 0.25,
            close_frac: 0.05,
            node_frac: 0.05,
            short_frac: 0.02,
        }
    }
}

impl CostWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("w_close", self.w_close),
            ("w_node", self.w_node),
            ("w_short", self.w_short),
            ("close_frac", self.close_frac),
            ("node_frac", self.node_frac),
            ("short_frac", self.short_frac),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(KnotError::invalid_config(format!(
                    "{name} must be finite and non-negative, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// `crossings + w_close·Σ close + w_node·Σ near-node + w_short·Σ short`, each
/// penalty term being `1 − d/r` for distances `d` below its radius `r`.
pub fn view_cost(p: &Projection, w: &CostWeights) -> f64 {
    let scale = diagonal(p);
    let ramp = |d: f64, r: f64| if r > 0.0 && d < r { 1.0 - d / r } else { 0.0 };

    let (rc, rn, rs) = (w.close_frac * scale, w.node_frac * scale, w.short_frac * scale);
    let mut close = 0.0;
    for (i, a) in p.crossings.iter().enumerate() {
        for b in &p.crossings[i + 1..] {
            close += ramp((a.point - b.point).norm(), rc);
        }
    }
    let near_node: f64 = p
        .crossings
        .iter()
        .flat_map(|c| p.nodes.iter().map(move |n| ramp((c.point - n).norm(), rn)))
        .sum();
    // only arcs ending at a crossing can be too short to read
    let short: f64 = p
        .arcs
        .iter()
        .filter(|a| p.crossings.iter().any(|c| c.arcs.contains(&a.id)))
        .map(|a| ramp(arc_length(p, a.edge, a.start, a.end), rs))
        .sum();
    p.num_crossings() as f64 + w.w_close * close + w.w_node * near_node + w.w_short * short
}

fn diagonal(p: &Projection) -> f64 {
    let mut pts = p.edges.iter().flat_map(|e| e.points.iter());
    let Some(first) = pts.next() else {
        return 0.0;
    };
    let (mut lo, mut hi) = (*first, *first);
    for q in pts {
        lo = lo.inf(q);
        hi = hi.sup(q);
    }
    (hi - lo).norm()
}

/// 2D length of edge `edge` between polyline positions `start` and `end`
/// (integer part = segment index, fractional part = position on it).
fn arc_length(p: &Projection, edge: usize, start: f64, end: f64) -> f64 {
    let pts = &p.edges[edge].points;
    let at = |s: f64| {
        let i = (s.floor() as usize).min(pts.len() - 2);
        let t = s - i as f64;
        pts[i] + (pts[i + 1] - pts[i]) * t
    };
    let mut len = 0.0;
    let mut prev = at(start);
    let mut k = start.floor() + 1.0;
    while k < end {
        let q = pts[k as usize];
        len += (q - prev).norm();
        prev = q;
        k += 1.0;
    }
    len + (at(end) - prev).norm()
}

/// Projection of `graph` under `view`, `None` when the view is degenerate.
pub(crate) fn try_project(
    graph: &SpatialGraph,
    view: &View,
    cfg: &ProjectionCfg,
) -> Result<Option<Projection>> {
    match project(graph, view, cfg) {
        Ok(p) => Ok(Some(p)),
        Err(e) if e.is_degenerate() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run `f` on a dedicated pool of `workers` threads, or on the global pool.
pub(crate) fn install<T, F>(workers: Option<usize>, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match workers {
        None => Ok(f()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| KnotError::invalid_config(format!("worker pool: {e}")))?;
            Ok(pool.install(f))
        }
    }
}

/// Result of the sampled search.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewSearchOutcome {
    /// The two best views (or the only valid one) agree.
    Found {
        view: View,
        code: PlanarDiagramCode,
        polynomial: YamadaPolynomial,
    },
    /// Every valid view with its code and polynomial, best first.
    Ambiguous(Vec<(View, PlanarDiagramCode, YamadaPolynomial)>),
}

/// Manual path: project under one explicit view, or keep the valid candidate
/// with the fewest crossings (earliest wins ties).
///
/// A single view reports its own `DegenerateView`; a list with no valid view
/// reports `ExhaustedSearch`.
pub fn best_of_views(graph: &SpatialGraph, views: &[View], cfg: &ProjectionCfg) -> Result<Projection> {
    match views {
        [] => Err(KnotError::invalid_config("no candidate views given")),
        [v] => project(graph, v, cfg),
        _ => {
            let found: Vec<Option<Projection>> = views
                .par_iter()
                .map(|v| try_project(graph, v, cfg))
                .collect::<Result<_>>()?;
            found
                .into_iter()
                .enumerate()
                .filter_map(|(i, p)| p.map(|p| (i, p)))
                .min_by_key(|(i, p)| (p.num_crossings(), *i))
                .map(|(_, p)| p)
                .ok_or(KnotError::ExhaustedSearch {
                    attempts: views.len(),
                })
        }
    }
}

#[cfg(test)]
mod tests;
