use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use super::{install, try_project, view_cost, CostWeights};
use crate::error::{KnotError, Result};
use crate::graph::SpatialGraph;
use crate::projection::{AxisOrder, Projection, ProjectionCfg, View};
use crate::rng::TrialSeed;

/// Simulated-annealing parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnealCfg {
    pub t_initial: f64,
    pub t_final: f64,
    /// Proposals per restart; the temperature cools geometrically across them.
    pub steps: usize,
    pub restarts: usize,
    /// Half-width (radians) of the uniform per-angle perturbation.
    pub step_size: f64,
    pub weights: CostWeights,
    pub order: AxisOrder,
    pub seed: u64,
    pub workers: Option<usize>,
}

impl Default for AnnealCfg {
    fn default() -> Self {
        Self {
            t_initial: 2.0,
            t_final: 0.01,
            steps: 200,
            restarts: 8,
            step_size: 0.3,
            weights: CostWeights::default(),
            order: AxisOrder::Xyz,
            seed: 0,
            workers: None,
        }
    }
}

impl AnnealCfg {
    pub fn validate(&self) -> Result<()> {
        if !(self.t_final.is_finite() && self.t_final > 0.0 && self.t_initial >= self.t_final) {
            return Err(KnotError::invalid_config(format!(
                "temperatures must satisfy t_initial >= t_final > 0, got {} and {}",
                self.t_initial, self.t_final
            )));
        }
        if self.steps == 0 || self.restarts == 0 {
            return Err(KnotError::invalid_config("steps and restarts must be positive"));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(KnotError::invalid_config(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        self.weights.validate()
    }

    fn temperature(&self, k: usize) -> f64 {
        if self.steps <= 1 {
            return self.t_final;
        }
        let frac = k as f64 / (self.steps - 1) as f64;
        self.t_initial * (self.t_final / self.t_initial).powf(frac)
    }
}

/// The winning view with its cost and projection.
#[derive(Clone, Debug)]
pub struct ScoredView {
    pub view: View,
    pub cost: f64,
    pub projection: Projection,
}

struct Walk<'a> {
    graph: &'a SpatialGraph,
    cfg: &'a AnnealCfg,
    proj: &'a ProjectionCfg,
}

impl Walk<'_> {
    fn score(&self, view: View) -> Result<Option<(f64, Projection)>> {
        Ok(try_project(self.graph, &view, self.proj)?
            .map(|p| (view_cost(&p, &self.cfg.weights), p)))
    }

    fn run(&self, restart: usize) -> Result<Option<ScoredView>> {
        let mut rng = TrialSeed::new(self.cfg.seed, restart as u64).rng();
        let mut current = View::new(
            [
                rng.gen_range(-PI..PI),
                rng.gen_range(-PI..PI),
                rng.gen_range(-PI..PI),
            ],
            self.cfg.order,
        );
        let mut current_cost = f64::INFINITY;
        let mut best: Option<ScoredView> = None;
        if let Some((c, p)) = self.score(current)? {
            current_cost = c;
            best = Some(ScoredView {
                view: current,
                cost: c,
                projection: p,
            });
        }
        for k in 0..self.cfg.steps {
            let t = self.cfg.temperature(k);
            let cand = self.perturb(&current, &mut rng);
            let Some((c, p)) = self.score(cand)? else {
                continue;
            };
            let accept = c < current_cost || rng.gen::<f64>() < (-(c - current_cost) / t).exp();
            if !accept {
                continue;
            }
            current = cand;
            current_cost = c;
            if best.as_ref().map_or(true, |b| c < b.cost) {
                best = Some(ScoredView {
                    view: cand,
                    cost: c,
                    projection: p,
                });
            }
        }
        Ok(best)
    }

    fn perturb(&self, v: &View, rng: &mut StdRng) -> View {
        let h = self.cfg.step_size;
        View::new(v.angles.map(|a| a + rng.gen_range(-h..h)), v.order).wrapped()
    }
}

/// Anneal over view angles; independent restarts run in parallel and the
/// lowest cost wins (earliest restart on ties).
pub fn anneal_views(graph: &SpatialGraph, cfg: &AnnealCfg, proj: &ProjectionCfg) -> Result<ScoredView> {
    cfg.validate()?;
    proj.validate()?;
    let walk = Walk { graph, cfg, proj };
    let results: Vec<Option<ScoredView>> = install(cfg.workers, || {
        (0..cfg.restarts)
            .into_par_iter()
            .map(|r| walk.run(r))
            .collect::<Result<_>>()
    })??;
    let best = results
        .into_iter()
        .flatten()
        .reduce(|a, b| if b.cost < a.cost { b } else { a })
        .ok_or(KnotError::ExhaustedSearch {
            attempts: cfg.restarts * (cfg.steps + 1),
        })?;
    debug!(view = %best.view, cost = best.cost, crossings = best.projection.num_crossings(), "annealing done");
    Ok(best)
}
