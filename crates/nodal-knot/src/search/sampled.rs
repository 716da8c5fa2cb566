use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{install, try_project, ViewSearchOutcome};
use crate::error::{KnotError, Result};
use crate::graph::SpatialGraph;
use crate::projection::{PlanarDiagramCode, Projection, ProjectionCfg, View};
use crate::rng::TrialSeed;
use crate::yamada::{YamadaEvaluator, YamadaPolynomial};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrivalentCfg {
    /// Total number of sampled directions.
    pub samples: usize,
    /// Directions projected between two agreement checks.
    pub batch: usize,
    /// Jitter the sample lattice with this seed; `None` keeps it fixed.
    pub jitter: Option<u64>,
    pub workers: Option<usize>,
}

impl Default for TrivalentCfg {
    fn default() -> Self {
        Self {
            samples: 64,
            batch: 16,
            jitter: None,
            workers: None,
        }
    }
}

impl TrivalentCfg {
    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 || self.batch == 0 {
            return Err(KnotError::invalid_config(
                "samples and batch must be positive",
            ));
        }
        Ok(())
    }
}

/// `n` views looking along a Fibonacci lattice on the upper hemisphere.
///
/// Opposite directions give mirror diagrams and in-plane rotations give the
/// same diagram, so one hemisphere with zero in-plane angle covers every class.
pub fn hemisphere_views(n: usize, jitter: Option<u64>) -> Vec<View> {
    let golden = PI * (3.0 - 5f64.sqrt());
    let (phase, dz) = match jitter {
        Some(seed) => {
            let mut rng = TrialSeed::new(seed, 0).rng();
            (rng.gen_range(0.0..TAU), rng.gen_range(0.0..1.0))
        }
        None => (0.0, 0.5),
    };
    (0..n)
        .map(|i| {
            let z = 1.0 - (i as f64 + dz) / n as f64;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = phase + golden * i as f64;
            View::along(Vector3::new(r * phi.cos(), r * phi.sin(), z))
        })
        .collect()
}

struct Candidate {
    index: usize,
    view: View,
    projection: Projection,
}

/// Sampled search for a trivalent graph.
///
/// Views are projected in batches; after each batch the two valid views with
/// the fewest crossings are evaluated together (normalized) and the search stops as soon
/// as they agree. Otherwise, once the budget is spent, every valid view is
/// returned with its polynomial as `ViewSearchOutcome::Ambiguous`.
pub fn search_trivalent(
    graph: &SpatialGraph,
    cfg: &TrivalentCfg,
    proj: &ProjectionCfg,
    eval: &YamadaEvaluator,
) -> Result<ViewSearchOutcome> {
    cfg.validate()?;
    proj.validate()?;
    if !graph.is_trivalent() {
        return Err(KnotError::ManualViewRequired {
            max_degree: graph.max_degree(),
        });
    }
    let views = hemisphere_views(cfg.samples, cfg.jitter);
    let normalized = |codes: &[PlanarDiagramCode]| {
        eval.evaluate_many(codes)
            .into_iter()
            .map(|r| r.map(|p| p.normalized()))
            .collect::<Result<Vec<_>>>()
    };
    install(cfg.workers, || run(graph, &views, cfg, proj, &normalized))?
}

/// Sampling loop over `views`; `evaluate` maps a batch of codes to their
/// normalized polynomials.
pub(super) fn run<E>(
    graph: &SpatialGraph,
    views: &[View],
    cfg: &TrivalentCfg,
    proj: &ProjectionCfg,
    evaluate: &E,
) -> Result<ViewSearchOutcome>
where
    E: Fn(&[PlanarDiagramCode]) -> Result<Vec<YamadaPolynomial>> + Sync,
{
    let mut valid: Vec<Candidate> = Vec::new();
    for (b, chunk) in views.chunks(cfg.batch).enumerate() {
        let offset = b * cfg.batch;
        let found: Vec<Option<Projection>> = chunk
            .par_iter()
            .map(|v| try_project(graph, v, proj))
            .collect::<Result<_>>()?;
        valid.extend(found.into_iter().enumerate().filter_map(|(i, p)| {
            p.map(|projection| Candidate {
                index: offset + i,
                view: chunk[i],
                projection,
            })
        }));
        valid.sort_by_key(|c| (c.projection.num_crossings(), c.index));
        if let [first, second, ..] = &valid[..] {
            let top = [first.projection.code.clone(), second.projection.code.clone()];
            if let [p, q] = &evaluate(&top)?[..] {
                if p.same_value(q) {
                    debug!(batch = b, valid = valid.len(), view = %first.view, "top views agree");
                    return Ok(found_outcome(first, p.clone()));
                }
            }
        }
    }
    match &valid[..] {
        [] => Err(KnotError::ExhaustedSearch {
            attempts: views.len(),
        }),
        [only] => {
            let p = evaluate(std::slice::from_ref(&only.projection.code))?
                .pop()
                .ok_or_else(|| KnotError::invalid_diagram("evaluator returned no value"))?;
            Ok(found_outcome(only, p))
        }
        _ => {
            let codes: Vec<_> = valid.iter().map(|c| c.projection.code.clone()).collect();
            let polys = evaluate(&codes)?;
            warn!(valid = valid.len(), "top views still disagree after the full budget");
            Ok(ViewSearchOutcome::Ambiguous(
                valid
                    .into_iter()
                    .zip(polys)
                    .map(|(c, p)| (c.view, c.projection.code, p))
                    .collect(),
            ))
        }
    }
}

fn found_outcome(c: &Candidate, polynomial: YamadaPolynomial) -> ViewSearchOutcome {
    ViewSearchOutcome::Found {
        view: c.view,
        code: c.projection.code.clone(),
        polynomial,
    }
}
