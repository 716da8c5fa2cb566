//! Caller-owned cache over the pipeline stages.
//!
//! Entries are keyed by `(input fingerprint, parameter hash)`, so a changed
//! configuration simply misses; `invalidate` drops everything derived from one
//! input and `clear` drops everything. The Yamada memo is shared by all stages.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::error::{KnotError, Result};
use crate::graph::{hash_vec3, SimpleGraph, SimplifiedGraph, SpatialGraph};
use crate::minor::{find_minor_in, MinorCfg, MinorOutcome};
use crate::projection::{PlanarDiagramCode, ProjectionCfg, View};
use crate::search::{
    anneal_views, best_of_views, search_trivalent, AnnealCfg, TrivalentCfg, ViewSearchOutcome,
};
use crate::simplify::{simplify, SimplifyCfg};
use crate::skeleton::{build_skeleton, SkeletonCfg, Volume};
use crate::yamada::{YamadaCfg, YamadaEvaluator, YamadaPolynomial};

/// Every stage's configuration in one place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineCfg {
    pub skeleton: SkeletonCfg,
    pub simplify: SimplifyCfg,
    pub projection: ProjectionCfg,
    pub anneal: AnnealCfg,
    pub trivalent: TrivalentCfg,
    pub yamada: YamadaCfg,
    pub minor: MinorCfg,
    /// Worker hint for stages that do not set their own.
    pub workers: Option<usize>,
}

impl PipelineCfg {
    pub fn validate(&self) -> Result<()> {
        self.simplify.validate()?;
        self.projection.validate()?;
        self.anneal.validate()?;
        self.trivalent.validate()?;
        self.minor.validate()
    }

    /// Copy of the config with `workers` pushed into every parallel stage
    /// that has no hint of its own.
    pub fn resolved(&self) -> Self {
        let mut cfg = self.clone();
        cfg.anneal.workers = cfg.anneal.workers.or(self.workers);
        cfg.trivalent.workers = cfg.trivalent.workers.or(self.workers);
        cfg.minor.workers = cfg.minor.workers.or(self.workers);
        cfg
    }
}

/// How the view behind a [`KnotSummary`] was chosen.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewChoice {
    /// Trivalent sampling; the two best views agree.
    Agreed,
    /// Trivalent sampling ran out of budget without agreement. `candidates`
    /// holds every valid view with its code and normalized polynomial, best
    /// first; the summary's own fields repeat the first entry.
    Ambiguous {
        candidates: Vec<(View, PlanarDiagramCode, YamadaPolynomial)>,
    },
    /// The valid caller-supplied view with the fewest crossings.
    Manual,
    /// Annealing, on explicit request.
    Annealed,
}

/// Selected view of a simplified graph with its code and polynomial.
#[derive(Clone, Debug, PartialEq)]
pub struct KnotSummary {
    pub view: View,
    pub code: PlanarDiagramCode,
    pub polynomial: YamadaPolynomial,
    pub choice: ViewChoice,
}

impl KnotSummary {
    fn from_search(outcome: ViewSearchOutcome) -> Result<Self> {
        match outcome {
            ViewSearchOutcome::Found {
                view,
                code,
                polynomial,
            } => Ok(Self {
                view,
                code,
                polynomial,
                choice: ViewChoice::Agreed,
            }),
            ViewSearchOutcome::Ambiguous(candidates) => {
                let Some((view, code, polynomial)) = candidates.first().cloned() else {
                    return Err(KnotError::ExhaustedSearch { attempts: 0 });
                };
                Ok(Self {
                    view,
                    code,
                    polynomial,
                    choice: ViewChoice::Ambiguous { candidates },
                })
            }
        }
    }
}

/// How `knot_by` picks a view.
enum Route<'a> {
    Sampled,
    Manual(&'a [View]),
    Annealed,
}

impl Route<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Sampled => "sampled",
            Self::Manual(_) => "manual",
            Self::Annealed => "annealed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Key {
    input: u64,
    params: u64,
}

/// Hash of a parameter set. `Debug` prints floats in round-trip form, so
/// distinct values give distinct keys.
fn params_hash<T: Debug>(params: &T) -> u64 {
    let mut h = DefaultHasher::new();
    format!("{params:?}").hash(&mut h);
    h.finish()
}

fn volume_fingerprint(v: &Volume) -> u64 {
    let mut h = DefaultHasher::new();
    v.dims().hash(&mut h);
    v.data().hash(&mut h);
    hash_vec3(&v.spacing(), &mut h);
    hash_vec3(&v.origin(), &mut h);
    h.finish()
}

pub struct PipelineCache {
    cfg: PipelineCfg,
    eval: YamadaEvaluator,
    skeletons: HashMap<Key, SpatialGraph>,
    simplified: HashMap<Key, SimplifiedGraph>,
    knots: HashMap<Key, KnotSummary>,
}

impl PipelineCache {
    pub fn new(cfg: PipelineCfg) -> Result<Self> {
        cfg.validate()?;
        let cfg = cfg.resolved();
        Ok(Self {
            eval: YamadaEvaluator::new(cfg.yamada.clone()),
            cfg,
            skeletons: HashMap::new(),
            simplified: HashMap::new(),
            knots: HashMap::new(),
        })
    }

    pub fn cfg(&self) -> &PipelineCfg {
        &self.cfg
    }

    /// Replace the configuration. Cached entries stay; they are keyed by
    /// parameters and are found again if the old configuration returns.
    pub fn set_cfg(&mut self, cfg: PipelineCfg) -> Result<()> {
        cfg.validate()?;
        let cfg = cfg.resolved();
        if cfg.yamada != self.cfg.yamada {
            self.eval = YamadaEvaluator::new(cfg.yamada.clone());
        }
        self.cfg = cfg;
        Ok(())
    }

    pub fn evaluator(&self) -> &YamadaEvaluator {
        &self.eval
    }

    /// Number of cached skeletons, simplified graphs and knot summaries.
    pub fn len(&self) -> usize {
        self.skeletons.len() + self.simplified.len() + self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn skeleton(&mut self, volume: &Volume) -> Result<&SpatialGraph> {
        let key = Key {
            input: volume_fingerprint(volume),
            params: params_hash(&self.cfg.skeleton),
        };
        if !self.skeletons.contains_key(&key) {
            let g = build_skeleton(volume, self.cfg.skeleton)?;
            self.skeletons.insert(key, g);
        }
        Ok(&self.skeletons[&key])
    }

    pub fn simplified(&mut self, graph: &SpatialGraph) -> Result<&SimplifiedGraph> {
        let key = Key {
            input: graph.fingerprint(),
            params: params_hash(&self.cfg.simplify),
        };
        if !self.simplified.contains_key(&key) {
            let s = simplify(graph, self.cfg.simplify)?;
            self.simplified.insert(key, s);
        }
        Ok(&self.simplified[&key])
    }

    /// Simplify `graph`, search a view and evaluate its polynomial.
    ///
    /// Only trivalent graphs have an automatic search; any other graph gets
    /// `ManualViewRequired` and must go through [`Self::knot_with_views`] or
    /// [`Self::knot_annealed`]. Values are normalized.
    pub fn knot(&mut self, graph: &SpatialGraph) -> Result<KnotSummary> {
        self.knot_by(graph, Route::Sampled)
    }

    /// Evaluate under one explicit view, or under the valid candidate with the
    /// fewest crossings. Values follow the evaluator's normalization flag.
    pub fn knot_with_views(&mut self, graph: &SpatialGraph, views: &[View]) -> Result<KnotSummary> {
        self.knot_by(graph, Route::Manual(views))
    }

    /// Evaluate under the view found by annealing. The value depends on the
    /// view for non-trivalent graphs; it follows the normalization flag.
    pub fn knot_annealed(&mut self, graph: &SpatialGraph) -> Result<KnotSummary> {
        self.knot_by(graph, Route::Annealed)
    }

    fn knot_by(&mut self, graph: &SpatialGraph, route: Route<'_>) -> Result<KnotSummary> {
        let cfg = &self.cfg;
        let stage = match &route {
            Route::Sampled => params_hash(&cfg.trivalent),
            Route::Manual(views) => params_hash(views),
            Route::Annealed => params_hash(&cfg.anneal),
        };
        let key = Key {
            input: graph.fingerprint(),
            params: params_hash(&(route.name(), stage, &cfg.simplify, &cfg.projection, &cfg.yamada)),
        };
        if let Some(k) = self.knots.get(&key) {
            debug!(route = route.name(), "knot summary cached");
            return Ok(k.clone());
        }
        self.simplified(graph)?;
        let (cfg, eval) = (&self.cfg, &self.eval);
        let simple = &self.simplified[&Key {
            input: key.input,
            params: params_hash(&cfg.simplify),
        }];
        let summary = match route {
            Route::Sampled => {
                if !simple.is_trivalent() {
                    return Err(KnotError::ManualViewRequired {
                        max_degree: simple.max_degree(),
                    });
                }
                KnotSummary::from_search(search_trivalent(simple, &cfg.trivalent, &cfg.projection, eval)?)?
            }
            Route::Manual(views) => {
                let p = best_of_views(simple, views, &cfg.projection)?;
                let polynomial = eval.evaluate(&p.code)?;
                KnotSummary {
                    view: p.view,
                    code: p.code,
                    polynomial,
                    choice: ViewChoice::Manual,
                }
            }
            Route::Annealed => {
                let best = anneal_views(simple, &cfg.anneal, &cfg.projection)?;
                let polynomial = eval.evaluate(&best.projection.code)?;
                KnotSummary {
                    view: best.view,
                    code: best.projection.code,
                    polynomial,
                    choice: ViewChoice::Annealed,
                }
            }
        };
        self.knots.insert(key, summary.clone());
        Ok(summary)
    }

    /// Minor check on the (cached) simplified graph.
    pub fn minor(&mut self, graph: &SpatialGraph, target: &SimpleGraph) -> Result<MinorOutcome> {
        let cfg: MinorCfg = self.cfg.minor;
        let simple = self.simplified(graph)?;
        find_minor_in(simple, target, &cfg)
    }

    /// Drop every entry derived from `graph`; returns how many were removed.
    pub fn invalidate(&mut self, graph: &SpatialGraph) -> usize {
        let input = graph.fingerprint();
        let before = self.simplified.len() + self.knots.len();
        self.simplified.retain(|k, _| k.input != input);
        self.knots.retain(|k, _| k.input != input);
        before - self.simplified.len() - self.knots.len()
    }

    /// Drop the skeleton of `volume` under every parameter set.
    pub fn invalidate_volume(&mut self, volume: &Volume) -> usize {
        let input = volume_fingerprint(volume);
        let before = self.skeletons.len();
        self.skeletons.retain(|k, _| k.input != input);
        before - self.skeletons.len()
    }

    pub fn clear(&mut self) {
        self.skeletons.clear();
        self.simplified.clear();
        self.knots.clear();
        self.eval.clear_cache();
    }
}
