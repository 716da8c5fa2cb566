//! Minor Checker: heuristic chain embeddings of a small target graph.
//!
//! Each target node is mapped to a connected chain of host nodes. Chains are
//! placed one at a time by node-weighted shortest paths towards the chains of
//! already placed neighbors; host nodes used by other chains cost `α^usage`,
//! and `α` doubles every round so overlaps are pushed apart. Roots with fewer
//! host neighbors than the target node needs are penalized. When the overlap
//! stops shrinking, the overlapping chains are torn up and re-placed. A try
//! stops at the first overlap-free placement, verified before it is reported.
//! Failure is a definite `NotFound`, not proof that no minor exists.

use std::collections::BTreeSet;

use petgraph::algo::dijkstra;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{KnotError, Result};
use crate::graph::{SimpleGraph, SimplifiedGraph};
use crate::rng::TrialSeed;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinorCfg {
    /// Independent seeded attempts, run in parallel.
    pub tries: usize,
    /// Re-placement rounds per attempt.
    pub rounds: usize,
    pub seed: u64,
    pub workers: Option<usize>,
}

impl Default for MinorCfg {
    fn default() -> Self {
        Self {
            tries: 16,
            rounds: 64,
            seed: 0,
            workers: None,
        }
    }
}

impl MinorCfg {
    pub fn validate(&self) -> Result<()> {
        if self.tries == 0 || self.rounds == 0 {
            return Err(KnotError::invalid_config("tries and rounds must be positive"));
        }
        Ok(())
    }
}

/// Target node → chain of host nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinorEmbedding {
    chains: Vec<BTreeSet<usize>>,
}

impl MinorEmbedding {
    pub fn chains(&self) -> &[BTreeSet<usize>] {
        &self.chains
    }

    /// Non-empty, connected, pairwise disjoint chains, with every target edge
    /// realized by a host edge between the two chains.
    pub fn verify(&self, host: &SimpleGraph, target: &SimpleGraph) -> bool {
        if self.chains.len() != target.num_nodes() {
            return false;
        }
        let mut owner = vec![usize::MAX; host.num_nodes()];
        for (x, chain) in self.chains.iter().enumerate() {
            if !chain.iter().all(|&v| v < host.num_nodes()) || !host.is_connected_subset(chain) {
                return false;
            }
            for &v in chain {
                if owner[v] != usize::MAX {
                    return false;
                }
                owner[v] = x;
            }
        }
        target.edges().all(|(x, y)| {
            self.chains[x]
                .iter()
                .any(|&v| host.neighbors(v).any(|w| owner[w] == y))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MinorOutcome {
    Found(MinorEmbedding),
    NotFound { tries: usize },
}

impl MinorOutcome {
    pub fn embedding(&self) -> Option<&MinorEmbedding> {
        match self {
            Self::Found(e) => Some(e),
            Self::NotFound { .. } => None,
        }
    }
}

/// Search for `target` as a minor of the simple adjacency of a simplified skeleton.
pub fn find_minor_in(host: &SimplifiedGraph, target: &SimpleGraph, cfg: &MinorCfg) -> Result<MinorOutcome> {
    find_minor(&host.simple_adjacency(), target, cfg)
}

pub fn find_minor(host: &SimpleGraph, target: &SimpleGraph, cfg: &MinorCfg) -> Result<MinorOutcome> {
    cfg.validate()?;
    if target.num_nodes() > host.num_nodes() || target.num_edges() > host.num_edges() {
        debug!(
            host_nodes = host.num_nodes(),
            target_nodes = target.num_nodes(),
            "target larger than host"
        );
        return Ok(MinorOutcome::NotFound { tries: 0 });
    }
    let attempt = |t: usize| {
        Placer::new(host, target, TrialSeed::new(cfg.seed, t as u64).rng())
            .run(cfg.rounds)
            .filter(|e| e.verify(host, target))
    };
    let found = crate::search::install(cfg.workers, || {
        (0..cfg.tries).into_par_iter().find_map_first(attempt)
    })?;
    Ok(match found {
        Some(e) => {
            debug!(chain_nodes = e.chains.iter().map(BTreeSet::len).sum::<usize>(), "minor found");
            MinorOutcome::Found(e)
        }
        None => MinorOutcome::NotFound { tries: cfg.tries },
    })
}

const ALPHA_START: f64 = 2.0;
/// Rounds without a new overlap minimum before overlapping chains are torn up.
const STALL_ROUNDS: usize = 3;
/// Root cost multiplier per missing host degree.
const DEGREE_PENALTY: f64 = 10.0;

struct Placer<'a> {
    host: &'a SimpleGraph,
    target: &'a SimpleGraph,
    rng: StdRng,
    chains: Vec<BTreeSet<usize>>,
    usage: Vec<u32>,
    alpha: f64,
}

impl<'a> Placer<'a> {
    fn new(host: &'a SimpleGraph, target: &'a SimpleGraph, rng: StdRng) -> Self {
        Self {
            host,
            target,
            rng,
            chains: vec![BTreeSet::new(); target.num_nodes()],
            usage: vec![0; host.num_nodes()],
            alpha: ALPHA_START,
        }
    }

    fn weight(&self, v: usize) -> f64 {
        self.alpha.powi(self.usage[v] as i32)
    }

    fn run(mut self, rounds: usize) -> Option<MinorEmbedding> {
        let mut order: Vec<usize> = (0..self.target.num_nodes()).collect();
        let mut best_overlap = usize::MAX;
        let mut stalled = 0;
        for _ in 0..rounds {
            order.shuffle(&mut self.rng);
            for &x in &order {
                self.clear(x);
                let chain = self.place(x)?;
                for &v in &chain {
                    self.usage[v] += 1;
                }
                self.chains[x] = chain;
            }
            let overlap: usize = self.usage.iter().map(|&u| u.saturating_sub(1) as usize).sum();
            if overlap == 0 {
                return Some(MinorEmbedding {
                    chains: self.chains,
                });
            }
            if overlap < best_overlap {
                best_overlap = overlap;
                stalled = 0;
            } else {
                stalled += 1;
            }
            if stalled >= STALL_ROUNDS {
                // tear up every chain that touches an overlap and start cool again
                for x in 0..self.chains.len() {
                    if self.chains[x].iter().any(|&v| self.usage[v] > 1) {
                        self.clear(x);
                    }
                }
                best_overlap = usize::MAX;
                stalled = 0;
                self.alpha = ALPHA_START;
                continue;
            }
            self.alpha *= 2.0;
        }
        None
    }

    fn clear(&mut self, x: usize) {
        for &v in &self.chains[x] {
            self.usage[v] -= 1;
        }
        self.chains[x].clear();
    }

    /// Node-weighted distances from `chain`: entering a host node costs its
    /// weight, chain nodes cost nothing. Chains are connected, so one source
    /// reaches the whole chain at distance zero.
    fn distances(&self, chain: &BTreeSet<usize>) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; self.host.num_nodes()];
        let Some(&source) = chain.iter().next() else {
            return dist;
        };
        let reached = dijkstra(self.host.inner(), NodeIndex::new(source), None, |e| {
            let w = e.target().index();
            if chain.contains(&w) {
                0.0
            } else {
                self.weight(w)
            }
        });
        for (n, d) in reached {
            dist[n.index()] = d;
        }
        dist
    }

    /// Neighbor of `v` closest to the source chain (lowest id on ties).
    fn towards_source(&self, dist: &[f64], v: usize) -> Option<usize> {
        self.host
            .neighbors(v)
            .filter(|&u| dist[u].is_finite())
            .min_by(|&a, &b| dist[a].total_cmp(&dist[b]).then(a.cmp(&b)))
    }

    fn place(&mut self, x: usize) -> Option<BTreeSet<usize>> {
        let n = self.host.num_nodes();
        let placed: Vec<usize> = self
            .target
            .neighbors(x)
            .filter(|&y| !self.chains[y].is_empty())
            .collect();
        let fields: Vec<Vec<f64>> = placed.iter().map(|&y| self.distances(&self.chains[y])).collect();
        let want = self.target.degree(x);
        let cost: Vec<f64> = (0..n)
            .map(|r| {
                let w = self.weight(r);
                let missing = want.saturating_sub(self.host.degree(r)) as f64;
                w * (1.0 + DEGREE_PENALTY * missing)
                    + fields
                    .iter()
                    .map(|d| if d[r] == 0.0 { 0.0 } else { d[r] - w })
                    .sum::<f64>()
            })
            .collect();
        let best = cost.iter().copied().fold(f64::INFINITY, f64::min);
        if !best.is_finite() {
            return None;
        }
        let ties: Vec<usize> = (0..n).filter(|&r| cost[r] <= best + 1e-9).collect();
        let root = ties[self.rng.gen_range(0..ties.len())];

        let mut chain = BTreeSet::from([root]);
        for d in &fields {
            if d[root] == 0.0 {
                continue;
            }
            // walk back until the neighbor chain, which is excluded
            let mut next = self.towards_source(d, root);
            while let Some(v) = next.filter(|&v| d[v] > 0.0) {
                chain.insert(v);
                next = self.towards_source(d, v);
            }
        }
        Some(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replace every edge by a path through one new node.
    fn subdivided(g: &SimpleGraph) -> SimpleGraph {
        let mut s = SimpleGraph::with_nodes(g.num_nodes());
        let mut next = g.num_nodes();
        for (a, b) in g.edges().collect::<Vec<_>>() {
            s.add_edge(a, next);
            s.add_edge(next, b);
            next += 1;
        }
        s
    }

    #[test]
    fn k4_does_not_fit_a_triangle() {
        let out = find_minor(&SimpleGraph::cycle(3), &SimpleGraph::complete(4), &MinorCfg::default()).unwrap();
        assert!(matches!(out, MinorOutcome::NotFound { .. }));
    }

    #[test]
    fn k4_is_refused_by_a_hexagon() {
        let cfg = MinorCfg {
            tries: 4,
            rounds: 8,
            ..MinorCfg::default()
        };
        let out = find_minor(&SimpleGraph::cycle(6), &SimpleGraph::complete(4), &cfg).unwrap();
        assert_eq!(out, MinorOutcome::NotFound { tries: 4 });
    }

    #[test]
    fn triangle_in_a_long_cycle() {
        let host = SimpleGraph::cycle(9);
        let target = SimpleGraph::cycle(3);
        let out = find_minor(&host, &target, &MinorCfg::default()).unwrap();
        let e = out.embedding().expect("a 9-cycle contracts to a triangle");
        assert!(e.verify(&host, &target));
    }

    #[test]
    fn petersen_in_its_subdivision() {
        let target = SimpleGraph::petersen();
        let host = subdivided(&target);
        assert_eq!(host.num_nodes(), 25);
        let out = find_minor(&host, &target, &MinorCfg::default()).unwrap();
        let e = out.embedding().expect("subdivided Petersen contains Petersen");
        assert!(e.verify(&host, &target));
        assert_eq!(e.chains().len(), 10);
        assert!(e.chains().iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn complete_graphs_in_their_subdivisions() {
        for n in [4, 5] {
            let target = SimpleGraph::complete(n);
            let host = subdivided(&target);
            let out = find_minor(&host, &target, &MinorCfg { seed: 3, ..MinorCfg::default() }).unwrap();
            assert!(out.embedding().is_some_and(|e| e.verify(&host, &target)), "K{n}");
        }
    }

    #[test]
    fn verify_rejects_bad_embeddings() {
        let host = SimpleGraph::cycle(4);
        let target = SimpleGraph::complete(2);
        let good = MinorEmbedding {
            chains: vec![BTreeSet::from([0]), BTreeSet::from([1, 2])],
        };
        assert!(good.verify(&host, &target));
        let overlapping = MinorEmbedding {
            chains: vec![BTreeSet::from([0, 1]), BTreeSet::from([1])],
        };
        assert!(!overlapping.verify(&host, &target));
        let disconnected = MinorEmbedding {
            chains: vec![BTreeSet::from([0, 2]), BTreeSet::from([1])],
        };
        assert!(!disconnected.verify(&host, &target));
        let unrealized = MinorEmbedding {
            chains: vec![BTreeSet::from([0]), BTreeSet::new()],
        };
        assert!(!unrealized.verify(&host, &target));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let cfg = MinorCfg {
            tries: 0,
            ..MinorCfg::default()
        };
        let r = find_minor(&SimpleGraph::cycle(3), &SimpleGraph::cycle(3), &cfg);
        assert!(matches!(r, Err(KnotError::InvalidConfig { .. })));
    }
}
