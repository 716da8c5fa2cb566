//! Memoized state-sum evaluation of planar diagram codes.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use tracing::debug;

use super::canon::{canonicalize, components, reduce, Canonical, Reduced, Signature};
use super::graph_poly::{graph_h, loop_factor, AbstractGraph};
use super::poly::{Laurent, YamadaPolynomial};
use crate::error::Result;
use crate::projection::{PdToken, PlanarDiagramCode};

/// Evaluator options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YamadaCfg {
    /// Rescale results to the `±A^k`-free representative.
    pub normalize: bool,
    pub variable: String,
}

impl Default for YamadaCfg {
    fn default() -> Self {
        Self {
            normalize: false,
            variable: "A".to_string(),
        }
    }
}

/// Skein-relation evaluator with a component-level memo.
///
/// The memo maps canonical signatures of connected, reduced diagrams to their
/// values. Clones share the same memo, so it may be reused across threads and
/// across diagrams of one pipeline run.
#[derive(Clone, Debug, Default)]
pub struct YamadaEvaluator {
    cfg: YamadaCfg,
    memo: Arc<DashMap<Signature, Laurent>>,
}

enum Task {
    Visit(Canonical),
    /// Sum of `weight · Π children` once every child is known.
    Combine {
        key: Signature,
        terms: Vec<(Laurent, Vec<Signature>)>,
    },
}

impl YamadaEvaluator {
    pub fn new(cfg: YamadaCfg) -> Self {
        Self {
            cfg,
            memo: Arc::default(),
        }
    }

    pub fn cfg(&self) -> &YamadaCfg {
        &self.cfg
    }

    /// Number of memoized components.
    pub fn cache_len(&self) -> usize {
        self.memo.len()
    }

    /// Drop all memoized values.
    pub fn clear_cache(&self) {
        self.memo.clear();
    }

    /// Yamada polynomial of `code`, normalized when the config asks for it.
    pub fn evaluate(&self, code: &PlanarDiagramCode) -> Result<YamadaPolynomial> {
        self.evaluate_with(code, self.cfg.normalize)
    }

    pub fn evaluate_with(&self, code: &PlanarDiagramCode, normalize: bool) -> Result<YamadaPolynomial> {
        code.validate()?;
        let mut value = match split(code.tokens().to_vec()) {
            None => Laurent::zero(),
            Some((factor, parts)) => parts
                .into_iter()
                .fold(factor, |acc, c| &acc * &self.component_value(c)),
        };
        if normalize {
            value = value.normalized();
        }
        debug!(
            crossings = code.num_crossings(),
            vertices = code.num_vertices(),
            memo = self.memo.len(),
            "yamada evaluated"
        );
        Ok(YamadaPolynomial::new(value, self.cfg.variable.clone()))
    }

    /// Evaluate several codes in parallel against the shared memo.
    pub fn evaluate_many(&self, codes: &[PlanarDiagramCode]) -> Vec<Result<YamadaPolynomial>> {
        codes.par_iter().map(|c| self.evaluate(c)).collect()
    }

    fn lookup(&self, sig: &Signature) -> Option<Laurent> {
        self.memo.get(sig).map(|v| v.value().clone())
    }

    fn component_value(&self, root: Canonical) -> Laurent {
        if let Some(v) = self.lookup(&root.signature) {
            return v;
        }
        let root_sig = root.signature.clone();
        // values of this run; the shared memo may be cleared underneath us
        let mut local: HashMap<Signature, Laurent> = HashMap::new();
        let mut stack = vec![Task::Visit(root)];
        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(c) => {
                    if local.contains_key(&c.signature) {
                        continue;
                    }
                    if let Some(v) = self.lookup(&c.signature) {
                        local.insert(c.signature, v);
                        continue;
                    }
                    let Some(ix) = c.tokens.iter().position(PdToken::is_crossing) else {
                        let h = graph_h(abstract_graph(&c.tokens));
                        self.memo.insert(c.signature.clone(), h.clone());
                        local.insert(c.signature, h);
                        continue;
                    };
                    let mut rest = c.tokens;
                    let PdToken::Crossing([a, b, cc, d]) = rest.remove(ix) else {
                        continue;
                    };
                    let states = [
                        (
                            Laurent::monomial(1, 1),
                            vec![PdToken::Vertex(vec![a, b]), PdToken::Vertex(vec![cc, d])],
                        ),
                        (
                            Laurent::monomial(-1, 1),
                            vec![PdToken::Vertex(vec![a, d]), PdToken::Vertex(vec![b, cc])],
                        ),
                        (Laurent::one(), vec![PdToken::Vertex(vec![a, b, cc, d])]),
                    ];
                    let mut terms = Vec::with_capacity(3);
                    let mut pending = Vec::new();
                    for (weight, extra) in states {
                        let mut tokens = rest.clone();
                        tokens.extend(extra);
                        let Some((factor, parts)) = split(tokens) else {
                            continue;
                        };
                        terms.push((
                            &weight * &factor,
                            parts.iter().map(|p| p.signature.clone()).collect(),
                        ));
                        pending.extend(parts);
                    }
                    stack.push(Task::Combine {
                        key: c.signature,
                        terms,
                    });
                    stack.extend(pending.into_iter().map(Task::Visit));
                }
                Task::Combine { key, terms } => {
                    let mut total = Laurent::zero();
                    for (weight, children) in terms {
                        let term = children.iter().fold(weight, |acc, s| match local.get(s) {
                            Some(v) => &acc * v,
                            None => Laurent::zero(),
                        });
                        total += &term;
                    }
                    self.memo.insert(key.clone(), total.clone());
                    local.insert(key, total);
                }
            }
        }
        local.remove(&root_sig).unwrap_or_default()
    }
}

/// Reduce, then split into canonical components with the circle factor pulled out.
/// `None` means the diagram evaluates to zero.
fn split(tokens: Vec<PdToken>) -> Option<(Laurent, Vec<Canonical>)> {
    let Reduced::Tokens { circles, tokens } = reduce(tokens) else {
        return None;
    };
    let factor = (-loop_factor()).pow(circles);
    let parts = components(tokens)
        .iter()
        .map(|c| canonicalize(c))
        .collect();
    Some((factor, parts))
}

/// Crossing-free diagram as a multigraph: one vertex per token, one edge per arc.
fn abstract_graph(tokens: &[PdToken]) -> AbstractGraph {
    let mut ends: HashMap<usize, Vec<usize>> = HashMap::new();
    for (t, tok) in tokens.iter().enumerate() {
        for &a in tok.arcs() {
            ends.entry(a).or_default().push(t);
        }
    }
    let mut edges: Vec<(usize, usize)> = ends
        .into_values()
        .filter_map(|e| match e[..] {
            [u, v] => Some((u, v)),
            _ => None,
        })
        .collect();
    edges.sort_unstable();
    AbstractGraph {
        vertices: tokens.len(),
        edges,
    }
}
