//! Yamada polynomial of spatial-graph diagrams.
//!
//! Crossings are resolved by the skein relation
//! `R(X[a,b,c,d]) = A·R(V[a,b],V[c,d]) + A⁻¹·R(V[a,d],V[b,c]) + R(V[a,b,c,d])`
//! until only vertices remain, whose value is the graph polynomial `h` of the
//! underlying abstract multigraph. Connected components multiply and are
//! memoized by canonical signature, so repeated subdiagrams are evaluated once.

mod canon;
mod eval;
mod graph_poly;
mod poly;

pub use eval::{YamadaCfg, YamadaEvaluator};
pub use poly::{Laurent, YamadaPolynomial};

#[cfg(test)]
mod tests;
