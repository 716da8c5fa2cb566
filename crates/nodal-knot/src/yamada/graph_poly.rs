//! Yamada `h` polynomial of an abstract multigraph (a crossing-free diagram).
//!
//! `h(G) = Σ_{F ⊆ E} (-1)^{μ(G−F)} y^{β(G−F)}` with `y = −A − 2 − A⁻¹`, evaluated by
//! deletion–contraction on an explicit worklist of `(coefficient, graph)` terms:
//! - a loop multiplies by `y + 1 = −(A + 1 + A⁻¹)`;
//! - an isolated vertex multiplies by `−1`;
//! - a degree-1 vertex makes the term vanish;
//! - a degree-2 vertex is absorbed by contracting one of its edges;
//! - otherwise `h(G) = h(G − e) + h(G / e)` for a non-loop edge `e`.

use super::poly::Laurent;

/// `y + 1 = −A − 1 − A⁻¹`.
pub(crate) fn loop_factor() -> Laurent {
    Laurent::from_terms([(1, -1), (0, -1), (-1, -1)])
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AbstractGraph {
    pub vertices: usize,
    pub edges: Vec<(usize, usize)>,
}

impl AbstractGraph {
    /// Merge `v` into `u` along edge `e`; returns the contracted graph.
    fn contract(mut self, e: usize) -> Self {
        let (u, v) = self.edges.swap_remove(e);
        let last = self.vertices - 1;
        for (a, b) in &mut self.edges {
            for x in [a, b] {
                if *x == v {
                    *x = u;
                }
            }
        }
        // keep vertex ids dense
        if v != last {
            for (a, b) in &mut self.edges {
                for x in [a, b] {
                    if *x == last {
                        *x = v;
                    }
                }
            }
        }
        self.vertices -= 1;
        self
    }

    fn delete(mut self, e: usize) -> Self {
        self.edges.swap_remove(e);
        self
    }
}

pub(crate) fn graph_h(graph: AbstractGraph) -> Laurent {
    let y1 = loop_factor();
    let mut total = Laurent::zero();
    let mut work = vec![(Laurent::one(), graph)];
    while let Some((mut coef, mut g)) = work.pop() {
        loop {
            let loops = g.edges.iter().filter(|(a, b)| a == b).count();
            if loops > 0 {
                g.edges.retain(|(a, b)| a != b);
                coef = &coef * &y1.pow(loops as u32);
            }
            let mut degree = vec![0usize; g.vertices];
            for &(a, b) in &g.edges {
                degree[a] += 1;
                degree[b] += 1;
            }
            if degree.contains(&1) {
                coef = Laurent::zero();
                break;
            }
            let isolated = degree.iter().filter(|&&d| d == 0).count();
            if isolated > 0 {
                if isolated % 2 == 1 {
                    coef = -coef;
                }
                let mut remap = vec![usize::MAX; g.vertices];
                let mut next = 0;
                for (v, &d) in degree.iter().enumerate() {
                    if d > 0 {
                        remap[v] = next;
                        next += 1;
                    }
                }
                for (a, b) in &mut g.edges {
                    *a = remap[*a];
                    *b = remap[*b];
                }
                g.vertices = next;
                continue;
            }
            if g.edges.is_empty() {
                break;
            }
            // loops are gone, so a degree-2 vertex has two non-loop edge-ends
            if let Some(v) = degree.iter().position(|&d| d == 2) {
                let e = g
                    .edges
                    .iter()
                    .position(|&(a, b)| a == v || b == v)
                    .unwrap_or(0);
                g = g.contract(e);
                continue;
            }
            work.push((coef.clone(), g.clone().delete(0)));
            g = g.contract(0);
        }
        if !coef.is_zero() {
            total += &coef;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(vertices: usize, edges: &[(usize, usize)]) -> AbstractGraph {
        AbstractGraph {
            vertices,
            edges: edges.to_vec(),
        }
    }

    fn circle() -> Laurent {
        Laurent::from_terms([(1, 1), (0, 1), (-1, 1)])
    }

    #[test]
    fn local_rules() {
        assert_eq!(graph_h(g(1, &[])), Laurent::monomial(0, -1));
        assert_eq!(graph_h(g(0, &[])), Laurent::one());
        assert_eq!(graph_h(g(1, &[(0, 0)])), circle());
        assert!(graph_h(g(2, &[(0, 1)])).is_zero());
        // subdivided circle
        assert_eq!(graph_h(g(3, &[(0, 1), (1, 2), (2, 0)])), circle());
        // two disjoint circles multiply
        assert_eq!(graph_h(g(2, &[(0, 0), (1, 1)])), &circle() * &circle());
    }

    #[test]
    fn theta_graph() {
        let h = graph_h(g(2, &[(0, 1), (0, 1), (0, 1)]));
        assert_eq!(
            h,
            Laurent::from_terms([(2, -1), (1, -1), (0, -2), (-1, -1), (-2, -1)])
        );
    }

    #[test]
    fn graph_with_a_bridge_vanishes() {
        // two loops joined by a bridge (handcuff graph)
        assert!(graph_h(g(2, &[(0, 0), (1, 1), (0, 1)])).is_zero());
    }

    fn find(p: &mut [usize], x: usize) -> usize {
        if p[x] != x {
            let r = find(p, p[x]);
            p[x] = r;
        }
        p[x]
    }

    #[test]
    fn matches_the_state_sum_on_k4() {
        let edges = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        let y = Laurent::from_terms([(1, -1), (0, -2), (-1, -1)]);
        let mut expected = Laurent::zero();
        for mask in 0u32..(1 << edges.len()) {
            // G − F keeps the edges not in F
            let kept: Vec<_> = (0..edges.len())
                .filter(|i| mask & (1 << i) == 0)
                .map(|i| edges[i])
                .collect();
            let mut parent: Vec<usize> = (0..4).collect();
            let mut mu = 4;
            for &(a, b) in &kept {
                let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
                if ra != rb {
                    parent[ra] = rb;
                    mu -= 1;
                }
            }
            let beta = kept.len() + mu - 4;
            let sign = if mu % 2 == 1 { -1 } else { 1 };
            expected += &(&Laurent::monomial(0, sign) * &y.pow(beta as u32));
        }
        assert_eq!(graph_h(g(4, &edges)), expected);
    }
}
