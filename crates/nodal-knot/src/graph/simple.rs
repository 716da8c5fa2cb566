//! Simple undirected graphs (no loops, no parallels) used for minors and reports.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{Bfs, EdgeRef, NodeFiltered};

use super::spatial::SpatialGraph;

/// Node `i` is `NodeIndex::new(i)`; nodes are never removed.
#[derive(Clone, Debug, Default)]
pub struct SimpleGraph {
    g: UnGraph<(), ()>,
}

impl PartialEq for SimpleGraph {
    fn eq(&self, other: &Self) -> bool {
        self.num_nodes() == other.num_nodes()
            && self.edges().collect::<BTreeSet<_>>() == other.edges().collect::<BTreeSet<_>>()
    }
}

impl Eq for SimpleGraph {}

impl SimpleGraph {
    pub fn with_nodes(n: usize) -> Self {
        let mut g = UnGraph::with_capacity(n, 0);
        for _ in 0..n {
            g.add_node(());
        }
        Self { g }
    }

    /// Simple adjacency of a spatial multigraph.
    pub fn from_spatial(g: &SpatialGraph) -> Self {
        let mut s = Self::with_nodes(g.num_nodes());
        for e in g.edges() {
            s.add_edge(e.endpoints.0, e.endpoints.1);
        }
        s
    }

    /// Add `a -- b`, growing the node set as needed; loops are dropped and
    /// parallels collapse.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        while self.g.node_count() <= a.max(b) {
            self.g.add_node(());
        }
        self.g.update_edge(NodeIndex::new(a), NodeIndex::new(b), ());
    }

    pub fn complete(n: usize) -> Self {
        let mut g = Self::with_nodes(n);
        for a in 0..n {
            for b in (a + 1)..n {
                g.add_edge(a, b);
            }
        }
        g
    }

    pub fn cycle(n: usize) -> Self {
        let mut g = Self::with_nodes(n);
        for a in 0..n {
            g.add_edge(a, (a + 1) % n);
        }
        g
    }

    /// Petersen graph: outer 5-cycle `0..5`, inner pentagram `5..10`, spokes `i -- i+5`.
    pub fn petersen() -> Self {
        let mut g = Self::with_nodes(10);
        for i in 0..5 {
            g.add_edge(i, (i + 1) % 5);
            g.add_edge(5 + i, 5 + (i + 2) % 5);
            g.add_edge(i, i + 5);
        }
        g
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.g.node_count()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.g.edge_count()
    }

    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.g.neighbors(NodeIndex::new(v)).map(|n| n.index())
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        a.max(b) < self.num_nodes() && self.g.find_edge(NodeIndex::new(a), NodeIndex::new(b)).is_some()
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.g.neighbors(NodeIndex::new(v)).count()
    }

    /// Edges as `(low, high)` pairs in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.g.edge_references().map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            (a.min(b), a.max(b))
        })
    }

    /// Hop distances from `src`; unreachable nodes are absent.
    pub fn hop_distances(&self, src: usize) -> HashMap<usize, usize> {
        dijkstra(&self.g, NodeIndex::new(src), None, |_| 1usize)
            .into_iter()
            .map(|(n, d)| (n.index(), d))
            .collect()
    }

    pub fn num_components(&self) -> usize {
        connected_components(&self.g)
    }

    /// Connected components, each sorted, in order of smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut sets = UnionFind::new(self.num_nodes());
        for (a, b) in self.edges() {
            sets.union(a, b);
        }
        let mut index: HashMap<usize, usize> = HashMap::new();
        let mut out: Vec<Vec<usize>> = Vec::new();
        for v in 0..self.num_nodes() {
            let k = *index.entry(sets.find_mut(v)).or_insert_with(|| {
                out.push(Vec::new());
                out.len() - 1
            });
            out[k].push(v);
        }
        out
    }

    /// Whether the node subset induces a connected subgraph (empty sets are not connected).
    pub fn is_connected_subset(&self, nodes: &BTreeSet<usize>) -> bool {
        let Some(&start) = nodes.iter().next() else {
            return false;
        };
        if nodes.iter().any(|&v| v >= self.num_nodes()) {
            return false;
        }
        let induced = NodeFiltered::from_fn(&self.g, |n: NodeIndex| nodes.contains(&n.index()));
        let mut bfs = Bfs::new(&induced, NodeIndex::new(start));
        let mut seen = 0;
        while bfs.next(&induced).is_some() {
            seen += 1;
        }
        seen == nodes.len()
    }

    pub(crate) fn inner(&self) -> &UnGraph<(), ()> {
        &self.g
    }
}

/// Summary statistics of a graph's shape.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphReport {
    pub num_nodes: usize,
    pub num_edges: usize,
    /// `degree_histogram[d]` = number of nodes with multigraph degree `d`.
    pub degree_histogram: Vec<usize>,
    /// Component sizes, largest first.
    pub component_sizes: Vec<usize>,
    /// Hop diameter of the simple adjacency, when connected.
    pub diameter: Option<usize>,
    pub average_shortest_path: Option<f64>,
}

impl GraphReport {
    pub fn of(g: &SpatialGraph) -> Self {
        let mut degree_histogram = vec![0usize; g.max_degree() + 1];
        for n in g.nodes() {
            degree_histogram[n.degree] += 1;
        }
        let simple = SimpleGraph::from_spatial(g);
        let mut component_sizes: Vec<usize> =
            simple.components().iter().map(|c| c.len()).collect();
        component_sizes.sort_unstable_by(|a, b| b.cmp(a));
        let (diameter, average_shortest_path) = if simple.num_components() == 1 {
            let n = simple.num_nodes();
            let mut diam = 0usize;
            let mut total = 0usize;
            for s in 0..n {
                for d in simple.hop_distances(s).into_values() {
                    diam = diam.max(d);
                    total += d;
                }
            }
            let pairs = n * n.saturating_sub(1);
            let avg = if pairs == 0 {
                0.0
            } else {
                total as f64 / pairs as f64
            };
            (Some(diam), Some(avg))
        } else {
            (None, None)
        };
        Self {
            num_nodes: g.num_nodes(),
            num_edges: g.num_edges(),
            degree_histogram,
            component_sizes,
            diameter,
            average_shortest_path,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.component_sizes.len() == 1
    }
}

impl fmt::Display for GraphReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes: {}", self.num_nodes)?;
        writeln!(f, "edges: {}", self.num_edges)?;
        writeln!(f, "degree distribution (degree: count):")?;
        for (d, &c) in self.degree_histogram.iter().enumerate() {
            if c > 0 {
                writeln!(f, "  {d}: {c}")?;
            }
        }
        match (self.diameter, self.average_shortest_path) {
            (Some(d), Some(avg)) => {
                writeln!(f, "connected")?;
                writeln!(f, "diameter: {d}")?;
                write!(f, "average shortest path length: {avg:.4}")
            }
            _ => {
                write!(f, "components: {}", self.component_sizes.len())?;
                for (i, s) in self.component_sizes.iter().enumerate() {
                    write!(f, "\n  component {}: {s} nodes", i + 1)?;
                }
                Ok(())
            }
        }
    }
}
