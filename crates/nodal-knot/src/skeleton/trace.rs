//! Walk a thinned voxel skeleton into a spatial multigraph.
//!
//! - 1-neighbor voxels become end nodes; 26-adjacent runs of voxels with three
//!   or more neighbors merge into one junction node at their centroid.
//! - Chains of 2-neighbor voxels between nodes become polyline edges.
//! - Leftover chain components (closed curves) get a `LoopAnchor` node and one
//!   self-loop edge.

use std::collections::BTreeSet;

use nalgebra::Vector3;

use super::thin::{Grid, CENTER};
use crate::graph::{NodeId, SpatialGraph};

/// Maps padded grid indices to physical coordinates.
pub(crate) struct Placement {
    pub origin: Vector3<f64>,
    pub spacing: Vector3<f64>,
}

impl Placement {
    /// Physical coordinate of a padded index (the pad shifts indices by one).
    fn at(&self, grid: &Grid, i: usize) -> Vector3<f64> {
        let [x, y, z] = grid.coords(i);
        let ijk = Vector3::new(x as f64 - 1.0, y as f64 - 1.0, z as f64 - 1.0);
        self.origin + ijk.component_mul(&self.spacing)
    }
}

enum Role {
    Background,
    Stray,
    Chain,
    Node(NodeId),
}

pub(crate) fn trace_graph(grid: &Grid, place: &Placement) -> SpatialGraph {
    let offsets = grid.cube_offsets();
    let neighbors = |i: usize| -> Vec<usize> {
        offsets
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != CENTER)
            .map(|(_, &o)| (i as isize + o) as usize)
            .filter(|&j| grid.cells[j] != 0)
            .collect()
    };

    let skeleton: Vec<usize> = (0..grid.cells.len())
        .filter(|&i| grid.cells[i] != 0)
        .collect();
    let mut degree = vec![0usize; grid.cells.len()];
    for &i in &skeleton {
        degree[i] = grid.count_neighbors(i, &offsets);
    }

    let mut graph = SpatialGraph::new();
    let mut role: Vec<Role> = (0..grid.cells.len())
        .map(|i| {
            if grid.cells[i] == 0 {
                Role::Background
            } else if degree[i] == 2 {
                Role::Chain
            } else {
                // end and junction voxels become `Role::Node` below
                Role::Stray
            }
        })
        .collect();

    // Node voxels: ends alone, junction voxels merged by 26-adjacency.
    let mut members: Vec<Vec<usize>> = Vec::new();
    let mut assigned = vec![false; grid.cells.len()];
    for &i in &skeleton {
        if assigned[i] || degree[i] == 0 || degree[i] == 2 {
            continue;
        }
        let id = members.len();
        let mut cluster = vec![i];
        assigned[i] = true;
        if degree[i] >= 3 {
            let mut stack = vec![i];
            while let Some(v) = stack.pop() {
                for w in neighbors(v) {
                    if !assigned[w] && degree[w] >= 3 {
                        assigned[w] = true;
                        cluster.push(w);
                        stack.push(w);
                    }
                }
            }
        }
        cluster.sort_unstable();
        for &v in &cluster {
            role[v] = Role::Node(id);
        }
        let centroid = cluster
            .iter()
            .map(|&v| place.at(grid, v))
            .fold(Vector3::zeros(), |acc, p| acc + p)
            / cluster.len() as f64;
        graph.add_node(centroid);
        members.push(cluster);
    }

    let mut visited = vec![false; grid.cells.len()];
    let mut direct: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (node, cluster) in members.iter().enumerate() {
        for &v in cluster {
            for w in neighbors(v) {
                match role[w] {
                    Role::Chain if !visited[w] => {
                        let (mut interior, end) = walk(v, w, &neighbors, &role, &mut visited);
                        let end = match end {
                            Some(id) => id,
                            None => {
                                // dead end: the last chain voxel becomes an end node
                                let last = interior.pop().unwrap_or(w);
                                graph.add_node(place.at(grid, last))
                            }
                        };
                        let pts = interior.iter().map(|&p| place.at(grid, p)).collect();
                        graph.add_edge(node, end, pts);
                    }
                    Role::Node(other) if other != node => {
                        let key = (v.min(w), v.max(w));
                        if direct.insert(key) {
                            graph.add_edge(node, other, Vec::new());
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    // Closed curves without any node voxel.
    for &i in &skeleton {
        if !matches!(role[i], Role::Chain) || visited[i] {
            continue;
        }
        visited[i] = true;
        let anchor = graph.add_node(place.at(grid, i));
        let Some(&first) = neighbors(i).first() else {
            continue;
        };
        let mut interior = Vec::new();
        let mut prev = i;
        let mut cur = first;
        while cur != i && !visited[cur] {
            visited[cur] = true;
            interior.push(place.at(grid, cur));
            let Some(next) = neighbors(cur).into_iter().find(|&n| n != prev) else {
                break;
            };
            prev = cur;
            cur = next;
        }
        graph.add_edge(anchor, anchor, interior);
    }
    graph
}

/// Follow 2-neighbor voxels from `first` (entered from node voxel `from`).
///
/// Returns the chain voxels in order and the node it ends at (`None` if the
/// chain dead-ends, which only happens on malformed skeletons).
fn walk<F>(
    from: usize,
    first: usize,
    neighbors: &F,
    role: &[Role],
    visited: &mut [bool],
) -> (Vec<usize>, Option<NodeId>)
where
    F: Fn(usize) -> Vec<usize>,
{
    let mut chain = Vec::new();
    let mut prev = from;
    let mut cur = first;
    loop {
        visited[cur] = true;
        chain.push(cur);
        let Some(next) = neighbors(cur).into_iter().find(|&n| n != prev) else {
            return (chain, None);
        };
        match role[next] {
            Role::Node(id) => return (chain, Some(id)),
            Role::Chain if !visited[next] => {
                prev = cur;
                cur = next;
            }
            _ => return (chain, None),
        }
    }
}
