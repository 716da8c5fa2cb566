//! Topology-preserving 3D thinning (directional simple-point removal).
//!
//! A voxel is removed when it is a border voxel for the current direction, is
//! not a curve end (one 26-neighbor), and is a simple point: its 26-neighborhood
//! holds exactly one 26-connected foreground component and exactly one
//! 6-connected background component touching the center's face neighbors.
//! Candidates are re-checked sequentially, so each deletion sees the previous ones.

use std::sync::OnceLock;

/// Padded binary grid: one background layer on every side, `x` fastest.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    pub dims: [usize; 3],
    pub cells: Vec<u8>,
}

impl Grid {
    /// Pad `data` (layout of `dims`) with one background voxel per side.
    pub fn padded(dims: [usize; 3], data: &[bool]) -> Self {
        let pd = [dims[0] + 2, dims[1] + 2, dims[2] + 2];
        let mut cells = vec![0u8; pd[0] * pd[1] * pd[2]];
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    if data[(z * dims[1] + y) * dims[0] + x] {
                        cells[((z + 1) * pd[1] + y + 1) * pd[0] + x + 1] = 1;
                    }
                }
            }
        }
        Self { dims: pd, cells }
    }

    #[inline]
    pub fn coords(&self, i: usize) -> [usize; 3] {
        let x = i % self.dims[0];
        let y = (i / self.dims[0]) % self.dims[1];
        let z = i / (self.dims[0] * self.dims[1]);
        [x, y, z]
    }

    /// Linear offsets of the 27 cube cells around a voxel (cell 13 is the center).
    pub fn cube_offsets(&self) -> [isize; 27] {
        let sx = 1isize;
        let sy = self.dims[0] as isize;
        let sz = (self.dims[0] * self.dims[1]) as isize;
        let mut out = [0isize; 27];
        for (k, o) in out.iter_mut().enumerate() {
            let (dx, dy, dz) = cube_delta(k);
            *o = dx * sx + dy * sy + dz * sz;
        }
        out
    }

    /// Whether `i` has a full 3x3x3 neighborhood inside the grid.
    #[inline]
    pub fn is_interior(&self, i: usize) -> bool {
        let [x, y, z] = self.coords(i);
        x > 0
            && y > 0
            && z > 0
            && x + 1 < self.dims[0]
            && y + 1 < self.dims[1]
            && z + 1 < self.dims[2]
    }

    pub fn neighborhood(&self, i: usize, offsets: &[isize; 27]) -> [bool; 27] {
        let mut n = [false; 27];
        for (k, o) in offsets.iter().enumerate() {
            n[k] = self.cells[(i as isize + o) as usize] != 0;
        }
        n
    }

    /// Number of foreground 26-neighbors (center excluded).
    pub fn count_neighbors(&self, i: usize, offsets: &[isize; 27]) -> usize {
        offsets
            .iter()
            .enumerate()
            .filter(|&(k, o)| k != CENTER && self.cells[(i as isize + o) as usize] != 0)
            .count()
    }
}

pub(crate) const CENTER: usize = 13;

#[inline]
pub(crate) fn cube_delta(k: usize) -> (isize, isize, isize) {
    let dx = (k % 3) as isize - 1;
    let dy = ((k / 3) % 3) as isize - 1;
    let dz = (k / 9) as isize - 1;
    (dx, dy, dz)
}

struct CubeTables {
    /// 26-adjacency among the 26 non-center cells.
    adj26: Vec<Vec<usize>>,
    /// 6-adjacency among the 18-neighborhood (faces + edges), center excluded.
    adj6: Vec<Vec<usize>>,
    in18: [bool; 27],
    faces: [usize; 6],
}

fn tables() -> &'static CubeTables {
    static TABLES: OnceLock<CubeTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut adj26 = vec![Vec::new(); 27];
        let mut adj6 = vec![Vec::new(); 27];
        let mut in18 = [false; 27];
        for k in 0..27 {
            let (x, y, z) = cube_delta(k);
            let l1 = x.abs() + y.abs() + z.abs();
            in18[k] = k != CENTER && l1 <= 2;
        }
        for a in 0..27 {
            if a == CENTER {
                continue;
            }
            let (ax, ay, az) = cube_delta(a);
            for b in 0..27 {
                if b == CENTER || b == a {
                    continue;
                }
                let (bx, by, bz) = cube_delta(b);
                let d = ((ax - bx).abs(), (ay - by).abs(), (az - bz).abs());
                if d.0 <= 1 && d.1 <= 1 && d.2 <= 1 {
                    adj26[a].push(b);
                    if d.0 + d.1 + d.2 == 1 && in18[a] && in18[b] {
                        adj6[a].push(b);
                    }
                }
            }
        }
        CubeTables {
            adj26,
            adj6,
            in18,
            faces: [4, 10, 12, 14, 16, 22],
        }
    })
}

/// Count components of `mask` cells under `adj`, restricted to seeds in `seeds`.
fn count_components(mask: &[bool; 27], adj: &[Vec<usize>], seeds: &[usize]) -> usize {
    let mut seen = [false; 27];
    let mut count = 0;
    let mut stack = Vec::with_capacity(27);
    for &s in seeds {
        if !mask[s] || seen[s] {
            continue;
        }
        count += 1;
        seen[s] = true;
        stack.push(s);
        while let Some(v) = stack.pop() {
            for &w in &adj[v] {
                if mask[w] && !seen[w] {
                    seen[w] = true;
                    stack.push(w);
                }
            }
        }
    }
    count
}

/// Simple-point test on a 3x3x3 neighborhood (26/6 connectivity).
pub(crate) fn is_simple(n: &[bool; 27]) -> bool {
    let t = tables();
    let mut fg = *n;
    fg[CENTER] = false;
    let all: Vec<usize> = (0..27).filter(|&k| k != CENTER).collect();
    if count_components(&fg, &t.adj26, &all) != 1 {
        return false;
    }
    let mut bg = [false; 27];
    for k in 0..27 {
        bg[k] = t.in18[k] && !n[k];
    }
    count_components(&bg, &t.adj6, &t.faces) == 1
}

/// Thin the grid in place; returns the number of passes that removed voxels.
pub(crate) fn thin(grid: &mut Grid, max_passes: usize) -> usize {
    let offsets = grid.cube_offsets();
    // Face neighbors in the order +x, -x, +y, -y, +z, -z.
    let directions = [14usize, 12, 16, 10, 22, 4];
    let mut passes = 0;
    for _ in 0..max_passes {
        let mut removed_any = false;
        for &dir in &directions {
            let candidates: Vec<usize> = (0..grid.cells.len())
                .filter(|&i| {
                    grid.cells[i] != 0
                        && grid.is_interior(i)
                        && grid.cells[(i as isize + offsets[dir]) as usize] == 0
                })
                .collect();
            for i in candidates {
                if grid.count_neighbors(i, &offsets) <= 1 {
                    continue;
                }
                let n = grid.neighborhood(i, &offsets);
                if is_simple(&n) {
                    grid.cells[i] = 0;
                    removed_any = true;
                }
            }
        }
        if !removed_any {
            break;
        }
        passes += 1;
    }
    passes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_with(cells: &[usize]) -> [bool; 27] {
        let mut n = [false; 27];
        n[CENTER] = true;
        for &c in cells {
            n[c] = true;
        }
        n
    }

    #[test]
    fn line_interior_is_not_simple_but_end_is() {
        // neighbors at -x (12) and +x (14): removing the center splits the line
        assert!(!is_simple(&cube_with(&[12, 14])));
        // only one neighbor: simple
        assert!(is_simple(&cube_with(&[14])));
    }

    #[test]
    fn isolated_and_enclosed_are_not_simple() {
        assert!(!is_simple(&cube_with(&[])));
        let all: Vec<usize> = (0..27).filter(|&k| k != CENTER).collect();
        // fully enclosed center: removing it creates a cavity
        assert!(!is_simple(&cube_with(&all)));
    }

    #[test]
    fn corner_of_l_shape_is_simple() {
        // neighbors at -x and +y are 26-adjacent to each other
        assert!(is_simple(&cube_with(&[12, 16])));
    }

    #[test]
    fn solid_bar_thins_to_a_curve() {
        let dims = [9, 3, 3];
        let data = vec![true; 81];
        let mut g = Grid::padded(dims, &data);
        thin(&mut g, 50);
        let offsets = g.cube_offsets();
        let remaining: Vec<usize> = (0..g.cells.len()).filter(|&i| g.cells[i] != 0).collect();
        assert!(!remaining.is_empty());
        assert!(remaining.len() < 81);
        // one-voxel-wide: no voxel keeps more than two skeleton neighbors
        for &i in &remaining {
            assert!(g.count_neighbors(i, &offsets) <= 2);
        }
    }
}
