//! Diagram reduction, connected components and canonical signatures.
//!
//! A component's signature is the lexicographically smallest encoding over all
//! starting darts of a breadth-first traversal of its planar map. Vertex tokens
//! may start at any slot; crossing tokens only at an even slot (rotating an `X`
//! by one position would swap over and under), the entry parity is encoded.

use std::collections::{HashMap, VecDeque};

use petgraph::unionfind::UnionFind;

use crate::projection::{ArcId, PdToken};

pub(crate) type Signature = Vec<u32>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Canonical {
    pub signature: Signature,
    /// Tokens in traversal order, rotated to their start slot, arcs renamed `1..`.
    pub tokens: Vec<PdToken>,
}

/// Outcome of removing vertices of degree at most two.
pub(crate) enum Reduced {
    /// A degree-1 vertex survives somewhere, so the whole diagram evaluates to 0.
    Vanishes,
    Tokens { circles: u32, tokens: Vec<PdToken> },
}

/// Absorb degree-2 vertices into their arcs and count free circles `V[a,a]`.
pub(crate) fn reduce(mut tokens: Vec<PdToken>) -> Reduced {
    let mut circles = 0;
    while let Some(i) = tokens
        .iter()
        .position(|t| matches!(t, PdToken::Vertex(a) if a.len() <= 2))
    {
        let PdToken::Vertex(arcs) = tokens.swap_remove(i) else {
            continue;
        };
        match arcs[..] {
            [a, b] if a == b => circles += 1,
            [a, b] => {
                for t in &mut tokens {
                    let slots: &mut [ArcId] = match t {
                        PdToken::Vertex(v) => v,
                        PdToken::Crossing(x) => x,
                    };
                    if let Some(s) = slots.iter_mut().find(|s| **s == b) {
                        *s = a;
                        break;
                    }
                }
            }
            _ => return Reduced::Vanishes,
        }
    }
    Reduced::Tokens { circles, tokens }
}

fn occurrences(tokens: &[PdToken]) -> HashMap<ArcId, Vec<(usize, usize)>> {
    let mut occ: HashMap<ArcId, Vec<(usize, usize)>> = HashMap::new();
    for (t, tok) in tokens.iter().enumerate() {
        for (s, &a) in tok.arcs().iter().enumerate() {
            occ.entry(a).or_default().push((t, s));
        }
    }
    occ
}

/// Split into connected components (tokens linked by shared arcs).
pub(crate) fn components(tokens: Vec<PdToken>) -> Vec<Vec<PdToken>> {
    let mut sets = UnionFind::new(tokens.len());
    for ends in occurrences(&tokens).values() {
        if let [(a, _), (b, _)] = ends[..] {
            sets.union(a, b);
        }
    }
    let mut index: HashMap<usize, usize> = HashMap::new();
    let mut out: Vec<Vec<PdToken>> = Vec::new();
    for (t, tok) in tokens.into_iter().enumerate() {
        let k = *index.entry(sets.find_mut(t)).or_insert_with(|| {
            out.push(Vec::new());
            out.len() - 1
        });
        out[k].push(tok);
    }
    out
}

/// Canonical form of one connected component.
pub(crate) fn canonicalize(tokens: &[PdToken]) -> Canonical {
    let occ = occurrences(tokens);
    let mut best: Option<(Signature, Vec<(usize, usize)>, HashMap<ArcId, u32>)> = None;
    for (t, tok) in tokens.iter().enumerate() {
        for s in 0..tok.arcs().len() {
            let (sig, order, labels) = traverse(tokens, &occ, t, s);
            if best.as_ref().map_or(true, |b| sig < b.0) {
                best = Some((sig, order, labels));
            }
        }
    }
    let Some((signature, order, labels)) = best else {
        return Canonical {
            signature: Vec::new(),
            tokens: Vec::new(),
        };
    };
    let name = |a: &ArcId| labels.get(a).map_or(0, |&l| l as ArcId + 1);
    let out = order
        .into_iter()
        .map(|(t, start)| {
            let arcs = tokens[t].arcs();
            let k = arcs.len();
            let rotated: Vec<ArcId> = (0..k).map(|i| name(&arcs[(start + i) % k])).collect();
            match tokens[t] {
                PdToken::Vertex(_) => PdToken::Vertex(rotated),
                PdToken::Crossing(_) => {
                    PdToken::Crossing([rotated[0], rotated[1], rotated[2], rotated[3]])
                }
            }
        })
        .collect();
    Canonical {
        signature,
        tokens: out,
    }
}

type Traversal = (Signature, Vec<(usize, usize)>, HashMap<ArcId, u32>);

fn traverse(
    tokens: &[PdToken],
    occ: &HashMap<ArcId, Vec<(usize, usize)>>,
    t0: usize,
    s0: usize,
) -> Traversal {
    let mut queued = vec![false; tokens.len()];
    let mut labels: HashMap<ArcId, u32> = HashMap::new();
    let mut queue = VecDeque::from([(t0, s0)]);
    queued[t0] = true;
    let mut sig = Vec::new();
    let mut order = Vec::with_capacity(tokens.len());
    while let Some((t, entry)) = queue.pop_front() {
        let arcs = tokens[t].arcs();
        let k = arcs.len();
        let (tag, start, parity) = if tokens[t].is_crossing() {
            (1, entry & !1, entry & 1)
        } else {
            (0, entry, 0)
        };
        sig.extend([tag, parity as u32, k as u32]);
        for i in 0..k {
            let slot = (start + i) % k;
            let a = arcs[slot];
            let label = match labels.get(&a) {
                Some(&l) => l,
                None => {
                    let l = labels.len() as u32;
                    labels.insert(a, l);
                    for &(t2, s2) in occ.get(&a).into_iter().flatten() {
                        if !queued[t2] {
                            queued[t2] = true;
                            queue.push_back((t2, s2));
                        }
                    }
                    l
                }
            };
            sig.push(label);
        }
        order.push((t, start));
    }
    (sig, order, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::PlanarDiagramCode;

    fn tokens(s: &str) -> Vec<PdToken> {
        s.parse::<PlanarDiagramCode>().unwrap().tokens().to_vec()
    }

    #[test]
    fn relabeling_and_rotation_do_not_change_the_signature() {
        let a = canonicalize(&tokens("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]"));
        // arcs renamed, tokens reordered, one crossing rotated by two
        let b = canonicalize(&tokens("X[15,13,16,12];X[12,14,11,15];X[13,11,14,16]"));
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.tokens, b.tokens);
    }

    #[test]
    fn mirror_images_differ() {
        let a = canonicalize(&tokens("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]"));
        let m = canonicalize(&tokens("X[5,2,4,1];X[1,4,6,3];X[3,6,2,5]"));
        assert_ne!(a.signature, m.signature);
    }

    #[test]
    fn vertex_rotation_is_free() {
        let a = canonicalize(&tokens("V[1,2,3];V[3,2,1]"));
        let b = canonicalize(&tokens("V[2,3,1];V[1,3,2]"));
        assert_eq!(a.signature, b.signature);
        // reversing one vertex's cyclic order changes the planar map
        let c = canonicalize(&tokens("V[1,2,3];V[1,2,3]"));
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn reduce_absorbs_two_valent_vertices() {
        let Reduced::Tokens { circles, tokens } = reduce(tokens("V[1,2];V[2,1];V[3,4];V[4,5,6];V[5,6,3]"))
        else {
            panic!("unexpected vanishing");
        };
        assert_eq!(circles, 1);
        assert_eq!(tokens.len(), 2);
        let code = PlanarDiagramCode::new(tokens).unwrap();
        assert_eq!(code.num_vertices(), 2);
        assert!(matches!(
            reduce(self::tokens("V[1];V[1,2,2]")),
            Reduced::Vanishes
        ));
    }

    #[test]
    fn components_split_disjoint_pieces() {
        let parts = components(tokens("V[1,1];X[2,3,3,2];V[4,5,6];V[6,5,4]"));
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 1, 2]);
    }
}
