//! Planar diagram codes: `V[a,b,c]` vertex tokens and `X[a,b,c,d]` crossing tokens.
//!
//! Text form: tokens joined by `;`. Vertex tokens list arc ids in counterclockwise
//! order around the vertex. Crossing tokens list arc ids counterclockwise starting
//! at the incoming under strand, so positions 0 and 2 are the under strand.
//! In a well-formed code every arc id occurs exactly twice.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{KnotError, Result};

pub type ArcId = usize;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PdToken {
    Vertex(Vec<ArcId>),
    Crossing([ArcId; 4]),
}

impl PdToken {
    pub fn arcs(&self) -> &[ArcId] {
        match self {
            PdToken::Vertex(a) => a,
            PdToken::Crossing(a) => a,
        }
    }

    pub fn is_crossing(&self) -> bool {
        matches!(self, PdToken::Crossing(_))
    }
}

impl fmt::Display for PdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_crossing() { 'X' } else { 'V' };
        write!(f, "{tag}[")?;
        for (i, a) in self.arcs().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{a}")?;
        }
        f.write_str("]")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlanarDiagramCode {
    tokens: Vec<PdToken>,
}

impl PlanarDiagramCode {
    /// Build and validate a code from tokens.
    pub fn new(tokens: Vec<PdToken>) -> Result<Self> {
        let code = Self { tokens };
        code.validate()?;
        Ok(code)
    }

    pub fn tokens(&self) -> &[PdToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn num_crossings(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_crossing()).count()
    }

    pub fn num_vertices(&self) -> usize {
        self.tokens.len() - self.num_crossings()
    }

    /// Occurrence count per arc id.
    pub fn arc_counts(&self) -> BTreeMap<ArcId, usize> {
        let mut counts = BTreeMap::new();
        for t in &self.tokens {
            for &a in t.arcs() {
                *counts.entry(a).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn validate(&self) -> Result<()> {
        for (i, t) in self.tokens.iter().enumerate() {
            if t.arcs().is_empty() {
                return Err(KnotError::invalid_diagram(format!("token {i} is empty")));
            }
        }
        for (arc, n) in self.arc_counts() {
            if n != 2 {
                return Err(KnotError::invalid_diagram(format!(
                    "arc {arc} occurs {n} times (expected 2)"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for PlanarDiagramCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

fn parse_token(raw: &str) -> Result<PdToken> {
    let s = raw.trim();
    let mut chars = s.chars();
    let tag = chars.next().map(|c| c.to_ascii_uppercase());
    let body = chars
        .as_str()
        .trim_start()
        .strip_prefix('[')
        .and_then(|b| b.trim_end().strip_suffix(']'))
        .ok_or_else(|| KnotError::invalid_diagram(format!("token `{s}` is not of the form T[...]")))?;
    let arcs = if body.trim().is_empty() {
        Vec::new()
    } else {
        body.split(',')
            .map(|a| {
                a.trim().parse::<ArcId>().map_err(|_| {
                    KnotError::invalid_diagram(format!("bad arc id `{}` in `{s}`", a.trim()))
                })
            })
            .collect::<Result<Vec<_>>>()?
    };
    match tag {
        Some('V') => Ok(PdToken::Vertex(arcs)),
        Some('X') => {
            let arr: [ArcId; 4] = arcs.try_into().map_err(|v: Vec<ArcId>| {
                KnotError::invalid_diagram(format!("crossing `{s}` has {} arcs", v.len()))
            })?;
            Ok(PdToken::Crossing(arr))
        }
        _ => Err(KnotError::invalid_diagram(format!("unknown token `{s}`"))),
    }
}

impl FromStr for PlanarDiagramCode {
    type Err = KnotError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens = s
            .split(';')
            .filter(|t| !t.trim().is_empty())
            .map(parse_token)
            .collect::<Result<Vec<_>>>()?;
        Self::new(tokens)
    }
}
