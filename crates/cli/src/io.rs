//! JSON documents read and written by the CLI.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::Vector3;
use nodal_knot::api::{AxisOrder, FieldThreshold, SpatialGraph, View, Volume};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn vec3(p: [f64; 3]) -> Vector3<f64> {
    Vector3::new(p[0], p[1], p[2])
}

fn arr3(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn unit() -> [f64; 3] {
    [1.0; 3]
}

fn xyz() -> String {
    AxisOrder::Xyz.name().to_string()
}

/// One rotation: three angles in radians applied in `order`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewDoc {
    pub angles: [f64; 3],
    #[serde(default = "xyz")]
    pub order: String,
}

impl From<View> for ViewDoc {
    fn from(v: View) -> Self {
        Self {
            angles: v.angles,
            order: v.order.name().to_string(),
        }
    }
}

impl ViewDoc {
    pub fn to_view(&self) -> Result<View> {
        let order = AxisOrder::parse(&self.order).ok_or_else(|| anyhow!("unknown axis order `{}`", self.order))?;
        Ok(View::new(self.angles, order))
    }
}

/// Candidate views for the manual search path, as a JSON list of [`ViewDoc`].
pub fn read_views(path: &Path) -> Result<Vec<View>> {
    let docs: Vec<ViewDoc> = read_json(path)?;
    if docs.is_empty() {
        bail!("{} lists no views", path.display());
    }
    docs.iter().map(ViewDoc::to_view).collect()
}

/// Volume input. Voxel and field samples are laid out x fastest, then y, then z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeDoc {
    /// Occupancy as 0/1 values.
    Voxels {
        dims: [usize; 3],
        occupied: Vec<u8>,
        #[serde(default = "unit")]
        spacing: [f64; 3],
        #[serde(default)]
        origin: [f64; 3],
    },
    /// Sampled magnitudes, binarized by `thickness`/`epsilon`.
    Field {
        dims: [usize; 3],
        magnitudes: Vec<f64>,
        #[serde(default = "unit")]
        spacing: [f64; 3],
        #[serde(default)]
        origin: [f64; 3],
        #[serde(default)]
        thickness: f64,
        #[serde(default)]
        epsilon: Option<f64>,
    },
    /// Point cloud rasterized with cubic voxels.
    Points { points: Vec<[f64; 3]>, spacing: f64 },
}

impl VolumeDoc {
    pub fn to_volume(&self) -> Result<Volume> {
        let v = match self {
            Self::Voxels {
                dims,
                occupied,
                spacing,
                origin,
            } => Volume::new(
                *dims,
                occupied.iter().map(|&b| b != 0).collect(),
                vec3(*spacing),
                vec3(*origin),
            )?,
            Self::Field {
                dims,
                magnitudes,
                spacing,
                origin,
                thickness,
                epsilon,
            } => Volume::from_field(
                magnitudes,
                *dims,
                vec3(*spacing),
                vec3(*origin),
                FieldThreshold {
                    thickness: *thickness,
                    epsilon: *epsilon,
                },
            )?,
            Self::Points { points, spacing } => {
                let pts: Vec<Vector3<f64>> = points.iter().copied().map(vec3).collect();
                Volume::from_points(&pts, *spacing)?
            }
        };
        Ok(v)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeDoc {
    pub a: usize,
    pub b: usize,
    /// Full polyline from node `a` to node `b`; may be empty for a straight edge.
    #[serde(default)]
    pub polyline: Vec<[f64; 3]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDoc {
    pub nodes: Vec<[f64; 3]>,
    pub edges: Vec<EdgeDoc>,
}

impl GraphDoc {
    pub fn from_graph(g: &SpatialGraph) -> Self {
        Self {
            nodes: g.nodes().iter().map(|n| arr3(&n.coord)).collect(),
            edges: g
                .edges()
                .iter()
                .map(|e| EdgeDoc {
                    a: e.endpoints.0,
                    b: e.endpoints.1,
                    polyline: e.polyline.iter().map(arr3).collect(),
                })
                .collect(),
        }
    }

    pub fn to_graph(&self) -> Result<SpatialGraph> {
        let mut g = SpatialGraph::new();
        for p in &self.nodes {
            g.add_node(vec3(*p));
        }
        for (i, e) in self.edges.iter().enumerate() {
            if e.a >= self.nodes.len() || e.b >= self.nodes.len() {
                bail!("edge {i} references node {} of {}", e.a.max(e.b), self.nodes.len());
            }
            g.add_edge_polyline(e.a, e.b, e.polyline.iter().copied().map(vec3).collect());
        }
        Ok(g)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))
}

pub fn read_graph(path: &Path) -> Result<SpatialGraph> {
    read_json::<GraphDoc>(path)?.to_graph()
}
