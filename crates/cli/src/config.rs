//! JSON configuration file for the pipeline, every field optional.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nodal_knot::api::{
    AnnealCfg, AxisOrder, CostWeights, MinorCfg, PipelineCfg, ProjectionCfg, SimplifyCfg,
    SkeletonCfg, TrivalentCfg, YamadaCfg,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub skeleton: SkeletonSection,
    pub simplify: SimplifySection,
    pub projection: ProjectionSection,
    pub anneal: AnnealSection,
    pub trivalent: TrivalentSection,
    pub yamada: YamadaSection,
    pub minor: MinorSection,
    pub workers: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkeletonSection {
    pub min_branch_length: f64,
    pub prune_leaves: bool,
    pub max_passes: usize,
}

impl Default for SkeletonSection {
    fn default() -> Self {
        let d = SkeletonCfg::default();
        Self {
            min_branch_length: d.min_branch_length,
            prune_leaves: d.prune_leaves,
            max_passes: d.max_passes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimplifySection {
    pub smooth_tolerance: f64,
    pub merge_radius: f64,
}

impl Default for SimplifySection {
    fn default() -> Self {
        let d = SimplifyCfg::default();
        Self {
            smooth_tolerance: d.smooth_tolerance,
            merge_radius: d.merge_radius,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionSection {
    pub point_tol: f64,
    pub depth_tol: f64,
    pub angle_tol: f64,
}

impl Default for ProjectionSection {
    fn default() -> Self {
        let d = ProjectionCfg::default();
        Self {
            point_tol: d.point_tol,
            depth_tol: d.depth_tol,
            angle_tol: d.angle_tol,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnealSection {
    pub t_initial: f64,
    pub t_final: f64,
    pub steps: usize,
    pub restarts: usize,
    pub step_size: f64,
    pub w_close: f64,
    pub w_node: f64,
    pub w_short: f64,
    pub close_frac: f64,
    pub node_frac: f64,
    pub short_frac: f64,
    /// Axis order name, e.g. `"xyz"`.
    pub order: String,
    pub seed: u64,
}

impl Default for AnnealSection {
    fn default() -> Self {
        let d = AnnealCfg::default();
        Self {
            t_initial: d.t_initial,
            t_final: d.t_final,
            steps: d.steps,
            restarts: d.restarts,
            step_size: d.step_size,
            w_close: d.weights.w_close,
            w_node: d.weights.w_node,
            w_short: d.weights.w_short,
            close_frac: d.weights.close_frac,
            node_frac: d.weights.node_frac,
            short_frac: d.weights.short_frac,
            order: d.order.name().to_string(),
            seed: d.seed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrivalentSection {
    pub samples: usize,
    pub batch: usize,
    pub jitter: Option<u64>,
}

impl Default for TrivalentSection {
    fn default() -> Self {
        let d = TrivalentCfg::default();
        Self {
            samples: d.samples,
            batch: d.batch,
            jitter: d.jitter,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YamadaSection {
    pub normalize: bool,
    pub variable: String,
}

impl Default for YamadaSection {
    fn default() -> Self {
        let d = YamadaCfg::default();
        Self {
            normalize: d.normalize,
            variable: d.variable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinorSection {
    pub tries: usize,
    pub rounds: usize,
    pub seed: u64,
}

impl Default for MinorSection {
    fn default() -> Self {
        let d = MinorCfg::default();
        Self {
            tries: d.tries,
            rounds: d.rounds,
            seed: d.seed,
        }
    }
}

impl CliConfig {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn to_pipeline(&self) -> Result<PipelineCfg> {
        let order = AxisOrder::parse(&self.anneal.order)
            .with_context(|| format!("unknown axis order `{}`", self.anneal.order))?;
        Ok(PipelineCfg {
            skeleton: SkeletonCfg {
                min_branch_length: self.skeleton.min_branch_length,
                prune_leaves: self.skeleton.prune_leaves,
                max_passes: self.skeleton.max_passes,
            },
            simplify: SimplifyCfg {
                smooth_tolerance: self.simplify.smooth_tolerance,
                merge_radius: self.simplify.merge_radius,
            },
            projection: ProjectionCfg {
                point_tol: self.projection.point_tol,
                depth_tol: self.projection.depth_tol,
                angle_tol: self.projection.angle_tol,
            },
            anneal: AnnealCfg {
                t_initial: self.anneal.t_initial,
                t_final: self.anneal.t_final,
                steps: self.anneal.steps,
                restarts: self.anneal.restarts,
                step_size: self.anneal.step_size,
                weights: CostWeights {
                    w_close: self.anneal.w_close,
                    w_node: self.anneal.w_node,
                    w_short: self.anneal.w_short,
                    close_frac: self.anneal.close_frac,
                    node_frac: self.anneal.node_frac,
                    short_frac: self.anneal.short_frac,
                },
                order,
                seed: self.anneal.seed,
                workers: None,
            },
            trivalent: TrivalentCfg {
                samples: self.trivalent.samples,
                batch: self.trivalent.batch,
                jitter: self.trivalent.jitter,
                workers: None,
            },
            yamada: YamadaCfg {
                normalize: self.yamada.normalize,
                variable: self.yamada.variable.clone(),
            },
            minor: MinorCfg {
                tries: self.minor.tries,
                rounds: self.minor.rounds,
                seed: self.minor.seed,
                workers: None,
            },
            workers: self.workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_library() {
        let cfg = CliConfig::load(None).unwrap().to_pipeline().unwrap();
        assert_eq!(cfg, PipelineCfg::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"anneal": {"steps": 12, "order": "zyx"}, "workers": 2}"#).unwrap();
        let cfg = CliConfig::load(Some(&path)).unwrap().to_pipeline().unwrap();
        assert_eq!(cfg.anneal.steps, 12);
        assert_eq!(cfg.anneal.order, AxisOrder::Zyx);
        assert_eq!(cfg.anneal.restarts, AnnealCfg::default().restarts);
        assert_eq!(cfg.workers, Some(2));
    }

    #[test]
    fn unknown_fields_and_orders_are_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"anneal": {"stepz": 12}}"#).unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());

        let mut c = CliConfig::default();
        c.anneal.order = "abc".into();
        assert!(c.to_pipeline().is_err());
    }
}
