use std::f64::consts::PI;
use std::sync::atomic::{AtomicI64, Ordering};

use super::*;
use crate::yamada::{Laurent, YamadaEvaluator, YamadaPolynomial};
use nalgebra::{vector, Vector3};

fn two_sticks() -> SpatialGraph {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![-1.0, 0.0, 0.0]);
    let b = g.add_node(vector![1.0, 0.0, 0.0]);
    let c = g.add_node(vector![0.0, -1.0, 1.0]);
    let d = g.add_node(vector![0.0, 1.0, 1.0]);
    g.add_edge(a, b, vec![]);
    g.add_edge(c, d, vec![]);
    g
}

fn planar_theta() -> SpatialGraph {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![-1.0, 0.0, 0.0]);
    let b = g.add_node(vector![1.0, 0.0, 0.0]);
    g.add_edge(a, b, vec![vector![0.0, 1.0, 0.0]]);
    g.add_edge(a, b, vec![]);
    g.add_edge(a, b, vec![vector![0.0, -1.0, 0.0]]);
    g
}

/// Closed polyline as one node with a self-loop through the remaining points.
fn add_loop(g: &mut SpatialGraph, pts: Vec<Vector3<f64>>) {
    let n = g.add_node(pts[0]);
    g.add_edge(n, n, pts[1..].to_vec());
}

/// Two linked octagons in perpendicular planes.
fn hopf_octagons() -> SpatialGraph {
    let angle = |k: usize| k as f64 * PI / 4.0 + PI / 8.0;
    let mut g = SpatialGraph::new();
    add_loop(&mut g, (0..8).map(|k| vector![angle(k).cos(), angle(k).sin(), 0.0]).collect());
    add_loop(&mut g, (0..8).map(|k| vector![1.0 + angle(k).cos(), 0.0, angle(k).sin()]).collect());
    g
}

fn ones(lo: i32, hi: i32) -> Laurent {
    Laurent::from_terms((lo..=hi).map(|e| (e, 1)))
}

fn small_anneal() -> AnnealCfg {
    AnnealCfg {
        steps: 40,
        restarts: 4,
        ..AnnealCfg::default()
    }
}

#[test]
fn cost_counts_crossings_and_near_nodes() {
    let p = project(&two_sticks(), &View::default(), &ProjectionCfg::default()).unwrap();
    assert_eq!(p.num_crossings(), 1);
    assert!((view_cost(&p, &CostWeights::default()) - 1.0).abs() < 1e-12);

    // four nodes at distance 1 from the crossing, diagonal 2√2
    let w = CostWeights {
        node_frac: 0.5,
        ..CostWeights::default()
    };
    let r = 0.5 * 8f64.sqrt();
    let expected = 1.0 + 0.5 * 4.0 * (1.0 - 1.0 / r);
    assert!((view_cost(&p, &w) - expected).abs() < 1e-9);
}

#[test]
fn anneal_untangles_two_sticks() {
    let best = anneal_views(&two_sticks(), &small_anneal(), &ProjectionCfg::default()).unwrap();
    assert_eq!(best.projection.num_crossings(), 0);
    assert_eq!(best.cost, 0.0);
    assert_eq!(best.projection.view, best.view);
}

#[test]
fn anneal_replays_per_seed() {
    let g = hopf_octagons();
    let cfg = AnnealCfg {
        seed: 11,
        ..small_anneal()
    };
    let a = anneal_views(&g, &cfg, &ProjectionCfg::default()).unwrap();
    let b = anneal_views(&g, &AnnealCfg { workers: Some(1), ..cfg }, &ProjectionCfg::default()).unwrap();
    assert_eq!(a.view, b.view);
    assert_eq!(a.cost, b.cost);
    assert_eq!(a.projection.code, b.projection.code);
}

#[test]
fn anneal_reports_exhaustion_and_bad_budgets() {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![0.0, 0.0, 0.0]);
    let b = g.add_node(vector![1.0, 0.0, 0.0]);
    g.add_node(vector![0.0, 0.0, 0.0]);
    g.add_edge(a, b, vec![]);
    let cfg = small_anneal();
    let r = anneal_views(&g, &cfg, &ProjectionCfg::default());
    assert!(matches!(r, Err(KnotError::ExhaustedSearch { attempts }) if attempts == 4 * 41));

    let zero = AnnealCfg {
        steps: 0,
        ..AnnealCfg::default()
    };
    let r = anneal_views(&two_sticks(), &zero, &ProjectionCfg::default());
    assert!(matches!(r, Err(KnotError::InvalidConfig { .. })));
}

#[test]
fn hemisphere_views_look_down() {
    for jitter in [None, Some(3)] {
        let views = hemisphere_views(32, jitter);
        assert_eq!(views.len(), 32);
        for v in &views {
            let d = v.direction();
            assert!(d.z > 0.0, "{v}");
            assert!((d.norm() - 1.0).abs() < 1e-12);
        }
    }
    assert_eq!(hemisphere_views(8, Some(5)), hemisphere_views(8, Some(5)));
}

#[test]
fn trivalent_search_finds_planar_theta() {
    let out = search_trivalent(
        &planar_theta(),
        &TrivalentCfg::default(),
        &ProjectionCfg::default(),
        &YamadaEvaluator::default(),
    )
    .unwrap();
    let ViewSearchOutcome::Found { code, polynomial, .. } = out else {
        panic!("expected agreement, got {out:?}");
    };
    assert_eq!(code.num_crossings(), 0);
    assert_eq!(
        *polynomial.poly(),
        Laurent::from_terms([(4, 1), (3, 1), (2, 2), (1, 1), (0, 1)])
    );
}

#[test]
fn trivalent_search_finds_the_hopf_link() {
    let eval = YamadaEvaluator::default();
    let out = search_trivalent(&hopf_octagons(), &TrivalentCfg::default(), &ProjectionCfg::default(), &eval).unwrap();
    assert!(!matches!(out, ViewSearchOutcome::Ambiguous(_)));
    let ViewSearchOutcome::Found { code, polynomial, .. } = out else {
        unreachable!()
    };
    assert!(code.num_crossings() >= 2);
    assert_eq!(*polynomial.poly(), ones(0, 8));
    assert!(eval.cache_len() > 0);
}

#[test]
fn trivalent_search_refuses_higher_degree() {
    let mut g = SpatialGraph::new();
    let c = g.add_node(vector![0.0, 0.0, 0.0]);
    for d in [vector![1.0, 0.0, 0.0], vector![-1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], vector![0.0, -1.0, 0.0]] {
        let n = g.add_node(d);
        g.add_edge(c, n, vec![]);
    }
    let r = search_trivalent(&g, &TrivalentCfg::default(), &ProjectionCfg::default(), &YamadaEvaluator::default());
    assert_eq!(r, Err(KnotError::ManualViewRequired { max_degree: 4 }));
}

#[test]
fn best_of_views_skips_degenerate_candidates() {
    let g = two_sticks();
    let cfg = ProjectionCfg::default();
    let end_on = View::along(vector![1.0, 0.0, 0.0]);

    assert!(matches!(best_of_views(&g, &[], &cfg), Err(KnotError::InvalidConfig { .. })));
    assert!(matches!(best_of_views(&g, &[end_on], &cfg), Err(KnotError::DegenerateView { .. })));

    let p = best_of_views(&g, &[end_on, View::default()], &cfg).unwrap();
    assert_eq!(p.view, View::default());
    assert_eq!(p.num_crossings(), 1);

    let r = best_of_views(&g, &[end_on, end_on], &cfg);
    assert!(matches!(r, Err(KnotError::ExhaustedSearch { attempts: 2 })));
}

#[test]
fn disagreeing_views_return_every_candidate() {
    let g = planar_theta();
    let cfg = TrivalentCfg {
        samples: 8,
        batch: 4,
        ..TrivalentCfg::default()
    };
    let proj = ProjectionCfg::default();
    let views = hemisphere_views(cfg.samples, None);
    let valid: Vec<View> = views.iter().copied().filter(|v| project(&g, v, &proj).is_ok()).collect();
    assert!(valid.len() >= 2);

    // every value handed out is new, so no two views ever agree
    let next = AtomicI64::new(1);
    let distinct = |codes: &[PlanarDiagramCode]| -> Result<Vec<YamadaPolynomial>> {
        Ok(codes
            .iter()
            .map(|_| YamadaPolynomial::new(Laurent::monomial(0, next.fetch_add(1, Ordering::Relaxed)), "A"))
            .collect())
    };
    let out = super::sampled::run(&g, &views, &cfg, &proj, &distinct).unwrap();
    let ViewSearchOutcome::Ambiguous(all) = out else {
        panic!("expected every candidate back, got {out:?}");
    };
    // no crossings anywhere, so candidates keep sampling order
    assert_eq!(all.iter().map(|(v, _, _)| *v).collect::<Vec<_>>(), valid);
    assert!(all.iter().all(|(_, code, _)| code.num_crossings() == 0));
    assert!(all.windows(2).all(|w| w[0].2 != w[1].2));
}
