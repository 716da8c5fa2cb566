use super::*;
use crate::projection::PlanarDiagramCode;

fn code(s: &str) -> PlanarDiagramCode {
    s.parse().unwrap()
}

fn raw(s: &str) -> Laurent {
    YamadaEvaluator::default()
        .evaluate(&code(s))
        .unwrap()
        .poly()
        .clone()
}

fn normalized(s: &str) -> Laurent {
    raw(s).normalized()
}

fn ones(lo: i32, hi: i32) -> Laurent {
    Laurent::from_terms((lo..=hi).map(|e| (e, 1)))
}

#[test]
fn unknotted_circle() {
    assert_eq!(raw("V[1,1]"), ones(-1, 1));
    // subdivision points do not matter
    assert_eq!(raw("V[1,2];V[2,3];V[3,1]"), ones(-1, 1));
}

#[test]
fn planar_theta() {
    assert_eq!(
        raw("V[1,2,3];V[3,2,1]"),
        Laurent::from_terms([(2, -1), (1, -1), (0, -2), (-1, -1), (-2, -1)])
    );
    assert_eq!(
        normalized("V[1,2,3];V[3,2,1]"),
        Laurent::from_terms([(4, 1), (3, 1), (2, 2), (1, 1), (0, 1)])
    );
}

#[test]
fn hopf_link_with_or_without_vertices() {
    assert_eq!(normalized("V[5,4];V[6,2];X[5,1,3,2];X[6,3,1,4]"), ones(0, 8));
    assert_eq!(normalized("X[4,1,3,2];X[2,3,1,4]"), ones(0, 8));
}

#[test]
fn trefoil_and_its_mirror() {
    let trefoil = Laurent::from_terms([
        (5, 1),
        (4, 1),
        (3, 1),
        (2, 1),
        (1, 1),
        (-2, -1),
        (-3, -1),
        (-4, -1),
        (-6, 1),
    ]);
    assert_eq!(raw("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]"), trefoil);
    // rotating every crossing by one slot swaps over and under
    assert_eq!(raw("X[5,2,4,1];X[1,4,6,3];X[3,6,2,5]"), trefoil.mirror());
}

#[test]
fn kinks_shift_by_a_power_of_a() {
    assert_eq!(raw("X[1,1,2,2]"), ones(1, 3));
    assert_eq!(raw("X[1,2,2,1]"), ones(-3, -1));
    assert_eq!(normalized("X[1,1,2,2]"), normalized("V[1,1]"));
}

#[test]
fn leaves_and_bridges_vanish() {
    assert!(raw("V[1];V[1]").is_zero());
    // two sticks crossing once
    assert!(raw("V[1];V[2];V[3];V[4];X[1,3,2,4]").is_zero());
    // handcuff graph
    assert!(raw("V[1,1,2];V[2,3,3]").is_zero());
}

#[test]
fn split_diagrams_multiply() {
    let theta = raw("V[1,2,3];V[3,2,1]");
    let circle = raw("V[1,1]");
    assert_eq!(raw("V[1,2,3];V[3,2,1];V[4,4]"), &theta * &circle);
    let hopf = raw("X[4,1,3,2];X[2,3,1,4]");
    assert_eq!(
        raw("X[4,1,3,2];X[2,3,1,4];V[7,8,9];V[9,8,7]"),
        &hopf * &theta
    );
}

#[test]
fn relabeled_codes_agree() {
    let a = raw("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]");
    let b = raw("X[15,13,16,12];X[12,14,11,15];X[13,11,14,16]");
    assert_eq!(a, b);
}

#[test]
fn memo_is_shared_between_clones() {
    let eval = YamadaEvaluator::default();
    let twin = eval.clone();
    let first = eval.evaluate(&code("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]")).unwrap();
    let filled = eval.cache_len();
    assert!(filled > 0);
    let again = twin.evaluate(&code("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]")).unwrap();
    assert_eq!(first, again);
    assert_eq!(twin.cache_len(), filled);
    eval.clear_cache();
    assert_eq!(twin.cache_len(), 0);
    assert_eq!(twin.evaluate(&code("X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]")).unwrap(), first);
}

#[test]
fn parallel_batch_matches_sequential() {
    let codes: Vec<PlanarDiagramCode> = [
        "V[1,1]",
        "V[1,2,3];V[3,2,1]",
        "X[4,1,3,2];X[2,3,1,4]",
        "X[1,5,2,4];X[3,1,4,6];X[5,3,6,2]",
        "V[5,4];V[6,2];X[5,1,3,2];X[6,3,1,4]",
    ]
    .iter()
    .map(|s| code(s))
    .collect();
    let eval = YamadaEvaluator::default();
    let batch = eval.evaluate_many(&codes);
    let fresh = YamadaEvaluator::default();
    for (c, r) in codes.iter().zip(batch) {
        assert_eq!(r.unwrap(), fresh.evaluate(c).unwrap());
    }
}

#[test]
fn config_controls_normalization_and_variable() {
    let eval = YamadaEvaluator::new(YamadaCfg {
        normalize: true,
        variable: "t".into(),
    });
    let p = eval.evaluate(&code("V[1,1]")).unwrap();
    assert_eq!(p.to_string(), "t^2 + t + 1");
    assert_eq!(p.variable(), "t");
    let raw = eval.evaluate_with(&code("V[1,1]"), false).unwrap();
    assert_eq!(raw.to_string(), "t + 1 + t^-1");
}

#[test]
fn empty_diagram_is_one() {
    let p = YamadaEvaluator::default()
        .evaluate(&PlanarDiagramCode::default())
        .unwrap();
    assert_eq!(p.poly(), &Laurent::one());
}
