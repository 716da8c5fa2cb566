use super::*;
use nalgebra::vector;

fn two_sticks(under_z: f64, over_z: f64) -> SpatialGraph {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![-1.0, 0.0, under_z]);
    let b = g.add_node(vector![1.0, 0.0, under_z]);
    let c = g.add_node(vector![0.0, -1.0, over_z]);
    let d = g.add_node(vector![0.0, 1.0, over_z]);
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

fn is_degenerate(r: Result<Projection>) -> bool {
    matches!(r, Err(KnotError::DegenerateView { .. }))
}

#[test]
fn single_crossing_orders_arcs_from_incoming_under() {
    let cfg = ProjectionCfg::default();
    let p = project(&two_sticks(0.0, 1.0), &View::default(), &cfg).unwrap();
    assert_eq!(p.num_crossings(), 1);
    assert_eq!(p.arcs.len(), 4);
    // under runs +x (arcs 1 → 2), over runs +y (arcs 3 → 4)
    assert_eq!(p.code.to_string(), "V[1];V[2];V[3];V[4];X[1,3,2,4]");
    let c = p.crossings[0];
    assert_eq!(c.under.edge, 0);
    assert!((c.under.position - 0.5).abs() < 1e-12);
    assert!(c.point.norm() < 1e-12);

    // swapping depths swaps the strands
    let q = project(&two_sticks(1.0, 0.0), &View::default(), &cfg).unwrap();
    assert_eq!(q.code.to_string(), "V[1];V[2];V[3];V[4];X[3,2,4,1]");
}

#[test]
fn viewing_from_below_mirrors_the_crossing() {
    let below = View::new([std::f64::consts::PI, 0.0, 0.0], AxisOrder::Xyz);
    let p = project(&two_sticks(0.0, 1.0), &below, &ProjectionCfg::default()).unwrap();
    let c = p.crossings[0];
    // depth flips, so the +x stick is now on top
    assert_eq!(c.over.edge, 0);
    assert_eq!(c.under.edge, 1);
}

#[test]
fn planar_theta_has_no_crossings() {
    let p = project(&planar_theta(), &View::default(), &ProjectionCfg::default()).unwrap();
    assert_eq!(p.num_crossings(), 0);
    assert_eq!(p.arcs.len(), 3);
    // each vertex lists its ends counterclockwise starting nearest to -π
    assert_eq!(p.code.to_string(), "V[3,2,1];V[3,1,2]");
}

#[test]
fn vertex_tokens_are_counterclockwise() {
    let mut g = SpatialGraph::new();
    let o = g.add_node(vector![0.0, 0.0, 0.0]);
    for p in [vector![1.0, 0.0, 0.0], vector![0.0, 1.0, 0.0], vector![-1.0, -1.0, 0.0]] {
        let n = g.add_node(p);
        g.add_edge(o, n, vec![]);
    }
    let p = project(&g, &View::default(), &ProjectionCfg::default()).unwrap();
    assert_eq!(p.code.to_string(), "V[3,1,2];V[1];V[2];V[3]");
}

#[test]
fn three_arcs_through_one_point_are_degenerate() {
    let mut g = SpatialGraph::new();
    for (k, z) in [(0.0f64, 0.0), (1.0, 1.0), (2.0, 2.0)] {
        let t = k * std::f64::consts::PI / 3.0;
        let d = vector![t.cos(), t.sin(), 0.0];
        let a = g.add_node(-d + vector![0.0, 0.0, z]);
        let b = g.add_node(d + vector![0.0, 0.0, z]);
        g.add_edge(a, b, vec![]);
    }
    let r = project(&g, &View::default(), &ProjectionCfg::default());
    assert!(is_degenerate(r));
}

#[test]
fn depth_ties_are_degenerate() {
    let r = project(&two_sticks(0.5, 0.5), &View::default(), &ProjectionCfg::default());
    assert!(is_degenerate(r));
}

#[test]
fn crossing_on_a_polyline_vertex_is_degenerate() {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![-1.0, 0.0, 0.0]);
    let b = g.add_node(vector![1.0, 0.0, 0.0]);
    let c = g.add_node(vector![0.0, -1.0, 1.0]);
    let d = g.add_node(vector![0.0, 1.0, 1.0]);
    g.add_edge(a, b, vec![vector![0.0, 0.0, 0.0]]);
    g.add_edge(c, d, vec![]);
    let r = project(&g, &View::default(), &ProjectionCfg::default());
    assert!(is_degenerate(r));
}

#[test]
fn edge_through_a_node_and_coincident_nodes_are_degenerate() {
    let mut g = two_sticks(0.0, 1.0);
    g.add_node(vector![0.5, 0.0, 3.0]);
    assert!(is_degenerate(project(&g, &View::default(), &ProjectionCfg::default())));

    let mut h = SpatialGraph::new();
    let a = h.add_node(vector![0.0, 0.0, 0.0]);
    let b = h.add_node(vector![0.0, 0.0, 1.0]);
    h.add_edge(a, b, vec![vector![1.0, 0.0, 0.5]]);
    assert!(is_degenerate(project(&h, &View::default(), &ProjectionCfg::default())));
}

#[test]
fn collinear_overlap_and_shared_directions_are_degenerate() {
    let mut g = SpatialGraph::new();
    let a = g.add_node(vector![0.0, 0.0, 0.0]);
    let b = g.add_node(vector![2.0, 0.0, 0.0]);
    let c = g.add_node(vector![1.0, 0.0, 1.0]);
    let d = g.add_node(vector![3.0, 0.0, 1.0]);
    g.add_edge(a, b, vec![]);
    g.add_edge(c, d, vec![]);
    assert!(is_degenerate(project(&g, &View::default(), &ProjectionCfg::default())));

    // two edges leave `o` along +x before diverging
    let mut h = SpatialGraph::new();
    let o = h.add_node(vector![0.0, 0.0, 0.0]);
    let p = h.add_node(vector![2.0, 1.0, 0.0]);
    let q = h.add_node(vector![2.0, -1.0, 0.0]);
    h.add_edge(o, p, vec![vector![1.0, 0.0, 1.0], vector![1.5, 0.5, 0.0]]);
    h.add_edge(o, q, vec![vector![1.0, 0.0, 2.0], vector![1.5, -0.5, 0.0]]);
    assert!(is_degenerate(project(&h, &View::default(), &ProjectionCfg::default())));
}

#[test]
fn self_loop_kink_crosses_itself() {
    // a loop at the origin that passes over itself once
    let mut g = SpatialGraph::new();
    let o = g.add_node(vector![0.0, 0.0, 0.0]);
    g.add_edge(
        o,
        o,
        vec![
            vector![2.0, 0.0, 0.0],
            vector![2.0, 2.0, 0.0],
            vector![1.0, 2.0, 0.0],
            vector![1.0, -1.0, 1.0],
            vector![0.0, -1.0, 0.0],
        ],
    );
    let p = project(&g, &View::default(), &ProjectionCfg::default()).unwrap();
    assert_eq!(p.num_crossings(), 1);
    assert_eq!(p.arcs.len(), 3);
    let counts = p.code.arc_counts();
    assert!(counts.values().all(|&n| n == 2));
}

#[test]
fn rotation_is_applied_before_projection() {
    let side = View::along(vector![1.0, 0.0, 0.0]);
    let r = project(&two_sticks(0.0, 1.0), &side, &ProjectionCfg::default());
    // looking along +x, the first stick collapses to a point
    assert!(is_degenerate(r));
    let tilted = View::along(vector![0.3, 0.2, 1.0]);
    let p = project(&planar_theta(), &tilted, &ProjectionCfg::default()).unwrap();
    assert_eq!(p.num_crossings(), 0);
}

#[test]
fn rejects_bad_tolerances() {
    let cfg = ProjectionCfg {
        point_tol: 0.0,
        ..ProjectionCfg::default()
    };
    let r = project(&planar_theta(), &View::default(), &cfg);
    assert!(matches!(r, Err(KnotError::InvalidConfig { .. })));
}
