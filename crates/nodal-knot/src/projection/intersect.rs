//! 2D segment predicates used by the projector.

use nalgebra::Vector2;

#[inline]
pub(crate) fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SegHit {
    Disjoint,
    /// Proper or touching intersection at parameters `t` (first) and `u` (second).
    Point { t: f64, u: f64 },
    /// Collinear segments sharing more than a point.
    Overlap,
}

/// Intersect `p0→p1` with `q0→q1`; `tol` is an absolute 2D distance.
pub(crate) fn intersect(
    p0: &Vector2<f64>,
    p1: &Vector2<f64>,
    q0: &Vector2<f64>,
    q1: &Vector2<f64>,
    tol: f64,
) -> SegHit {
    let r = p1 - p0;
    let s = q1 - q0;
    let (lr, ls) = (r.norm(), s.norm());
    let denom = cross(&r, &s);
    let qp = q0 - p0;
    if denom.abs() <= 1e-12 * lr * ls {
        // parallel: collinear only if q0 lies on the line through p
        if cross(&r, &qp).abs() > tol * lr {
            return SegHit::Disjoint;
        }
        let rr = r.dot(&r);
        let t0 = qp.dot(&r) / rr;
        let t1 = (q1 - p0).dot(&r) / rr;
        let (lo, hi) = (t0.min(t1).max(0.0), t0.max(t1).min(1.0));
        let overlap = (hi - lo) * lr;
        if overlap > tol {
            return SegHit::Overlap;
        }
        if overlap < -tol {
            return SegHit::Disjoint;
        }
        // touching end to end
        let t = lo.clamp(0.0, 1.0);
        let x = p0 + r * t;
        let u = ((x - q0).dot(&s) / s.dot(&s)).clamp(0.0, 1.0);
        return SegHit::Point { t, u };
    }
    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;
    let (et, eu) = (tol / lr, tol / ls);
    if t < -et || t > 1.0 + et || u < -eu || u > 1.0 + eu {
        return SegHit::Disjoint;
    }
    SegHit::Point {
        t: t.clamp(0.0, 1.0),
        u: u.clamp(0.0, 1.0),
    }
}

pub(crate) fn point_segment_distance(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}
