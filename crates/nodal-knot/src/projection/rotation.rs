//! Views: rotations parameterized by an angle triple and an axis order.
//!
//! `View { angles: [a, b, c], order }` is the intrinsic composition
//! `R = R_first(a) · R_second(b) · R_third(c)`. After rotation, `(x, y)` is the
//! 2D diagram position and `z` the depth (larger `z` is closer to the viewer).

use std::f64::consts::{PI, TAU};
use std::fmt;

use nalgebra::{Rotation3, Unit, Vector3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AxisOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl AxisOrder {
    pub const ALL: [AxisOrder; 6] = [
        AxisOrder::Xyz,
        AxisOrder::Xzy,
        AxisOrder::Yxz,
        AxisOrder::Yzx,
        AxisOrder::Zxy,
        AxisOrder::Zyx,
    ];

    fn axes(self) -> [Unit<Vector3<f64>>; 3] {
        let (x, y, z) = (Vector3::x_axis(), Vector3::y_axis(), Vector3::z_axis());
        match self {
            AxisOrder::Xyz => [x, y, z],
            AxisOrder::Xzy => [x, z, y],
            AxisOrder::Yxz => [y, x, z],
            AxisOrder::Yzx => [y, z, x],
            AxisOrder::Zxy => [z, x, y],
            AxisOrder::Zyx => [z, y, x],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AxisOrder::Xyz => "xyz",
            AxisOrder::Xzy => "xzy",
            AxisOrder::Yxz => "yxz",
            AxisOrder::Yzx => "yzx",
            AxisOrder::Zxy => "zxy",
            AxisOrder::Zyx => "zyx",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct View {
    pub angles: [f64; 3],
    pub order: AxisOrder,
}

impl View {
    pub fn new(angles: [f64; 3], order: AxisOrder) -> Self {
        Self { angles, order }
    }

    /// View that projects along the unit direction `dir` (mapped onto `+z`),
    /// with zero in-plane rotation.
    ///
    /// Uses `Zyx`: the third row of `Rz(a)·Ry(b)·Rx(c)` is
    /// `(-sin b, cos b sin c, cos b cos c)`.
    pub fn along(dir: Vector3<f64>) -> Self {
        let d = dir.normalize();
        let b = (-d.x).clamp(-1.0, 1.0).asin();
        let c = d.y.atan2(d.z);
        Self {
            angles: [0.0, b, c],
            order: AxisOrder::Zyx,
        }
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        let axes = self.order.axes();
        let [a, b, c] = self.angles;
        Rotation3::from_axis_angle(&axes[0], a)
            * Rotation3::from_axis_angle(&axes[1], b)
            * Rotation3::from_axis_angle(&axes[2], c)
    }

    /// Viewing direction in the input frame (the preimage of `+z`).
    pub fn direction(&self) -> Vector3<f64> {
        self.rotation().inverse() * Vector3::z()
    }

    /// Angles wrapped into `[-π, π)`.
    pub fn wrapped(&self) -> Self {
        let wrap = |t: f64| (t + PI).rem_euclid(TAU) - PI;
        Self {
            angles: self.angles.map(wrap),
            order: self.order,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.angles;
        write!(f, "{}({a:.6}, {b:.6}, {c:.6})", self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    #[test]
    fn identity_and_single_axis() {
        let v = View::default();
        assert!((v.rotation().matrix() - nalgebra::Matrix3::identity()).norm() < 1e-15);
        // quarter turn about z maps x to y
        let q = View::new([0.0, 0.0, PI / 2.0], AxisOrder::Xyz);
        let p = q.rotation() * vector![1.0, 0.0, 0.0];
        assert!((p - vector![0.0, 1.0, 0.0]).norm() < 1e-12);
    }

    #[test]
    fn composition_follows_axis_order() {
        let angles = [0.3, -0.7, 1.1];
        let xyz = View::new(angles, AxisOrder::Xyz).rotation();
        let manual = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), -0.7)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), 1.1);
        assert!((xyz.matrix() - manual.matrix()).norm() < 1e-12);
        let zyx = View::new(angles, AxisOrder::Zyx).rotation();
        assert!((xyz.matrix() - zyx.matrix()).norm() > 1e-3);
    }

    #[test]
    fn along_maps_direction_to_depth_axis() {
        for dir in [
            vector![0.0, 0.0, 1.0],
            vector![1.0, 2.0, 3.0],
            vector![-0.5, 0.1, 0.2],
            vector![0.0, 1.0, 0.0],
        ] {
            let v = View::along(dir);
            let z = v.rotation() * dir.normalize();
            assert!((z - Vector3::z()).norm() < 1e-12, "{dir:?}");
            assert!((v.direction() - dir.normalize()).norm() < 1e-12);
        }
    }

    #[test]
    fn axis_order_names_round_trip() {
        for o in AxisOrder::ALL {
            assert_eq!(AxisOrder::parse(o.name()), Some(o));
        }
        assert_eq!(AxisOrder::parse("ZYX"), Some(AxisOrder::Zyx));
        assert_eq!(AxisOrder::parse("xxy"), None);
    }
}
