//! Binary occupancy volumes with physical spacing and origin.
//!
//! Layout: `x` fastest, then `y`, then `z` (`idx = (z * ny + y) * nx + x`).
//! Physical coordinate of voxel `(x, y, z)` is `origin + (x, y, z) ⊙ spacing`.

use nalgebra::Vector3;

use crate::error::{KnotError, Result};

/// Largest grid accepted, in voxels.
pub const MAX_VOXELS: usize = 1 << 28;

/// Voxel count of `dims`, refusing products that overflow or exceed [`MAX_VOXELS`].
fn voxel_count(dims: [usize; 3]) -> Result<usize> {
    let n = dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]))
        .ok_or_else(|| KnotError::malformed(format!("volume dimensions {dims:?} overflow")))?;
    if n > MAX_VOXELS {
        return Err(KnotError::malformed(format!(
            "dims {dims:?} give {n} voxels, more than {MAX_VOXELS}"
        )));
    }
    Ok(n)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Volume {
    dims: [usize; 3],
    data: Vec<bool>,
    spacing: Vector3<f64>,
    origin: Vector3<f64>,
}

/// Thresholding rule for a sampled field magnitude.
///
/// - `epsilon: None` (or `<= 0`): solid region `|f| <= thickness`, where the
///   thickness is raised to at least `10 / samples_per_dim`.
/// - `epsilon: Some(e)`: thickened shell `abs(|f| - thickness) < e`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldThreshold {
    pub thickness: f64,
    pub epsilon: Option<f64>,
}

impl Default for FieldThreshold {
    fn default() -> Self {
        Self {
            thickness: 0.0,
            epsilon: None,
        }
    }
}

impl Volume {
    pub fn new(
        dims: [usize; 3],
        data: Vec<bool>,
        spacing: Vector3<f64>,
        origin: Vector3<f64>,
    ) -> Result<Self> {
        let v = Self {
            dims,
            data,
            spacing,
            origin,
        };
        v.validate()?;
        Ok(v)
    }

    /// All-background volume; fill it with `set`.
    pub fn empty(dims: [usize; 3], spacing: Vector3<f64>, origin: Vector3<f64>) -> Result<Self> {
        let n = voxel_count(dims)?;
        Self::new(dims, vec![false; n], spacing, origin)
    }

    /// Rasterize a point cloud onto a grid of cubic voxels of side `spacing`.
    ///
    /// The grid gets one background voxel of padding on every side.
    pub fn from_points(points: &[Vector3<f64>], spacing: f64) -> Result<Self> {
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(KnotError::malformed("point spacing must be finite and > 0"));
        }
        let Some(first) = points.first() else {
            return Err(KnotError::malformed("empty point cloud"));
        };
        let mut lo = *first;
        let mut hi = *first;
        for p in points {
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(KnotError::malformed("non-finite point in cloud"));
            }
            lo = lo.inf(p);
            hi = hi.sup(p);
        }
        let origin = lo - Vector3::repeat(spacing);
        let extent = (hi - lo) / spacing;
        let cells = |e: f64| -> Result<usize> {
            let c = e.round();
            if !(c.is_finite() && c < MAX_VOXELS as f64) {
                return Err(KnotError::malformed(format!(
                    "point cloud spans {e:.3e} voxels at spacing {spacing}"
                )));
            }
            Ok(c as usize + 3)
        };
        let dims = [cells(extent.x)?, cells(extent.y)?, cells(extent.z)?];
        let mut vol = Self::empty(dims, Vector3::repeat(spacing), origin)?;
        for p in points {
            let q = (p - origin) / spacing;
            let (x, y, z) = (q.x.round() as usize, q.y.round() as usize, q.z.round() as usize);
            vol.set(x.min(dims[0] - 1), y.min(dims[1] - 1), z.min(dims[2] - 1), true);
        }
        Ok(vol)
    }

    /// Binarize a sampled magnitude grid (same layout as the volume).
    pub fn from_field(
        magnitudes: &[f64],
        dims: [usize; 3],
        spacing: Vector3<f64>,
        origin: Vector3<f64>,
        rule: FieldThreshold,
    ) -> Result<Self> {
        let n = voxel_count(dims)?;
        if magnitudes.len() != n {
            return Err(KnotError::malformed(format!(
                "field has {} samples, dims {dims:?} need {n}",
                magnitudes.len()
            )));
        }
        let data = match rule.epsilon {
            Some(eps) if eps > 0.0 => magnitudes
                .iter()
                .map(|m| (m.abs() - rule.thickness).abs() < eps)
                .collect(),
            _ => {
                let per_dim = dims.iter().copied().max().unwrap_or(1).max(1) as f64;
                let t = rule.thickness.max(10.0 / per_dim);
                magnitudes.iter().map(|m| m.abs() <= t).collect()
            }
        };
        Self::new(dims, data, spacing, origin)
    }

    fn validate(&self) -> Result<()> {
        let n = voxel_count(self.dims)?;
        if n != self.data.len() {
            return Err(KnotError::malformed(format!(
                "dims {:?} need {n} voxels, data has {}",
                self.dims,
                self.data.len()
            )));
        }
        if !self.spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(KnotError::malformed("spacing must be finite and > 0"));
        }
        if !self.origin.iter().all(|o| o.is_finite()) {
            return Err(KnotError::malformed("origin must be finite"));
        }
        Ok(())
    }

    /// Validation applied at skeleton entry: shape checks plus non-empty occupancy.
    pub(crate) fn check_usable(&self) -> Result<()> {
        self.validate()?;
        if self.count_occupied() == 0 {
            return Err(KnotError::malformed("volume has no occupied voxel"));
        }
        Ok(())
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn spacing(&self) -> Vector3<f64> {
        self.spacing
    }

    #[inline]
    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.dims[0] && y < self.dims[1] && z < self.dims[2] && self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: bool) {
        let i = self.index(x, y, z);
        self.data[i] = value;
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn count_occupied(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Physical coordinate of a (possibly fractional) voxel index.
    #[inline]
    pub fn to_physical(&self, ijk: Vector3<f64>) -> Vector3<f64> {
        self.origin + ijk.component_mul(&self.spacing)
    }
}
