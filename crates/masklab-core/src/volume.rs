//! In-memory 3-D volume representation.
//!
//! A [`Volume`] carries its spatial geometry (voxel spacing and the
//! voxel-to-world affine) alongside the sample data, so the metrics engine
//! can report physical volumes and distances without touching any decoder.

use serde::{Deserialize, Serialize};

use crate::error::TrainerError;

/// A voxel is foreground iff its value exceeds this threshold. Inputs are
/// expected to be near-binary masks; the threshold tolerates interpolation
/// artifacts from resampling.
pub const FOREGROUND_THRESHOLD: f32 = 0.5;

/// Geometry of a volume without its sample data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeHeader {
    /// Spatial dimensions (x, y, z).
    pub shape: [usize; 3],
    /// Voxel spacing in millimeters along each axis.
    pub spacing_mm: [f64; 3],
    /// Voxel-index to world-space (mm) affine transform.
    pub affine: [[f64; 4]; 4],
}

impl VolumeHeader {
    /// An axis-aligned affine whose scale is the voxel spacing.
    pub fn identity_affine(spacing_mm: [f64; 3]) -> [[f64; 4]; 4] {
        let mut a = [[0.0; 4]; 4];
        a[0][0] = spacing_mm[0];
        a[1][1] = spacing_mm[1];
        a[2][2] = spacing_mm[2];
        a[3][3] = 1.0;
        a
    }

    /// Volume of a single voxel in cubic millimeters.
    pub fn voxel_volume_mm3(&self) -> f64 {
        self.spacing_mm[0] * self.spacing_mm[1] * self.spacing_mm[2]
    }
}

/// A dense 3-D scalar volume, x-fastest layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub shape: [usize; 3],
    pub spacing_mm: [f64; 3],
    pub affine: [[f64; 4]; 4],
    pub data: Vec<f32>,
}

impl Volume {
    /// Build a volume, checking that `data` matches `shape`.
    pub fn new(
        shape: [usize; 3],
        spacing_mm: [f64; 3],
        affine: [[f64; 4]; 4],
        data: Vec<f32>,
    ) -> Result<Self, TrainerError> {
        let expected = shape[0] * shape[1] * shape[2];
        if data.len() != expected {
            return Err(TrainerError::Validation(format!(
                "volume data length {} does not match shape {:?} ({} voxels)",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self {
            shape,
            spacing_mm,
            affine,
            data,
        })
    }

    /// An all-background volume with the given geometry.
    pub fn blank(header: &VolumeHeader) -> Self {
        let n = header.shape[0] * header.shape[1] * header.shape[2];
        Self {
            shape: header.shape,
            spacing_mm: header.spacing_mm,
            affine: header.affine,
            data: vec![0.0; n],
        }
    }

    /// An all-background volume sharing this volume's geometry.
    pub fn blank_like(&self) -> Self {
        Self::blank(&self.header())
    }

    pub fn header(&self) -> VolumeHeader {
        VolumeHeader {
            shape: self.shape,
            spacing_mm: self.spacing_mm,
            affine: self.affine,
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.shape[0] * (y + self.shape[1] * z)
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let i = self.index(x, y, z);
        self.data[i] = value;
    }

    /// Number of foreground voxels.
    pub fn foreground_count(&self) -> u64 {
        self.data
            .iter()
            .filter(|v| **v > FOREGROUND_THRESHOLD)
            .count() as u64
    }

    /// Mean foreground voxel index, or `None` for an empty mask.
    pub fn foreground_centroid(&self) -> Option<[f64; 3]> {
        let mut sum = [0.0f64; 3];
        let mut n = 0u64;
        for z in 0..self.shape[2] {
            for y in 0..self.shape[1] {
                for x in 0..self.shape[0] {
                    if self.get(x, y, z) > FOREGROUND_THRESHOLD {
                        sum[0] += x as f64;
                        sum[1] += y as f64;
                        sum[2] += z as f64;
                        n += 1;
                    }
                }
            }
        }
        if n == 0 {
            return None;
        }
        Some([sum[0] / n as f64, sum[1] / n as f64, sum[2] / n as f64])
    }

    /// Map a voxel-space point to world space (mm) through the affine.
    pub fn apply_affine(&self, p: [f64; 3]) -> [f64; 3] {
        apply_affine(&self.affine, p)
    }
}

/// Apply a 4x4 affine to a 3-D point.
pub fn apply_affine(affine: &[[f64; 4]; 4], p: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (row, o) in affine.iter().zip(out.iter_mut()).take(3) {
        *o = row[0] * p[0] + row[1] * p[1] + row[2] * p[2] + row[3];
    }
    out
}
