//! Density field (heat map) synthesis
//!
//! Each spot contributes an isotropic Gaussian bump over the whole region.
//! Contributions add up so that clusters of spots read hotter than isolated
//! ones, then the field is scaled so its peak is exactly 1.0.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::DensityConfig;
use crate::types::Point;
use crate::{AnalysisError, Result};

/// Row-major grid of values in `[0, 1]`
///
/// All zero when no spots were given; otherwise the maximum cell is 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DensityField {
    /// All-zero field
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.values[y * self.width + x])
        } else {
            None
        }
    }

    /// Row-major cell values
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Row `y` as a slice
    pub fn row(&self, y: usize) -> Option<&[f32]> {
        (y < self.height).then(|| &self.values[y * self.width..(y + 1) * self.width])
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Mean cell value, a coarse summary of overall coverage
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|v| *v as f64).sum();
        (sum / self.values.len() as f64) as f32
    }
}

/// Squared distance from `coordinate` to the nearest index in `0..len`
fn nearest_offset_sq(coordinate: i32, len: usize) -> f64 {
    let nearest = (coordinate as f64).clamp(0.0, (len - 1) as f64);
    let offset = coordinate as f64 - nearest;
    offset * offset
}

/// Builds density fields from spot centers
#[derive(Debug, Clone, Default)]
pub struct DensitySynthesizer {
    config: DensityConfig,
}

impl DensitySynthesizer {
    pub fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    /// Accumulate one Gaussian per point and normalize to a peak of 1.0
    ///
    /// Points are accumulated in sorted order, so any permutation of the
    /// same list produces a bit-identical field.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when sigma is not positive.
    pub fn synthesize(&self, width: usize, height: usize, points: &[Point]) -> Result<DensityField> {
        let sigma = self.config.sigma;
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(AnalysisError::invalid_parameter("density.sigma", sigma));
        }

        if points.is_empty() || width == 0 || height == 0 {
            return Ok(DensityField::zeros(width, height));
        }

        let mut ordered = points.to_vec();
        ordered.sort_unstable();

        let two_sigma_sq = 2.0 * sigma * sigma;
        // Exponents are taken relative to the closest grid distance so a
        // point far outside the grid cannot underflow every cell to zero.
        let offsets: Vec<(f64, f64)> = ordered
            .iter()
            .map(|point| {
                (
                    nearest_offset_sq(point.x, width),
                    nearest_offset_sq(point.y, height),
                )
            })
            .collect();
        let closest = offsets
            .iter()
            .map(|(ox, oy)| ox + oy)
            .fold(f64::INFINITY, f64::min);

        let mut accum = vec![0.0f64; width * height];

        for (point, &(offset_x, offset_y)) in ordered.iter().zip(&offsets) {
            let point_scale = (-(offset_x + offset_y - closest) / two_sigma_sq).exp();
            if point_scale == 0.0 {
                continue;
            }

            let (px, py) = (point.x as f64, point.y as f64);
            // Separable: exp(-(dx²+dy²)/2σ²) = exp(-dx²/2σ²) * exp(-dy²/2σ²)
            let column_weights: Vec<f64> = (0..width)
                .map(|x| {
                    let dx = x as f64 - px;
                    (-(dx * dx - offset_x) / two_sigma_sq).exp()
                })
                .collect();

            for (y, row) in accum.chunks_exact_mut(width).enumerate() {
                let dy = y as f64 - py;
                let row_weight = point_scale * (-(dy * dy - offset_y) / two_sigma_sq).exp();
                if row_weight == 0.0 {
                    continue;
                }
                for (cell, column_weight) in row.iter_mut().zip(&column_weights) {
                    *cell += row_weight * column_weight;
                }
            }
        }

        let peak = accum.iter().copied().fold(0.0f64, f64::max);
        let values: Vec<f32> = if peak > 0.0 {
            accum.iter().map(|v| (v / peak) as f32).collect()
        } else {
            vec![0.0; width * height]
        };

        debug!(
            "Synthesized {}x{} density field from {} point(s), raw peak {:.3}",
            width,
            height,
            ordered.len(),
            peak
        );

        Ok(DensityField {
            width,
            height,
            values,
        })
    }
}
