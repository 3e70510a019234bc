use tracing::{debug, warn};

use crate::error::{BinningError, Result};
use crate::geometry::CellCoord;
use crate::grid::FinalizedGrid;

pub const BASE: f64 = 15.0;
pub const RANGE: f64 = 240.0;
pub const GAMMA: f64 = 0.4;

/// Display mapping `floor(base + (weight / peak)^gamma * range)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NormalizeParams {
    pub base: f64,
    pub range: f64,
    pub gamma: f64,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self { base: BASE, range: RANGE, gamma: GAMMA }
    }
}

impl NormalizeParams {
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(BinningError::InvalidNormalization(format!(
                "gamma must be positive and finite, got {}",
                self.gamma
            )));
        }
        for (name, value) in [("base", self.base), ("range", self.range)] {
            if !value.is_finite() || value < 0.0 {
                return Err(BinningError::InvalidNormalization(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }
        if self.base + self.range > u32::MAX as f64 {
            return Err(BinningError::InvalidNormalization(
                "base + range does not fit a 32-bit intensity".to_string(),
            ));
        }
        Ok(())
    }

    /// Intensity of a cell with no weight.
    pub fn min_intensity(&self) -> u32 {
        self.base.floor() as u32
    }

    /// Intensity of the peak cell.
    pub fn max_intensity(&self) -> u32 {
        (self.base + self.range).floor() as u32
    }

    /// Quantizes a weight ratio; values outside `[0, 1]` are clamped.
    #[inline]
    pub fn quantize(&self, ratio: f64) -> u32 {
        let r = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        (self.base + r.powf(self.gamma) * self.range).floor() as u32
    }

    /// Inverse of the linear part of the mapping, used by colormaps.
    pub fn unit_value(&self, intensity: u32) -> f64 {
        if self.range == 0.0 {
            return 0.0;
        }
        ((intensity as f64 - self.base) / self.range).clamp(0.0, 1.0)
    }
}


/// Square grid of display intensities, same storage order as the grid it
/// was computed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntensityGrid {
    resolution: u32,
    values: Vec<u32>,
}

impl IntensityGrid {
    /// Wraps already-quantized values. `values.len()` must be
    /// `resolution * resolution`.
    pub fn from_values(resolution: u32, values: Vec<u32>) -> Result<Self> {
        let expected = resolution as usize * resolution as usize;
        if values.len() != expected {
            return Err(BinningError::ShapeMismatch { expected, found: values.len() });
        }
        Ok(Self { resolution, values })
    }

    fn filled(resolution: u32, value: u32) -> Self {
        let side = resolution as usize;
        Self { resolution, values: vec![value; side * side] }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Values in storage order (`cell_x * resolution + cell_y`).
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn get(&self, coord: CellCoord) -> Option<u32> {
        self.values.get(coord.index(self.resolution)).copied()
    }

    pub fn max_value(&self) -> Option<u32> {
        self.values.iter().copied().max()
    }

    /// Rows in output order: from the highest `cell_x` down to 0, each row
    /// running from `cell_y = 0` upwards.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.values.chunks(self.resolution.max(1) as usize).rev()
    }
}

/// Result of normalizing a grid.
#[derive(Clone, Debug, PartialEq)]
pub enum Normalization {
    Scaled { grid: IntensityGrid, peak_weight: f64 },
    /// No cell carries positive weight; every cell is at the minimum
    /// intensity.
    EmptyInput(IntensityGrid),
}

impl Normalization {
    pub fn grid(&self) -> &IntensityGrid {
        match self {
            Normalization::Scaled { grid, .. } => grid,
            Normalization::EmptyInput(grid) => grid,
        }
    }

    pub fn into_grid(self) -> IntensityGrid {
        match self {
            Normalization::Scaled { grid, .. } => grid,
            Normalization::EmptyInput(grid) => grid,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Normalization::EmptyInput(_))
    }
}

/// Maps every cell's weight (`average * count`) through the gamma curve
/// relative to the peak weight of the grid.
pub fn normalize(grid: &FinalizedGrid, params: &NormalizeParams) -> Result<Normalization> {
    params.validate()?;

    let peak = grid.peak_weight().unwrap_or(0.0);
    if peak.is_nan() || peak <= 0.0 {
        warn!("No cell carries positive weight; emitting a flat grid");
        return Ok(Normalization::EmptyInput(IntensityGrid::filled(
            grid.resolution(),
            params.min_intensity(),
        )));
    }
    debug!("Peak weight: {}", peak);

    let values = grid
        .cells()
        .iter()
        .map(|cell| params.quantize(cell.weight() / peak))
        .collect();
    Ok(Normalization::Scaled {
        grid: IntensityGrid { resolution: grid.resolution(), values },
        peak_weight: peak,
    })
}
