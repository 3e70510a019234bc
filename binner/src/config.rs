use crate::error::Result;
use crate::geometry::{BoundingBox, GridSpec};
use crate::normalize::NormalizeParams;
use crate::partition::ExecutionMode;

/// Web mercator extent of the reference tile.
pub const TILE_BBOX: BoundingBox = BoundingBox {
    min_x: 4970241.3272153,
    min_y: -8257645.03970416,
    max_x: 5009377.08569731,
    max_y: -8218509.28122215,
};
/// Tile side in pixels.
pub const TILE_RESOLUTION: u32 = 256;
/// Meters per pixel at the reference tile's zoom level.
pub const TILE_CELL_SIZE: f64 = 152.874056570353;

/// Everything one aggregation run needs. Fixed for the duration of the run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BinningConfig {
    pub bbox: BoundingBox,
    pub grid: GridSpec,
    pub workers: usize,
    pub mode: ExecutionMode,
    pub normalize: NormalizeParams,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            bbox: TILE_BBOX,
            grid: GridSpec::new(TILE_RESOLUTION, TILE_CELL_SIZE),
            workers: default_workers(),
            mode: ExecutionMode::default(),
            normalize: NormalizeParams::default(),
        }
    }
}

impl BinningConfig {
    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        self.grid.validate()?;
        self.normalize.validate()
    }
}

/// One worker per available core, or one if that cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|p| p.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        let config = BinningConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.workers >= 1);
    }

    #[test]
    fn reference_grid_covers_the_tile() {
        let covered = TILE_CELL_SIZE * TILE_RESOLUTION as f64;
        assert!((covered - TILE_BBOX.width()).abs() < 1e-3);
        assert!((covered - TILE_BBOX.height()).abs() < 1e-3);
    }
}
