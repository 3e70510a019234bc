use std::fmt;

use crate::error::{BinningError, Result};

// --------------------------------------------------------------------------
// Sample

/// One geotagged measurement. `x` and `y` are in the same planar map units as
/// the bounding box (e.g. web mercator meters).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub amount: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, amount: f64) -> Self {
        Self { x, y, amount }
    }

    /// Same position, amount multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Self { amount: self.amount * k, ..*self }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ x: {}, y: {}, amount: {} }}", self.x, self.y, self.amount)
    }
}


// --------------------------------------------------------------------------
// BoundingBox

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Strict containment on both axes: points lying exactly on an edge are
    /// outside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn validate(&self) -> Result<()> {
        let corners = [self.min_x, self.min_y, self.max_x, self.max_y];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(BinningError::MisconfiguredGrid(format!(
                "bounding box has a non-finite corner: {}",
                self
            )));
        }
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(BinningError::MisconfiguredGrid(format!(
                "bounding box is empty or inverted: {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}


// --------------------------------------------------------------------------
// GridSpec

/// Square grid of `resolution` x `resolution` cells, each `cell_size` map
/// units wide and high.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridSpec {
    pub resolution: u32,
    pub cell_size: f64,
}

impl GridSpec {
    pub fn new(resolution: u32, cell_size: f64) -> Self {
        Self { resolution, cell_size }
    }

    /// Derives the cell size from the horizontal extent of `bbox`. Only the x
    /// axis is consulted; pass an explicit cell size through [`GridSpec::new`]
    /// when the box is not square.
    pub fn from_extent(bbox: &BoundingBox, resolution: u32) -> Self {
        let cell_size = if resolution == 0 {
            0.0
        } else {
            bbox.width() / resolution as f64
        };
        Self { resolution, cell_size }
    }

    pub fn cell_count(&self) -> usize {
        let side = self.resolution as usize;
        side * side
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(BinningError::MisconfiguredGrid(
                "resolution must be at least 1".to_string(),
            ));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(BinningError::MisconfiguredGrid(format!(
                "cell size must be a positive finite number, got {}",
                self.cell_size
            )));
        }
        Ok(())
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{res}x{res} cells of {size}",
            res = self.resolution,
            size = self.cell_size
        )
    }
}


// --------------------------------------------------------------------------
// CellCoord

/// Two-dimensional cell address. Storage is row-major on `cell_x`:
/// `index = cell_x * resolution + cell_y`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub cell_x: u32,
    pub cell_y: u32,
}

impl CellCoord {
    pub fn new(cell_x: u32, cell_y: u32) -> Self {
        Self { cell_x, cell_y }
    }

    #[inline]
    pub fn index(&self, resolution: u32) -> usize {
        self.cell_x as usize * resolution as usize + self.cell_y as usize
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cell_x, self.cell_y)
    }
}
