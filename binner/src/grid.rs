//! Per-cell accumulators and the two grid shapes the pipeline passes around:
//! [`PartialGrid`] (running sums, produced by one partition) and
//! [`FinalizedGrid`] (resolved averages, produced once by the merger).

use tracing::{span, trace, Level};

use crate::geometry::{BoundingBox, CellCoord, GridSpec, Sample};
use crate::mapper::map_to_index;

// --------------------------------------------------------------------------
// CellAccumulator

/// Running total for one cell. The average is only computed at finalization
/// so that partial grids stay additive.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CellAccumulator {
    pub sum: f64,
    pub count: u64,
}

impl CellAccumulator {
    #[inline]
    pub fn add(&mut self, amount: f64) {
        self.sum += amount;
        self.count += 1;
    }

    #[inline]
    pub fn absorb(&mut self, other: &CellAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn finalize(&self) -> FinalizedCell {
        if self.count == 0 {
            FinalizedCell::default()
        } else {
            FinalizedCell {
                average: self.sum / self.count as f64,
                count: self.count,
            }
        }
    }
}


// --------------------------------------------------------------------------
// PartialGrid

/// Grid of running sums owned by exactly one partition task.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialGrid {
    resolution: u32,
    cells: Vec<CellAccumulator>,
}

impl PartialGrid {
    pub fn new(spec: &GridSpec) -> Self {
        Self {
            resolution: spec.resolution,
            cells: vec![CellAccumulator::default(); spec.cell_count()],
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn cells(&self) -> &[CellAccumulator] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellAccumulator] {
        &mut self.cells
    }

    pub fn get(&self, coord: CellCoord) -> Option<&CellAccumulator> {
        self.cells.get(coord.index(self.resolution))
    }

    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.count).sum()
    }

    pub fn total_sum(&self) -> f64 {
        self.cells.iter().map(|c| c.sum).sum()
    }

    /// Resolves averages without merging; equivalent to merging a single
    /// partial grid.
    pub fn finalize(&self) -> FinalizedGrid {
        FinalizedGrid {
            resolution: self.resolution,
            cells: self.cells.iter().map(CellAccumulator::finalize).collect(),
        }
    }
}

/// Bins every sample of `samples` into a fresh grid. Reads nothing but its
/// own slice and writes nothing but the grid it returns.
pub fn accumulate_partition(samples: &[Sample], bbox: &BoundingBox, spec: &GridSpec) -> PartialGrid {
    let _span = span!(Level::TRACE, "accumulate_partition", samples = samples.len()).entered();

    let mut grid = PartialGrid::new(spec);
    let cells = grid.cells_mut();
    let mut outside = 0usize;
    for sample in samples {
        match map_to_index(sample, bbox, spec) {
            Some(idx) => cells[idx].add(sample.amount),
            None => outside += 1,
        }
    }
    trace!("Binned {} samples, {} outside", samples.len() - outside, outside);
    grid
}


// --------------------------------------------------------------------------
// FinalizedCell / FinalizedGrid

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FinalizedCell {
    pub average: f64,
    pub count: u64,
}

impl FinalizedCell {
    /// Total mass of the cell (`average * count`); empty cells weigh zero.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.average * self.count as f64
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinalizedGrid {
    resolution: u32,
    cells: Vec<FinalizedCell>,
}

impl FinalizedGrid {
    #[cfg(test)]
    pub(crate) fn from_cells(resolution: u32, cells: Vec<FinalizedCell>) -> Self {
        Self { resolution, cells }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn cells(&self) -> &[FinalizedCell] {
        &self.cells
    }

    pub fn get(&self, coord: CellCoord) -> Option<&FinalizedCell> {
        self.cells.get(coord.index(self.resolution))
    }

    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.count).sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.cells.iter().map(FinalizedCell::weight).sum()
    }

    /// Largest cell weight, or `None` for a zero-resolution grid.
    pub fn peak_weight(&self) -> Option<f64> {
        self.cells.iter().map(FinalizedCell::weight).reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_yields_zeroed_grid() {
        let spec = GridSpec::new(3, 1.0);
        let bbox = BoundingBox::new(0.0, 0.0, 3.0, 3.0);
        let grid = accumulate_partition(&[], &bbox, &spec);
        assert_eq!(grid.cells().len(), 9);
        assert!(grid.cells().iter().all(|c| *c == CellAccumulator::default()));
    }

    #[test]
    fn accumulates_sum_and_count_per_cell() {
        let spec = GridSpec::new(2, 5.0);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let samples = [
            Sample::new(1.0, 1.0, 2.0),
            Sample::new(1.0, 1.0, 4.0),
            Sample::new(9.0, 9.0, 10.0),
            Sample::new(10.0, 9.0, 99.0),
        ];
        let grid = accumulate_partition(&samples, &bbox, &spec);
        assert_eq!(grid.get(CellCoord::new(0, 0)), Some(&CellAccumulator { sum: 6.0, count: 2 }));
        assert_eq!(grid.get(CellCoord::new(1, 1)), Some(&CellAccumulator { sum: 10.0, count: 1 }));
        assert_eq!(grid.total_count(), 3);
        assert_eq!(grid.total_sum(), 16.0);
    }

    #[test]
    fn finalize_divides_and_keeps_empty_cells_at_zero() {
        let cell = CellAccumulator { sum: 9.0, count: 3 }.finalize();
        assert_eq!(cell, FinalizedCell { average: 3.0, count: 3 });
        assert_eq!(cell.weight(), 9.0);
        assert_eq!(CellAccumulator::default().finalize(), FinalizedCell::default());
    }

    #[test]
    fn peak_weight_of_empty_grid_is_zero() {
        let grid = PartialGrid::new(&GridSpec::new(2, 1.0)).finalize();
        assert_eq!(grid.peak_weight(), Some(0.0));
    }
}
