//! Spatial binning of geotagged samples into a square raster.
//!
//! Samples are split into contiguous partitions, each partition is binned
//! into its own grid of `(sum, count)` accumulators on an independent worker,
//! the partial grids are merged into per-cell averages, and the merged grid
//! is mapped through a gamma curve into display intensities.
//!
//! ```no_run
//! use grid_binner::{render, BinningConfig, Sample};
//!
//! let samples = vec![Sample::new(4980000.0, -8240000.0, 12.5)];
//! let image = render(&samples, &BinningConfig::default()).unwrap();
//! for row in image.grid().rows() {
//!     println!("{:?}", row);
//! }
//! ```

mod config;
mod error;
mod geometry;
mod grid;
mod mapper;
mod merge;
mod normalize;
mod partition;
mod utils;

use tracing::{debug, span, Level};

pub use config::{default_workers, BinningConfig, TILE_BBOX, TILE_CELL_SIZE, TILE_RESOLUTION};
pub use error::{BinningError, Result};
pub use geometry::{BoundingBox, CellCoord, GridSpec, Sample};
pub use grid::{accumulate_partition, CellAccumulator, FinalizedCell, FinalizedGrid, PartialGrid};
pub use mapper::{map_to_cell, map_to_index};
pub use merge::merge;
pub use normalize::{normalize, IntensityGrid, NormalizeParams, Normalization, BASE, GAMMA, RANGE};
pub use partition::{fan_out, partition_ranges, run, ExecutionMode};
pub use utils::{millis, timed};

/// Bins `samples` according to `config`: partitions are accumulated in
/// parallel and merged into one finalized grid.
pub fn aggregate(samples: &[Sample], config: &BinningConfig) -> Result<FinalizedGrid> {
    let _span = span!(Level::DEBUG, "aggregate", samples = samples.len(), workers = config.workers).entered();
    config.validate()?;

    let (partials, accumulate_time) =
        timed(|| run(samples, &config.bbox, &config.grid, config.workers, config.mode));
    let partials = partials?;
    let (grid, merge_time) = timed(|| merge(&config.grid, partials));
    let grid = grid?;

    debug!(
        "Accumulated in {:.3} ms, merged in {:.3} ms, {} of {} samples binned",
        millis(accumulate_time),
        millis(merge_time),
        grid.total_count(),
        samples.len()
    );
    Ok(grid)
}

/// Single pass over all samples on the calling thread, without partitioning.
pub fn aggregate_sequential(samples: &[Sample], bbox: &BoundingBox, spec: &GridSpec) -> Result<FinalizedGrid> {
    bbox.validate()?;
    spec.validate()?;
    Ok(accumulate_partition(samples, bbox, spec).finalize())
}

/// [`aggregate`] followed by [`normalize`].
pub fn render(samples: &[Sample], config: &BinningConfig) -> Result<Normalization> {
    let grid = aggregate(samples, config)?;
    let (normalized, normalize_time) = timed(|| normalize(&grid, &config.normalize));
    debug!("Normalized in {:.3} ms", millis(normalize_time));
    normalized
}
