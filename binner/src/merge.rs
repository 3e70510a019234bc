use tracing::{span, trace, Level};

use crate::error::{BinningError, Result};
use crate::geometry::GridSpec;
use crate::grid::{FinalizedGrid, PartialGrid};

/// Folds partial grids into one, adding sums and counts cell by cell, and
/// only then resolves each average as `total_sum / total_count`.
///
/// Averages of partitions are never averaged together: with unequal
/// per-partition counts that would weight small partitions too heavily.
/// Counts cannot overflow since they are bounded by the number of input
/// samples.
pub fn merge<I>(spec: &GridSpec, partials: I) -> Result<FinalizedGrid>
where
    I: IntoIterator<Item = PartialGrid>,
{
    let _span = span!(Level::DEBUG, "merge").entered();

    let mut total = PartialGrid::new(spec);
    let expected = total.cells().len();
    let mut merged = 0usize;
    for partial in partials {
        if partial.cells().len() != expected {
            return Err(BinningError::ShapeMismatch { expected, found: partial.cells().len() });
        }
        for (acc, cell) in total.cells_mut().iter_mut().zip(partial.cells()) {
            acc.absorb(cell);
        }
        merged += 1;
    }
    trace!("Merged {} partial grids", merged);

    Ok(total.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, CellCoord, Sample};
    use crate::grid::{accumulate_partition, FinalizedCell};

    #[test]
    fn merge_uses_counts_not_mean_of_means() {
        let spec = GridSpec::new(1, 10.0);
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        // Partition A: three samples averaging 1, partition B: one sample of 9.
        let a = accumulate_partition(
            &[
                Sample::new(1.0, 1.0, 1.0),
                Sample::new(2.0, 2.0, 1.0),
                Sample::new(3.0, 3.0, 1.0),
            ],
            &bbox,
            &spec,
        );
        let b = accumulate_partition(&[Sample::new(4.0, 4.0, 9.0)], &bbox, &spec);
        let merged = merge(&spec, vec![a, b]).unwrap();
        let cell = merged.get(CellCoord::new(0, 0)).unwrap();
        assert_eq!(cell.count, 4);
        assert_eq!(cell.average, 3.0);
    }

    #[test]
    fn merging_nothing_gives_an_empty_grid() {
        let spec = GridSpec::new(2, 1.0);
        let merged = merge(&spec, Vec::new()).unwrap();
        assert_eq!(merged.cells(), &[FinalizedCell::default(); 4]);
    }

    #[test]
    fn mismatched_partial_is_rejected() {
        let spec = GridSpec::new(2, 1.0);
        let wrong = PartialGrid::new(&GridSpec::new(3, 1.0));
        let err = merge(&spec, vec![wrong]).unwrap_err();
        assert!(matches!(err, BinningError::ShapeMismatch { expected: 4, found: 9 }));
    }
}
