use crate::geometry::{BoundingBox, CellCoord, GridSpec, Sample};

/// Maps a sample onto its grid cell, or `None` when it lies outside the
/// bounding box (edges included) or beyond the area covered by the grid.
///
/// The offsets are non-negative once the containment test passes, so the
/// float-to-integer cast truncates the same way `floor` would.
#[inline]
pub fn map_to_cell(sample: &Sample, bbox: &BoundingBox, spec: &GridSpec) -> Option<CellCoord> {
    if !bbox.contains(sample.x, sample.y) {
        return None;
    }
    let cell_x = ((sample.x - bbox.min_x) / spec.cell_size) as u64;
    let cell_y = ((sample.y - bbox.min_y) / spec.cell_size) as u64;
    let side = spec.resolution as u64;
    if cell_x >= side || cell_y >= side {
        return None;
    }
    Some(CellCoord::new(cell_x as u32, cell_y as u32))
}

/// Flat storage index for `sample`, see [`map_to_cell`].
#[inline]
pub fn map_to_index(sample: &Sample, bbox: &BoundingBox, spec: &GridSpec) -> Option<usize> {
    map_to_cell(sample, bbox, spec).map(|coord| coord.index(spec.resolution))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_setup() -> (BoundingBox, GridSpec) {
        (BoundingBox::new(0.0, 0.0, 10.0, 10.0), GridSpec::new(2, 5.0))
    }

    #[test]
    fn maps_interior_points() {
        let (bbox, spec) = unit_setup();
        assert_eq!(map_to_index(&Sample::new(1.0, 1.0, 0.0), &bbox, &spec), Some(0));
        assert_eq!(map_to_index(&Sample::new(1.0, 9.0, 0.0), &bbox, &spec), Some(1));
        assert_eq!(map_to_index(&Sample::new(9.0, 1.0, 0.0), &bbox, &spec), Some(2));
        assert_eq!(map_to_index(&Sample::new(9.0, 9.0, 0.0), &bbox, &spec), Some(3));
    }

    #[test]
    fn cell_boundaries_inside_the_box_belong_to_the_upper_cell() {
        let (bbox, spec) = unit_setup();
        let coord = map_to_cell(&Sample::new(5.0, 5.0, 0.0), &bbox, &spec);
        assert_eq!(coord, Some(CellCoord::new(1, 1)));
    }

    #[test]
    fn edges_and_outside_points_are_dropped() {
        let (bbox, spec) = unit_setup();
        for (x, y) in [
            (0.0, 5.0),
            (10.0, 5.0),
            (5.0, 0.0),
            (5.0, 10.0),
            (-1.0, 5.0),
            (5.0, 11.0),
            (f64::NAN, 5.0),
        ] {
            assert_eq!(map_to_cell(&Sample::new(x, y, 1.0), &bbox, &spec), None, "({x}, {y})");
        }
    }

    #[test]
    fn points_past_the_covered_grid_are_outside() {
        // 2 cells of 4 units cover only [0, 8) of a 10 unit box.
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let spec = GridSpec::new(2, 4.0);
        assert_eq!(map_to_cell(&Sample::new(9.0, 1.0, 1.0), &bbox, &spec), None);
        assert_eq!(
            map_to_cell(&Sample::new(7.9, 1.0, 1.0), &bbox, &spec),
            Some(CellCoord::new(1, 0))
        );
    }
}
