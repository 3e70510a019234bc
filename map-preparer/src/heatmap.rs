use std::path::Path;

use grid_binner::{IntensityGrid, NormalizeParams};
use plotters::prelude::*;
use tracing::debug;

/// Colormaps for PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Colormap {
    /// Black -> white, same look as the PGM output
    Grey,
    /// Blue -> Cyan -> Green -> Yellow -> Red
    Jet,
    /// Purple -> Blue -> Green -> Yellow
    Viridis,
    /// Blue -> Cyan -> Green -> Yellow -> Orange -> Red
    Turbo,
}

const VIRIDIS: [(f64, f64, f64); 5] = [
    (0.267004, 0.004874, 0.329415),
    (0.282623, 0.140926, 0.457517),
    (0.163625, 0.471133, 0.558148),
    (0.477504, 0.821444, 0.318195),
    (0.993248, 0.906157, 0.143936),
];

const TURBO: [(f64, f64, f64); 6] = [
    (0.18995, 0.07176, 0.23217),
    (0.11770, 0.56700, 0.75088),
    (0.17205, 0.88797, 0.54362),
    (0.89567, 0.99343, 0.29685),
    (0.97809, 0.55414, 0.10540),
    (0.78801, 0.08080, 0.06051),
];

impl Colormap {
    /// Maps `value` in `[0, 1]` to a color; out-of-range input is clamped.
    pub fn map(&self, value: f64) -> RGBColor {
        let v = value.clamp(0.0, 1.0);
        let (r, g, b) = match self {
            Colormap::Grey => (v, v, v),
            Colormap::Jet => jet(v),
            Colormap::Viridis => interpolate(&VIRIDIS, v),
            Colormap::Turbo => interpolate(&TURBO, v),
        };
        RGBColor(to_byte(r), to_byte(g), to_byte(b))
    }
}

fn to_byte(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0) as u8
}

/// Piecewise-linear blend between evenly spaced color stops.
fn interpolate(stops: &[(f64, f64, f64)], v: f64) -> (f64, f64, f64) {
    let last = stops.len() - 1;
    let pos = v * last as f64;
    let i = (pos.floor() as usize).min(last);
    if i == last {
        return stops[last];
    }
    let t = pos - i as f64;
    let (a, b) = (stops[i], stops[i + 1]);
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1), a.2 + t * (b.2 - a.2))
}

/// Triangular ramp that is 1 on `[lo, hi]` and falls off over `width` on
/// either side.
fn ramp(v: f64, lo: f64, hi: f64, width: f64) -> f64 {
    if v < lo {
        (1.0 - (lo - v) / width).max(0.0)
    } else if v > hi {
        (1.0 - (v - hi) / width).max(0.0)
    } else {
        1.0
    }
}

fn jet(v: f64) -> (f64, f64, f64) {
    (
        ramp(v, 0.625, 0.875, 0.25),
        ramp(v, 0.375, 0.625, 0.25),
        ramp(v, 0.125, 0.375, 0.25),
    )
}

/// Paints one pixel per cell and saves the image as PNG. Image row 0 is the
/// first row of [`IntensityGrid::rows`].
pub fn save_heatmap_png(
    grid: &IntensityGrid,
    params: &NormalizeParams,
    output_path: &Path,
    colormap: Colormap,
) -> Result<(), Box<dyn std::error::Error>> {
    let side = grid.resolution();
    debug!("Painting {}x{} heatmap with {:?}", side, side, colormap);

    let root = BitMapBackend::new(output_path, (side, side)).into_drawing_area();
    root.fill(&BLACK)?;
    for (row, values) in grid.rows().enumerate() {
        for (col, &value) in values.iter().enumerate() {
            let color = colormap.map(params.unit_value(value));
            root.draw_pixel((col as i32, row as i32), &color)?;
        }
    }
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_spans_black_to_white() {
        assert_eq!(Colormap::Grey.map(0.0), RGBColor(0, 0, 0));
        assert_eq!(Colormap::Grey.map(1.0), RGBColor(255, 255, 255));
        assert_eq!(Colormap::Grey.map(2.0), RGBColor(255, 255, 255));
    }

    #[test]
    fn jet_runs_from_dark_blue_to_dark_red() {
        assert_eq!(Colormap::Jet.map(0.0), RGBColor(0, 0, 127));
        assert_eq!(Colormap::Jet.map(0.5), RGBColor(127, 255, 127));
        assert_eq!(Colormap::Jet.map(1.0), RGBColor(127, 0, 0));
    }

    #[test]
    fn interpolated_maps_hit_their_end_stops() {
        let first = VIRIDIS[0];
        let last = TURBO[TURBO.len() - 1];
        assert_eq!(Colormap::Viridis.map(0.0), RGBColor(to_byte(first.0), to_byte(first.1), to_byte(first.2)));
        assert_eq!(Colormap::Turbo.map(1.0), RGBColor(to_byte(last.0), to_byte(last.1), to_byte(last.2)));
    }

    #[test]
    fn interpolation_is_linear_between_stops() {
        let stops = [(0.0, 0.0, 0.0), (1.0, 0.5, 0.0)];
        assert_eq!(interpolate(&stops, 0.5), (0.5, 0.25, 0.0));
    }
}
