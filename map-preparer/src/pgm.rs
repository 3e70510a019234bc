use std::io::{self, Write};

use grid_binner::{IntensityGrid, NormalizeParams};

/// Max value written in the header unless the intensity scale reaches
/// higher. Existing tiles were produced with 256 here.
pub const PGM_MAX_VALUE: u32 = 256;

/// Writes `grid` as an ASCII (P2) greymap. Rows follow
/// [`IntensityGrid::rows`], every value is followed by a single space and
/// every row by a newline. The header max covers both `params` and the values
/// actually present in `grid`.
pub fn write_pgm<W: Write>(grid: &IntensityGrid, params: &NormalizeParams, mut out: W) -> io::Result<()> {
    let side = grid.resolution();
    let max_value = PGM_MAX_VALUE
        .max(params.max_intensity())
        .max(grid.max_value().unwrap_or(0));
    writeln!(out, "P2")?;
    writeln!(out, "{side} {side}")?;
    writeln!(out, "{max_value}")?;
    for row in grid.rows() {
        for value in row {
            write!(out, "{value} ")?;
        }
        writeln!(out)?;
    }
    out.flush()
}
