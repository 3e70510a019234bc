//! Binary intensity grid dump: little-endian `u32` width, `u32` height, then
//! `width * height` `u32` values in storage order.

use std::io::{self, Read, Write};

use grid_binner::IntensityGrid;

pub fn write_raw<W: Write>(grid: &IntensityGrid, mut out: W) -> io::Result<()> {
    let side = grid.resolution();
    out.write_all(&side.to_le_bytes())?;
    out.write_all(&side.to_le_bytes())?;
    for value in grid.values() {
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()
}

fn read_u32<R: Read>(input: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn read_raw<R: Read>(mut input: R) -> io::Result<IntensityGrid> {
    let width = read_u32(&mut input)?;
    let height = read_u32(&mut input)?;
    if width != height {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("grid must be square, got {}x{}", width, height),
        ));
    }

    let n = width as usize * height as usize;
    let mut values = Vec::with_capacity(n.min(1 << 20));
    for _ in 0..n {
        values.push(read_u32(&mut input)?);
    }
    IntensityGrid::from_values(width, values)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn dump_and_reload() {
        let grid = IntensityGrid::from_values(2, vec![15, 16, 254, 255]).unwrap();
        let mut bytes = Vec::new();
        write_raw(&grid, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 8 + 4 * 4);
        assert_eq!(&bytes[..8], &[2, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(read_raw(Cursor::new(bytes)).unwrap(), grid);
    }

    #[test]
    fn non_square_header_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 24]);
        let err = read_raw(Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_body_is_an_eof_error() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        let err = read_raw(Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
