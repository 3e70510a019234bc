use std::io::{self, BufRead, BufReader};
use std::path::Path;

use grid_binner::Sample;
use tracing::{debug, info, span, warn, Level};

use crate::instrumented_reader::InstrumentedReader;
use crate::potentially_compressed::decompressed;

/// Outcome of reading a sample file.
#[derive(Debug, Default)]
pub struct LoadedSamples {
    pub samples: Vec<Sample>,
    /// 1-based number of the line that stopped the read, if any.
    pub stopped_at: Option<usize>,
}

/// Parses one `amount y x` line. Extra trailing columns are ignored.
pub fn parse_line(line: &str) -> Option<Sample> {
    let mut fields = line.split_whitespace().map(str::parse::<f64>);
    let amount = fields.next()?.ok()?;
    let y = fields.next()?.ok()?;
    let x = fields.next()?.ok()?;
    Some(Sample { x, y, amount })
}

/// Reads whitespace-separated `amount y x` records until end of input or the
/// first line that does not parse. Blank lines are skipped.
pub fn read_samples<R: BufRead>(reader: R) -> io::Result<LoadedSamples> {
    let _span = span!(Level::DEBUG, "read_samples").entered();

    let mut loaded = LoadedSamples::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Some(sample) => loaded.samples.push(sample),
            None => {
                warn!("Stopping at line {}: expected `amount y x`, got {:?}", i + 1, line);
                loaded.stopped_at = Some(i + 1);
                break;
            }
        }
    }
    Ok(loaded)
}

/// Loads samples from a plain, gzip- or zlib-compressed file.
pub fn load_samples(path: &Path) -> io::Result<LoadedSamples> {
    let file = std::fs::File::open(path)?;
    let name = path.display().to_string();
    let progress = InstrumentedReader::new(file, move |n| {
        debug!("Read {} MiB of {}", n / (1024 * 1024), name);
    });
    let stream = decompressed(BufReader::new(progress))?;
    let loaded = read_samples(stream)?;
    info!("Loaded {} rows from {}", loaded.samples.len(), path.display());
    Ok(loaded)
}
