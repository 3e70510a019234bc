mod heatmap;
mod instrumented_reader;
mod loader;
mod pgm;
mod potentially_compressed;
mod raw_grid;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use grid_binner::{
    aggregate, default_workers, millis, normalize, timed, BinningConfig, BoundingBox, ExecutionMode,
    GridSpec, IntensityGrid, NormalizeParams, Normalization, BASE, GAMMA, RANGE, TILE_BBOX,
    TILE_CELL_SIZE, TILE_RESOLUTION,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use heatmap::Colormap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CliExecutionMode {
    Sequential,
    ScopedThreads,
    RayonPool,
}

impl From<CliExecutionMode> for ExecutionMode {
    fn from(value: CliExecutionMode) -> Self {
        match value {
            CliExecutionMode::Sequential => ExecutionMode::Sequential,
            CliExecutionMode::ScopedThreads => ExecutionMode::ScopedThreads,
            CliExecutionMode::RayonPool => ExecutionMode::RayonPool,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// ASCII greymap (P2)
    Pgm,
    /// Colormapped PNG heatmap
    Png,
    /// Binary grid dump, see `render`
    Raw,
}

/// Bins geotagged samples into a greyscale map tile
#[derive(Parser)]
#[command(name = "map-preparer", version, about)]
struct ClArgs {
    #[command(subcommand)]
    command: Command,

    /// Verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Bin a sample file with one `amount y x` record per line
    Bin(BinArgs),
    /// Paint a raw grid dump as a PNG heatmap
    Render(RenderArgs),
}

#[derive(Args)]
struct BinArgs {
    /// Input sample file, plain or gzip/zlib compressed
    input: PathBuf,

    /// Output file; PGM and raw output go to stdout when omitted
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pgm)]
    format: OutputFormat,

    /// Colormap for PNG output
    #[arg(long, value_enum, default_value_t = Colormap::Grey)]
    colormap: Colormap,

    #[command(flatten)]
    binning: BinningArgs,
}

#[derive(Args)]
struct BinningArgs {
    /// Bounding box as `min_x,min_y,max_x,max_y` [default: reference tile]
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    /// Cells per side
    #[arg(long, default_value_t = TILE_RESOLUTION)]
    resolution: u32,

    /// Cell width in map units [default: reference tile's, or bbox width / resolution]
    #[arg(long)]
    cell_size: Option<f64>,

    /// Number of partitions [default: available cores]
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum, default_value_t = CliExecutionMode::ScopedThreads)]
    mode: CliExecutionMode,

    /// Intensity of an empty cell
    #[arg(long, default_value_t = BASE)]
    base: f64,

    /// Intensity span above `base` reached by the heaviest cell
    #[arg(long, default_value_t = RANGE)]
    range: f64,

    /// Exponent applied to the normalized weight
    #[arg(long, default_value_t = GAMMA)]
    gamma: f64,
}

impl BinningArgs {
    fn config(&self) -> BinningConfig {
        let bbox = self.bbox.unwrap_or(TILE_BBOX);
        let grid = match self.cell_size {
            Some(cell_size) => GridSpec::new(self.resolution, cell_size),
            None if self.bbox.is_none() && self.resolution == TILE_RESOLUTION => {
                GridSpec::new(TILE_RESOLUTION, TILE_CELL_SIZE)
            }
            None => GridSpec::from_extent(&bbox, self.resolution),
        };
        BinningConfig {
            bbox,
            grid,
            workers: self.workers.unwrap_or_else(default_workers),
            mode: self.mode.into(),
            normalize: NormalizeParams {
                base: self.base,
                range: self.range,
                gamma: self.gamma,
            },
        }
    }
}

#[derive(Args)]
struct RenderArgs {
    /// Grid written by `bin --format raw`
    input_grid: PathBuf,

    /// Output PNG file path
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Colormap::Jet)]
    colormap: Colormap,

    /// Base the grid was rendered with
    #[arg(long, default_value_t = BASE)]
    base: f64,

    /// Range the grid was rendered with
    #[arg(long, default_value_t = RANGE)]
    range: f64,
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let corners = s
        .split(',')
        .map(|c| c.trim().parse::<f64>().map_err(|e| format!("'{}': {}", c, e)))
        .collect::<Result<Vec<f64>, String>>()?;
    match corners[..] {
        [min_x, min_y, max_x, max_y] => Ok(BoundingBox::new(min_x, min_y, max_x, max_y)),
        _ => Err(format!("expected 4 comma-separated numbers, got {}", corners.len())),
    }
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClArgs::parse();
    init_tracing(args.verbosity);

    match args.command {
        Command::Bin(bin_args) => run_bin(&bin_args),
        Command::Render(render_args) => run_render(&render_args),
    }
}

fn run_bin(args: &BinArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.binning.config();
    config.validate()?;
    info!(
        "Binning into {} over {} with {} workers ({})",
        config.grid, config.bbox, config.workers, config.mode
    );

    let loaded = loader::load_samples(&args.input)?;
    if let Some(line) = loaded.stopped_at {
        warn!("Only the {} records before line {} are binned", loaded.samples.len(), line);
    }

    let (grid, elapsed) = timed(|| aggregate(&loaded.samples, &config));
    let grid = grid?;
    info!("Time: {:.0}ms", millis(elapsed));

    let image = match normalize(&grid, &config.normalize)? {
        Normalization::Scaled { grid, peak_weight } => {
            info!("Peak cell weight: {}", peak_weight);
            grid
        }
        Normalization::EmptyInput(grid) => {
            warn!("No samples inside {}; the tile is flat", config.bbox);
            grid
        }
    };
    write_output(args, &image, &config.normalize)
}

fn write_output(
    args: &BinArgs,
    image: &IntensityGrid,
    params: &NormalizeParams,
) -> Result<(), Box<dyn std::error::Error>> {
    match (args.format, &args.output) {
        (OutputFormat::Pgm, Some(path)) => pgm::write_pgm(image, params, BufWriter::new(File::create(path)?))?,
        (OutputFormat::Pgm, None) => pgm::write_pgm(image, params, BufWriter::new(std::io::stdout().lock()))?,
        (OutputFormat::Raw, Some(path)) => raw_grid::write_raw(image, BufWriter::new(File::create(path)?))?,
        (OutputFormat::Raw, None) => raw_grid::write_raw(image, BufWriter::new(std::io::stdout().lock()))?,
        (OutputFormat::Png, Some(path)) => heatmap::save_heatmap_png(image, params, path, args.colormap)?,
        (OutputFormat::Png, None) => return Err("--output is required for PNG output".into()),
    }
    if let Some(path) = &args.output {
        info!("Tile saved to: {}", path.display());
    }
    Ok(())
}

fn run_render(args: &RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading grid from: {}", args.input_grid.display());
    let image = raw_grid::read_raw(BufReader::new(File::open(&args.input_grid)?))?;
    info!("Loaded grid: {0}x{0} cells", image.resolution());

    let params = NormalizeParams {
        base: args.base,
        range: args.range,
        gamma: GAMMA,
    };
    params.validate()?;
    heatmap::save_heatmap_png(&image, &params, &args.output, args.colormap)?;
    info!("Heatmap saved to: {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin_args(argv: &[&str]) -> BinArgs {
        let mut full = vec!["map-preparer", "bin", "tile.csv"];
        full.extend_from_slice(argv);
        match ClArgs::try_parse_from(full).unwrap().command {
            Command::Bin(args) => args,
            Command::Render(_) => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        ClArgs::command().debug_assert();
    }

    #[test]
    fn defaults_reproduce_the_reference_tile() {
        let config = bin_args(&[]).binning.config();
        assert_eq!(config.bbox, TILE_BBOX);
        assert_eq!(config.grid, GridSpec::new(TILE_RESOLUTION, TILE_CELL_SIZE));
        assert_eq!(config.mode, ExecutionMode::ScopedThreads);
        assert_eq!(config.normalize, NormalizeParams::default());
        assert!(config.workers >= 1);
    }

    #[test]
    fn custom_bbox_derives_cell_size() {
        let args = bin_args(&["--bbox", "-10,-10,10,10", "--resolution", "4", "--workers", "3", "--mode", "rayon-pool"]);
        let config = args.binning.config();
        assert_eq!(config.bbox, BoundingBox::new(-10.0, -10.0, 10.0, 10.0));
        assert_eq!(config.grid, GridSpec::new(4, 5.0));
        assert_eq!(config.workers, 3);
        assert_eq!(config.mode, ExecutionMode::RayonPool);
    }

    #[test]
    fn explicit_cell_size_wins() {
        let config = bin_args(&["--bbox", "0,0,10,20", "--resolution", "2", "--cell-size", "5"]).binning.config();
        assert_eq!(config.grid, GridSpec::new(2, 5.0));
    }

    #[test]
    fn bbox_needs_four_numbers() {
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("1,2,3,x").is_err());
        assert_eq!(parse_bbox(" 1, 2 ,3,4").unwrap(), BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }
}
