use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinningError>;

/// Failures that abort an aggregation run. Samples outside the bounding box
/// and cells without samples are steady-state conditions and never show up
/// here.
#[derive(Debug, Error)]
pub enum BinningError {
    /// No cell index can be valid under this configuration.
    #[error("misconfigured grid: {0}")]
    MisconfiguredGrid(String),

    /// A partition task terminated abnormally; the whole run is invalid.
    #[error("worker {worker} failed: {message}")]
    WorkerFailure { worker: usize, message: String },

    /// The OS refused to start a worker thread.
    #[error("could not start worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A partial grid did not have the number of cells the merger expected.
    #[error("partial grid has {found} cells, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("invalid normalization parameters: {0}")]
    InvalidNormalization(String),
}
