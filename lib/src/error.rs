use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("resample threshold {threshold} exceeds the maximum of {max} points")]
    ThresholdTooLarge { threshold: usize, max: usize },
    #[error("{0} log contains no data rows")]
    NoData(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("downsampling task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
