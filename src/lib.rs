pub mod cli;
pub mod config;
pub mod history;
pub mod io;
pub mod processing;
pub mod reconstruct;
pub mod utils;

pub use crate::processing::{run_pipeline, ProcessingStats, RecordProcessor};
pub use crate::reconstruct::{
    reconstruct_composite, reconstruct_line, reconstruct_point, Reconstruction,
    ReconstructionError,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaybackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Reconstruction error: {0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WaybackError>;
