use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbexError {
    #[error("Input directory does not exist: {0:?}")]
    InputDirMissing(PathBuf),
    #[error("No files matching {extensions:?} in {dir:?}")]
    NoMatchingFiles {
        dir: PathBuf,
        extensions: Vec<String>,
    },
    #[error("Invalid scheme {0}: {1}")]
    InvalidScheme(String, String),
    #[error("Unknown scheme: {0}")]
    UnknownScheme(String),
    #[error("Could not read container {0:?}: {1}")]
    ContainerRead(PathBuf, std::io::Error),
    #[error("Could not write sub-file {0:?}: {1}")]
    SubFileWrite(PathBuf, std::io::Error),
    #[error("Range {start}+{length} exceeds container of {len} bytes")]
    RangeOutOfBounds { start: usize, length: usize, len: usize },
}
