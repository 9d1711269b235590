use std::io;
use thiserror::Error;

use super::PageId;

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("Unknown page id: {0}")]
    UnknownPage(PageId),

    #[error("Page id space exhausted")]
    IdSpaceExhausted,
}

pub type BlockResult<T> = Result<T, BlockError>;
