use thiserror::Error;

use crate::block::{BlockError, PageId};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Block provider error: {0}")]
    Block(#[from] BlockError),

    #[error("Buffer pool is full")]
    PoolFull,

    #[error("No unpinned dirty entry for page {0}")]
    PageNotPresent(PageId),

    #[error("Page id 0 is reserved")]
    NullPageId,

    #[error("Page size {0} too small for a footer and one slot")]
    PageSizeTooSmall(usize),

    #[error("Page size {0} exceeds the on-page size field")]
    PageSizeTooLarge(usize),
}

pub type PoolResult<T> = Result<T, PoolError>;
