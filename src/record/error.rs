use thiserror::Error;

use super::handle::SlotId;
use crate::block::PageId;
use crate::pool::PoolError;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Buffer pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Record of {size} bytes exceeds page capacity of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Slot {slot} out of range: page has {records} records")]
    SlotOutOfRange { slot: SlotId, records: usize },

    #[error("Handle for page {handle} used with page {page}")]
    PageMismatch { handle: PageId, page: PageId },

    #[error("Field {index} out of range: record has {count} fields")]
    FieldOutOfRange { index: usize, count: usize },

    #[error("Page is full")]
    PageFull,

    #[error("Corrupt page layout: {0}")]
    CorruptPage(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
