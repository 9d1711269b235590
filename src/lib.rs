//! Embeddable paged storage core: a pinned buffer pool over pluggable block
//! providers, with a slotted-page record store layered on top.

pub mod block;
pub mod page;
pub mod pool;
pub mod record;

pub use block::{
    BlockError, BlockProvider, BlockResult, FileProvider, MemoryProvider, NULL_PAGE_ID, PageId,
};
pub use page::{PageFooter, SLOT_ENTRY_SIZE};
pub use pool::{PageManager, PinnedPage, PoolError, PoolResult};
pub use record::{
    FieldHandle, RecordError, RecordHandle, RecordResult, RecordScan, SlotId, SlottedPage,
    add_record, get_field, get_record, read_record, read_record_at, scan,
};
