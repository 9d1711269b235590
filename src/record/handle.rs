use crate::block::PageId;

/// Slot ordinal within a page
pub type SlotId = usize;

/// Physical locator for a record: page, slot, and byte range within the
/// page. Stable for the life of the record, since pages are never compacted
/// and record offsets are never rewritten. Equality is bytewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub page_id: PageId,
    pub slot_id: SlotId,
    /// Byte distance from the page start to the record's first byte
    pub offset: usize,
    pub size: usize,
}

/// Locator for one field inside a record whose body starts with a
/// size-prefix table. `offset` is relative to the first byte after that
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    pub page_id: PageId,
    pub slot_id: SlotId,
    pub field_index: usize,
    pub offset: usize,
    pub size: usize,
}
