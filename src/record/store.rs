use super::error::{RecordError, RecordResult};
use super::handle::{FieldHandle, RecordHandle, SlotId};
use super::page::SlottedPage;
use crate::block::{BlockProvider, NULL_PAGE_ID, PageId};
use crate::page::{PageFooter, SLOT_ENTRY_SIZE};
use crate::pool::{PageManager, PinnedPage};

/// Append `data` as a new record on the chain starting at `first_page`.
///
/// The chain is walked through `next_page` links until a page with room is
/// found; when the tail is full a fresh page is allocated and linked behind
/// it. The tail's footer gains its successor only after the allocation has
/// succeeded, so a failed allocation leaves every visited page consistent.
/// Records larger than an empty page are rejected up front without touching
/// any page; spanning them across pages is unsupported.
pub fn add_record<P: BlockProvider>(
    mgr: &PageManager<P>,
    first_page: PageId,
    data: &[u8],
) -> RecordResult<RecordHandle> {
    // TODO: span records larger than a page across the chain
    let max = mgr.page_data_size() - SLOT_ENTRY_SIZE;
    if data.len() > max {
        return Err(RecordError::RecordTooLarge {
            size: data.len(),
            max,
        });
    }

    let mut page = mgr.pin_page(first_page)?;
    loop {
        let (fits, next_page) = {
            let buf = page.data();
            let slotted = SlottedPage::from_buffer(&buf[..])?;
            (slotted.fits(data.len()), slotted.next_page())
        };

        if !fits {
            if next_page == NULL_PAGE_ID {
                // Grow the chain behind the current tail
                let next = mgr.new_pinned_page()?;
                {
                    let mut buf = page.data_mut();
                    let mut slotted = SlottedPage::from_buffer(&mut buf[..])?;
                    slotted.set_next_page(next.id());
                }
                page.mark_dirty();
                page = next;
            } else {
                page = mgr.pin_page(next_page)?;
            }
            continue;
        }

        let (slot, offset) = {
            let mut buf = page.data_mut();
            let mut slotted = SlottedPage::from_buffer(&mut buf[..])?;
            slotted.append(data)?
        };
        page.mark_dirty();
        tracing::trace!("add_record: {} bytes at page {} slot {slot}", data.len(), page.id());

        return Ok(RecordHandle {
            page_id: page.id(),
            slot_id: slot,
            offset,
            size: data.len(),
        });
    }
}

/// Resolve `slot` on a pinned page to a record handle
pub fn get_record<P: BlockProvider>(
    page: &PinnedPage<'_, P>,
    slot: SlotId,
) -> RecordResult<RecordHandle> {
    let buf = page.data();
    let slotted = SlottedPage::from_buffer(&buf[..])?;
    let (offset, size) = slotted.locate(slot)?;

    Ok(RecordHandle {
        page_id: page.id(),
        slot_id: slot,
        offset,
        size,
    })
}

/// Copy a record's bytes into `out`, returning the number of bytes copied.
/// An `out` shorter than the record yields a prefix; the count makes the
/// truncation visible.
pub fn read_record<P: BlockProvider>(
    page: &PinnedPage<'_, P>,
    handle: &RecordHandle,
    out: &mut [u8],
) -> RecordResult<usize> {
    if handle.page_id != page.id() {
        return Err(RecordError::PageMismatch {
            handle: handle.page_id,
            page: page.id(),
        });
    }

    let buf = page.data();
    check_record_range(&buf, handle)?;

    let n = out.len().min(handle.size);
    out[..n].copy_from_slice(&buf[handle.offset..handle.offset + n]);
    Ok(n)
}

/// Resolve `slot` and copy its record into `out` in one step, returning the
/// handle. Truncation behaves as in [`read_record`].
pub fn read_record_at<P: BlockProvider>(
    page: &PinnedPage<'_, P>,
    slot: SlotId,
    out: &mut [u8],
) -> RecordResult<RecordHandle> {
    let handle = get_record(page, slot)?;
    read_record(page, &handle, out)?;
    Ok(handle)
}

/// Resolve one field of a record whose body is laid out as a size-prefix
/// table of `field_count` entries followed by the field bytes.
///
/// This only interprets an already-written layout; encoding fields into a
/// record body is the caller's concern. The returned offset is relative to
/// the first byte after the table.
pub fn get_field<P: BlockProvider>(
    page: &PinnedPage<'_, P>,
    handle: &RecordHandle,
    field_count: usize,
    index: usize,
) -> RecordResult<FieldHandle> {
    if handle.page_id != page.id() {
        return Err(RecordError::PageMismatch {
            handle: handle.page_id,
            page: page.id(),
        });
    }
    if index >= field_count {
        return Err(RecordError::FieldOutOfRange {
            index,
            count: field_count,
        });
    }

    let buf = page.data();
    check_record_range(&buf, handle)?;
    let record = &buf[handle.offset..handle.offset + handle.size];

    let table_len = field_count * SLOT_ENTRY_SIZE;
    if table_len > record.len() {
        return Err(RecordError::CorruptPage(format!(
            "field table of {field_count} entries overruns a {} byte record",
            record.len()
        )));
    }

    let entry = |i: usize| {
        let pos = i * SLOT_ENTRY_SIZE;
        u32::from_le_bytes([record[pos], record[pos + 1], record[pos + 2], record[pos + 3]])
            as usize
    };

    let mut offset = 0;
    for i in 0..index {
        offset += entry(i);
    }
    let size = entry(index);

    if table_len + offset + size > record.len() {
        return Err(RecordError::CorruptPage(format!(
            "field {index} range {}..{} overruns the record body",
            offset,
            offset + size
        )));
    }

    Ok(FieldHandle {
        page_id: handle.page_id,
        slot_id: handle.slot_id,
        field_index: index,
        offset,
        size,
    })
}

/// Streaming iterator over every record in the chain starting at
/// `first_page`, in page-then-slot order. One page is pinned at a time.
pub fn scan<P: BlockProvider>(mgr: &PageManager<P>, first_page: PageId) -> RecordScan<'_, P> {
    RecordScan {
        mgr,
        page_id: first_page,
        slot: 0,
        done: false,
    }
}

/// Iterator state for [`scan`]; yields each record's handle and a copy of
/// its bytes, stopping at the end of the chain or the first error.
pub struct RecordScan<'a, P: BlockProvider> {
    mgr: &'a PageManager<P>,
    page_id: PageId,
    slot: SlotId,
    done: bool,
}

impl<P: BlockProvider> Iterator for RecordScan<'_, P> {
    type Item = RecordResult<(RecordHandle, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.page_id == NULL_PAGE_ID {
                self.done = true;
                return None;
            }

            let page = match self.mgr.pin_page(self.page_id) {
                Ok(page) => page,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            };

            let buf = page.data();
            let slotted = match SlottedPage::from_buffer(&buf[..]) {
                Ok(slotted) => slotted,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };

            if self.slot < slotted.records() {
                let (offset, size) = match slotted.locate(self.slot) {
                    Ok(range) => range,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                };

                let handle = RecordHandle {
                    page_id: self.page_id,
                    slot_id: self.slot,
                    offset,
                    size,
                };
                let bytes = buf[offset..offset + size].to_vec();
                self.slot += 1;
                return Some(Ok((handle, bytes)));
            }

            self.page_id = slotted.next_page();
            self.slot = 0;
        }
    }
}

/// Guard a handle's byte range against the page's record area
fn check_record_range(buf: &[u8], handle: &RecordHandle) -> RecordResult<()> {
    let data_end = buf.len() - PageFooter::SIZE;
    if handle.offset + handle.size > data_end {
        return Err(RecordError::CorruptPage(format!(
            "record range {}..{} overruns the page",
            handle.offset,
            handle.offset + handle.size
        )));
    }
    Ok(())
}
