use super::error::{RecordError, RecordResult};
use super::handle::SlotId;
use crate::block::PageId;
use crate::page::{PageFooter, SLOT_ENTRY_SIZE};

/// Zero-copy view of a page's slotted layout, operating directly on
/// buffer-pool frame bytes.
///
/// Records pack upward from byte 0 in insertion order. The slot directory
/// grows downward from the footer: slot `i`'s size field sits
/// `SLOT_ENTRY_SIZE * (i + 1)` bytes before the footer, so the youngest slot
/// has the lowest address. A slot's offset is the prefix sum of the sizes of
/// the slots inserted before it.
pub struct SlottedPage<B> {
    buf: B,
    /// Cached footer; rewritten into the buffer on every mutation
    footer: PageFooter,
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    /// Wrap an existing page buffer, validating the layout bookkeeping
    pub fn from_buffer(buf: B) -> RecordResult<Self> {
        let bytes = buf.as_ref();
        if bytes.len() < PageFooter::SIZE + SLOT_ENTRY_SIZE {
            return Err(RecordError::CorruptPage(format!(
                "page of {} bytes cannot hold a footer and a slot",
                bytes.len()
            )));
        }

        let footer = PageFooter::read_from(bytes);
        let dir_bytes = footer.records as u64 * SLOT_ENTRY_SIZE as u64;
        let fixed = PageFooter::SIZE as u64 + dir_bytes;
        if fixed > bytes.len() as u64 {
            return Err(RecordError::CorruptPage(format!(
                "slot directory of {} records overruns the page",
                footer.records
            )));
        }
        if footer.free_space as u64 > bytes.len() as u64 - fixed {
            return Err(RecordError::CorruptPage(format!(
                "free space {} exceeds the unused area",
                footer.free_space
            )));
        }

        Ok(Self { buf, footer })
    }

    pub fn records(&self) -> usize {
        self.footer.records as usize
    }

    pub fn free_space(&self) -> usize {
        self.footer.free_space as usize
    }

    pub fn next_page(&self) -> PageId {
        self.footer.next_page
    }

    pub fn prev_page(&self) -> PageId {
        self.footer.prev_page
    }

    /// True if a record of `len` bytes and its slot entry fit on this page
    pub fn fits(&self, len: usize) -> bool {
        self.free_space() >= len + SLOT_ENTRY_SIZE
    }

    /// Byte length of the record in `slot`
    pub fn slot_size(&self, slot: SlotId) -> RecordResult<usize> {
        if slot >= self.records() {
            return Err(RecordError::SlotOutOfRange {
                slot,
                records: self.records(),
            });
        }
        Ok(self.read_slot_entry(slot))
    }

    /// Resolve `slot` to its (offset, size) byte range by prefix-summing
    /// slot sizes in insertion order
    pub fn locate(&self, slot: SlotId) -> RecordResult<(usize, usize)> {
        if slot >= self.records() {
            return Err(RecordError::SlotOutOfRange {
                slot,
                records: self.records(),
            });
        }

        let mut offset = 0;
        for i in 0..slot {
            offset += self.read_slot_entry(i);
        }
        let size = self.read_slot_entry(slot);

        // The range must stay inside the record area
        let record_area_end = self.slot_dir_start() - self.free_space();
        if offset + size > record_area_end {
            return Err(RecordError::CorruptPage(format!(
                "slot {slot} range {}..{} overruns the record area",
                offset,
                offset + size
            )));
        }

        Ok((offset, size))
    }

    /// Bytes of the record in `slot`
    pub fn record(&self, slot: SlotId) -> RecordResult<&[u8]> {
        let (offset, size) = self.locate(slot)?;
        Ok(&self.buf.as_ref()[offset..offset + size])
    }

    fn slot_dir_start(&self) -> usize {
        self.buf.as_ref().len() - PageFooter::SIZE - self.records() * SLOT_ENTRY_SIZE
    }

    fn slot_entry_pos(&self, slot: SlotId) -> usize {
        self.buf.as_ref().len() - PageFooter::SIZE - SLOT_ENTRY_SIZE * (slot + 1)
    }

    fn read_slot_entry(&self, slot: SlotId) -> usize {
        let pos = self.slot_entry_pos(slot);
        let bytes = self.buf.as_ref();
        u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]) as usize
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    /// Format `buf` as an empty page and wrap it
    pub fn init(mut buf: B) -> RecordResult<Self> {
        let bytes = buf.as_mut();
        if bytes.len() <= PageFooter::SIZE + SLOT_ENTRY_SIZE {
            return Err(RecordError::CorruptPage(format!(
                "page of {} bytes too small to format",
                bytes.len()
            )));
        }
        if bytes.len() > u32::MAX as usize {
            return Err(RecordError::CorruptPage(format!(
                "page of {} bytes exceeds the on-page size field",
                bytes.len()
            )));
        }

        bytes.fill(0);
        let footer = PageFooter::new_empty(bytes.len());
        footer.write_to(bytes);

        Ok(Self { buf, footer })
    }

    /// Append a record, returning its slot and byte offset.
    ///
    /// The bytes land at the end of the record area and the new slot entry
    /// immediately before the existing directory; existing offsets are never
    /// rewritten.
    pub fn append(&mut self, data: &[u8]) -> RecordResult<(SlotId, usize)> {
        if !self.fits(data.len()) {
            return Err(RecordError::PageFull);
        }

        let slot = self.records();
        let dir_start = self.slot_dir_start();
        let offset = dir_start - self.free_space();
        let entry_pos = dir_start - SLOT_ENTRY_SIZE;

        let bytes = self.buf.as_mut();
        bytes[offset..offset + data.len()].copy_from_slice(data);
        bytes[entry_pos..entry_pos + SLOT_ENTRY_SIZE]
            .copy_from_slice(&(data.len() as u32).to_le_bytes());

        self.footer.records += 1;
        self.footer.free_space -= (data.len() + SLOT_ENTRY_SIZE) as u32;
        self.write_footer();

        Ok((slot, offset))
    }

    /// Link this page to its successor in the chain
    pub fn set_next_page(&mut self, id: PageId) {
        self.footer.next_page = id;
        self.write_footer();
    }

    fn write_footer(&mut self) {
        let footer = self.footer;
        footer.write_to(self.buf.as_mut());
    }
}
