use std::cell::{Ref, RefCell, RefMut};

use super::error::{PoolError, PoolResult};
use super::pinned::PinnedPage;
use crate::block::{BlockProvider, NULL_PAGE_ID, PageId};
use crate::page::{PageFooter, SLOT_ENTRY_SIZE};

/// Bookkeeping for one pool frame
#[derive(Debug, Clone, Copy)]
struct DirEntry {
    /// Page occupying the frame; 0 for a never-used frame
    page_id: PageId,
    /// Frame position in the pool buffer (fixed for the entry's lifetime)
    pool_index: usize,
    /// Outstanding pins; the frame may only be evicted at 0
    pin_count: usize,
    /// Frame bytes differ from the last successful write-back
    dirty: bool,
}

/// Buffer pool of page-sized frames over a block provider.
///
/// A fixed number of frames is allocated up front; pages are loaded on
/// demand, pinned while in use, and written back when a dirty frame is
/// evicted, explicitly flushed, or the manager is dropped. Eviction reuses
/// the first unpinned frame in the directory; loaded entries rotate to the
/// directory's end, so stale frames gravitate to the front and are picked
/// first, a cheap approximation of LRU with no semantic contract.
///
/// Pin handles borrow the manager immutably (several pins must coexist), so
/// all state lives behind `RefCell`s. Frame bytes are exposed through
/// `Ref`/`RefMut` guards; single-threaded callers keep those borrows scoped
/// and never observe a conflict.
pub struct PageManager<P: BlockProvider> {
    page_size: usize,
    pool: RefCell<Box<[u8]>>,
    directory: RefCell<Vec<DirEntry>>,
    provider: RefCell<P>,
}

impl<P: BlockProvider> PageManager<P> {
    /// Create a manager with `pool_capacity` frames of `page_size` bytes.
    ///
    /// `page_size` must leave room for a footer plus at least one slot
    /// entry, and must be representable in the footer's u32 fields.
    pub fn new(pool_capacity: usize, page_size: usize, provider: P) -> PoolResult<Self> {
        if page_size <= PageFooter::SIZE + SLOT_ENTRY_SIZE {
            return Err(PoolError::PageSizeTooSmall(page_size));
        }
        if page_size > u32::MAX as usize {
            return Err(PoolError::PageSizeTooLarge(page_size));
        }

        let directory = (0..pool_capacity)
            .map(|i| DirEntry {
                page_id: NULL_PAGE_ID,
                pool_index: i,
                pin_count: 0,
                dirty: false,
            })
            .collect();

        Ok(Self {
            page_size,
            pool: RefCell::new(vec![0u8; pool_capacity * page_size].into_boxed_slice()),
            directory: RefCell::new(directory),
            provider: RefCell::new(provider),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Bytes per page usable for records and the slot directory
    pub fn page_data_size(&self) -> usize {
        self.page_size - PageFooter::SIZE
    }

    /// Number of frames in the pool
    pub fn capacity(&self) -> usize {
        self.directory.borrow().len()
    }

    /// Pin `id` into the pool, loading it from the provider on a miss.
    ///
    /// Re-pinning a resident page increments its pin count and shares the
    /// frame. On a miss the first unpinned frame is reclaimed (written back
    /// first if dirty); if every frame is pinned the pool is full. A failed
    /// read rolls the reclaimed frame back to its never-used state.
    pub fn pin_page(&self, id: PageId) -> PoolResult<PinnedPage<'_, P>> {
        if id == NULL_PAGE_ID {
            return Err(PoolError::NullPageId);
        }

        {
            let mut dir = self.directory.borrow_mut();
            if let Some(pos) = dir.iter().position(|e| e.page_id == id) {
                dir[pos].pin_count += 1;
                tracing::trace!("pin_page({id}): hit, pin_count = {}", dir[pos].pin_count);
                return Ok(PinnedPage::new(self, id, dir[pos].pool_index));
            }
        }

        tracing::trace!("pin_page({id}): miss");
        let pos = self.reserve_entry()?;
        let pool_index = {
            let mut dir = self.directory.borrow_mut();
            dir[pos].page_id = id;
            dir[pos].pool_index
        };

        let read = {
            let mut pool = self.pool.borrow_mut();
            let frame = &mut pool[pool_index * self.page_size..][..self.page_size];
            self.provider.borrow_mut().read_page(id, frame)
        };
        if let Err(err) = read {
            // Roll the reservation back to an empty frame
            let mut dir = self.directory.borrow_mut();
            dir[pos].page_id = NULL_PAGE_ID;
            dir[pos].pin_count = 0;
            return Err(err.into());
        }

        self.touch(pos);
        Ok(PinnedPage::new(self, id, pool_index))
    }

    /// Allocate a fresh page from the provider and pin it.
    ///
    /// The frame is zeroed and formatted with an empty footer, so the page
    /// starts dirty: it holds real bytes the backing store has never seen.
    pub fn new_pinned_page(&self) -> PoolResult<PinnedPage<'_, P>> {
        let pos = self.reserve_entry()?;

        let id = match self.provider.borrow_mut().alloc_page(self.page_size) {
            Ok(id) => id,
            Err(err) => {
                self.directory.borrow_mut()[pos].pin_count = 0;
                return Err(err.into());
            }
        };
        if id == NULL_PAGE_ID {
            // Provider broke the non-zero id contract
            self.directory.borrow_mut()[pos].pin_count = 0;
            return Err(PoolError::NullPageId);
        }
        tracing::debug!("new_pinned_page: allocated page {id}");

        let pool_index = {
            let mut dir = self.directory.borrow_mut();
            dir[pos].page_id = id;
            dir[pos].dirty = true;
            dir[pos].pool_index
        };

        {
            let mut pool = self.pool.borrow_mut();
            let frame = &mut pool[pool_index * self.page_size..][..self.page_size];
            frame.fill(0);
            PageFooter::new_empty(self.page_size).write_to(frame);
        }

        self.touch(pos);
        let page = PinnedPage::new(self, id, pool_index);
        page.mark_dirty();
        Ok(page)
    }

    /// Write back the unpinned dirty frame holding `id`.
    ///
    /// The dirty bit is cleared only when the provider write succeeds.
    /// Errors if no unpinned dirty frame matches `id`.
    pub fn flush_page(&self, id: PageId) -> PoolResult<()> {
        let (pos, pool_index) = {
            let dir = self.directory.borrow();
            match dir
                .iter()
                .position(|e| e.page_id == id && e.pin_count == 0 && e.dirty)
            {
                Some(pos) => (pos, dir[pos].pool_index),
                None => return Err(PoolError::PageNotPresent(id)),
            }
        };

        self.write_back(id, pool_index)?;
        self.directory.borrow_mut()[pos].dirty = false;
        Ok(())
    }

    /// Write back every unpinned dirty frame, stopping at the first error.
    /// Frames written before the error have their dirty bits cleared.
    pub fn flush_free_pages(&self) -> PoolResult<()> {
        let capacity = self.directory.borrow().len();
        for pos in 0..capacity {
            let (page_id, pool_index, flush) = {
                let dir = self.directory.borrow();
                let e = &dir[pos];
                (e.page_id, e.pool_index, e.pin_count == 0 && e.dirty)
            };
            if !flush {
                continue;
            }
            self.write_back(page_id, pool_index)?;
            self.directory.borrow_mut()[pos].dirty = false;
        }
        Ok(())
    }

    /// Check whether `id` currently occupies a frame
    pub fn is_page_cached(&self, id: PageId) -> bool {
        id != NULL_PAGE_ID && self.directory.borrow().iter().any(|e| e.page_id == id)
    }

    /// Number of frames holding a page
    pub fn cached_page_count(&self) -> usize {
        self.directory
            .borrow()
            .iter()
            .filter(|e| e.page_id != NULL_PAGE_ID)
            .count()
    }

    /// Number of frames whose bytes have not reached the provider
    pub fn dirty_page_count(&self) -> usize {
        self.directory.borrow().iter().filter(|e| e.dirty).count()
    }

    /// Number of frames with outstanding pins
    pub fn pinned_page_count(&self) -> usize {
        self.directory.borrow().iter().filter(|e| e.pin_count > 0).count()
    }

    /// Write one frame's bytes to the provider
    fn write_back(&self, page_id: PageId, pool_index: usize) -> PoolResult<()> {
        tracing::debug!("write_back(page = {page_id})");
        let pool = self.pool.borrow();
        let frame = &pool[pool_index * self.page_size..][..self.page_size];
        self.provider.borrow_mut().write_page(page_id, frame)?;
        Ok(())
    }

    /// Claim the first unpinned frame for a load or allocation, writing its
    /// previous contents back if dirty. The entry is returned already
    /// reserved (pin_count = 1); a failed write-back leaves it untouched.
    fn reserve_entry(&self) -> PoolResult<usize> {
        let (pos, page_id, pool_index, dirty) = {
            let dir = self.directory.borrow();
            match dir.iter().position(|e| e.pin_count == 0) {
                Some(pos) => (pos, dir[pos].page_id, dir[pos].pool_index, dir[pos].dirty),
                None => return Err(PoolError::PoolFull),
            }
        };

        if dirty {
            self.write_back(page_id, pool_index)?;
            self.directory.borrow_mut()[pos].dirty = false;
        }

        self.directory.borrow_mut()[pos].pin_count = 1;
        Ok(pos)
    }

    /// Rotate an entry to the directory's end so the least recently loaded
    /// frames sit at the front of the eviction scan
    fn touch(&self, pos: usize) {
        let mut dir = self.directory.borrow_mut();
        let entry = dir.remove(pos);
        dir.push(entry);
    }

    /// Release one pin, folding the handle's dirty flag into the entry
    pub(crate) fn unpin(&self, id: PageId, dirty: bool) {
        let mut dir = self.directory.borrow_mut();
        if let Some(entry) = dir.iter_mut().find(|e| e.page_id == id) {
            if dirty {
                entry.dirty = true;
            }
            entry.pin_count = entry.pin_count.saturating_sub(1);
        }
    }

    pub(crate) fn frame(&self, pool_index: usize) -> Ref<'_, [u8]> {
        Ref::map(self.pool.borrow(), |pool| {
            &pool[pool_index * self.page_size..][..self.page_size]
        })
    }

    pub(crate) fn frame_mut(&self, pool_index: usize) -> RefMut<'_, [u8]> {
        RefMut::map(self.pool.borrow_mut(), |pool| {
            &mut pool[pool_index * self.page_size..][..self.page_size]
        })
    }
}

impl<P: BlockProvider> Drop for PageManager<P> {
    fn drop(&mut self) {
        // Last-chance write-back of every dirty frame, pinned or not.
        // There is no channel to report errors here.
        let page_size = self.page_size;
        let directory = self.directory.get_mut();
        let pool = self.pool.get_mut();
        let provider = self.provider.get_mut();

        for entry in directory.iter() {
            if entry.dirty {
                let frame = &pool[entry.pool_index * page_size..][..page_size];
                let _ = provider.write_page(entry.page_id, frame);
            }
        }
    }
}
