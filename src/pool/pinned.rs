use std::cell::{Cell, Ref, RefMut};

use super::manager::PageManager;
use crate::block::{BlockProvider, PageId};
use crate::page::PageFooter;

/// Scoped pin on a pool frame.
///
/// While the handle lives its frame cannot be evicted; dropping it releases
/// the pin and folds the handle's dirty flag into the pool's dirty tracking.
/// Handles are move-only: moving one transfers the unpin obligation. Several
/// handles may pin the same page and share its frame bytes.
pub struct PinnedPage<'a, P: BlockProvider> {
    mgr: &'a PageManager<P>,
    page_id: PageId,
    pool_index: usize,
    dirty: Cell<bool>,
}

impl<'a, P: BlockProvider> PinnedPage<'a, P> {
    pub(crate) fn new(mgr: &'a PageManager<P>, page_id: PageId, pool_index: usize) -> Self {
        Self {
            mgr,
            page_id,
            pool_index,
            dirty: Cell::new(false),
        }
    }

    pub fn id(&self) -> PageId {
        self.page_id
    }

    /// Page length in bytes
    pub fn size(&self) -> usize {
        self.mgr.page_size()
    }

    pub fn dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Record that the frame bytes were modified. Callers pair this with
    /// `data_mut()`; the flag reaches the pool when the pin is released.
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Shared view of the frame bytes.
    ///
    /// Panics if a mutable view of the pool is live; keep borrows scoped.
    pub fn data(&self) -> Ref<'_, [u8]> {
        self.mgr.frame(self.pool_index)
    }

    /// Exclusive view of the frame bytes. Does not set the dirty flag.
    ///
    /// Panics if any other view of the pool is live; keep borrows scoped.
    pub fn data_mut(&self) -> RefMut<'_, [u8]> {
        self.mgr.frame_mut(self.pool_index)
    }

    /// Decoded copy of the page footer
    pub fn footer(&self) -> PageFooter {
        PageFooter::read_from(&self.data())
    }
}

impl<P: BlockProvider> Drop for PinnedPage<'_, P> {
    fn drop(&mut self) {
        self.mgr.unpin(self.page_id, self.dirty.get());
    }
}
