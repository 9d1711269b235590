use super::error::BlockResult;
use super::PageId;

/// Block-addressable backing store for a page pool.
///
/// A provider persists fixed-size blocks under caller-visible ids. The pool
/// invokes these methods from a single flow of control, so implementations
/// need no internal synchronization; calls may block on I/O. Errors are
/// propagated to the pool's caller verbatim.
pub trait BlockProvider {
    /// Fill `buf` with the bytes previously persisted under `id`
    fn read_page(&mut self, id: PageId, buf: &mut [u8]) -> BlockResult<()>;

    /// Persist `buf` under `id`
    fn write_page(&mut self, id: PageId, buf: &[u8]) -> BlockResult<()>;

    /// Reserve a fresh block of `page_size` bytes.
    /// The returned id must never be zero.
    fn alloc_page(&mut self, page_size: usize) -> BlockResult<PageId>;

    /// Release a previously allocated block.
    /// Unused by the pool itself (record deletion is unsupported) but part
    /// of the provider surface for callers that manage page lifetimes.
    fn free_page(&mut self, id: PageId, page_size: usize) -> BlockResult<()>;
}
