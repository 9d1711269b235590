use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::error::{BlockError, BlockResult};
use super::provider::BlockProvider;
use super::{NULL_PAGE_ID, PageId};

/// Persistent block storage backed by a single file.
///
/// Page `n` lives at byte offset `(n - 1) * page_size`; id 0 is reserved.
/// Fresh ids are handed out past the current end of the file and the file is
/// extended lazily on write. The free list is kept in memory only, so freed
/// ids are recycled within one session but not across reopen.
pub struct FileProvider {
    file: File,
    page_size: usize,
    next_page: PageId,
    free_list: Vec<PageId>,
}

impl FileProvider {
    /// Create a new backing file
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> BlockResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            return Err(BlockError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        tracing::debug!("created backing file {}", path.display());
        Ok(Self {
            file,
            page_size,
            next_page: 1,
            free_list: Vec::new(),
        })
    }

    /// Open an existing backing file
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> BlockResult<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| BlockError::FileNotFound(path.display().to_string()))?;

        // Resume allocation past whatever the file already holds
        let len = file.metadata()?.len();
        let pages = len.div_ceil(page_size as u64) as PageId;

        Ok(Self {
            file,
            page_size,
            next_page: pages + 1,
            free_list: Vec::new(),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages the file currently holds
    pub fn page_count(&self) -> BlockResult<usize> {
        let len = self.file.metadata()?.len();
        Ok(len.div_ceil(self.page_size as u64) as usize)
    }

    /// Flush OS buffers so everything written so far reaches the disk
    pub fn sync(&mut self) -> BlockResult<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn check_len(&self, len: usize) -> BlockResult<()> {
        if len != self.page_size {
            return Err(BlockError::InvalidPageSize {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn page_offset(&self, id: PageId) -> u64 {
        (id as u64 - 1) * self.page_size as u64
    }
}

impl BlockProvider for FileProvider {
    fn read_page(&mut self, id: PageId, buf: &mut [u8]) -> BlockResult<()> {
        self.check_len(buf.len())?;
        if id == NULL_PAGE_ID {
            return Err(BlockError::UnknownPage(id));
        }

        self.file.seek(SeekFrom::Start(self.page_offset(id)))?;
        let bytes_read = self.file.read(buf)?;

        // Short reads happen past the end of the file; the tail reads as zeros
        if bytes_read < self.page_size {
            buf[bytes_read..].fill(0);
        }

        Ok(())
    }

    fn write_page(&mut self, id: PageId, buf: &[u8]) -> BlockResult<()> {
        self.check_len(buf.len())?;
        if id == NULL_PAGE_ID {
            return Err(BlockError::UnknownPage(id));
        }

        let offset = self.page_offset(id);
        let required = offset + self.page_size as u64;

        // Extend the file so the write lands inside it
        let current = self.file.metadata()?.len();
        if current < required {
            self.file.set_len(required)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        // No sync here; the OS batches writes until sync() is called

        Ok(())
    }

    fn alloc_page(&mut self, page_size: usize) -> BlockResult<PageId> {
        self.check_len(page_size)?;
        if let Some(id) = self.free_list.pop() {
            return Ok(id);
        }
        if self.next_page == PageId::MAX {
            return Err(BlockError::IdSpaceExhausted);
        }
        let id = self.next_page;
        self.next_page += 1;
        tracing::debug!("alloc_page -> {id}");
        Ok(id)
    }

    fn free_page(&mut self, id: PageId, page_size: usize) -> BlockResult<()> {
        self.check_len(page_size)?;
        if id == NULL_PAGE_ID || id >= self.next_page {
            return Err(BlockError::UnknownPage(id));
        }
        self.free_list.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE_SIZE: usize = 128;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_create_file() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");

        let provider = FileProvider::create(&path, PAGE_SIZE);
        assert!(provider.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_create_file_already_exists() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");

        FileProvider::create(&path, PAGE_SIZE).unwrap();
        let result = FileProvider::create(&path, PAGE_SIZE);
        assert!(matches!(result, Err(BlockError::FileAlreadyExists(_))));
    }

    #[test]
    fn test_open_nonexistent_file() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("missing.db");

        let result = FileProvider::open(&path, PAGE_SIZE);
        assert!(matches!(result, Err(BlockError::FileNotFound(_))));
    }

    #[test]
    fn test_read_write_round_trip() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");
        let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();

        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = 42;
        page[100] = 99;
        page[PAGE_SIZE - 1] = 255;

        let id = provider.alloc_page(PAGE_SIZE).unwrap();
        provider.write_page(id, &page).unwrap();

        let mut out = vec![0u8; PAGE_SIZE];
        provider.read_page(id, &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_read_past_end_is_zeroed() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");
        let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();

        let mut out = vec![0xFFu8; PAGE_SIZE];
        provider.read_page(10, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_extends_file() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");
        let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();

        let page = vec![7u8; PAGE_SIZE];
        provider.write_page(5, &page).unwrap();
        assert_eq!(provider.page_count().unwrap(), 5);

        // The gap pages read back as zeros
        let mut out = vec![0xFFu8; PAGE_SIZE];
        provider.read_page(2, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alloc_resumes_after_reopen() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");

        {
            let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();
            let a = provider.alloc_page(PAGE_SIZE).unwrap();
            let b = provider.alloc_page(PAGE_SIZE).unwrap();
            provider.write_page(a, &vec![1u8; PAGE_SIZE]).unwrap();
            provider.write_page(b, &vec![2u8; PAGE_SIZE]).unwrap();
            provider.sync().unwrap();
        }

        let mut provider = FileProvider::open(&path, PAGE_SIZE).unwrap();
        let c = provider.alloc_page(PAGE_SIZE).unwrap();
        assert_eq!(c, 3);

        let mut out = vec![0u8; PAGE_SIZE];
        provider.read_page(2, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_free_recycles_id() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");
        let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();

        let a = provider.alloc_page(PAGE_SIZE).unwrap();
        provider.free_page(a, PAGE_SIZE).unwrap();
        assert_eq!(provider.alloc_page(PAGE_SIZE).unwrap(), a);

        let result = provider.free_page(99, PAGE_SIZE);
        assert!(matches!(result, Err(BlockError::UnknownPage(99))));
    }

    #[test]
    fn test_invalid_buffer_size() {
        let temp_dir = setup_test_dir();
        let path = temp_dir.path().join("store.db");
        let mut provider = FileProvider::create(&path, PAGE_SIZE).unwrap();

        let mut small = vec![0u8; PAGE_SIZE - 1];
        let result = provider.read_page(1, &mut small);
        assert!(matches!(result, Err(BlockError::InvalidPageSize { .. })));

        let large = vec![0u8; PAGE_SIZE + 1];
        let result = provider.write_page(1, &large);
        assert!(matches!(result, Err(BlockError::InvalidPageSize { .. })));
    }
}
