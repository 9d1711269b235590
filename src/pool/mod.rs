mod error;
mod manager;
mod pinned;

pub use error::{PoolError, PoolResult};
pub use manager::PageManager;
pub use pinned::PinnedPage;
