mod error;
mod handle;
mod page;
mod store;

pub use error::{RecordError, RecordResult};
pub use handle::{FieldHandle, RecordHandle, SlotId};
pub use page::SlottedPage;
pub use store::{
    RecordScan, add_record, get_field, get_record, read_record, read_record_at, scan,
};
