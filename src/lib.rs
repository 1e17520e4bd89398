pub mod common;
pub mod error;
pub mod storage;
pub mod tuple;

pub use common::{BlockId, Handle, RecordId};
pub use error::{Result, StorageError};
pub use storage::block_file::BlockFile;
pub use storage::block_store::BlockStore;
pub use storage::file_manager::FileManager;
pub use storage::heap::table::Table;
pub use storage::page::Page;
