pub mod block_file;
pub mod block_store;
pub mod file_manager;
pub mod heap;
pub mod page;
pub(in crate::storage) mod utils;
