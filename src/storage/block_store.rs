use crate::common::BlockId;
use crate::error::Result;

/// A store of fixed-size blocks grouped into named files.
/// Blocks of a file are numbered from 1 without gaps, a new block is always appended at the end.
pub trait BlockStore {
    /// Size in bytes of every block in this store.
    fn block_size(&self) -> usize;

    /// Creates a new, empty file. Fails if the file already exists.
    fn create(&self, name: &str) -> Result<()>;

    /// Opens an existing file and returns how many blocks it holds.
    fn open(&self, name: &str) -> Result<BlockId>;

    /// Releases the handle of an open file.
    fn close(&self, name: &str) -> Result<()>;

    /// Closes and deletes a file with all its blocks. Returns false if there was no such file.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Appends a block to an open file and returns its id.
    fn allocate(&self, name: &str, data: &[u8]) -> Result<BlockId>;

    /// Reads an allocated block into the buffer.
    fn read_block(&self, name: &str, block_id: BlockId, buffer: &mut [u8]) -> Result<()>;

    /// Overwrites an allocated block.
    fn write_block(&self, name: &str, block_id: BlockId, data: &[u8]) -> Result<()>;
}
