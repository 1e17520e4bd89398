pub type BlockId = u32;
pub type RecordId = u16;

/// The externally visible identity of a row: the block it lives in and its record id inside that block.
pub type Handle = (BlockId, RecordId);

pub const INVALID_BLOCK_ID: BlockId = 0;
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

// every in-page offset, including the end of the block where an empty record may sit, has to fit into a u16
pub const MIN_BLOCK_SIZE: usize = 64;
pub const MAX_BLOCK_SIZE: usize = u16::MAX as usize;

/// Size of one directory entry, (size, offset) for a record or (record_count, free_boundary) for the header.
pub const DIRECTORY_ENTRY_SIZE: usize = 4;

/// The largest record an empty page of the given block size can hold.
/// One byte at the high end is never used, and the header plus the record's own entry occupy the directory.
pub const fn max_record_size(block_size: usize) -> usize {
    block_size - 1 - 2 * DIRECTORY_ENTRY_SIZE
}
