use log::debug;

use super::block_store::BlockStore;
use super::page::Page;
use crate::common::{BlockId, INVALID_BLOCK_ID};
use crate::error::{Result, StorageError};

/// A sequence of slotted pages, stored as consecutively numbered blocks of a block store.
/// Blocks are only ever appended, never removed.
pub struct BlockFile<'a> {
    name: String,
    last_block_id: BlockId,
    open: bool,
    store: &'a dyn BlockStore,
}

impl<'a> BlockFile<'a> {
    pub fn new(name: impl Into<String>, store: &'a dyn BlockStore) -> Self {
        Self {
            name: name.into(),
            last_block_id: INVALID_BLOCK_ID,
            open: false,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_block_id(&self) -> BlockId {
        self.last_block_id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    /// Creates the file with a single empty block and leaves it open.
    pub fn create(&mut self) -> Result<()> {
        self.store.create(&self.name)?;
        self.open = true;
        self.last_block_id = INVALID_BLOCK_ID;
        debug!("created block file '{}'", self.name);
        let page = self.get_new()?;
        self.put(&page)
    }

    /// Opens an existing file. Opening an open file does nothing.
    pub fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        let last_block_id = self.store.open(&self.name)?;
        if last_block_id == INVALID_BLOCK_ID {
            self.store.close(&self.name)?;
            return Err(StorageError::NotFound(format!(
                "Block file '{}' has no blocks",
                self.name
            )));
        }
        self.last_block_id = last_block_id;
        self.open = true;
        debug!("opened block file '{}' with {} blocks", self.name, last_block_id);
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        if self.open {
            self.store.close(&self.name)?;
            self.open = false;
            debug!("closed block file '{}'", self.name);
        }
        Ok(())
    }

    /// Closes the file and deletes all of its blocks.
    pub fn drop(&mut self) -> Result<()> {
        self.close()?;
        self.store.remove(&self.name)?;
        self.last_block_id = INVALID_BLOCK_ID;
        debug!("dropped block file '{}'", self.name);
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StorageError::Closed(self.name.clone()))
        }
    }

    /// Allocates a new block at the end of the file and returns it as an empty page.
    pub fn get_new(&mut self) -> Result<Page> {
        self.check_open()?;
        let page = Page::new(vec![0u8; self.store.block_size()], self.last_block_id + 1, true)?;
        let block_id = self.store.allocate(&self.name, page.as_bytes())?;
        if block_id != page.block_id() {
            return Err(StorageError::Corrupted(format!(
                "Block file '{}' expected to allocate block {}, but got {}",
                self.name,
                page.block_id(),
                block_id
            )));
        }
        self.last_block_id = block_id;
        debug!("allocated block {} of '{}'", block_id, self.name);
        Ok(page)
    }

    /// Reads a block and returns it as a page.
    pub fn get(&self, block_id: BlockId) -> Result<Page> {
        self.check_open()?;
        if block_id == INVALID_BLOCK_ID || block_id > self.last_block_id {
            return Err(StorageError::NotFound(format!(
                "Block {} of '{}', which has {} blocks",
                block_id, self.name, self.last_block_id
            )));
        }
        let mut data = vec![0u8; self.store.block_size()];
        self.store.read_block(&self.name, block_id, &mut data)?;
        Page::new(data, block_id, false)
    }

    /// Writes a page back to its block.
    pub fn put(&self, page: &Page) -> Result<()> {
        self.check_open()?;
        self.store
            .write_block(&self.name, page.block_id(), page.as_bytes())
    }

    /// Ids of all blocks in file order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        1..=self.last_block_id
    }
}
