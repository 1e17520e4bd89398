use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::prelude::FileExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use log::{debug, warn};

use super::block_store::BlockStore;
use crate::common::{BlockId, DEFAULT_BLOCK_SIZE, INVALID_BLOCK_ID, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{Result, StorageError};

const FILE_EXTENSION: &str = "db";

/// FileManager takes care of reading and writing blocks of relations.
/// It assumes that all relations are stored inside a single directory, the data directory,
/// where each relation is represented as a single file named after the relation.
pub struct FileManager {
    data_directory: PathBuf,
    block_size: usize,
    open_files: DashMap<String, FileHandle>,
}

impl FileManager {
    /// Creates a new FileManager using the default block size.
    ///
    /// # Arguments
    /// * `data_directory` - The directory under which all relations are stored
    ///
    pub fn new(data_directory: impl Into<PathBuf>) -> Result<Self> {
        Self::with_block_size(data_directory, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(data_directory: impl Into<PathBuf>, block_size: usize) -> Result<Self> {
        let data_directory = data_directory.into();
        if !data_directory.is_dir() {
            return Err(StorageError::InvalidConfig(format!(
                "{} is not a directory",
                data_directory.display()
            )));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(StorageError::InvalidConfig(format!(
                "Block size {} is outside of {}..={}",
                block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            )));
        }

        Ok(Self {
            data_directory,
            block_size,
            open_files: DashMap::new(),
        })
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StorageError::InvalidConfig(format!(
                "'{}' cannot be used as a file name",
                name
            )));
        }
        Ok(self
            .data_directory
            .join(format!("{}.{}", name, FILE_EXTENSION)))
    }

    /// Returns the FileHandle of an open file.
    fn get_file(&self, name: &str) -> Result<Ref<String, FileHandle>> {
        self.open_files
            .get(name)
            .ok_or_else(|| StorageError::Closed(name.to_owned()))
    }

    fn check_block_id(&self, file: &FileHandle, block_id: BlockId) -> Result<()> {
        let highest_block_id = file.get_highest_block_id(self.block_size);
        if block_id == INVALID_BLOCK_ID || block_id > highest_block_id {
            return Err(StorageError::NotFound(format!(
                "Block {} of '{}', which has {} blocks",
                block_id, file.name, highest_block_id
            )));
        }
        Ok(())
    }

    fn check_length(&self, length: usize) -> Result<()> {
        if length != self.block_size {
            return Err(StorageError::InvalidConfig(format!(
                "Got {} bytes for a block of {} bytes",
                length, self.block_size
            )));
        }
        Ok(())
    }
}

impl BlockStore for FileManager {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn create(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        if self.open_files.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_owned()));
        }
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(name.to_owned()),
                _ => StorageError::Io(e),
            })?;

        debug!("created {}", path.display());
        self.open_files
            .insert(name.to_owned(), FileHandle::new(name, file, 0));
        Ok(())
    }

    fn open(&self, name: &str) -> Result<BlockId> {
        if let Some(file) = self.open_files.get(name) {
            return Ok(file.get_highest_block_id(self.block_size));
        }

        let path = self.path(name)?;
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("No data file for '{}'", name)))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let size = file.metadata()?.len();
        if size % self.block_size as u64 != 0 {
            return Err(StorageError::Corrupted(format!(
                "Size {} of '{}' is not divisible by block size {}",
                size, name, self.block_size
            )));
        }

        let file = FileHandle::new(name, file, size);
        let highest_block_id = file.get_highest_block_id(self.block_size);
        debug!("opened {} with {} blocks", path.display(), highest_block_id);
        self.open_files.insert(name.to_owned(), file);
        Ok(highest_block_id)
    }

    fn close(&self, name: &str) -> Result<()> {
        if self.open_files.remove(name).is_some() {
            debug!("closed '{}'", name);
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path(name)?;
        self.open_files.remove(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("cannot drop {}, it does not exist", path.display());
                Ok(false)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn allocate(&self, name: &str, data: &[u8]) -> Result<BlockId> {
        self.check_length(data.len())?;
        let file = self.get_file(name)?;
        file.allocate_new_block(data, self.block_size)
    }

    fn read_block(&self, name: &str, block_id: BlockId, buffer: &mut [u8]) -> Result<()> {
        self.check_length(buffer.len())?;
        let file = self.get_file(name)?;
        self.check_block_id(&file, block_id)?;
        let offset = (block_id - 1) as u64 * self.block_size as u64;
        file.read_block_at_offset(offset, buffer)
    }

    fn write_block(&self, name: &str, block_id: BlockId, data: &[u8]) -> Result<()> {
        self.check_length(data.len())?;
        let file = self.get_file(name)?;
        self.check_block_id(&file, block_id)?;
        let offset = (block_id - 1) as u64 * self.block_size as u64;
        file.write_block_at_offset(offset, data)
    }
}

struct FileHandle {
    name: String,
    file: File,
    filesize: AtomicU64,
}

impl FileHandle {
    fn new(name: &str, file: File, filesize: u64) -> Self {
        Self {
            name: name.to_owned(),
            file,
            filesize: AtomicU64::new(filesize),
        }
    }

    fn filesize(&self) -> u64 {
        self.filesize.load(Ordering::Relaxed)
    }

    fn get_highest_block_id(&self, block_size: usize) -> BlockId {
        (self.filesize() / block_size as u64) as BlockId
    }

    /// Appends a new block.
    fn allocate_new_block(&self, data: &[u8], block_size: usize) -> Result<BlockId> {
        let offset = self
            .filesize
            .fetch_add(block_size as u64, Ordering::Relaxed);
        if let Err(e) = self.write_block_at_offset(offset, data) {
            self.filesize.fetch_sub(block_size as u64, Ordering::Relaxed);
            return Err(e);
        }
        Ok((offset / block_size as u64) as BlockId + 1)
    }

    fn read_block_at_offset(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buffer, offset)?;
        Ok(())
    }

    /// Writes data to the file at the given offset and syncs it.
    fn write_block_at_offset(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.file.write_all_at(data, offset)?;
        self.file.sync_all()?;
        Ok(())
    }
}
