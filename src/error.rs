use thiserror::Error;

use crate::common::BlockId;
use crate::tuple::schema::TypeId;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not enough room in block {block_id} for {requested} more bytes")]
    NoRoom { block_id: BlockId, requested: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Column '{column}' has type {type_id} which cannot be stored")]
    UnsupportedType { column: String, type_id: TypeId },

    #[error("Record of {size} bytes exceeds the maximum of {max} bytes per block")]
    RecordTooLarge { size: usize, max: usize },

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("Block file '{0}' is closed")]
    Closed(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_no_room(&self) -> bool {
        matches!(self, StorageError::NoRoom { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
