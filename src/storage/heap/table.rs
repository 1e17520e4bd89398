use log::debug;

use super::tuple::{marshal, unmarshal};
use crate::common::{Handle, RecordId};
use crate::error::{Result, StorageError};
use crate::storage::block_file::BlockFile;
use crate::storage::block_store::BlockStore;
use crate::storage::page::Page;
use crate::tuple::schema::Schema;
use crate::tuple::Row;

/// A heap relation: rows of a fixed schema stored in the slotted pages of its own block file.
pub struct Table<'a> {
    name: String,
    schema: Schema,
    file: BlockFile<'a>,
}

impl<'a> Table<'a> {
    pub fn new(name: impl Into<String>, schema: Schema, store: &'a dyn BlockStore) -> Self {
        let name = name.into();
        let file = BlockFile::new(name.clone(), store);
        Self { name, schema, file }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.column_names()
    }

    pub fn create(&mut self) -> Result<()> {
        self.file.create()
    }

    /// Opens the table, or creates it if it has no block file yet.
    pub fn create_if_not_exists(&mut self) -> Result<()> {
        match self.file.open() {
            Err(e) if e.is_not_found() => {
                debug!("table '{}' does not exist yet, creating it", self.name);
                self.file.create()
            }
            result => result,
        }
    }

    pub fn drop(&mut self) -> Result<()> {
        self.file.drop()
    }

    pub fn open(&mut self) -> Result<()> {
        self.file.open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.file.close()
    }

    /// Inserts a row and returns its handle. Keys which are not columns of the table are ignored.
    pub fn insert(&mut self, row: &Row) -> Result<Handle> {
        self.open()?;
        let full_row = self.validate(row)?;
        self.append(&full_row)
    }

    /// Returns the handles of all rows, in block then record order.
    pub fn select(&self) -> Result<Vec<Handle>> {
        let mut handles = Vec::new();
        for block_id in self.file.block_ids() {
            let page = self.file.get(block_id)?;
            handles.extend(page.ids().into_iter().map(|record_id| (block_id, record_id)));
        }
        Ok(handles)
    }

    /// Returns the handles of all rows whose columns equal every value of the predicate.
    pub fn select_where(&self, predicate: &Row) -> Result<Vec<Handle>> {
        let mut handles = Vec::new();
        for block_id in self.file.block_ids() {
            let page = self.file.get(block_id)?;
            for record_id in page.ids() {
                let row = self.read_row(&page, record_id)?;
                let matches = predicate
                    .iter()
                    .all(|(column, value)| row.get(column) == Some(value));
                if matches {
                    handles.push((block_id, record_id));
                }
            }
        }
        Ok(handles)
    }

    /// Reads all columns of a row.
    pub fn project(&self, handle: Handle) -> Result<Row> {
        let (block_id, record_id) = handle;
        let page = self.file.get(block_id)?;
        self.read_row(&page, record_id)
    }

    /// Reads the requested columns of a row. Requested names which are not columns are skipped.
    pub fn project_columns(&self, handle: Handle, column_names: &[&str]) -> Result<Row> {
        let mut row = self.project(handle)?;
        Ok(column_names
            .iter()
            .filter_map(|name| row.remove_entry(*name))
            .collect())
    }

    /// Overwrites columns of a row in place. The handle stays valid.
    /// Fails with NoRoom if the grown row does not fit into its block anymore.
    pub fn update(&self, handle: Handle, new_values: &Row) -> Result<()> {
        if let Some(column) = new_values
            .keys()
            .find(|column| self.schema.find_column(column).is_none())
        {
            return Err(StorageError::SchemaMismatch(format!(
                "Table '{}' has no column '{}'",
                self.name, column
            )));
        }

        let (block_id, record_id) = handle;
        let mut page = self.file.get(block_id)?;
        let mut row = self.read_row(&page, record_id)?;
        for (column, value) in new_values {
            row.insert(column.clone(), value.clone());
        }
        let data = marshal(&self.schema, &row, page.block_size())?;
        page.put(record_id, &data)?;
        self.file.put(&page)
    }

    pub fn del(&self, handle: Handle) -> Result<()> {
        let (block_id, record_id) = handle;
        let mut page = self.file.get(block_id)?;
        page.del(record_id)?;
        self.file.put(&page)
    }

    /// Checks that the row has a value for every column and returns only those values.
    fn validate(&self, row: &Row) -> Result<Row> {
        self.schema
            .column_names()
            .map(|column| match row.get(column) {
                Some(value) => Ok((column.to_owned(), value.clone())),
                None => Err(StorageError::SchemaMismatch(format!(
                    "Missing value for column '{}' of table '{}'",
                    column, self.name
                ))),
            })
            .collect()
    }

    /// Adds a full row to the last block, or to a new block if the last one is full.
    fn append(&mut self, row: &Row) -> Result<Handle> {
        let data = marshal(&self.schema, row, self.file.block_size())?;
        let mut page = self.file.get(self.file.last_block_id())?;
        let record_id = match page.add(&data) {
            Ok(record_id) => record_id,
            Err(e) if e.is_no_room() => {
                debug!(
                    "block {} of '{}' is full, appending to a new block",
                    page.block_id(),
                    self.name
                );
                page = self.file.get_new()?;
                page.add(&data)?
            }
            Err(e) => return Err(e),
        };
        self.file.put(&page)?;
        Ok((page.block_id(), record_id))
    }

    fn read_row(&self, page: &Page, record_id: RecordId) -> Result<Row> {
        let data = page.get(record_id).ok_or_else(|| {
            StorageError::NotFound(format!(
                "Record {} in block {} of '{}'",
                record_id,
                page.block_id(),
                self.name
            ))
        })?;
        unmarshal(&self.schema, data)
    }
}
