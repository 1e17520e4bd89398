use log::trace;

use super::utils::{get_u16, put_u16};
use crate::common::{BlockId, RecordId, DIRECTORY_ENTRY_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{Result, StorageError};

// Layout of a block (B bytes):
//
//  0..2          record_count
//  2..4          free_boundary
//  4*i..4*i+4    (size, offset) of record i, i in 1..=record_count. offset 0 is a tombstone
//  ...           free space
//  fb+1..B       packed record bytes, the most recently added record at the lowest offset

/// A slotted page over one block's bytes.
/// Record ids are handed out in increasing order and are never reused, even after the record is deleted.
#[derive(Debug)]
pub struct Page {
    block_id: BlockId,
    data: Vec<u8>,
    record_count: u16,
    free_boundary: u16,
}

impl Page {
    /// Wraps the bytes of a block.
    /// If `is_new` is set, the header of an empty page is written, otherwise it is read from `data`.
    pub fn new(data: Vec<u8>, block_id: BlockId, is_new: bool) -> Result<Self> {
        if data.len() < MIN_BLOCK_SIZE || data.len() > MAX_BLOCK_SIZE {
            return Err(StorageError::InvalidConfig(format!(
                "Block size {} is outside of {}..={}",
                data.len(),
                MIN_BLOCK_SIZE,
                MAX_BLOCK_SIZE
            )));
        }

        let mut page = Self {
            block_id,
            data,
            record_count: 0,
            free_boundary: 0,
        };
        if is_new {
            page.data.fill(0);
            page.free_boundary = (page.data.len() - 1) as u16;
            page.put_header();
        } else {
            page.record_count = get_u16(&page.data, 0);
            page.free_boundary = get_u16(&page.data, 2);
            page.check_layout()?;
        }
        Ok(page)
    }

    /// Verifies that the persisted header and directory describe a consistent page.
    fn check_layout(&self) -> Result<()> {
        let block_size = self.data.len();
        let free_boundary = self.free_boundary as usize;
        if free_boundary >= block_size || self.directory_end() > free_boundary + 1 {
            return Err(StorageError::Corrupted(format!(
                "Block {} has {} records and free boundary {}",
                self.block_id, self.record_count, self.free_boundary
            )));
        }
        for id in 1..=self.record_count {
            let (size, offset) = self.get_entry(id);
            if offset == 0 {
                continue;
            }
            let (size, offset) = (size as usize, offset as usize);
            if offset <= free_boundary || offset + size > block_size {
                return Err(StorageError::Corrupted(format!(
                    "Record {} of block {} points to {}..{}",
                    id,
                    self.block_id,
                    offset,
                    offset + size
                )));
            }
        }
        Ok(())
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn record_count(&self) -> u16 {
        self.record_count
    }

    pub fn free_boundary(&self) -> u16 {
        self.free_boundary
    }

    pub fn block_size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn directory_end(&self) -> usize {
        (self.record_count as usize + 1) * DIRECTORY_ENTRY_SIZE
    }

    /// Bytes between the end of the directory and the free boundary.
    pub fn available(&self) -> usize {
        (self.free_boundary as usize).saturating_sub(self.directory_end())
    }

    /// Returns whether `size` more bytes fit into this page.
    /// For `add` the caller has to include the directory entry of the new record.
    pub fn has_room(&self, size: usize) -> bool {
        let available = self.free_boundary as isize - self.directory_end() as isize;
        available >= size as isize
    }

    /// Adds a new record and returns its id.
    pub fn add(&mut self, data: &[u8]) -> Result<RecordId> {
        if !self.has_room(data.len() + DIRECTORY_ENTRY_SIZE) {
            return Err(StorageError::NoRoom {
                block_id: self.block_id,
                requested: data.len() + DIRECTORY_ENTRY_SIZE,
            });
        }
        self.record_count += 1;
        let id = self.record_count;
        let size = data.len() as u16;
        self.free_boundary -= size;
        let offset = self.free_boundary + 1;
        self.put_header();
        self.put_entry(id, size, offset);
        let start = offset as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        trace!("block {}: added record {} ({} bytes at {})", self.block_id, id, size, offset);
        Ok(id)
    }

    /// Returns the bytes of a record, or None if it was deleted or never allocated.
    pub fn get(&self, id: RecordId) -> Option<&[u8]> {
        if id == 0 || id > self.record_count {
            return None;
        }
        let (size, offset) = self.get_entry(id);
        if offset == 0 {
            return None;
        }
        let start = offset as usize;
        Some(&self.data[start..start + size as usize])
    }

    /// Replaces the bytes of a record.
    /// A growing record makes room by sliding all records stored below it further down.
    pub fn put(&mut self, id: RecordId, data: &[u8]) -> Result<()> {
        let (size, offset) = self.live_entry(id)?;
        let new_size = data.len();
        if new_size > size as usize {
            let extra = new_size - size as usize;
            if !self.has_room(extra) {
                return Err(StorageError::NoRoom {
                    block_id: self.block_id,
                    requested: extra,
                });
            }
            let new_offset = offset as usize - extra;
            self.slide(offset as usize, new_offset);
            self.data[new_offset..new_offset + new_size].copy_from_slice(data);
            self.put_entry(id, new_size as u16, new_offset as u16);
        } else {
            let start = offset as usize;
            self.data[start..start + new_size].copy_from_slice(data);
            self.put_entry(id, new_size as u16, offset);
        }
        self.put_header();
        trace!("block {}: put record {} ({} bytes)", self.block_id, id, new_size);
        Ok(())
    }

    /// Deletes a record. Its id stays retired and its bytes are reclaimed.
    pub fn del(&mut self, id: RecordId) -> Result<()> {
        let (size, offset) = self.live_entry(id)?;
        self.put_entry(id, 0, 0);
        self.slide(offset as usize, offset as usize + size as usize);
        self.put_header();
        trace!("block {}: deleted record {}", self.block_id, id);
        Ok(())
    }

    /// Ids of all live records in ascending order.
    pub fn ids(&self) -> Vec<RecordId> {
        (1..=self.record_count)
            .filter(|id| self.get_entry(*id).1 != 0)
            .collect()
    }

    /// Moves the packed bytes between the free boundary and `start` by `end - start` bytes.
    /// A positive shift closes a gap at `start` (after a delete), a negative one opens a gap below `start`.
    /// Every live record stored at or below `start` has its offset adjusted.
    fn slide(&mut self, start: usize, end: usize) {
        let shift = end as isize - start as isize;
        if shift == 0 {
            return;
        }

        let block_start = self.free_boundary as usize + 1;
        let dest = (block_start as isize + shift) as usize;
        self.data.copy_within(block_start..start, dest);

        for id in 1..=self.record_count {
            let (size, offset) = self.get_entry(id);
            if offset != 0 && offset as usize <= start {
                let moved = (offset as isize + shift) as u16;
                self.put_entry(id, size, moved);
            }
        }

        self.free_boundary = (self.free_boundary as isize + shift) as u16;
        self.put_header();
    }

    fn live_entry(&self, id: RecordId) -> Result<(u16, u16)> {
        if id == 0 || id > self.record_count {
            return Err(StorageError::NotFound(format!(
                "Record {} in block {} (block has {} records)",
                id, self.block_id, self.record_count
            )));
        }
        let (size, offset) = self.get_entry(id);
        if offset == 0 {
            return Err(StorageError::NotFound(format!(
                "Record {} in block {} was deleted",
                id, self.block_id
            )));
        }
        Ok((size, offset))
    }

    fn get_entry(&self, id: RecordId) -> (u16, u16) {
        let pos = DIRECTORY_ENTRY_SIZE * id as usize;
        (get_u16(&self.data, pos), get_u16(&self.data, pos + 2))
    }

    fn put_entry(&mut self, id: RecordId, size: u16, offset: u16) {
        let pos = DIRECTORY_ENTRY_SIZE * id as usize;
        put_u16(&mut self.data, pos, size);
        put_u16(&mut self.data, pos + 2, offset);
    }

    fn put_header(&mut self) {
        put_u16(&mut self.data, 0, self.record_count);
        put_u16(&mut self.data, 2, self.free_boundary);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rand::distributions::{Alphanumeric, DistString};
    use rand::Rng;

    use super::Page;
    use crate::common::{max_record_size, DEFAULT_BLOCK_SIZE, DIRECTORY_ENTRY_SIZE, MAX_BLOCK_SIZE};
    use crate::error::StorageError;

    fn empty_page() -> Page {
        Page::new(vec![0u8; DEFAULT_BLOCK_SIZE], 1, true).unwrap()
    }

    fn random_bytes(rng: &mut impl Rng) -> Vec<u8> {
        let length = rng.gen_range(0..64);
        Alphanumeric.sample_string(rng, length).into_bytes()
    }

    #[test]
    fn new_page_has_empty_header() {
        let page = empty_page();
        assert_eq!(page.record_count(), 0);
        assert_eq!(page.free_boundary() as usize, DEFAULT_BLOCK_SIZE - 1);
        assert!(page.ids().is_empty());
        assert_eq!(page.as_bytes()[0..4], [0, 0, 0xff, 0x0f]);
    }

    #[test]
    fn add_and_get() -> Result<()> {
        let mut page = empty_page();
        let id = page.add(b"hello\0")?;
        assert_eq!(id, 1);
        assert_eq!(page.get(id), Some(b"hello\0".as_slice()));

        let id = page.add(b"goodbye\0")?;
        assert_eq!(id, 2);
        assert_eq!(page.get(id), Some(b"goodbye\0".as_slice()));
        assert_eq!(page.ids(), vec![1, 2]);

        // the most recent record sits at the lowest offset
        assert_eq!(page.free_boundary() as usize, DEFAULT_BLOCK_SIZE - 1 - 6 - 8);
        assert_eq!(page.get(0), None);
        assert_eq!(page.get(3), None);
        Ok(())
    }

    #[test]
    fn random_adds_keep_their_bytes() -> Result<()> {
        let mut rng = rand::thread_rng();
        let mut page = empty_page();
        let mut added = Vec::new();
        loop {
            let data = random_bytes(&mut rng);
            if !page.has_room(data.len() + DIRECTORY_ENTRY_SIZE) {
                break;
            }
            let id = page.add(&data)?;
            added.push((id, data));
        }

        let expected_ids = added.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        assert_eq!(page.ids(), expected_ids);
        for (id, data) in &added {
            assert_eq!(page.get(*id), Some(data.as_slice()));
        }
        Ok(())
    }

    #[test]
    fn put_grows_and_shrinks_without_touching_neighbours() -> Result<()> {
        let mut page = empty_page();
        page.add(b"hello\0")?;
        page.add(b"goodbye\0")?;

        page.put(1, b"something much bigger\0")?;
        assert_eq!(page.get(2), Some(b"goodbye\0".as_slice()));
        assert_eq!(page.get(1), Some(b"something much bigger\0".as_slice()));

        page.put(1, b"hello\0")?;
        assert_eq!(page.get(2), Some(b"goodbye\0".as_slice()));
        assert_eq!(page.get(1), Some(b"hello\0".as_slice()));

        page.put(1, b"something much bigger\0")?;
        assert_eq!(page.get(2), Some(b"goodbye\0".as_slice()));
        assert_eq!(page.get(1), Some(b"something much bigger\0".as_slice()));
        assert_eq!(page.ids(), vec![1, 2]);
        Ok(())
    }

    #[test]
    fn growing_the_newest_record() -> Result<()> {
        let mut page = empty_page();
        page.add(b"first")?;
        page.add(b"second")?;
        let boundary = page.free_boundary();

        page.put(2, b"second, but longer")?;
        assert_eq!(page.free_boundary(), boundary - 12);
        assert_eq!(page.get(1), Some(b"first".as_slice()));
        assert_eq!(page.get(2), Some(b"second, but longer".as_slice()));
        Ok(())
    }

    #[test]
    fn put_without_room_fails() -> Result<()> {
        let mut page = empty_page();
        page.add(b"small")?;
        let available = page.available();
        page.add(&vec![7u8; available - 16])?;

        let result = page.put(1, &vec![1u8; 32]);
        assert!(matches!(result, Err(StorageError::NoRoom { .. })));
        assert_eq!(page.get(1), Some(b"small".as_slice()));
        Ok(())
    }

    #[test]
    fn del_compacts_and_retires_id() -> Result<()> {
        let mut page = empty_page();
        page.add(b"one")?;
        page.add(b"two")?;
        page.add(b"three")?;
        let boundary = page.free_boundary();

        page.del(2)?;
        assert_eq!(page.get(2), None);
        assert_eq!(page.ids(), vec![1, 3]);
        assert_eq!(page.get(1), Some(b"one".as_slice()));
        assert_eq!(page.get(3), Some(b"three".as_slice()));
        assert_eq!(page.free_boundary(), boundary + 3);

        // ids are never handed out twice
        assert_eq!(page.add(b"four")?, 4);
        assert_eq!(page.ids(), vec![1, 3, 4]);
        assert_eq!(page.get(3), Some(b"three".as_slice()));

        assert!(matches!(page.del(2), Err(StorageError::NotFound(_))));
        assert!(matches!(page.put(2, b"x"), Err(StorageError::NotFound(_))));
        assert!(matches!(page.del(9), Err(StorageError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn random_deletes_keep_other_records() -> Result<()> {
        let mut rng = rand::thread_rng();
        let mut page = empty_page();
        let mut live = Vec::new();
        for _ in 0..40 {
            let data = random_bytes(&mut rng);
            let id = page.add(&data)?;
            live.push((id, data));
        }

        while !live.is_empty() {
            let (id, _) = live.remove(rng.gen_range(0..live.len()));
            page.del(id)?;
            assert_eq!(page.get(id), None);
            assert!(!page.ids().contains(&id));
            for (other, data) in &live {
                assert_eq!(page.get(*other), Some(data.as_slice()));
            }
        }
        assert_eq!(page.free_boundary() as usize, DEFAULT_BLOCK_SIZE - 1);
        Ok(())
    }

    #[test]
    fn add_too_big_fails() -> Result<()> {
        let mut page = empty_page();
        page.add(b"hello\0")?;

        let result = page.add(&vec![0u8; DEFAULT_BLOCK_SIZE - 10]);
        assert!(matches!(result, Err(StorageError::NoRoom { block_id: 1, .. })));
        assert_eq!(page.ids(), vec![1]);
        assert_eq!(page.get(1), Some(b"hello\0".as_slice()));
        Ok(())
    }

    #[test]
    fn largest_record_fits_into_empty_page() -> Result<()> {
        let mut page = empty_page();
        let max = max_record_size(DEFAULT_BLOCK_SIZE);
        assert!(page.add(&vec![1u8; max + 1]).is_err());
        let id = page.add(&vec![1u8; max])?;
        assert_eq!(page.get(id).map(|data| data.len()), Some(max));
        assert_eq!(page.available(), 0);
        Ok(())
    }

    #[test]
    fn empty_records_at_largest_block_size() -> Result<()> {
        let mut page = Page::new(vec![0u8; MAX_BLOCK_SIZE], 1, true)?;
        let first = page.add(b"")?;
        assert_eq!(page.get(first), Some(b"".as_slice()));

        let filled = page.add(b"a")?;
        let second = page.add(b"")?;
        page.del(filled)?;
        assert_eq!(page.ids(), vec![first, second]);
        assert_eq!(page.get(first), Some(b"".as_slice()));
        assert_eq!(page.get(second), Some(b"".as_slice()));
        assert_eq!(page.free_boundary() as usize, MAX_BLOCK_SIZE - 1);

        let page = Page::new(page.into_bytes(), 1, false)?;
        assert_eq!(page.ids(), vec![first, second]);

        assert!(matches!(
            Page::new(vec![0u8; MAX_BLOCK_SIZE + 1], 1, true),
            Err(StorageError::InvalidConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn reopen_from_bytes() -> Result<()> {
        let mut page = empty_page();
        page.add(b"alpha")?;
        page.add(b"beta")?;
        page.del(1)?;

        let page = Page::new(page.into_bytes(), 1, false)?;
        assert_eq!(page.record_count(), 2);
        assert_eq!(page.ids(), vec![2]);
        assert_eq!(page.get(2), Some(b"beta".as_slice()));
        Ok(())
    }

    #[test]
    fn corrupted_bytes_are_rejected() {
        let mut data = vec![0u8; DEFAULT_BLOCK_SIZE];
        // one record whose bytes would run past the end of the block
        data[0..4].copy_from_slice(&[1, 0, 0xf0, 0x0f]);
        data[4..8].copy_from_slice(&[0x20, 0, 0xf8, 0x0f]);
        assert!(matches!(
            Page::new(data, 3, false),
            Err(StorageError::Corrupted(_))
        ));

        assert!(matches!(
            Page::new(vec![0u8; 16], 1, true),
            Err(StorageError::InvalidConfig(_))
        ));
    }
}
