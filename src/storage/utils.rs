use crate::error::{Result, StorageError};

const U16_SIZE: usize = std::mem::size_of::<u16>();
const I32_SIZE: usize = std::mem::size_of::<i32>();

/// Reads a little-endian u16 at the given offset of a block.
pub(in crate::storage) fn get_u16(buffer: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

/// Writes a little-endian u16 at the given offset of a block.
pub(in crate::storage) fn put_u16(buffer: &mut [u8], offset: usize, val: u16) {
    buffer[offset..offset + U16_SIZE].copy_from_slice(val.to_le_bytes().as_slice());
}

/// Appends little-endian fields to a growing byte buffer.
pub(in crate::storage) struct Serializer {
    buffer: Vec<u8>,
}

impl Serializer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn serialize_u16(&mut self, val: u16) {
        self.buffer.extend_from_slice(val.to_le_bytes().as_slice());
    }

    pub fn serialize_i32(&mut self, val: i32) {
        self.buffer.extend_from_slice(val.to_le_bytes().as_slice());
    }

    pub fn copy_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn end(self) -> Vec<u8> {
        self.buffer
    }
}

/// Reads little-endian fields from a byte slice, failing on truncated input.
pub(in crate::storage) struct Deserializer<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.buffer.len() {
            return Err(StorageError::Corrupted(format!(
                "Expected {} more bytes at position {}, but only {} are left",
                len,
                self.pos,
                self.buffer.len() - self.pos
            )));
        }
        let bytes = &self.buffer[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn deserialize_u16(&mut self) -> Result<u16> {
        let bytes = self.take(U16_SIZE)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn deserialize_i32(&mut self) -> Result<i32> {
        let bytes = self.take(I32_SIZE)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn deserialize_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::{get_u16, put_u16, Deserializer, Serializer};
    use crate::error::StorageError;

    #[test]
    fn fields_are_little_endian() {
        let mut block = [0u8; 8];
        put_u16(&mut block, 2, 0x0102);
        assert_eq!(block[2..4], [0x02, 0x01]);
        assert_eq!(get_u16(&block, 2), 0x0102);

        let mut serializer = Serializer::with_capacity(8);
        serializer.serialize_i32(-2);
        serializer.serialize_u16(7);
        serializer.copy_bytes(b"ab");
        let bytes = serializer.end();
        assert_eq!(bytes, vec![0xfe, 0xff, 0xff, 0xff, 7, 0, b'a', b'b']);

        let mut deserializer = Deserializer::new(&bytes);
        assert_eq!(deserializer.deserialize_i32().unwrap(), -2);
        assert_eq!(deserializer.deserialize_u16().unwrap(), 7);
        assert_eq!(deserializer.deserialize_bytes(2).unwrap(), b"ab");
        assert_eq!(deserializer.remaining(), 0);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut deserializer = Deserializer::new(&[1, 2, 3]);
        assert!(matches!(
            deserializer.deserialize_i32(),
            Err(StorageError::Corrupted(_))
        ));
    }
}
