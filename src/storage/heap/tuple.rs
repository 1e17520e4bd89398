use crate::common::max_record_size;
use crate::error::{Result, StorageError};
use crate::storage::utils::{Deserializer, Serializer};
use crate::tuple::schema::{ColumnDefinition, Schema, TypeId};
use crate::tuple::value::Value;
use crate::tuple::Row;

fn unsupported(column: &ColumnDefinition) -> StorageError {
    StorageError::UnsupportedType {
        column: column.column_name().to_owned(),
        type_id: column.type_id(),
    }
}

fn mismatch(column: &ColumnDefinition, value: &Value) -> StorageError {
    StorageError::SchemaMismatch(format!(
        "Column '{}' of type {} cannot hold {} {}",
        column.column_name(),
        column.type_id(),
        value.type_id(),
        value
    ))
}

/// Serializes the declared columns of a row in schema order.
/// INT and BOOLEAN take 4 bytes, TEXT a 2 byte length followed by its bytes.
pub fn marshal(schema: &Schema, row: &Row, block_size: usize) -> Result<Vec<u8>> {
    let mut serializer = Serializer::with_capacity(block_size);
    let mut size = 0;
    for column in schema.columns() {
        let value = row.get(column.column_name()).ok_or_else(|| {
            StorageError::SchemaMismatch(format!("Missing value for column '{}'", column.column_name()))
        })?;
        match column.type_id() {
            TypeId::Integer => {
                let val = value.as_i32().ok_or_else(|| mismatch(column, value))?;
                serializer.serialize_i32(val);
            }
            TypeId::Boolean => {
                let val = value.as_bool().ok_or_else(|| mismatch(column, value))?;
                serializer.serialize_i32(val as i32);
            }
            TypeId::Text => {
                let bytes = value.as_str().ok_or_else(|| mismatch(column, value))?.as_bytes();
                let len = u16::try_from(bytes.len()).map_err(|_| StorageError::RecordTooLarge {
                    size: bytes.len(),
                    max: u16::MAX as usize,
                })?;
                serializer.serialize_u16(len);
                serializer.copy_bytes(bytes);
            }
            TypeId::Unknown => return Err(unsupported(column)),
        }
        size += value.size();
    }

    let max = max_record_size(block_size);
    if size > max {
        return Err(StorageError::RecordTooLarge { size, max });
    }
    Ok(serializer.end())
}

/// Parses a record written by `marshal` with the same schema.
pub fn unmarshal(schema: &Schema, bytes: &[u8]) -> Result<Row> {
    let mut deserializer = Deserializer::new(bytes);
    let mut row = Row::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let value = match column.type_id() {
            TypeId::Integer => Value::Integer(deserializer.deserialize_i32()?),
            TypeId::Boolean => Value::Boolean(deserializer.deserialize_i32()? != 0),
            TypeId::Text => {
                let len = deserializer.deserialize_u16()? as usize;
                let bytes = deserializer.deserialize_bytes(len)?;
                let val = std::str::from_utf8(bytes).map_err(|e| {
                    StorageError::Corrupted(format!(
                        "Column '{}' does not hold valid text: {}",
                        column.column_name(),
                        e
                    ))
                })?;
                Value::Text(val.to_owned())
            }
            TypeId::Unknown => return Err(unsupported(column)),
        };
        row.insert(column.column_name().to_owned(), value);
    }

    if deserializer.remaining() != 0 {
        return Err(StorageError::Corrupted(format!(
            "{} bytes left after reading all columns",
            deserializer.remaining()
        )));
    }
    Ok(row)
}
