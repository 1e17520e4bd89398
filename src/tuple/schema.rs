use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Result, StorageError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeId {
    Boolean,
    Integer,
    Text,
    // has no marshalling rule, only used for columns whose type could not be resolved
    Unknown,
}

impl FromStr for TypeId {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BOOLEAN" => Ok(TypeId::Boolean),
            "INT" | "INTEGER" => Ok(TypeId::Integer),
            "TEXT" => Ok(TypeId::Text),
            _ => Err(StorageError::SchemaMismatch(format!("Invalid TypeId {}", s))),
        }
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDefinition {
    pub type_id: TypeId,
    pub column_name: String,
}

impl ColumnDefinition {
    pub fn new(type_id: TypeId, column_name: impl Into<String>) -> Self {
        Self {
            type_id,
            column_name: column_name.into(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

/// The ordered columns of a relation. The order is the on-page field order and must not change once data exists.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.column_name()) {
                return Err(StorageError::SchemaMismatch(format!(
                    "Column '{}' is declared more than once",
                    column.column_name()
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Builds a schema from parallel lists of column names and types.
    pub fn from_parts(column_names: &[&str], column_attributes: &[TypeId]) -> Result<Self> {
        if column_names.len() != column_attributes.len() {
            return Err(StorageError::SchemaMismatch(format!(
                "Got {} column names but {} column attributes",
                column_names.len(),
                column_attributes.len()
            )));
        }
        let columns = column_names
            .iter()
            .zip(column_attributes)
            .map(|(name, type_id)| ColumnDefinition::new(*type_id, *name))
            .collect();
        Self::new(columns)
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|col| col.column_name().eq(name))
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.column_name())
    }
}

/// Parses a comma separated list of `name:TYPE` columns, e.g. `a:INT,b:TEXT`.
impl FromStr for Schema {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let columns = s
            .split(',')
            .map(|column| -> Result<ColumnDefinition> {
                let (name, type_name) = column.split_once(':').ok_or_else(|| {
                    StorageError::SchemaMismatch(format!("Expected name:TYPE, got '{}'", column))
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(StorageError::SchemaMismatch(format!(
                        "Column '{}' has no name",
                        column
                    )));
                }
                Ok(ColumnDefinition::new(type_name.trim().parse()?, name))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDefinition, Schema, TypeId};
    use crate::error::StorageError;

    #[test]
    fn parse_type_id_test() {
        assert_eq!("INT".parse::<TypeId>().unwrap(), TypeId::Integer);
        assert_eq!("text".parse::<TypeId>().unwrap(), TypeId::Text);
        assert_eq!("Boolean".parse::<TypeId>().unwrap(), TypeId::Boolean);
        assert!("DOUBLE".parse::<TypeId>().is_err());
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let result = Schema::new(vec![
            ColumnDefinition::new(TypeId::Integer, "a"),
            ColumnDefinition::new(TypeId::Text, "a"),
        ]);
        assert!(matches!(result, Err(StorageError::SchemaMismatch(_))));
    }

    #[test]
    fn from_parts_test() {
        let schema = Schema::from_parts(&["a", "b"], &[TypeId::Integer, TypeId::Text]).unwrap();
        assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(schema.find_column("b").unwrap().type_id(), TypeId::Text);
        assert!(schema.find_column("c").is_none());

        let result = Schema::from_parts(&["a"], &[TypeId::Integer, TypeId::Text]);
        assert!(matches!(result, Err(StorageError::SchemaMismatch(_))));
    }

    #[test]
    fn parse_schema_test() {
        let schema: Schema = "a:INT, b:text,flag:Boolean".parse().unwrap();
        assert_eq!(
            schema,
            Schema::from_parts(
                &["a", "b", "flag"],
                &[TypeId::Integer, TypeId::Text, TypeId::Boolean]
            )
            .unwrap()
        );

        assert!("a".parse::<Schema>().is_err());
        assert!(":INT".parse::<Schema>().is_err());
        assert!("a:DOUBLE".parse::<Schema>().is_err());
        assert!("a:INT,a:TEXT".parse::<Schema>().is_err());
    }
}
